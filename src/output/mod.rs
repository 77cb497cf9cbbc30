//! Persisted artifacts: slice manifests, the run report and output verification

pub mod verifier;
pub mod writer;

pub use verifier::OutputVerifier;
pub use writer::ArtifactWriter;
