// Application layer - Use case interactors

pub mod batch_interactor;
pub mod container;
pub mod detect_interactor;
pub mod feature_interactor;
pub mod merge_interactor;
pub mod pipeline_interactor;
pub mod slice_interactor;

// Re-export interactors
pub use batch_interactor::BatchInteractor;
pub use detect_interactor::DetectInteractor;
pub use feature_interactor::FeatureExtractor;
pub use merge_interactor::{MergeInteractor, MergeOutcome};
pub use pipeline_interactor::PipelineInteractor;
pub use slice_interactor::{SliceInteractor, SliceOutcome};
