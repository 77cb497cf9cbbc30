// Adapters - External system implementations

pub mod cloud_http;
pub mod embed_http;
pub mod exec_ffmpeg;
pub mod fs_local;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use cloud_http::HttpCloudAnalyzer;
pub use embed_http::HttpEmbeddingClient;
pub use exec_ffmpeg::{EncodeSettings, FfmpegExecAdapter};
pub use fs_local::FsLocalAdapter;
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::PipelineOptions;
