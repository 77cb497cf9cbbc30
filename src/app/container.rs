use std::sync::Arc;

use crate::adapters::{
    FfmpegExecAdapter, FfprobeAdapter, FsLocalAdapter, HttpCloudAnalyzer, HttpEmbeddingClient, PipelineOptions,
};
use crate::app::{
    batch_interactor::BatchInteractor, detect_interactor::DetectInteractor,
    feature_interactor::FeatureExtractor, merge_interactor::MergeInteractor,
    pipeline_interactor::PipelineInteractor, slice_interactor::SliceInteractor,
};
use crate::domain::errors::DomainError;
use crate::output::{ArtifactWriter, OutputVerifier};
use crate::ports::{CloudAnalyzerPort, EmbeddingPort, ExecutePort, FsPort, ProbePort};

/// The collaborators every interactor is built from
#[derive(Clone)]
pub struct AppPorts {
    pub probe: Arc<dyn ProbePort>,
    pub execute: Arc<dyn ExecutePort>,
    pub fs: Arc<dyn FsPort>,
    pub cloud: Option<Arc<dyn CloudAnalyzerPort>>,
    pub embedding: Option<Arc<dyn EmbeddingPort>>,
}

pub trait AppContainer: Send + Sync {
    fn detect_interactor(&self) -> Arc<DetectInteractor>;
    fn pipeline_interactor(&self) -> Arc<PipelineInteractor>;
    fn batch_interactor(&self) -> Arc<BatchInteractor>;
}

pub struct DefaultAppContainer {
    detect_interactor: Arc<DetectInteractor>,
    pipeline_interactor: Arc<PipelineInteractor>,
    batch_interactor: Arc<BatchInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters described by `options`
    pub fn new(options: &PipelineOptions) -> Result<Self, DomainError> {
        let toolkit_timeout = options.timeouts.toolkit();

        let cloud = match &options.cloud.endpoint {
            Some(endpoint) => Some(
                Arc::new(HttpCloudAnalyzer::new(endpoint.clone(), options.timeouts.cloud())?)
                    as Arc<dyn CloudAnalyzerPort>,
            ),
            None => None,
        };
        let embedding = match &options.embedding.endpoint {
            Some(endpoint) => Some(
                Arc::new(HttpEmbeddingClient::new(endpoint.clone(), options.timeouts.embedding())?)
                    as Arc<dyn EmbeddingPort>,
            ),
            None => None,
        };

        let ports = AppPorts {
            probe: Arc::new(FfprobeAdapter::new(options.toolkit.ffprobe.clone(), toolkit_timeout)),
            execute: Arc::new(FfmpegExecAdapter::new(
                options.toolkit.ffmpeg.clone(),
                toolkit_timeout,
                options.toolkit.encode_settings(),
            )),
            fs: Arc::new(FsLocalAdapter::new()),
            cloud,
            embedding,
        };

        Ok(Self::with_ports(ports, options))
    }

    /// Wire interactors over arbitrary port implementations
    pub fn with_ports(ports: AppPorts, options: &PipelineOptions) -> Self {
        let retry = options.retry.policy();
        let workers = options.concurrency.slice_workers;

        let detector = DetectInteractor::new(Arc::clone(&ports.probe), Arc::clone(&ports.execute), retry);
        let slicer = SliceInteractor::new(Arc::clone(&ports.execute), Arc::clone(&ports.fs), retry, workers);
        let extractor = Arc::new(FeatureExtractor::new(
            Arc::clone(&ports.execute),
            ports.embedding.clone(),
            retry,
            options.merge.frames_per_clip,
        ));
        let merger = MergeInteractor::new(
            Arc::clone(&ports.execute),
            Arc::clone(&ports.fs),
            extractor,
            retry,
            workers,
        );
        let writer = ArtifactWriter::new(Arc::clone(&ports.fs));

        let pipeline_interactor = Arc::new(PipelineInteractor::new(
            ports.cloud.clone(),
            Arc::clone(&ports.fs),
            detector.clone(),
            slicer,
            merger,
            writer.clone(),
            OutputVerifier::new(Arc::clone(&ports.fs)),
            retry,
        ));
        let batch_interactor = Arc::new(BatchInteractor::new(Arc::clone(&pipeline_interactor), writer));

        Self {
            detect_interactor: Arc::new(detector),
            pipeline_interactor,
            batch_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn detect_interactor(&self) -> Arc<DetectInteractor> {
        Arc::clone(&self.detect_interactor)
    }

    fn pipeline_interactor(&self) -> Arc<PipelineInteractor> {
        Arc::clone(&self.pipeline_interactor)
    }

    fn batch_interactor(&self) -> Arc<BatchInteractor> {
        Arc::clone(&self.batch_interactor)
    }
}
