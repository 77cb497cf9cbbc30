// Feature interactor - Comparable visual summaries of clips

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::model::*;
use crate::ports::*;
use crate::utils::retry::RetryPolicy;

/// Histogram bins per RGB channel
pub const HISTOGRAM_BINS: usize = 16;

/// Luma gradient (|dx| + |dy|) above which a pixel counts as an edge
pub const EDGE_THRESHOLD: f32 = 32.0;

/// Length of a descriptor vector
pub const DESCRIPTOR_LEN: usize = HISTOGRAM_BINS * 3 + 3;

/// Extracts feature vectors for clips.
///
/// Built once per process and shared across workers. The embedding service is tried
/// first; after its first failure every later clip goes straight to the built-in
/// descriptor so one run never mixes the two kinds more than once.
pub struct FeatureExtractor {
    execute_port: Arc<dyn ExecutePort>,
    embedding_port: Option<Arc<dyn EmbeddingPort>>,
    retry: RetryPolicy,
    frames_per_clip: usize,
    embedding_available: AtomicBool,
}

impl FeatureExtractor {
    pub fn new(
        execute_port: Arc<dyn ExecutePort>,
        embedding_port: Option<Arc<dyn EmbeddingPort>>,
        retry: RetryPolicy,
        frames_per_clip: usize,
    ) -> Self {
        let embedding_available = AtomicBool::new(embedding_port.is_some());
        Self {
            execute_port,
            embedding_port,
            retry,
            frames_per_clip: frames_per_clip.max(1),
            embedding_available,
        }
    }

    pub fn embedding_available(&self) -> bool {
        self.embedding_available.load(Ordering::Relaxed)
    }

    /// Timestamps (relative to the clip file) at the centre of N equal windows
    pub fn sample_times(duration: f64, count: usize) -> Vec<f64> {
        if !(duration > 0.0) {
            return vec![0.0];
        }
        let count = count.max(1);
        (0..count)
            .map(|i| duration * (i as f64 + 0.5) / count as f64)
            .collect()
    }

    /// Feature vector for a clip, `None` when the clip cannot be read
    pub async fn extract(&self, clip: &Clip) -> Option<FeatureVector> {
        let frames = self.sample(clip).await?;
        if let Some(vector) = self.embed(&frames).await {
            return Some(vector);
        }
        describe_frames(&frames)
    }

    /// Built-in descriptor only, sampled at the same timestamps as [`Self::extract`]
    pub async fn describe(&self, clip: &Clip) -> Option<FeatureVector> {
        let frames = self.sample(clip).await?;
        describe_frames(&frames)
    }

    async fn sample(&self, clip: &Clip) -> Option<Vec<Frame>> {
        let timestamps = Self::sample_times(clip.duration, self.frames_per_clip);
        match self.execute_port.extract_frames(&clip.file_path, &timestamps).await {
            Ok(frames) if !frames.is_empty() => Some(frames),
            Ok(_) => {
                debug!(clip = %clip.file_path.display(), "No frames sampled");
                None
            }
            Err(e) => {
                warn!(clip = %clip.file_path.display(), error = %e, "Frame sampling failed");
                None
            }
        }
    }

    async fn embed(&self, frames: &[Frame]) -> Option<FeatureVector> {
        let port = self.embedding_port.as_ref()?;
        if !self.embedding_available() {
            return None;
        }

        match self.retry.run("embedding", || port.embed(frames)).await {
            Ok(embeddings) => {
                let averaged = mean_vector(&embeddings)?;
                FeatureVector::normalized(averaged, FeatureSource::Embedding)
            }
            Err(e) => {
                if self.embedding_available.swap(false, Ordering::Relaxed) {
                    warn!(error = %e, "Embedding service unavailable, using built-in descriptor");
                }
                None
            }
        }
    }
}

/// Element-wise mean of equally sized vectors
fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let width = vectors.first()?.len();
    if width == 0 || vectors.iter().any(|v| v.len() != width) {
        return None;
    }
    let mut sum = vec![0.0f32; width];
    for vector in vectors {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    let count = vectors.len() as f32;
    Some(sum.into_iter().map(|v| v / count).collect())
}

/// Per-channel histograms, brightness, contrast and edge density for one frame
pub fn frame_descriptor(frame: &Frame) -> Vec<f32> {
    let pixels = frame.pixel_count().max(1) as f32;
    let mut values = vec![0.0f32; DESCRIPTOR_LEN];

    for pixel in frame.rgb.chunks_exact(3) {
        for (channel, &value) in pixel.iter().enumerate() {
            let bin = value as usize * HISTOGRAM_BINS / 256;
            values[channel * HISTOGRAM_BINS + bin] += 1.0;
        }
    }
    for bin in values.iter_mut().take(HISTOGRAM_BINS * 3) {
        *bin /= pixels;
    }

    let luma = frame.luma();
    let mean = luma.iter().sum::<f32>() / pixels;
    let variance = luma.iter().map(|l| (l - mean) * (l - mean)).sum::<f32>() / pixels;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let mut edges = 0usize;
    let mut evaluated = 0usize;
    for y in 0..height.saturating_sub(1) {
        for x in 0..width.saturating_sub(1) {
            let here = luma[y * width + x];
            let dx = (luma[y * width + x + 1] - here).abs();
            let dy = (luma[(y + 1) * width + x] - here).abs();
            evaluated += 1;
            if dx + dy > EDGE_THRESHOLD {
                edges += 1;
            }
        }
    }

    let base = HISTOGRAM_BINS * 3;
    values[base] = mean / 255.0;
    values[base + 1] = variance.sqrt() / 128.0;
    values[base + 2] = if evaluated == 0 {
        0.0
    } else {
        edges as f32 / evaluated as f32
    };
    values
}

/// Average the per-frame descriptors and normalize
pub fn describe_frames(frames: &[Frame]) -> Option<FeatureVector> {
    let descriptors: Vec<Vec<f32>> = frames.iter().map(frame_descriptor).collect();
    FeatureVector::normalized(mean_vector(&descriptors)?, FeatureSource::Descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::rules::visual_similarity;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicU32;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = (0..width * height).flat_map(|_| rgb).collect();
        Frame::new(width, height, data).unwrap()
    }

    fn checkerboard(size: u32) -> Frame {
        let data = (0..size * size)
            .flat_map(|i| {
                let (x, y) = (i % size, i / size);
                if (x + y) % 2 == 0 {
                    [255u8, 255, 255]
                } else {
                    [0u8, 0, 0]
                }
            })
            .collect();
        Frame::new(size, size, data).unwrap()
    }

    #[test]
    fn test_sample_times_are_centred() {
        assert_eq!(FeatureExtractor::sample_times(10.0, 5), vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(FeatureExtractor::sample_times(0.0, 5), vec![0.0]);
    }

    #[test]
    fn test_descriptor_shape() {
        let values = frame_descriptor(&solid(4, 4, [255, 0, 0]));
        assert_eq!(values.len(), DESCRIPTOR_LEN);
        assert_eq!(values[HISTOGRAM_BINS - 1], 1.0, "all red in the top red bin");
        assert_eq!(values[HISTOGRAM_BINS], 1.0, "all green in the bottom green bin");
        assert_eq!(values[HISTOGRAM_BINS * 3 + 1], 0.0, "flat frame has no contrast");
        assert_eq!(values[HISTOGRAM_BINS * 3 + 2], 0.0, "flat frame has no edges");
    }

    #[test]
    fn test_edge_density_on_checkerboard() {
        let values = frame_descriptor(&checkerboard(8));
        assert_eq!(values[HISTOGRAM_BINS * 3 + 2], 1.0);
    }

    #[test]
    fn test_descriptor_similarity_orders_content() {
        let red = describe_frames(&[solid(8, 8, [250, 10, 10])]).unwrap();
        let red2 = describe_frames(&[solid(8, 8, [245, 12, 8])]).unwrap();
        let blue = describe_frames(&[solid(8, 8, [10, 10, 250])]).unwrap();
        assert!(visual_similarity(Some(&red), Some(&red2)) > visual_similarity(Some(&red), Some(&blue)));
        assert!((visual_similarity(Some(&red), Some(&red)) - 1.0).abs() < 1e-5);
    }

    struct OneFrame;

    #[async_trait]
    impl ExecutePort for OneFrame {
        async fn scene_scores(&self, _file_path: &Path) -> Result<Vec<SceneScore>, DomainError> {
            Ok(Vec::new())
        }

        async fn cut_segment(&self, _request: &CutRequest) -> Result<(), DomainError> {
            Ok(())
        }

        async fn extract_frames(&self, file_path: &Path, timestamps: &[f64]) -> Result<Vec<Frame>, DomainError> {
            if file_path.ends_with("broken.mp4") {
                return Err(DomainError::tool_failed("ffmpeg", "Invalid data found", Some(1)));
            }
            Ok(timestamps.iter().map(|_| solid(4, 4, [20, 200, 20])).collect())
        }
    }

    struct FlakyEmbedding {
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingPort for FlakyEmbedding {
        async fn embed(&self, _frames: &[Frame]) -> Result<Vec<Vec<f32>>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::ServiceUnavailable("connection refused".into()))
        }
    }

    struct UnitEmbedding;

    #[async_trait]
    impl EmbeddingPort for UnitEmbedding {
        async fn embed(&self, frames: &[Frame]) -> Result<Vec<Vec<f32>>, DomainError> {
            Ok(frames.iter().map(|_| vec![3.0, 4.0]).collect())
        }
    }

    fn clip(name: &str) -> Clip {
        let shot = ShotInterval::new(0, 0.0, 4.0, 1.0, ShotKind::Scene).unwrap();
        Clip::from_shot(&shot, PathBuf::from(name), Path::new("source.mp4"))
    }

    #[tokio::test]
    async fn test_embedding_path() {
        let extractor = FeatureExtractor::new(Arc::new(OneFrame), Some(Arc::new(UnitEmbedding)), RetryPolicy::none(), 3);
        let vector = extractor.extract(&clip("a.mp4")).await.unwrap();
        assert_eq!(vector.source, FeatureSource::Embedding);
        assert!((vector.values[0] - 0.6).abs() < 1e-6);
        assert!((vector.values[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_once() {
        let embedding = Arc::new(FlakyEmbedding {
            calls: AtomicU32::new(0),
        });
        let extractor = FeatureExtractor::new(
            Arc::new(OneFrame),
            Some(Arc::clone(&embedding) as Arc<dyn EmbeddingPort>),
            RetryPolicy::immediate(2),
            2,
        );

        let first = extractor.extract(&clip("a.mp4")).await.unwrap();
        let second = extractor.extract(&clip("b.mp4")).await.unwrap();

        assert_eq!(first.source, FeatureSource::Descriptor);
        assert_eq!(second.source, FeatureSource::Descriptor);
        assert_eq!(embedding.calls.load(Ordering::SeqCst), 2, "only the first clip tries the service");
        assert!(!extractor.embedding_available());
    }

    #[tokio::test]
    async fn test_unreadable_clip_has_no_features() {
        let extractor = FeatureExtractor::new(Arc::new(OneFrame), None, RetryPolicy::none(), 3);
        assert!(extractor.extract(&clip("broken.mp4")).await.is_none());
        assert!(extractor.extract(&clip("fine.mp4")).await.is_some());
    }
}
