// Domain rules - Segmentation, similarity and grouping policies

use std::ops::Range;

use crate::domain::model::*;

/// Shots shorter than this are absorbed into a neighbor while deriving intervals
pub const MIN_SHOT_SECONDS: f64 = 1.5;

/// Configured minimum shot durations at or below this value select raw-boundary mode
pub const RAW_BOUNDARY_MIN_SHOT_DURATION: f64 = 0.5;

/// Confidence assigned to synthetic uniform slices
pub const UNIFORM_CONFIDENCE: f32 = 0.5;

const DURATION_EPSILON: f64 = 1e-6;

/// Business rules that turn scene-change signals into shot intervals
pub struct ShotSegmenter;

impl ShotSegmenter {
    /// Uniform slice length keyed by total duration bucket
    pub fn uniform_slice_length(total_duration: f64) -> f64 {
        if total_duration <= 30.0 {
            5.0
        } else if total_duration <= 120.0 {
            10.0
        } else if total_duration <= 300.0 {
            15.0
        } else {
            20.0
        }
    }

    /// Duration-adaptive uniform segmentation covering [0, total_duration]
    pub fn uniform_segments(total_duration: f64) -> Vec<ShotInterval> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Vec::new();
        }

        let slice = Self::uniform_slice_length(total_duration);
        let mut shots = Vec::new();
        let mut start = 0.0;

        while start < total_duration - DURATION_EPSILON {
            let mut end = (start + slice).min(total_duration);
            // A sliver left at the end rides along with the last slice
            if total_duration - end < MIN_SHOT_SECONDS {
                end = total_duration;
            }
            if let Ok(shot) =
                ShotInterval::new(shots.len(), start, end, UNIFORM_CONFIDENCE, ShotKind::Uniform)
            {
                shots.push(shot);
            }
            start = end;
        }

        shots
    }

    /// Timestamps whose scene score exceeds `sensitivity`, strictly inside (0, total)
    pub fn cut_points(scores: &[SceneScore], sensitivity: f64, total_duration: f64) -> Vec<(f64, f32)> {
        let mut cuts: Vec<(f64, f32)> = scores
            .iter()
            .filter(|s| s.score.is_finite() && s.time.is_finite())
            .filter(|s| s.score > sensitivity)
            .filter(|s| s.time > 0.0 && s.time < total_duration)
            .map(|s| (s.time, s.score.min(1.0) as f32))
            .collect();

        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));
        cuts.dedup_by(|b, a| (b.0 - a.0).abs() < DURATION_EPSILON);
        cuts
    }

    /// Derive contiguous intervals from cut points, absorbing candidates under
    /// `MIN_SHOT_SECONDS` into their neighbors.
    pub fn intervals_from_cuts(cuts: &[(f64, f32)], total_duration: f64) -> Vec<ShotInterval> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Vec::new();
        }

        let mut boundaries: Vec<(f64, f32)> = vec![(0.0, 1.0)];
        for &(time, confidence) in cuts {
            let last = boundaries[boundaries.len() - 1].0;
            if time - last < MIN_SHOT_SECONDS || total_duration - time < MIN_SHOT_SECONDS {
                continue;
            }
            boundaries.push((time, confidence));
        }

        let mut shots = Vec::with_capacity(boundaries.len());
        for (i, &(start, confidence)) in boundaries.iter().enumerate() {
            let end = boundaries.get(i + 1).map_or(total_duration, |b| b.0);
            if let Ok(shot) = ShotInterval::new(i, start, end, confidence, ShotKind::Scene) {
                shots.push(shot);
            }
        }
        shots
    }

    /// Fold every shot shorter than `min_shot_duration` into its successors until it
    /// reaches 1.5x the minimum, then re-number. A short final shot joins its predecessor.
    pub fn fold_short_shots(shots: Vec<ShotInterval>, min_shot_duration: f64) -> Vec<ShotInterval> {
        if shots.len() < 2 || min_shot_duration <= 0.0 {
            return renumber(shots);
        }

        let target = min_shot_duration * 1.5;
        let mut folded: Vec<ShotInterval> = Vec::with_capacity(shots.len());
        let mut iter = shots.into_iter();

        while let Some(mut current) = iter.next() {
            if current.duration < min_shot_duration {
                while current.duration < target {
                    match iter.next() {
                        Some(next) => extend_to(&mut current, next.end_time),
                        None => break,
                    }
                }
            }
            folded.push(current);
        }

        if folded.len() >= 2 {
            let last_is_short = folded
                .last()
                .map_or(false, |s| s.duration < min_shot_duration);
            if last_is_short {
                if let Some(last) = folded.pop() {
                    if let Some(prev) = folded.last_mut() {
                        extend_to(prev, last.end_time);
                    }
                }
            }
        }

        renumber(folded)
    }

    /// Sort, de-overlap and re-number shots reported by the cloud analyzer
    pub fn sanitize_external(mut shots: Vec<ShotInterval>) -> Vec<ShotInterval> {
        shots.retain(|s| s.start_time.is_finite() && s.end_time.is_finite() && s.end_time > s.start_time);
        shots.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut cleaned: Vec<ShotInterval> = Vec::with_capacity(shots.len());
        for mut shot in shots {
            if let Some(prev) = cleaned.last() {
                if shot.start_time < prev.end_time {
                    shot.start_time = prev.end_time;
                }
            }
            if shot.end_time - shot.start_time <= DURATION_EPSILON {
                continue;
            }
            shot.duration = shot.end_time - shot.start_time;
            cleaned.push(shot);
        }
        renumber(cleaned)
    }

    /// True when shots are ordered, contiguous and span exactly [0, total_duration]
    pub fn covers_exactly(shots: &[ShotInterval], total_duration: f64) -> bool {
        let tolerance = 1e-6;
        match (shots.first(), shots.last()) {
            (Some(first), Some(last)) => {
                first.start_time.abs() < tolerance
                    && (last.end_time - total_duration).abs() < tolerance
                    && shots
                        .windows(2)
                        .all(|w| (w[1].start_time - w[0].end_time).abs() < tolerance)
                    && shots.iter().all(|s| s.duration > 0.0)
            }
            _ => false,
        }
    }
}

fn extend_to(shot: &mut ShotInterval, end_time: f64) {
    shot.end_time = end_time;
    shot.duration = shot.end_time - shot.start_time;
}

fn renumber(mut shots: Vec<ShotInterval>) -> Vec<ShotInterval> {
    for (i, shot) in shots.iter_mut().enumerate() {
        shot.index = i;
    }
    shots
}

/// Cosine similarity between two feature vectors of the same kind and length
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> Option<f32> {
    if a.source != b.source || a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.values.iter().zip(&b.values).map(|(x, y)| x * y).sum();
    let norm_a = a.values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return None;
    }
    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Cosine similarity mapped to [0, 1]; missing or incomparable features score 0
pub fn visual_similarity(a: Option<&FeatureVector>, b: Option<&FeatureVector>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b)
            .map(|c| ((c + 1.0) / 2.0).clamp(0.0, 1.0))
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Constraints a merge run must satisfy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingLimits {
    pub similarity_threshold: f32,
    pub max_merge_duration: f64,
    pub max_group_size: usize,
    /// Largest gap between neighbors that still counts as continuous
    pub continuity_gap: f64,
}

impl Default for GroupingLimits {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.92,
            max_merge_duration: 25.0,
            max_group_size: 3,
            continuity_gap: 0.5,
        }
    }
}

/// Greedy single-pass grouping over time-ordered, annotated clips.
///
/// Returns contiguous index ranges covering every clip exactly once. A clip joins the
/// open run only when the link from the run's last clip is similar enough, close enough
/// in time, and the run stays within the duration and size caps.
pub fn plan_merge_groups(clips: &[Clip], limits: &GroupingLimits) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    if clips.is_empty() {
        return groups;
    }

    let max_size = limits.max_group_size.max(1);
    let mut start = 0;
    let mut run_duration = clips[0].duration;

    for next in 1..clips.len() {
        let last = &clips[next - 1];
        let candidate = &clips[next];

        let similar = last
            .similarity_to_next
            .map_or(false, |s| s >= limits.similarity_threshold);
        let continuous = last
            .time_gap_to_next
            .map_or(false, |g| g <= limits.continuity_gap);
        let fits = run_duration + candidate.duration <= limits.max_merge_duration + DURATION_EPSILON;
        let room = next - start < max_size;
        let mergeable = !last.is_merged() && !candidate.is_merged();

        if similar && continuous && fits && room && mergeable {
            run_duration += candidate.duration;
        } else {
            groups.push(start..next);
            start = next;
            run_duration = candidate.duration;
        }
    }
    groups.push(start..clips.len());
    groups
}

/// Mean of the adjacent similarities inside a run
pub fn mean_run_similarity(run: &[Clip]) -> f32 {
    if run.len() < 2 {
        return 0.0;
    }
    let links = &run[..run.len() - 1];
    links
        .iter()
        .map(|c| c.similarity_to_next.unwrap_or(0.0))
        .sum::<f32>()
        / links.len() as f32
}

/// Output quality gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationPolicy {
    pub min_success_rate: f64,
    pub min_file_size: u64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_success_rate: 0.8,
            min_file_size: 1024,
        }
    }
}

impl ValidationPolicy {
    /// A slice counts as valid when it exists and reaches the minimum size
    pub fn is_valid_slice(&self, file_size: Option<u64>) -> bool {
        file_size.map_or(false, |size| size > 0 && size >= self.min_file_size)
    }

    pub fn summarize(&self, valid: usize, total: usize) -> ValidationSummary {
        let success_rate = if total == 0 {
            0.0
        } else {
            valid as f64 / total as f64
        };
        ValidationSummary {
            total,
            valid,
            success_rate,
            passed: total > 0 && success_rate >= self.min_success_rate,
        }
    }
}
