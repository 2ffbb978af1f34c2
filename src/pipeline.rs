// THEORY:
// The `pipeline` module is the top-level API for the entire vision engine.
// It wires every stage of the detection stack into a single call that takes
// one frame and returns one report.
//
//   Preprocessor → Color Segmenter → Blob Detector → Classifier
//     → Similarity Scorer → Tracker → Speech Gate → DetectionReport
//
// Each frame is processed independently except for the tracker, which owns
// all identity and announcement state. A `VisionPipeline` is one tracking
// session: it is constructed explicitly, reset explicitly, and never shares
// state with another instance.
//
// Any error raised while processing a frame (bad payload, zero weights) is
// returned before the tracker is touched, so a bad frame costs at most a gap
// in tracking.

use crate::config::{DetectorSettings, EffectiveConfig, FrameConfig};
use crate::core_modules::blob_detector::{Blob, ExtractionParams, blob_detector};
use crate::core_modules::classifier::{
    self, ColorClass, Shape, ShapeFeatures, SizeLabel, classify_color, classify_shape, classify_size,
    compose_label,
};
use crate::core_modules::color_segmenter::{HsvImage, color_segmenter};
use crate::core_modules::frame::{Frame, preprocessor};
use crate::core_modules::similarity::{self, SubScores};
use crate::core_modules::speech_gate::{SpeechPolicy, speech_gate};
use crate::core_modules::tracker::{Observation, Tracker};
use crate::error::Result;
use crate::protocol::{Detection, DetectionReport, FrameRequest, FrameResponse};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, info_span, warn};

/// A blob after classification and scoring, before it has an identity.
#[derive(Debug, Clone)]
struct Candidate {
    blob: Blob,
    color: ColorClass,
    shape: Shape,
    size: SizeLabel,
    label: String,
    similarity: f64,
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The main, top-level struct for the vision engine.
pub struct VisionPipeline {
    settings: DetectorSettings,
    tracker: Tracker,
    frame_seq: u64,
}

impl VisionPipeline {
    pub fn new(settings: DetectorSettings) -> Self {
        let tracker = Tracker::new(settings.tracker);
        info!(colors = settings.palette.len(), "vision pipeline created");
        Self {
            settings,
            tracker,
            frame_seq: 0,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Starts a new tracking session: every identity is forgotten and IDs
    /// restart at 1.
    pub fn reset(&mut self) {
        info!(frames = self.frame_seq, "resetting tracking session");
        self.tracker.reset();
        self.frame_seq = 0;
    }

    /// Handles one wire request. Never fails: errors become an error response.
    pub fn process(&mut self, request: &FrameRequest) -> FrameResponse {
        self.frame_seq += 1;
        let span = info_span!("frame", seq = self.frame_seq);
        let _enter = span.enter();

        let result = Frame::from_base64(request.jpeg_b64.as_deref().unwrap_or_default())
            .and_then(|frame| self.process_at(&frame, &request.config, now_ms()));

        match result {
            Ok(report) => FrameResponse::Report(report),
            Err(e) => {
                warn!(error = %e, input = e.is_input_error(), "frame rejected");
                FrameResponse::error(e)
            }
        }
    }

    /// Runs the full stack on a decoded frame at an explicit timestamp.
    pub fn process_at(&mut self, frame: &Frame, config: &FrameConfig, now_ms: u64) -> Result<DetectionReport> {
        let started = Instant::now();
        let config = config.validated()?;

        // Stage 1: Preprocessing
        let working = preprocessor::preprocess(frame, config.downscale_width, self.settings.blur_sigma)?;

        // Stage 2: Segmentation and Spatial Grouping
        let segmentation = color_segmenter::segment(&working, &self.settings.palette);
        let params = ExtractionParams {
            min_area: config.min_area_px as f64,
            morphology_radius: self.settings.morphology_radius,
            polygon_tolerance: self.settings.polygon_tolerance,
        };
        let mut blobs = Vec::new();
        for color_mask in &segmentation.masks {
            let found = blob_detector::find_blobs(&color_mask.mask, &color_mask.color, &params);
            if !found.is_empty() {
                debug!(color = %color_mask.color, blobs = found.len(), "color mask");
            }
            blobs.extend(found);
        }

        // Stage 3: Classification and Scoring
        let frame_area = working.area() as f64;
        let candidates = blobs
            .into_iter()
            .map(|blob| self.classify(blob, &segmentation.hsv, frame_area, &config))
            .collect::<Result<Vec<_>>>()?;

        // Stage 4: Identity and Announcement
        let detections = self.track_and_gate(candidates, working.width(), &config, now_ms);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            width = working.width(),
            height = working.height(),
            detections = detections.len(),
            elapsed_ms,
            "frame processed"
        );
        if elapsed_ms > config.frame_budget_ms() {
            warn!(elapsed_ms, budget_ms = config.frame_budget_ms(), "frame exceeded its max_fps budget");
        }

        Ok(DetectionReport {
            frame_w: working.width(),
            frame_h: working.height(),
            detections,
            ts_ms: now_ms,
        })
    }

    fn classify(&self, blob: Blob, hsv: &HsvImage, frame_area: f64, config: &EffectiveConfig) -> Result<Candidate> {
        let shape = classify_shape(&ShapeFeatures::from(&blob));
        let ratio = blob.bounding_box.area() as f64 / frame_area;
        let size = classify_size(ratio, &self.settings.size_buckets);
        let sample = classifier::median_sample(&blob, hsv);
        let color = classify_color(sample, &self.settings.palette, self.settings.color_tolerance);

        let scores = SubScores {
            color: similarity::color_score(&color, config.target_color.as_deref()),
            shape: similarity::shape_score(shape),
            size: similarity::size_score(ratio, size, &self.settings.size_buckets),
        };
        let similarity = similarity::similarity(&scores, &config.weights)?;

        Ok(Candidate {
            label: compose_label(&color.name, shape, size),
            blob,
            color,
            shape,
            size,
            similarity,
        })
    }

    fn track_and_gate(
        &mut self,
        candidates: Vec<Candidate>,
        frame_width: u32,
        config: &EffectiveConfig,
        now_ms: u64,
    ) -> Vec<Detection> {
        let observations: Vec<Observation> = candidates
            .iter()
            .map(|c| Observation {
                centroid: c.blob.centroid,
                label: c.label.clone(),
            })
            .collect();
        let update = self.tracker.update(&observations, frame_width);
        if !update.retired.is_empty() {
            debug!(retired = ?update.retired, "identities retired");
        }

        let policy = SpeechPolicy {
            min_similarity: config.min_similarity,
            cooldown_ms: config.speak_cooldown_ms,
        };

        let mut detections: Vec<Detection> = update
            .assignments
            .iter()
            .zip(candidates)
            .map(|(assignment, candidate)| {
                let should_speak = match self.tracker.get_mut(assignment.track_id) {
                    Some(tracked) => speech_gate::evaluate(
                        &mut tracked.speech,
                        &candidate.label,
                        candidate.similarity,
                        &policy,
                        now_ms,
                    ),
                    None => false,
                };
                debug!(
                    id = assignment.track_id,
                    mask = %candidate.blob.mask_color,
                    label = %candidate.label,
                    similarity = candidate.similarity,
                    should_speak,
                    "detection"
                );
                to_detection(assignment.track_id, candidate, should_speak)
            })
            .collect();

        detections.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then(a.id.cmp(&b.id)));
        detections
    }
}

fn to_detection(id: u64, candidate: Candidate, should_speak: bool) -> Detection {
    let bbox = candidate.blob.bounding_box;
    let (cx, cy) = candidate.blob.centroid;
    Detection {
        id,
        bbox: [bbox.x, bbox.y, bbox.width, bbox.height],
        centroid: [(cx * 10.0).round() / 10.0, (cy * 10.0).round() / 10.0],
        spoken_text: speech_gate::spoken_text(
            &candidate.color.name,
            candidate.shape.as_str(),
            candidate.size.as_str(),
            candidate.similarity,
        ),
        color: candidate.color.name,
        shape: candidate.shape.as_str().to_string(),
        size: candidate.size.as_str().to_string(),
        label: candidate.label,
        similarity: candidate.similarity,
        should_speak,
    }
}
