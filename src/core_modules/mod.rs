// Stages of the per-frame detection pipeline, leaf-first.

pub mod pixel;
pub mod frame;
pub mod color_segmenter;
pub mod morphology;
pub mod geometry;
pub mod blob_detector;
pub mod classifier;
pub mod similarity;
pub mod tracker;
pub mod speech_gate;
