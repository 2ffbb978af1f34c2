// THEORY:
// This file is the main entry point for the `hue_vision` library crate. It
// defines the public API exposed to transports and other consumers.
//
// The primary goal is to export the `VisionPipeline` (one synchronous tracking
// session), the `DetectionSession` actor that serializes access to it, and the
// wire types that describe a request and its report. The algorithmic stages
// live in `core_modules` and can be used on their own, but most callers only
// need the pipeline and the protocol.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod session;

pub use config::{DetectorSettings, FrameConfig, SimilarityWeights};
pub use error::{Result, VisionError};
pub use pipeline::VisionPipeline;
pub use protocol::{ClientMessage, Detection, DetectionReport, FrameRequest, FrameResponse};
pub use session::{DetectionSession, PendingFrame, SessionError, SessionHandle};
