// THEORY:
// The `protocol` module is the boundary between the engine and its transport.
// Every type here is plain serde data: one JSON object per request and one per
// response. Nothing in this module knows how frames are processed.
//
// - A producer sends a `FrameRequest`: a base64 compressed image plus the
//   per-frame `FrameConfig`. The payload field is `jpeg_b64`; `frame` is
//   accepted as an alias.
// - The consumer receives a `FrameResponse`: either a `DetectionReport` or an
//   `{ "error": ... }` object. Bad input is never fatal, it is just a
//   different response shape.
// - Two control lines ride the same stream: `{"ping": true}` for health checks
//   and `{"reset": true}` to start a new tracking session.

use crate::config::FrameConfig;
use serde::{Deserialize, Serialize};

/// One frame from the producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Base64 compressed image, optionally as a `data:` URL.
    #[serde(default, alias = "frame")]
    pub jpeg_b64: Option<String>,
    #[serde(default)]
    pub config: FrameConfig,
}

impl FrameRequest {
    pub fn new(jpeg_b64: impl Into<String>, config: FrameConfig) -> Self {
        Self {
            jpeg_b64: Some(jpeg_b64.into()),
            config,
        }
    }
}

/// Any line a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Ping { ping: bool },
    Reset { reset: bool },
    Frame(FrameRequest),
}

/// One labeled, tracked object in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: u64,
    /// `[x, y, w, h]` in working-frame pixels.
    pub bbox: [u32; 4],
    pub centroid: [f64; 2],
    pub color: String,
    pub shape: String,
    pub size: String,
    pub label: String,
    /// 0..=100, one decimal.
    pub similarity: f64,
    pub should_speak: bool,
    pub spoken_text: String,
}

/// Everything detected in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub frame_w: u32,
    pub frame_h: u32,
    pub detections: Vec<Detection>,
    pub ts_ms: u64,
}

/// What the consumer receives for each line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameResponse {
    Report(DetectionReport),
    Error { error: String },
    Status { status: String },
}

impl FrameResponse {
    pub fn error(message: impl ToString) -> Self {
        FrameResponse::Error {
            error: message.to_string(),
        }
    }

    pub fn ok() -> Self {
        FrameResponse::Status {
            status: "ok".to_string(),
        }
    }

    pub fn as_report(&self) -> Option<&DetectionReport> {
        match self {
            FrameResponse::Report(report) => Some(report),
            _ => None,
        }
    }
}
