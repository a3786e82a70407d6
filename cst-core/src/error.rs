//! Error types

use crate::mode::OperatingMode;
use thiserror::Error;

/// A hardware frame that could not be turned into an ingress event
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no \"type\" tag")]
    MissingType,

    #[error("unknown frame type: {0}")]
    UnknownType(String),
}

/// Rejected operator command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no flight profile is running in {0} mode")]
    NoFlightProfile(OperatingMode),
}
