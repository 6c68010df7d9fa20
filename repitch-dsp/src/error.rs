//! Error types for the pitch-shifting engines

use thiserror::Error;

/// Errors reported by shifter configuration and processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShiftError {
    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f64),
    #[error("pitch ratio must be finite and within [{min}, {max}], got {value}")]
    InvalidPitchRatio { value: f64, min: f64, max: f64 },
    #[error("frame size must be a power of two of at least {min}, got {size}")]
    InvalidFrameSize { size: usize, min: usize },
    #[error("analysis hop must satisfy 0 < hop < frame size ({frame_size}), got {hop}")]
    InvalidAnalysisHop { hop: usize, frame_size: usize },
    #[error("overlap ({overlap_ms} ms) must be positive and shorter than the sequence ({sequence_ms} ms)")]
    InvalidOverlap { overlap_ms: f64, sequence_ms: f64 },
    #[error("sequence must be positive and longer than the overlap ({overlap_ms} ms), got {sequence_ms} ms")]
    InvalidSequence { sequence_ms: f64, overlap_ms: f64 },
    #[error("search radius must be finite and non-negative, got {0} ms")]
    InvalidSearch(f64),
    #[error("window length must be non-zero")]
    InvalidWindowLength,
    #[error("transform plan is sized for {expected} samples, buffer holds {actual}")]
    PlanSizeMismatch { expected: usize, actual: usize },
    #[error("resampler hop lengths must be non-zero, got {from_hop}:{to_hop}")]
    InvalidHopPair { from_hop: usize, to_hop: usize },
    #[error("resample error: {0}")]
    Resample(String),
}

pub type Result<T> = std::result::Result<T, ShiftError>;
