//! Pitch-shifting engines for REPITCH
//!
//! Two independent algorithms implement one shared contract:
//! - WsolaShifter: time-domain segment overlap-add with correlation-guided
//!   splicing, then rational duration correction
//! - VocoderShifter: short-time phase vocoder, dispatching between direct
//!   bin remapping (small shifts) and time-stretch plus resample
//!
//! Both process one complete mono buffer per call and always return output
//! of the same length as the input. Callers hold either engine behind the
//! [`PitchShifter`] trait and swap implementations freely.

mod error;
mod resample;
mod shifter;
mod spectral;
mod vocoder;
mod window;
mod wsola;

pub use error::{Result, ShiftError};
pub use resample::{resample, ResampleQuality};
pub use shifter::{
    ratio_to_semitones, semitones_to_ratio, PitchShifter, MAX_PITCH_RATIO, MIN_PITCH_RATIO,
};
pub use spectral::{mirror_spectrum, wrap_phase, SpectralTransform};
pub use vocoder::{VocoderShifter, MIN_FRAME_SIZE};
pub use window::{generate as generate_window, WindowType};
pub use wsola::WsolaShifter;
