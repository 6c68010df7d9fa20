//! Shared pitch-processor contract implemented by both shifter engines

use crate::error::{Result, ShiftError};

/// Smallest accepted pitch ratio (three octaves down).
pub const MIN_PITCH_RATIO: f64 = 0.125;
/// Largest accepted pitch ratio (three octaves up).
pub const MAX_PITCH_RATIO: f64 = 8.0;

/// Converts a semitone offset to a frequency ratio (`2^(semitones/12)`).
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    2.0f64.powf(semitones / 12.0)
}

/// Converts a frequency ratio to a semitone offset (`12·log2(ratio)`).
#[inline]
pub fn ratio_to_semitones(ratio: f64) -> f64 {
    12.0 * ratio.log2()
}

/// Truncates or zero-pads `output` to exactly `len` samples, upholding the
/// equal-length invariant whatever the internal processing produced.
pub(crate) fn fit_length(mut output: Vec<f32>, len: usize) -> Vec<f32> {
    output.resize(len, 0.0);
    output
}

pub(crate) fn validate_sample_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ShiftError::InvalidSampleRate(rate));
    }
    Ok(())
}

pub(crate) fn validate_pitch_ratio(ratio: f64) -> Result<()> {
    if !ratio.is_finite() || !(MIN_PITCH_RATIO..=MAX_PITCH_RATIO).contains(&ratio) {
        return Err(ShiftError::InvalidPitchRatio {
            value: ratio,
            min: MIN_PITCH_RATIO,
            max: MAX_PITCH_RATIO,
        });
    }
    Ok(())
}

/// Capability set shared by the time-domain and frequency-domain shifters.
///
/// Implementations process one complete mono buffer per call and always
/// produce output of the same length as the input. The fault-tolerant
/// `process`/`process_in_place` entry points never fail: an internal
/// processing fault degrades to an unmodified copy of the input. Callers
/// that want the fault use the `try_` variants instead.
pub trait PitchShifter {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Sets the sample rate. Fails on non-finite or non-positive values,
    /// leaving the previous rate in place.
    fn set_sample_rate(&mut self, rate: f64) -> Result<()>;

    /// Current pitch ratio (1.0 = unchanged).
    fn pitch_ratio(&self) -> f64;

    /// Sets the pitch ratio. Fails outside `[MIN_PITCH_RATIO, MAX_PITCH_RATIO]`
    /// or on non-finite values, leaving the previous ratio in place.
    fn set_pitch_ratio(&mut self, ratio: f64) -> Result<()>;

    /// Current pitch shift in semitones.
    fn pitch_semitones(&self) -> f64 {
        ratio_to_semitones(self.pitch_ratio())
    }

    /// Sets the pitch shift in semitones.
    fn set_pitch_semitones(&mut self, semitones: f64) -> Result<()> {
        self.set_pitch_ratio(semitones_to_ratio(semitones))
    }

    /// Clears carried processing state so the next call behaves like the
    /// first call on a fresh instance.
    fn reset(&mut self);

    /// Pitch-shifts `input` into a new buffer of identical length,
    /// surfacing processing faults.
    fn try_process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Pitch-shifts `input` into a new buffer of identical length.
    /// On an internal fault, returns an unmodified copy of the input.
    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        match self.try_process(input) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("pitch shift failed, passing input through: {err}");
                input.to_vec()
            }
        }
    }

    /// In-place variant of [`try_process`](Self::try_process).
    fn try_process_in_place(&mut self, buffer: &mut [f32]) -> Result<()> {
        let output = self.try_process(buffer)?;
        buffer.copy_from_slice(&output);
        Ok(())
    }

    /// In-place variant of [`process`](Self::process). On an internal
    /// fault the buffer is left untouched.
    fn process_in_place(&mut self, buffer: &mut [f32]) {
        if let Err(err) = self.try_process_in_place(buffer) {
            tracing::warn!("in-place pitch shift failed, leaving buffer unmodified: {err}");
        }
    }
}
