//! Time-domain pitch shifting: correlation-guided segment overlap-add
//! followed by rational duration correction.
//!
//! Segments of a configured `sequence` length are spliced at a fixed
//! synthesis step while the read cursor advances at `step / pitchRatio`,
//! producing a time-stretched intermediate whose duration is then restored
//! by the rational resampler. Each new segment is taken at the position
//! inside a bounded search window that best correlates with the tail of
//! the previously emitted segment, which keeps the crossfade constructive.

use std::f32::consts::PI;

use crate::error::{Result, ShiftError};
use crate::resample::{resample, ResampleQuality};
use crate::shifter::{fit_length, validate_pitch_ratio, validate_sample_rate, PitchShifter};

const DEFAULT_SEQUENCE_MS: f64 = 40.0;
const DEFAULT_OVERLAP_MS: f64 = 8.0;
const DEFAULT_SEARCH_MS: f64 = 15.0;
/// Guard against division by near-zero energy in correlation normalization.
const ENERGY_EPSILON: f64 = 1e-12;

/// Segment overlap-add pitch shifter (WSOLA splicing).
pub struct WsolaShifter {
    sample_rate: f64,
    pitch_ratio: f64,
    sequence_ms: f64,
    overlap_ms: f64,
    search_ms: f64,
    quality: ResampleQuality,
    // Derived sample lengths, rebuilt on every configuration change
    sequence_len: usize,
    overlap_len: usize,
    search_len: usize,
    /// Fade-in ramp applied to the incoming segment over the overlap region
    crossfade: Vec<f32>,
    /// Reusable buffer for the stretched intermediate
    stretch_buf: Vec<f32>,
}

impl WsolaShifter {
    /// Creates a shifter with the default segment geometry (40 ms
    /// sequence, 8 ms overlap, 15 ms search radius).
    pub fn new(sample_rate: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        let mut shifter = Self {
            sample_rate,
            pitch_ratio: 1.0,
            sequence_ms: DEFAULT_SEQUENCE_MS,
            overlap_ms: DEFAULT_OVERLAP_MS,
            search_ms: DEFAULT_SEARCH_MS,
            quality: ResampleQuality::default(),
            sequence_len: 0,
            overlap_len: 0,
            search_len: 0,
            crossfade: Vec::new(),
            stretch_buf: Vec::new(),
        };
        shifter.rebuild();
        Ok(shifter)
    }

    /// Segment length in milliseconds.
    pub fn sequence(&self) -> f64 {
        self.sequence_ms
    }

    /// Sets the segment length. Fails if it would not exceed the overlap.
    pub fn set_sequence(&mut self, sequence_ms: f64) -> Result<()> {
        if !sequence_ms.is_finite() || sequence_ms <= 0.0 || sequence_ms <= self.overlap_ms {
            return Err(ShiftError::InvalidSequence {
                sequence_ms,
                overlap_ms: self.overlap_ms,
            });
        }
        self.sequence_ms = sequence_ms;
        self.rebuild();
        Ok(())
    }

    /// Crossfade overlap length in milliseconds.
    pub fn overlap(&self) -> f64 {
        self.overlap_ms
    }

    /// Sets the overlap length. Fails if it would reach the sequence length.
    pub fn set_overlap(&mut self, overlap_ms: f64) -> Result<()> {
        if !overlap_ms.is_finite() || overlap_ms <= 0.0 || overlap_ms >= self.sequence_ms {
            return Err(ShiftError::InvalidOverlap {
                overlap_ms,
                sequence_ms: self.sequence_ms,
            });
        }
        self.overlap_ms = overlap_ms;
        self.rebuild();
        Ok(())
    }

    /// Correlation search radius in milliseconds.
    pub fn search(&self) -> f64 {
        self.search_ms
    }

    /// Sets the correlation search radius (zero disables the search).
    pub fn set_search(&mut self, search_ms: f64) -> Result<()> {
        if !search_ms.is_finite() || search_ms < 0.0 {
            return Err(ShiftError::InvalidSearch(search_ms));
        }
        self.search_ms = search_ms;
        self.rebuild();
        Ok(())
    }

    /// Quality preset for the duration-correction resampling pass.
    pub fn resample_quality(&self) -> ResampleQuality {
        self.quality
    }

    pub fn set_resample_quality(&mut self, quality: ResampleQuality) {
        self.quality = quality;
    }

    fn rebuild(&mut self) {
        let per_ms = self.sample_rate / 1000.0;
        self.sequence_len = ((self.sequence_ms * per_ms).round() as usize).max(2);
        self.overlap_len =
            ((self.overlap_ms * per_ms).round() as usize).clamp(1, self.sequence_len - 1);
        self.search_len = (self.search_ms * per_ms).round() as usize;
        self.crossfade = (0..self.overlap_len)
            .map(|i| 0.5 * (1.0 - (PI * (i + 1) as f32 / self.overlap_len as f32).cos()))
            .collect();
        tracing::debug!(
            sequence = self.sequence_len,
            overlap = self.overlap_len,
            search = self.search_len,
            "rebuilt segment geometry"
        );
    }

    /// Overlap-adds segments at a fixed `write_step` while the read cursor
    /// advances by `read_step`, stretching the signal by `write/read`.
    fn stretch(&mut self, input: &[f32], write_step: usize, read_step: usize) -> Vec<f32> {
        let seq = self.sequence_len;
        let ovl = self.overlap_len;
        let len = input.len();

        let steps = if len > seq {
            (len - seq) / read_step + 2
        } else {
            1
        };
        let capacity = steps * write_step + seq;

        let mut out = std::mem::take(&mut self.stretch_buf);
        out.clear();
        out.resize(capacity, 0.0);

        let first = seq.min(len);
        out[..first].copy_from_slice(&input[..first]);
        let mut filled = first;

        let mut write_pos = write_step;
        let mut read_nominal = read_step;
        while read_nominal + seq <= len {
            let best = self.find_best_offset(input, &out, read_nominal, write_pos);
            // The previous segment's tail occupies exactly the overlap
            // region starting at write_pos.
            for i in 0..ovl {
                let t = self.crossfade[i];
                out[write_pos + i] = out[write_pos + i] * (1.0 - t) + input[best + i] * t;
            }
            out[write_pos + ovl..write_pos + seq]
                .copy_from_slice(&input[best + ovl..best + seq]);
            filled = write_pos + seq;
            write_pos += write_step;
            read_nominal += read_step;
        }

        out.truncate(filled);
        let stretched = out.clone();
        self.stretch_buf = out;
        stretched
    }

    /// Best-correlated segment start within the search window around the
    /// nominal read position.
    fn find_best_offset(
        &self,
        input: &[f32],
        out: &[f32],
        nominal: usize,
        write_pos: usize,
    ) -> usize {
        if self.search_len == 0 {
            return nominal;
        }
        let lo = nominal.saturating_sub(self.search_len);
        let hi = (nominal + self.search_len).min(input.len() - self.sequence_len);
        let reference = &out[write_pos..write_pos + self.overlap_len];

        let mut best = nominal;
        let mut best_score = f64::NEG_INFINITY;
        for pos in lo..=hi {
            let score =
                normalized_cross_correlation(reference, &input[pos..pos + self.overlap_len]);
            if score > best_score {
                best_score = score;
                best = pos;
            }
        }
        best
    }
}

impl PitchShifter for WsolaShifter {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, rate: f64) -> Result<()> {
        validate_sample_rate(rate)?;
        self.sample_rate = rate;
        self.rebuild();
        Ok(())
    }

    fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    fn set_pitch_ratio(&mut self, ratio: f64) -> Result<()> {
        validate_pitch_ratio(ratio)?;
        self.pitch_ratio = ratio;
        Ok(())
    }

    fn reset(&mut self) {
        self.stretch_buf.clear();
    }

    fn try_process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let write_step = self.sequence_len - self.overlap_len;
        let read_step = ((write_step as f64 / self.pitch_ratio).round() as usize).max(1);
        if read_step == write_step {
            // The quantized read step realizes a unit ratio: nothing to do.
            return Ok(input.to_vec());
        }

        let stretched = self.stretch(input, write_step, read_step);
        let corrected = resample(&stretched, write_step, read_step, self.quality)?;
        Ok(fit_length(corrected, input.len()))
    }
}

fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut energy_a = 0.0f64;
    let mut energy_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        energy_a += x as f64 * x as f64;
        energy_b += y as f64 * y as f64;
    }
    let denom = (energy_a * energy_b).sqrt();
    if denom < ENERGY_EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    fn sine(freq: f64, rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin() as f32)
            .collect()
    }

    /// FFT-peak frequency estimate over a power-of-two window taken from
    /// the middle of the signal (skips onset/edge artifacts).
    fn dominant_frequency(signal: &[f32], rate: f64, window: usize) -> f64 {
        assert!(window.is_power_of_two() && signal.len() >= window);
        let start = (signal.len() - window) / 2;
        let mut buf: Vec<Complex<f32>> = signal[start..start + window]
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let w = 0.5
                    * (1.0
                        - (2.0 * std::f32::consts::PI * i as f32 / window as f32).cos());
                Complex::new(s * w, 0.0)
            })
            .collect();
        FftPlanner::new().plan_fft_forward(window).process(&mut buf);
        let peak = (1..window / 2)
            .max_by(|&a, &b| buf[a].norm().partial_cmp(&buf[b].norm()).unwrap())
            .unwrap();
        peak as f64 * rate / window as f64
    }

    #[test]
    fn test_output_length_matches_input() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        for ratio in [0.5, 1.0, 1.3, 2.0] {
            shifter.set_pitch_ratio(ratio).unwrap();
            for len in [0, 1, 100, 1919, 10000, 48000] {
                let input = sine(220.0, 48000.0, len);
                let out = shifter.try_process(&input).unwrap();
                assert_eq!(out.len(), len, "ratio {ratio}, len {len}");
            }
        }
    }

    #[test]
    fn test_output_finite_at_ratio_bounds() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        let input = sine(220.0, 48000.0, 24000);
        for ratio in [0.125, 8.0] {
            shifter.set_pitch_ratio(ratio).unwrap();
            let out = shifter.try_process(&input).unwrap();
            assert_eq!(out.len(), input.len());
            assert!(out.iter().all(|s| s.is_finite()), "ratio {ratio}");
        }
    }

    #[test]
    fn test_unit_ratio_is_copy() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        let input = sine(440.0, 48000.0, 8000);
        let out = shifter.try_process(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_reset_determinism() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        shifter.set_pitch_ratio(1.5).unwrap();
        let input = sine(330.0, 48000.0, 20000);
        let first = shifter.try_process(&input).unwrap();
        shifter.reset();
        let second = shifter.try_process(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_in_place_matches_allocating() {
        let mut a = WsolaShifter::new(48000.0).unwrap();
        let mut b = WsolaShifter::new(48000.0).unwrap();
        a.set_pitch_ratio(0.75).unwrap();
        b.set_pitch_ratio(0.75).unwrap();
        let input = sine(500.0, 48000.0, 16000);
        let out = a.try_process(&input).unwrap();
        let mut buf = input.clone();
        b.try_process_in_place(&mut buf).unwrap();
        for (x, y) in out.iter().zip(buf.iter()) {
            assert!((x - y).abs() <= 1e-9);
        }
    }

    #[test]
    fn test_overlap_must_stay_below_sequence() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        let before = shifter.overlap();
        assert!(shifter.set_overlap(40.0).is_err());
        assert!(shifter.set_overlap(55.0).is_err());
        assert!(shifter.set_overlap(0.0).is_err());
        assert_eq!(shifter.overlap(), before);
        assert!(shifter.set_overlap(12.0).is_ok());
        assert_eq!(shifter.overlap(), 12.0);
    }

    #[test]
    fn test_sequence_must_stay_above_overlap() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        let before = shifter.sequence();
        assert!(shifter.set_sequence(8.0).is_err());
        assert!(shifter.set_sequence(f64::NAN).is_err());
        assert_eq!(shifter.sequence(), before);
        assert!(shifter.set_sequence(60.0).is_ok());
    }

    #[test]
    fn test_search_validation() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        assert!(shifter.set_search(-1.0).is_err());
        assert!(shifter.set_search(0.0).is_ok());
        let input = sine(220.0, 48000.0, 12000);
        shifter.set_pitch_ratio(1.5).unwrap();
        let out = shifter.try_process(&input).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_invalid_ratio_leaves_previous_value() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        shifter.set_pitch_ratio(1.25).unwrap();
        assert!(shifter.set_pitch_ratio(f64::NAN).is_err());
        assert!(shifter.set_pitch_ratio(0.0).is_err());
        assert_eq!(shifter.pitch_ratio(), 1.25);
    }

    #[test]
    fn test_octave_up_lands_near_double_frequency() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        shifter.set_pitch_semitones(12.0).unwrap();
        let input = sine(220.0, 48000.0, 72000);
        let out = shifter.try_process(&input).unwrap();
        let freq = dominant_frequency(&out, 48000.0, 32768);
        assert!(
            (freq - 440.0).abs() < 5.0,
            "expected ~440 Hz, measured {freq:.1} Hz"
        );
    }

    #[test]
    fn test_octave_down_lands_near_half_frequency() {
        let mut shifter = WsolaShifter::new(48000.0).unwrap();
        shifter.set_pitch_semitones(-12.0).unwrap();
        let input = sine(220.0, 48000.0, 72000);
        let out = shifter.try_process(&input).unwrap();
        let freq = dominant_frequency(&out, 48000.0, 32768);
        assert!(
            (freq - 110.0).abs() < 5.0,
            "expected ~110 Hz, measured {freq:.1} Hz"
        );
    }
}
