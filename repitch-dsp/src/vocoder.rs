//! Frequency-domain pitch shifting: a short-time phase vocoder with two
//! strategies dispatched on shift magnitude.
//!
//! Small shifts remap magnitude and instantaneous frequency directly
//! between bins (no resampling pass, best quality near unity). Larger
//! shifts run the classic decoupled pipeline: time-stretch with identity
//! phase locking, then rational resampling back to the input duration.

use std::f32::consts::TAU;

use rustfft::num_complex::Complex;

use crate::error::{Result, ShiftError};
use crate::resample::{resample, ResampleQuality};
use crate::shifter::{fit_length, validate_pitch_ratio, validate_sample_rate, PitchShifter};
use crate::spectral::{mirror_spectrum, wrap_phase, SpectralTransform};
use crate::window::{self, WindowType};

/// Shift magnitudes at or below this distance from unity use the bin-shift
/// strategy; anything larger goes through time-stretch plus resampling.
const BIN_SHIFT_THRESHOLD: f64 = 0.15;
/// Ratios this close to unity return the input unchanged.
const UNITY_EPSILON: f64 = 1e-6;
/// Accumulated window energy below this floor is left undivided.
const NORM_FLOOR: f32 = 1e-6;
/// Smallest accepted transform frame.
pub const MIN_FRAME_SIZE: usize = 64;

const DEFAULT_FRAME_SIZE: usize = 2048;

/// Phase-vocoder pitch shifter.
pub struct VocoderShifter {
    sample_rate: f64,
    pitch_ratio: f64,
    frame_size: usize,
    analysis_hop: usize,
    window_type: WindowType,
    quality: ResampleQuality,
    transform: SpectralTransform,
    window: Vec<f32>,
    /// Natural angular frequency per bin (`2πk/N`, rad/sample)
    omega: Vec<f32>,
    // Per-bin phase tracking, bins 0..=N/2. Cleared at the start of every
    // call so repeated calls cannot accumulate drift.
    prev_phase: Vec<f32>,
    sum_phase: Vec<f32>,
    // Scratch sized on structural rebuild, reused across calls
    spectrum: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    frequencies: Vec<f32>,
    shifted_mag: Vec<f32>,
    shifted_freq: Vec<f32>,
    synth_phase: Vec<f32>,
    peaks: Vec<usize>,
}

impl VocoderShifter {
    /// Creates a shifter with a 2048-sample frame, quarter-frame analysis
    /// hop, and periodic Hann analysis window.
    pub fn new(sample_rate: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        let frame_size = DEFAULT_FRAME_SIZE;
        let window_type = WindowType::default();
        let mut shifter = Self {
            sample_rate,
            pitch_ratio: 1.0,
            frame_size,
            analysis_hop: frame_size / 4,
            window_type,
            quality: ResampleQuality::default(),
            transform: SpectralTransform::new(frame_size)?,
            window: window::generate(window_type, frame_size, true)?,
            omega: Vec::new(),
            prev_phase: Vec::new(),
            sum_phase: Vec::new(),
            spectrum: Vec::new(),
            magnitudes: Vec::new(),
            frequencies: Vec::new(),
            shifted_mag: Vec::new(),
            shifted_freq: Vec::new(),
            synth_phase: Vec::new(),
            peaks: Vec::new(),
        };
        shifter.rebuild_state();
        Ok(shifter)
    }

    /// Transform frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Sets the frame size (power of two, at least [`MIN_FRAME_SIZE`]).
    /// Fails without touching state if the size is invalid or the current
    /// analysis hop would no longer fit below it.
    pub fn set_frame_size(&mut self, frame_size: usize) -> Result<()> {
        if frame_size < MIN_FRAME_SIZE || !frame_size.is_power_of_two() {
            return Err(ShiftError::InvalidFrameSize {
                size: frame_size,
                min: MIN_FRAME_SIZE,
            });
        }
        if self.analysis_hop >= frame_size {
            return Err(ShiftError::InvalidAnalysisHop {
                hop: self.analysis_hop,
                frame_size,
            });
        }
        let transform = SpectralTransform::new(frame_size)?;
        let window = window::generate(self.window_type, frame_size, true)?;
        self.frame_size = frame_size;
        self.transform = transform;
        self.window = window;
        self.rebuild_state();
        Ok(())
    }

    /// Analysis hop in samples.
    pub fn analysis_hop(&self) -> usize {
        self.analysis_hop
    }

    /// Sets the analysis hop (`0 < hop < frame size`).
    pub fn set_analysis_hop(&mut self, hop: usize) -> Result<()> {
        if hop == 0 || hop >= self.frame_size {
            return Err(ShiftError::InvalidAnalysisHop {
                hop,
                frame_size: self.frame_size,
            });
        }
        self.analysis_hop = hop;
        self.rebuild_state();
        Ok(())
    }

    /// Analysis window shape.
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Sets the analysis window shape and rebuilds the coefficients.
    pub fn set_window_type(&mut self, window_type: WindowType) -> Result<()> {
        let window = window::generate(window_type, self.frame_size, true)?;
        self.window_type = window_type;
        self.window = window;
        self.rebuild_state();
        Ok(())
    }

    /// Synthesis hop for the current ratio: equal to the analysis hop in
    /// the bin-shift regime, `round(hop·ratio)` otherwise.
    pub fn synthesis_hop(&self) -> usize {
        if self.uses_bin_shift() {
            self.analysis_hop
        } else {
            self.stretch_hop()
        }
    }

    /// The ratio actually realized by the current configuration. The
    /// stretch-resample strategy quantizes the synthesis hop to an integer,
    /// so its realized ratio is `Hs/Ha` rather than the requested value.
    pub fn effective_pitch_ratio(&self) -> f64 {
        if self.uses_bin_shift() {
            self.pitch_ratio
        } else {
            self.stretch_hop() as f64 / self.analysis_hop as f64
        }
    }

    /// Quality preset for the duration-correction resampling pass.
    pub fn resample_quality(&self) -> ResampleQuality {
        self.quality
    }

    pub fn set_resample_quality(&mut self, quality: ResampleQuality) {
        self.quality = quality;
    }

    fn uses_bin_shift(&self) -> bool {
        (self.pitch_ratio - 1.0).abs() <= BIN_SHIFT_THRESHOLD
    }

    fn stretch_hop(&self) -> usize {
        (((self.analysis_hop as f64) * self.pitch_ratio).round() as usize).max(1)
    }

    fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Re-sizes and zeroes every frame-shaped buffer after a structural
    /// parameter change.
    fn rebuild_state(&mut self) {
        let n = self.frame_size;
        let bins = self.bins();
        self.omega = (0..bins).map(|k| TAU * k as f32 / n as f32).collect();
        self.prev_phase = vec![0.0; bins];
        self.sum_phase = vec![0.0; bins];
        self.spectrum = vec![Complex::new(0.0, 0.0); n];
        self.magnitudes = vec![0.0; bins];
        self.frequencies = vec![0.0; bins];
        self.shifted_mag = vec![0.0; bins];
        self.shifted_freq = vec![0.0; bins];
        self.synth_phase = vec![0.0; bins];
        self.peaks = Vec::with_capacity(bins / 4);
        tracing::debug!(
            frame_size = n,
            analysis_hop = self.analysis_hop,
            window = ?self.window_type,
            "rebuilt vocoder state"
        );
    }

    /// Windows one frame, transforms it, and derives per-bin magnitude and
    /// instantaneous frequency from the phase difference to the previous
    /// frame.
    fn analyze_frame(&mut self, frame: &[f32]) -> Result<()> {
        let ha = self.analysis_hop as f32;
        for (i, (&sample, &w)) in frame.iter().zip(self.window.iter()).enumerate() {
            self.spectrum[i] = Complex::new(sample * w, 0.0);
        }
        self.transform.forward(&mut self.spectrum)?;
        for k in 0..self.bins() {
            let c = self.spectrum[k];
            let phase = c.arg();
            let deviation = wrap_phase(phase - self.prev_phase[k] - self.omega[k] * ha);
            self.magnitudes[k] = c.norm();
            self.frequencies[k] = self.omega[k] + deviation / ha;
            self.prev_phase[k] = phase;
        }
        Ok(())
    }

    /// Mirrors the half spectrum, inverse-transforms, and overlap-adds the
    /// windowed frame at `pos`, accumulating window energy alongside.
    fn synthesize_frame(
        &mut self,
        output: &mut [f32],
        window_energy: &mut [f32],
        pos: usize,
    ) -> Result<()> {
        mirror_spectrum(&mut self.spectrum);
        self.transform.inverse(&mut self.spectrum)?;
        for i in 0..self.frame_size {
            let w = self.window[i];
            output[pos + i] += self.spectrum[i].re * w;
            window_energy[pos + i] += w * w;
        }
        Ok(())
    }

    /// Bin-shift strategy: synthesis hop equals the analysis hop, so the
    /// duration is untouched and the shift happens entirely by remapping
    /// bins.
    fn process_bin_shift(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let n = self.frame_size;
        let ha = self.analysis_hop;
        let bins = self.bins();
        let ratio = self.pitch_ratio;

        let num_frames = input.len() / ha + 1;
        let processed_len = (num_frames - 1) * ha + n;
        let mut padded = input.to_vec();
        padded.resize(processed_len, 0.0);

        let mut output = vec![0.0f32; processed_len];
        let mut window_energy = vec![0.0f32; processed_len];

        for frame in 0..num_frames {
            let pos = frame * ha;
            self.analyze_frame(&padded[pos..pos + n])?;

            // Magnitude-preserving remap: output bin k samples source bin
            // k/ratio, interpolating magnitude and instantaneous frequency
            // between the bracketing bins. Sources beyond Nyquist vanish.
            for k in 0..bins {
                let src = k as f64 / ratio;
                let k0 = src.floor() as usize;
                let frac = (src - k0 as f64) as f32;
                if k0 + 1 < bins {
                    self.shifted_mag[k] =
                        self.magnitudes[k0] * (1.0 - frac) + self.magnitudes[k0 + 1] * frac;
                    let freq =
                        self.frequencies[k0] * (1.0 - frac) + self.frequencies[k0 + 1] * frac;
                    self.shifted_freq[k] = freq * ratio as f32;
                } else {
                    self.shifted_mag[k] = 0.0;
                    self.shifted_freq[k] = 0.0;
                }
            }

            for k in 0..bins {
                self.sum_phase[k] =
                    wrap_phase(self.sum_phase[k] + self.shifted_freq[k] * ha as f32);
                self.spectrum[k] = Complex::from_polar(self.shifted_mag[k], self.sum_phase[k]);
            }

            self.synthesize_frame(&mut output, &mut window_energy, pos)?;
        }

        normalize(&mut output, &window_energy);
        Ok(fit_length(output, input.len()))
    }

    /// Stretch-resample strategy: overlap-add at the synthesis hop into a
    /// time-stretched buffer, then correct the duration with the rational
    /// resampler.
    fn process_stretch(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let n = self.frame_size;
        let ha = self.analysis_hop;
        let hs = self.stretch_hop();
        let bins = self.bins();

        let num_frames = input.len() / ha + 1;
        let padded_len = (num_frames - 1) * ha + n;
        let mut padded = input.to_vec();
        padded.resize(padded_len, 0.0);

        let stretched_len = (num_frames - 1) * hs + n;
        let mut stretched = vec![0.0f32; stretched_len];
        let mut window_energy = vec![0.0f32; stretched_len];

        for frame in 0..num_frames {
            self.analyze_frame(&padded[frame * ha..frame * ha + n])?;
            self.advance_synthesis_phases(hs);
            for k in 0..bins {
                self.spectrum[k] =
                    Complex::from_polar(self.magnitudes[k], self.synth_phase[k]);
            }
            self.synthesize_frame(&mut stretched, &mut window_energy, frame * hs)?;
        }

        normalize(&mut stretched, &window_energy);

        let corrected = if hs == ha {
            stretched
        } else {
            resample(&stretched, hs, ha, self.quality)?
        };
        Ok(fit_length(corrected, input.len()))
    }

    /// Advances the per-bin phase accumulators by one synthesis hop and
    /// derives the synthesis phases, locking non-peak bins to their
    /// nearest spectral peak.
    fn advance_synthesis_phases(&mut self, hs: usize) {
        let bins = self.bins();
        for k in 0..bins {
            self.sum_phase[k] =
                wrap_phase(self.sum_phase[k] + self.frequencies[k] * hs as f32);
            self.synth_phase[k] = self.sum_phase[k];
        }

        // Identity phase locking (Laroche & Dolson): non-peak bins keep
        // their analysis-phase offset to the nearest peak. With no peaks
        // every bin keeps its independent accumulation.
        self.peaks.clear();
        for k in 1..bins.saturating_sub(1) {
            if self.magnitudes[k] >= self.magnitudes[k - 1]
                && self.magnitudes[k] > self.magnitudes[k + 1]
            {
                self.peaks.push(k);
            }
        }
        if self.peaks.is_empty() {
            return;
        }

        let mut idx = 0;
        for k in 0..bins {
            while idx + 1 < self.peaks.len()
                && (self.peaks[idx + 1] as i64 - k as i64).unsigned_abs()
                    < (self.peaks[idx] as i64 - k as i64).unsigned_abs()
            {
                idx += 1;
            }
            let peak = self.peaks[idx];
            if k != peak {
                self.synth_phase[k] =
                    self.sum_phase[peak] + (self.prev_phase[k] - self.prev_phase[peak]);
            }
        }
    }
}

impl PitchShifter for VocoderShifter {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, rate: f64) -> Result<()> {
        validate_sample_rate(rate)?;
        self.sample_rate = rate;
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
        self.prev_phase.fill(0.0);
        self.sum_phase.fill(0.0);
    }

    fn try_process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        if (self.pitch_ratio - 1.0).abs() <= UNITY_EPSILON {
            return Ok(input.to_vec());
        }

        // Each call is self-contained: phase tracking restarts so repeated
        // calls cannot drift.
        self.prev_phase.fill(0.0);
        self.sum_phase.fill(0.0);

        if self.uses_bin_shift() {
            self.process_bin_shift(input)
        } else {
            self.process_stretch(input)
        }
    }
}

fn normalize(output: &mut [f32], window_energy: &[f32]) {
    for (sample, &energy) in output.iter_mut().zip(window_energy.iter()) {
        if energy > NORM_FLOOR {
            *sample /= energy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn sine(freq: f64, rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin() as f32)
            .collect()
    }

    /// Hann-windowed FFT over a mid-signal slice.
    fn mid_spectrum(signal: &[f32], window: usize) -> Vec<Complex<f32>> {
        assert!(window.is_power_of_two() && signal.len() >= window);
        let start = (signal.len() - window) / 2;
        let mut buf: Vec<Complex<f32>> = signal[start..start + window]
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let w = 0.5 * (1.0 - (TAU * i as f32 / window as f32).cos());
                Complex::new(s * w, 0.0)
            })
            .collect();
        FftPlanner::new().plan_fft_forward(window).process(&mut buf);
        buf
    }

    fn dominant_frequency(signal: &[f32], rate: f64, window: usize) -> f64 {
        let buf = mid_spectrum(signal, window);
        let peak = (1..window / 2)
            .max_by(|&a, &b| buf[a].norm().partial_cmp(&buf[b].norm()).unwrap())
            .unwrap();
        peak as f64 * rate / window as f64
    }

    /// In-band energy (±`half_width` bins around `center_bin`) against
    /// everything else below Nyquist, in dB.
    fn band_snr_db(signal: &[f32], center_bin: usize, half_width: usize, window: usize) -> f64 {
        let buf = mid_spectrum(signal, window);
        let mut in_band = 0.0f64;
        let mut out_band = 0.0f64;
        for k in 0..window / 2 {
            let energy = buf[k].norm_sqr() as f64;
            if k.abs_diff(center_bin) <= half_width {
                in_band += energy;
            } else {
                out_band += energy;
            }
        }
        10.0 * (in_band / out_band.max(1e-30)).log10()
    }

    #[test]
    fn test_unity_ratio_returns_exact_copy() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        let input = sine(440.0, 48000.0, 10000);
        let out = shifter.try_process(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_dispatch_threshold() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();

        // Inside the bin-shift regime the hops coincide and the requested
        // ratio is realized exactly.
        shifter.set_pitch_ratio(1.1).unwrap();
        assert_eq!(shifter.synthesis_hop(), shifter.analysis_hop());
        assert_eq!(shifter.effective_pitch_ratio(), 1.1);

        // Outside it the synthesis hop is the quantized stretch hop.
        shifter.set_pitch_ratio(1.5).unwrap();
        assert_eq!(shifter.synthesis_hop(), 768);
        assert_eq!(shifter.effective_pitch_ratio(), 1.5);

        shifter.set_pitch_ratio(0.5).unwrap();
        assert_eq!(shifter.synthesis_hop(), 256);
    }

    #[test]
    fn test_output_length_matches_input() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        for ratio in [0.5, 0.9, 1.1, 2.0] {
            shifter.set_pitch_ratio(ratio).unwrap();
            for len in [0, 1, 63, 100, 2047, 2048, 10000, 48000] {
                let input = sine(220.0, 48000.0, len);
                let out = shifter.try_process(&input).unwrap();
                assert_eq!(out.len(), len, "ratio {ratio}, len {len}");
                assert!(out.iter().all(|s| s.is_finite()));
            }
        }
    }

    #[test]
    fn test_output_finite_at_ratio_bounds_and_min_frame() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        shifter.set_analysis_hop(16).unwrap();
        shifter.set_frame_size(64).unwrap();
        let input = sine(1000.0, 48000.0, 8000);
        for ratio in [0.125, 8.0] {
            shifter.set_pitch_ratio(ratio).unwrap();
            let out = shifter.try_process(&input).unwrap();
            assert_eq!(out.len(), input.len());
            assert!(out.iter().all(|s| s.is_finite()), "ratio {ratio}");
        }
    }

    #[test]
    fn test_reset_determinism_both_strategies() {
        for ratio in [1.1, 1.5] {
            let mut shifter = VocoderShifter::new(48000.0).unwrap();
            shifter.set_pitch_ratio(ratio).unwrap();
            let input = sine(330.0, 48000.0, 20000);
            let first = shifter.try_process(&input).unwrap();
            shifter.reset();
            let second = shifter.try_process(&input).unwrap();
            assert_eq!(first, second, "ratio {ratio}");
        }
    }

    #[test]
    fn test_in_place_matches_allocating() {
        for ratio in [0.9, 1.5] {
            let mut a = VocoderShifter::new(48000.0).unwrap();
            let mut b = VocoderShifter::new(48000.0).unwrap();
            a.set_pitch_ratio(ratio).unwrap();
            b.set_pitch_ratio(ratio).unwrap();
            let input = sine(500.0, 48000.0, 16000);
            let out = a.try_process(&input).unwrap();
            let mut buf = input.clone();
            b.try_process_in_place(&mut buf).unwrap();
            for (x, y) in out.iter().zip(buf.iter()) {
                assert!((x - y).abs() <= 1e-9, "ratio {ratio}");
            }
        }
    }

    #[test]
    fn test_invalid_configuration_leaves_state() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        shifter.set_pitch_ratio(1.25).unwrap();

        assert!(shifter.set_pitch_ratio(f64::NAN).is_err());
        assert!(shifter.set_pitch_ratio(0.0).is_err());
        assert_eq!(shifter.pitch_ratio(), 1.25);

        assert!(shifter.set_frame_size(1000).is_err());
        assert!(shifter.set_frame_size(32).is_err());
        assert_eq!(shifter.frame_size(), 2048);

        assert!(shifter.set_analysis_hop(0).is_err());
        assert!(shifter.set_analysis_hop(2048).is_err());
        assert_eq!(shifter.analysis_hop(), 512);

        assert!(shifter.set_sample_rate(f64::NAN).is_err());
        assert_eq!(shifter.sample_rate(), 48000.0);
    }

    #[test]
    fn test_frame_size_below_hop_is_rejected() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        // Hop 512 cannot fit below a 256-sample frame.
        assert!(shifter.set_frame_size(256).is_err());
        shifter.set_analysis_hop(64).unwrap();
        assert!(shifter.set_frame_size(256).is_ok());
        assert_eq!(shifter.frame_size(), 256);
    }

    #[test]
    fn test_octave_up_lands_near_double_frequency() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
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
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        shifter.set_pitch_semitones(-12.0).unwrap();
        let input = sine(220.0, 48000.0, 72000);
        let out = shifter.try_process(&input).unwrap();
        let freq = dominant_frequency(&out, 48000.0, 32768);
        assert!(
            (freq - 110.0).abs() < 5.0,
            "expected ~110 Hz, measured {freq:.1} Hz"
        );
    }

    #[test]
    fn test_small_shift_accuracy_bin_shift_path() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        shifter.set_pitch_ratio(1.1).unwrap();
        let input = sine(220.0, 48000.0, 72000);
        let out = shifter.try_process(&input).unwrap();
        let freq = dominant_frequency(&out, 48000.0, 32768);
        assert!(
            (freq - 242.0).abs() < 5.0,
            "expected ~242 Hz, measured {freq:.1} Hz"
        );
    }

    #[test]
    fn test_on_bin_sine_snr() {
        // Bin 100 of the 2048-point analysis frame at 48 kHz: 2343.75 Hz.
        // Each ratio is realized exactly by the quantized hop pair, and the
        // expected output lands on an exact bin of the 8192-point
        // measurement FFT.
        let rate = 48000.0;
        let source_bin_freq = 100.0 * rate / 2048.0;
        let input = sine(source_bin_freq, rate, 72000);

        for (ratio, center_bin) in [(0.5, 200), (0.75, 300), (1.5, 600), (2.0, 800)] {
            let mut shifter = VocoderShifter::new(rate).unwrap();
            shifter.set_pitch_ratio(ratio).unwrap();
            let out = shifter.try_process(&input).unwrap();
            let snr = band_snr_db(&out, center_bin, 10, 8192);
            assert!(
                snr > 40.0,
                "ratio {ratio}: SNR {snr:.1} dB below threshold"
            );
        }
    }

    #[test]
    fn test_window_type_change_still_processes() {
        let mut shifter = VocoderShifter::new(48000.0).unwrap();
        shifter.set_window_type(WindowType::Hamming).unwrap();
        shifter.set_pitch_ratio(1.5).unwrap();
        let input = sine(440.0, 48000.0, 12000);
        let out = shifter.try_process(&input).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
