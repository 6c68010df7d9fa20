//! Complex spectral transform plus the numeric helpers shared by the
//! frequency-domain processing paths

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{Result, ShiftError};

const TWO_PI: f32 = 2.0 * PI;

/// Forward/inverse transform pair planned for one fixed power-of-two size.
pub struct SpectralTransform {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl SpectralTransform {
    /// Plans both directions for `size` samples.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(ShiftError::InvalidFrameSize { size, min: 2 });
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        })
    }

    /// Planned transform size.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place forward transform. Fails if `buffer` does not match the
    /// planned size.
    pub fn forward(&self, buffer: &mut [Complex<f32>]) -> Result<()> {
        self.check_len(buffer.len())?;
        self.forward.process(buffer);
        Ok(())
    }

    /// In-place inverse transform, normalized by `1/size` so that a
    /// forward/inverse pair is the identity.
    pub fn inverse(&self, buffer: &mut [Complex<f32>]) -> Result<()> {
        self.check_len(buffer.len())?;
        self.inverse.process(buffer);
        let norm = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c = c.scale(norm);
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(ShiftError::PlanSizeMismatch {
                expected: self.size,
                actual: len,
            });
        }
        Ok(())
    }
}

/// Wraps a phase value into (-π, π].
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let p = phase + PI;
    p - (p / TWO_PI).floor() * TWO_PI - PI
}

/// Enforces Hermitian symmetry on a full-length spectrum so its inverse
/// transform is purely real: DC and Nyquist are forced real and every bin
/// above Nyquist becomes the conjugate of its mirror.
pub fn mirror_spectrum(spectrum: &mut [Complex<f32>]) {
    let n = spectrum.len();
    if n < 2 {
        return;
    }
    let nyquist = n / 2;
    spectrum[0].im = 0.0;
    spectrum[nyquist].im = 0.0;
    for k in 1..nyquist {
        spectrum[n - k] = spectrum[k].conj();
    }
}
