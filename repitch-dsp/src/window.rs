//! Analysis window generation

use std::f32::consts::PI;

use crate::error::{Result, ShiftError};

/// Window function shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Raised cosine, optimal for overlap-add (default)
    #[default]
    Hann,
    Hamming,
    Blackman,
}

/// Generates window coefficients of exactly `length` samples.
///
/// Periodic windows divide by `length` (the DFT-even form used for
/// overlap-add analysis); symmetric windows divide by `length - 1`.
pub fn generate(window: WindowType, length: usize, periodic: bool) -> Result<Vec<f32>> {
    if length == 0 {
        return Err(ShiftError::InvalidWindowLength);
    }
    if length == 1 {
        return Ok(vec![1.0]);
    }

    let denom = if periodic { length } else { length - 1 } as f32;
    let coeffs = (0..length)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / denom;
            match window {
                WindowType::Hann => 0.5 * (1.0 - x.cos()),
                WindowType::Hamming => 0.54 - 0.46 * x.cos(),
                WindowType::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            }
        })
        .collect();
    Ok(coeffs)
}
