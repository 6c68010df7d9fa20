//! Rational-ratio duration correction for the stretch-then-resample paths

use rubato::{FftFixedIn, Resampler};

use crate::error::{Result, ShiftError};

/// Resampling quality presets, traded against CPU cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleQuality {
    /// Small chunks, single sub-chunk (lowest latency, lowest quality)
    Fast,
    /// Balanced quality/speed (default)
    #[default]
    Balanced,
    /// Large chunks, finest sub-chunking (best quality, slowest)
    Best,
}

impl ResampleQuality {
    fn chunk_size(self) -> usize {
        match self {
            ResampleQuality::Fast => 512,
            ResampleQuality::Balanced => 1024,
            ResampleQuality::Best => 2048,
        }
    }

    fn sub_chunks(self) -> usize {
        match self {
            ResampleQuality::Fast => 1,
            ResampleQuality::Balanced => 2,
            ResampleQuality::Best => 4,
        }
    }
}

/// Resamples a mono signal by the rational ratio `to_hop / from_hop`, so
/// the output holds `len·to_hop/from_hop` samples and the spectral content
/// scales by `from_hop / to_hop`.
///
/// An identity hop pair returns a plain copy. Fails on a zero hop or if
/// the underlying resampler rejects the configuration.
pub fn resample(
    input: &[f32],
    from_hop: usize,
    to_hop: usize,
    quality: ResampleQuality,
) -> Result<Vec<f32>> {
    if from_hop == 0 || to_hop == 0 {
        return Err(ShiftError::InvalidHopPair { from_hop, to_hop });
    }
    if from_hop == to_hop {
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let expected = ((input.len() as f64 * to_hop as f64) / from_hop as f64).round() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_hop,
        to_hop,
        quality.chunk_size(),
        quality.sub_chunks(),
        1,
    )
    .map_err(|e| ShiftError::Resample(e.to_string()))?;

    let mut output: Vec<f32> = Vec::with_capacity(expected + quality.chunk_size());
    let mut pos = 0;

    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let produced = if pos + needed <= input.len() {
            resampler
                .process(&[&input[pos..pos + needed]], None)
                .map_err(|e| ShiftError::Resample(e.to_string()))?
        } else {
            // Zero-pad the tail chunk
            let mut padded = input[pos..].to_vec();
            padded.resize(needed, 0.0);
            resampler
                .process(&[padded.as_slice()], None)
                .map_err(|e| ShiftError::Resample(e.to_string()))?
        };
        output.extend_from_slice(&produced[0]);
        pos += needed;
    }

    // Flush the resampler delay line with silence until the expected
    // number of frames is available.
    let mut flushes = 0;
    while output.len() < expected && flushes < 8 {
        let needed = resampler.input_frames_next();
        let silence = vec![0.0f32; needed];
        let produced = resampler
            .process(&[silence.as_slice()], None)
            .map_err(|e| ShiftError::Resample(e.to_string()))?;
        output.extend_from_slice(&produced[0]);
        flushes += 1;
    }

    output.resize(expected, 0.0);
    Ok(output)
}
