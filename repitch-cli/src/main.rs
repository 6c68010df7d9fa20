//! REPITCH - offline WAV pitch shifter
//!
//! Reads a WAV file, shifts its pitch by a semitone amount with either
//! engine, and writes the result. Multi-channel input is averaged to mono.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use repitch_dsp::{PitchShifter, VocoderShifter, WsolaShifter};

struct Args {
    input: PathBuf,
    output: PathBuf,
    semitones: f64,
    algo: String,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut algo = String::from("vocoder");
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--algo" {
            algo = args
                .next()
                .context("--algo expects a value (time|vocoder)")?;
        } else {
            positional.push(arg);
        }
    }
    if positional.len() != 3 {
        bail!("usage: repitch <input.wav> <output.wav> <semitones> [--algo time|vocoder]");
    }
    Ok(Args {
        input: PathBuf::from(&positional[0]),
        output: PathBuf::from(&positional[1]),
        semitones: positional[2]
            .parse()
            .with_context(|| format!("invalid semitone amount: {}", positional[2]))?,
        algo,
    })
}

/// Decodes a WAV file into mono f32 samples (channels averaged).
fn read_mono(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let frames = interleaved.len() / channels;
    let mono = (0..frames)
        .map(|f| {
            interleaved[f * channels..(f + 1) * channels].iter().sum::<f32>() / channels as f32
        })
        .collect();
    Ok((mono, spec.sample_rate))
}

fn write_mono(path: &PathBuf, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args()?;
    let (input, sample_rate) = read_mono(&args.input)?;
    tracing::info!(
        samples = input.len(),
        sample_rate,
        semitones = args.semitones,
        algo = %args.algo,
        "loaded input"
    );

    let mut shifter: Box<dyn PitchShifter> = match args.algo.as_str() {
        "time" => Box::new(WsolaShifter::new(sample_rate as f64)?),
        "vocoder" => Box::new(VocoderShifter::new(sample_rate as f64)?),
        other => bail!("unknown algorithm {other:?}, expected time or vocoder"),
    };
    shifter.set_pitch_semitones(args.semitones)?;

    let output = shifter.try_process(&input)?;
    write_mono(&args.output, &output, sample_rate)?;
    tracing::info!(path = %args.output.display(), "wrote shifted audio");
    Ok(())
}
