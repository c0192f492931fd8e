//! WAV inspection and encoding for the target PCM contract.
//!
//! Every artifact must be mono, 16-bit integer PCM at the configured sample
//! rate with at least one frame. Reading and writing go through `hound`.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

/// Default artifact sample rate (44.1kHz).
pub const SAMPLE_RATE: u32 = 44100;

/// Number of audio channels (mono).
pub const CHANNELS: u16 = 1;

/// Bits per sample (16-bit linear PCM).
pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of a canonical RIFF/WAVE header; anything this small has no audio.
pub const MIN_FILE_BYTES: u64 = 44;

/// Target format every artifact is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Files at or below this size are rejected without parsing.
    pub min_file_bytes: u64,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            min_file_bytes: MIN_FILE_BYTES,
        }
    }
}

impl AudioFormat {
    /// Returns the hound spec for writing artifacts.
    pub fn spec(&self) -> WavSpec {
        WavSpec {
            channels: CHANNELS,
            sample_rate: self.sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        }
    }
}

/// Header facts read from a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WavInfo {
    /// Number of channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// True for integer PCM, false for float.
    pub integer: bool,
    /// Number of frames (samples per channel).
    pub frames: u32,
}

/// Reason a file fails the format contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatIssue {
    /// The file does not exist.
    Missing,
    /// The file is no larger than a bare header.
    TooSmall(u64),
    /// The header could not be parsed.
    Unreadable(String),
    /// Channel count differs from mono.
    Channels(u16),
    /// Sample width differs from 16 bits.
    SampleWidth(u16),
    /// Samples are floating point.
    FloatSamples,
    /// Sample rate differs from the target.
    SampleRate(u32),
    /// The file has a header but no frames.
    Empty,
}

impl std::fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatIssue::Missing => write!(f, "file missing"),
            FormatIssue::TooSmall(size) => write!(f, "file too small ({} bytes)", size),
            FormatIssue::Unreadable(e) => write!(f, "unreadable header: {}", e),
            FormatIssue::Channels(c) => write!(f, "{} channels, expected {}", c, CHANNELS),
            FormatIssue::SampleWidth(b) => {
                write!(f, "{}-bit samples, expected {}", b, BITS_PER_SAMPLE)
            }
            FormatIssue::FloatSamples => write!(f, "float samples, expected integer PCM"),
            FormatIssue::SampleRate(r) => write!(f, "{} Hz", r),
            FormatIssue::Empty => write!(f, "no audio frames"),
        }
    }
}

/// Reads the header of a WAV file on disk.
pub fn inspect(path: &Path, format: &AudioFormat) -> Result<WavInfo, FormatIssue> {
    let meta = std::fs::metadata(path).map_err(|_| FormatIssue::Missing)?;
    if meta.len() <= format.min_file_bytes {
        return Err(FormatIssue::TooSmall(meta.len()));
    }

    let reader = WavReader::open(path).map_err(|e| FormatIssue::Unreadable(e.to_string()))?;
    let spec = reader.spec();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        integer: spec.sample_format == SampleFormat::Int,
        frames: reader.duration(),
    })
}

/// Checks header facts against the target format.
pub fn check(info: &WavInfo, format: &AudioFormat) -> Result<(), FormatIssue> {
    if info.channels != CHANNELS {
        return Err(FormatIssue::Channels(info.channels));
    }
    if info.bits_per_sample != BITS_PER_SAMPLE {
        return Err(FormatIssue::SampleWidth(info.bits_per_sample));
    }
    if !info.integer {
        return Err(FormatIssue::FloatSamples);
    }
    if info.sample_rate != format.sample_rate {
        return Err(FormatIssue::SampleRate(info.sample_rate));
    }
    if info.frames == 0 {
        return Err(FormatIssue::Empty);
    }
    Ok(())
}

/// Returns true if the bytes start with a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decoded audio as interleaved f32 samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    /// Channel count of `samples`.
    pub channels: u16,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
}

/// Decodes an in-memory WAV file of any PCM layout hound understands.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, hound::Error> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Averages interleaved channels down to one.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Encodes mono samples as a 16-bit PCM WAV file in memory.
pub fn encode_pcm16(samples: &[f32], format: &AudioFormat) -> Result<Vec<u8>, hound::Error> {
    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), format.spec())?;
        for sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::write_fixture;
    use tempfile::tempdir;

    #[test]
    fn valid_file_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.wav");
        let format = AudioFormat::default();
        write_fixture(&path, format.spec(), 441);

        let info = inspect(&path, &format).unwrap();
        assert_eq!(info.frames, 441);
        assert!(check(&info, &format).is_ok());
    }

    #[test]
    fn stereo_and_wrong_rate_are_rejected() {
        let dir = tempdir().unwrap();
        let format = AudioFormat::default();

        let stereo = dir.path().join("stereo.wav");
        write_fixture(&stereo, WavSpec { channels: 2, ..format.spec() }, 100);
        let info = inspect(&stereo, &format).unwrap();
        assert_eq!(check(&info, &format), Err(FormatIssue::Channels(2)));

        let slow = dir.path().join("slow.wav");
        write_fixture(&slow, WavSpec { sample_rate: 22050, ..format.spec() }, 100);
        let info = inspect(&slow, &format).unwrap();
        assert_eq!(check(&info, &format), Err(FormatIssue::SampleRate(22050)));
    }

    #[test]
    fn float_samples_are_rejected() {
        let dir = tempdir().unwrap();
        let format = AudioFormat::default();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
            ..format.spec()
        };
        write_fixture(&path, spec, 100);
        let info = inspect(&path, &format).unwrap();
        assert_eq!(check(&info, &format), Err(FormatIssue::SampleWidth(32)));
    }

    #[test]
    fn missing_tiny_and_garbage_files() {
        let dir = tempdir().unwrap();
        let format = AudioFormat::default();

        assert_eq!(
            inspect(&dir.path().join("nope.wav"), &format),
            Err(FormatIssue::Missing)
        );

        let tiny = dir.path().join("tiny.wav");
        std::fs::write(&tiny, b"RIFF").unwrap();
        assert_eq!(inspect(&tiny, &format), Err(FormatIssue::TooSmall(4)));

        let garbage = dir.path().join("garbage.wav");
        std::fs::write(&garbage, vec![7u8; 200]).unwrap();
        assert!(matches!(
            inspect(&garbage, &format),
            Err(FormatIssue::Unreadable(_))
        ));
    }

    #[test]
    fn encode_produces_target_format() {
        let format = AudioFormat::default();
        let bytes = encode_pcm16(&[0.0, 0.5, -0.5, 1.5], &format).unwrap();
        assert!(is_wav(&bytes));

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.sample_rate, SAMPLE_RATE);
        assert_eq!(decoded.samples.len(), 4);
        // Out-of-range input is clamped rather than wrapped.
        assert!(decoded.samples[3] > 0.99);
    }

    #[test]
    fn downmix_averages_frames() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }
}
