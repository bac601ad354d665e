//! Audio clip header decoding.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use quarry_assets::{AssetError, AssetResult, AudioClip};

/// Container formats the audio backend accepts.
pub const AUDIO_FORMATS: &[&str] = &["wav", "ogg", "mp3", "flac"];

/// Build an [`AudioClip`] from encoded bytes.
///
/// WAV headers are parsed for sample rate, channel count and duration. Other
/// formats are only checked for their magic bytes and kept encoded, with
/// unknown duration.
pub fn decode_clip(path: &str, bytes: &[u8], extension: &str) -> AssetResult<AudioClip> {
    let format = extension.to_ascii_lowercase();
    match format.as_str() {
        "wav" => decode_wav(path, bytes),
        "ogg" | "mp3" | "flac" => {
            if !has_magic(&format, bytes) {
                return Err(AssetError::loader(path, format!("not a valid {} stream", format)));
            }
            Ok(AudioClip {
                format,
                sample_rate: None,
                channels: None,
                duration: None,
                bytes: Arc::from(bytes),
            })
        }
        _ => Err(AssetError::UnsupportedFormat {
            path: path.to_string(),
            extension: format,
        }),
    }
}

fn decode_wav(path: &str, bytes: &[u8]) -> AssetResult<AudioClip> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AssetError::loader(path, format!("WAV header: {}", e)))?;
    let spec = reader.spec();

    if spec.sample_rate == 0 {
        return Err(AssetError::loader(path, "WAV sample rate is zero"));
    }

    // `duration` is in frames (samples per channel).
    let frames = reader.duration() as u64;
    let duration = Duration::from_micros(frames * 1_000_000 / spec.sample_rate as u64);

    Ok(AudioClip {
        format: "wav".to_string(),
        sample_rate: Some(spec.sample_rate),
        channels: Some(spec.channels),
        duration: Some(duration),
        bytes: Arc::from(bytes),
    })
}

fn has_magic(format: &str, bytes: &[u8]) -> bool {
    match format {
        "ogg" => bytes.starts_with(b"OggS"),
        "flac" => bytes.starts_with(b"fLaC"),
        // ID3 tag or a bare MPEG frame sync.
        "mp3" => bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0),
        _ => false,
    }
}

/// Encode `frames` of silent 16-bit PCM as a WAV file.
pub fn silent_wav(sample_rate: u32, channels: u16, frames: u32) -> AssetResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_write_error)?;
    for _ in 0..frames as u64 * channels as u64 {
        writer.write_sample(0i16).map_err(wav_write_error)?;
    }
    writer.finalize().map_err(wav_write_error)?;
    Ok(cursor.into_inner())
}

fn wav_write_error(err: hound::Error) -> AssetError {
    AssetError::Other {
        message: format!("WAV encode failed: {}", err),
    }
}
