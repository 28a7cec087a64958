use crate::{CoreResult, SolverError};

use std::{io::Cursor, panic::Location};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavSpec, WavWriter};

/// Encode mono f32 PCM as a 16-bit WAV byte buffer.
///
/// Used to keep a speech-recognizable copy of each prompt in the
/// challenge cache for inspection.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> CoreResult<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| SolverError::Encode {
                reason: format!("wav header: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        for &sample in samples {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| SolverError::Encode {
                    reason: format!("wav sample: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        writer.finalize().map_err(|e| SolverError::Encode {
            reason: format!("wav finalize: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
    }

    Ok(cursor.into_inner())
}

/// Pack mono f32 PCM into little-endian 16-bit samples.
///
/// This is the LINEAR16 payload the recognition API consumes.
pub fn pcm_to_linear16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&to_i16(sample).to_le_bytes());
    }
    bytes
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
