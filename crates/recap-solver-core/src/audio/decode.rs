use crate::{CoreResult, SolverError};

use std::{io::Cursor, panic::Location};

use error_location::ErrorLocation;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, instrument, warn};

/// Decoded mono PCM with its source sample rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved-to-mono f32 samples.
    pub samples: Vec<f32>,
    /// Sample rate the samples were decoded at.
    pub sample_rate: u32,
}

/// Decode compressed audio (the challenge delivers MP3) to mono f32 PCM.
///
/// Multi-channel audio is downmixed by averaging; corrupt frames are
/// skipped rather than failing the whole prompt.
#[instrument(skip(data), fields(byte_len = data.len()))]
pub fn decode_to_pcm(data: &[u8]) -> CoreResult<DecodedAudio> {
    let cursor = Cursor::new(data.to_vec());
    let stream = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SolverError::Decode {
            reason: format!("probe: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| SolverError::Decode {
            reason: "no audio track found".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| SolverError::Decode {
            reason: "unknown sample rate".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| SolverError::Decode {
            reason: format!("codec: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(SolverError::Decode {
                    reason: format!("packet: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => {
                return Err(SolverError::Decode {
                    reason: format!("decode: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let mut buffer = SampleBuffer::<f32>::new(frames as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        let interleaved = buffer.samples();

        if channels > 1 {
            for frame in interleaved.chunks(channels) {
                let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
                samples.push(mono);
            }
        } else {
            samples.extend_from_slice(interleaved);
        }
    }

    if samples.is_empty() {
        return Err(SolverError::Decode {
            reason: "no audio samples decoded".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!(
        sample_count = samples.len(),
        sample_rate = sample_rate,
        duration_secs = samples.len() as f32 / sample_rate as f32,
        "Audio decoded to mono PCM"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
