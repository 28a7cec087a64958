use crate::{
    SolverError,
    audio::{encode_wav, pcm_to_linear16},
};

use std::{io::Cursor, panic::Location};

use error_location::ErrorLocation;

const SAMPLE_RATE: u32 = 16000;

/// WHAT: Encoded WAV parses back with the same spec and length
/// WHY: The cached prompt must stay playable for inspection
#[test]
fn given_pcm_when_encoding_wav_then_output_parses_with_same_spec() {
    // Given: A short ramp of samples
    let samples: Vec<f32> = (0..1600).map(|i| (i as f32 / 1600.0) - 0.5).collect();

    // When: Encoding to WAV bytes
    let bytes = encode_wav(&samples, SAMPLE_RATE).unwrap();

    // Then: hound reads the same spec and sample count back
    let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}

/// WHAT: LINEAR16 packing emits two little-endian bytes per sample
/// WHY: The speech API decodes the payload as raw 16-bit PCM
#[test]
fn given_pcm_when_packing_linear16_then_bytes_are_little_endian_i16() {
    // Given: Known sample values
    let samples = [0.0f32, 1.0, -1.0];

    // When: Packing to LINEAR16
    let bytes = pcm_to_linear16(&samples);

    // Then: Each sample became the expected i16
    assert_eq!(bytes.len(), samples.len() * 2);
    assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
    assert_eq!(&bytes[2..4], &i16::MAX.to_le_bytes());
    assert_eq!(&bytes[4..6], &(-i16::MAX).to_le_bytes());
}

/// WHAT: Encode failures name the encode operation
/// WHY: A cache-write problem must not read as a decode problem
#[test]
fn given_encode_error_when_displayed_then_names_encoding() {
    let error = SolverError::Encode {
        reason: "wav header: unsupported spec".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    let message = error.to_string();
    assert!(message.starts_with("Audio encode failed"), "got: {message}");
}

/// WHAT: Out-of-range samples are clamped instead of wrapping
/// WHY: Decoder overshoot must not turn into full-scale clicks
#[test]
fn given_overdriven_samples_when_packing_then_values_clamp() {
    // Given: Samples beyond [-1.0, 1.0]
    let samples = [2.5f32, -3.0];

    // When: Packing to LINEAR16
    let bytes = pcm_to_linear16(&samples);

    // Then: Values clamp to the i16 extremes
    assert_eq!(&bytes[0..2], &i16::MAX.to_le_bytes());
    assert_eq!(&bytes[2..4], &(-i16::MAX).to_le_bytes());
}
