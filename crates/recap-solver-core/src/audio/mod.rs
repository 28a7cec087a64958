mod decode;
mod resampler;
mod wav;

pub use {
    decode::{DecodedAudio, decode_to_pcm},
    resampler::Resampler,
    wav::{encode_wav, pcm_to_linear16},
};

/// Sample rate the speech API consumes.
pub const RECOGNITION_SAMPLE_RATE: u32 = 16_000;
