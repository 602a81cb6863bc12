use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Sample rate of synthesized speech
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Decoded mono PCM, samples normalized to `[-1.0, 1.0)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcmAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl PcmAudio {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// Decodes base64 little-endian 16-bit PCM into float samples
pub fn decode_pcm(encoded: &str) -> AppResult<PcmAudio> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(AppError::ExternalApi("no audio returned".to_string()));
    }

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AppError::ExternalApi(format!("audio payload is not base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(AppError::ExternalApi("no audio returned".to_string()));
    }
    if bytes.len() % 2 != 0 {
        return Err(AppError::ExternalApi(format!(
            "audio payload has odd length {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(PcmAudio {
        sample_rate: SPEECH_SAMPLE_RATE,
        channels: 1,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_decodes_and_scales() {
        let audio = decode_pcm(&encode(&[0, 16384, -32768, 32767])).unwrap();
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples[0], 0.0);
        assert_eq!(audio.samples[1], 0.5);
        assert_eq!(audio.samples[2], -1.0);
        assert!(audio.samples[3] < 1.0);
    }

    #[test]
    fn test_duration() {
        let audio = decode_pcm(&encode(&vec![0; 12_000])).unwrap();
        assert!((audio.duration_secs() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_payload_is_error() {
        assert!(matches!(decode_pcm(""), Err(AppError::ExternalApi(_))));
        assert!(matches!(decode_pcm("   "), Err(AppError::ExternalApi(_))));
    }

    #[test]
    fn test_odd_length_is_error() {
        let odd = STANDARD.encode([1u8, 2, 3]);
        assert!(matches!(decode_pcm(&odd), Err(AppError::ExternalApi(_))));
    }

    #[test]
    fn test_bad_base64_is_error() {
        assert!(matches!(decode_pcm("not base64!!"), Err(AppError::ExternalApi(_))));
    }
}
