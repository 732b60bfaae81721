//! services/api/src/adapters/probe.rs
//!
//! This module contains the duration probe adapter, which is the concrete
//! implementation of the `AudioProbeService` port. Only WAV headers are
//! understood; anything else simply reports no duration, which callers
//! store as absent.

use async_trait::async_trait;
use folktales_core::ports::AudioProbeService;
use std::io::Cursor;

/// An adapter that implements the `AudioProbeService` port using `hound`.
#[derive(Clone, Default)]
pub struct WavProbeAdapter;

impl WavProbeAdapter {
    /// Creates a new `WavProbeAdapter`.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioProbeService for WavProbeAdapter {
    async fn probe_duration_secs(&self, data: &[u8]) -> Option<i64> {
        let reader = hound::WavReader::new(Cursor::new(data)).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        Some(i64::from(reader.duration() / spec.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(seconds: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..(seconds * sample_rate) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn probes_wav_duration_in_whole_seconds() {
        let probe = WavProbeAdapter::new();
        let data = wav_bytes(3, 8_000);
        assert_eq!(probe.probe_duration_secs(&data).await, Some(3));
    }

    #[tokio::test]
    async fn unreadable_input_reports_no_duration() {
        let probe = WavProbeAdapter::new();
        assert_eq!(probe.probe_duration_secs(b"not a wav file").await, None);
        assert_eq!(probe.probe_duration_secs(&[]).await, None);
    }
}
