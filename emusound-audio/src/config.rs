/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Mixer and audio output configuration.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use emusound_core::clock::MAIN_CLOCK_HZ;
use emusound_core::error::{SoundError, SoundResult};

/// The default host sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Parameters of the mixer and of the audio stream it feeds.
///
/// With the `snapshot` feature the configuration can be loaded from any `serde` format.
/// Missing fields take their default values.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(default, rename_all = "kebab-case"))]
#[derive(Clone, Debug, PartialEq)]
pub struct MixerConfig {
    /// The host sample rate in samples per second.
    pub sample_rate: u32,
    /// The number of samples in a single audio frame sent to the audio backend.
    pub frame_samples: usize,
    /// The number of frames buffered between the mixer and the audio backend.
    pub latency: usize,
    /// The master volume in the range `[0.0, 1.0]`.
    pub master_volume: f32,
    /// The number of interleaved output channels.
    pub channels: u8,
}

impl Default for MixerConfig {
    fn default() -> Self {
        MixerConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_samples: DEFAULT_SAMPLE_RATE as usize / 50,
            latency: 2,
            master_volume: 1.0,
            channels: 2,
        }
    }
}

impl MixerConfig {
    /// Checks that all the parameters are within their valid ranges.
    pub fn validate(&self) -> SoundResult<()> {
        if self.sample_rate == 0 {
            return Err(SoundError::invalid_argument("sample rate must not be 0"))
        }
        if u64::from(self.sample_rate) > MAIN_CLOCK_HZ {
            return Err(SoundError::invalid_argument(
                format!("sample rate: {} exceeds the main clock frequency", self.sample_rate)))
        }
        if self.frame_samples == 0 {
            return Err(SoundError::invalid_argument("frame samples must not be 0"))
        }
        if self.channels == 0 {
            return Err(SoundError::invalid_argument("number of channels must not be 0"))
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(SoundError::invalid_argument(
                format!("master volume: {} should be in the range [0.0, 1.0]", self.master_volume)))
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emusound_core::error::SoundErrorKind;

    #[test]
    fn default_config_is_valid() {
        let config = MixerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_samples, 882);
    }

    #[test]
    fn invalid_config_is_rejected() {
        for config in vec![
            MixerConfig { sample_rate: 0, ..Default::default() },
            MixerConfig { sample_rate: u32::MAX, ..Default::default() },
            MixerConfig { frame_samples: 0, ..Default::default() },
            MixerConfig { channels: 0, ..Default::default() },
            MixerConfig { master_volume: 1.5, ..Default::default() },
            MixerConfig { master_volume: f32::NAN, ..Default::default() },
        ] {
            assert_eq!(config.validate().unwrap_err().kind(), SoundErrorKind::InvalidArgument);
        }
    }

    #[cfg(feature = "snapshot")]
    #[test]
    fn config_from_partial_json() {
        let config: MixerConfig = serde_json::from_str(r#"{"sample-rate": 48000, "master-volume": 0.5}"#).unwrap();
        assert_eq!(config, MixerConfig { sample_rate: 48000, master_volume: 0.5, ..Default::default() });
        let json = serde_json::to_string(&config).unwrap();
        let config1: MixerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, config1);
    }
}
