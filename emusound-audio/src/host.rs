/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Platform dependent audio device streaming implementations.
//!
//! To make use of this module enable the `cpal` feature of the `emusound-audio` entry in
//! `[dependencies]` section of the Cargo configuration file.
use core::fmt;
use std::error::Error;

use emusound_core::error::{SoundError, SoundErrorKind};

#[cfg(feature = "cpal")]
pub mod cpal;

/// A list specifying categories of [AudioHandleError] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioHandleErrorKind {
    /// This error occurs when the audio subsystem host or device is not available.
    AudioSubsystem,
    /// This error occurs while trying to create or modify an audio stream.
    AudioStream,
    /// This error occurs due to invalid audio parameters or other arguments.
    InvalidArguments,
}

/// A common error type returned by all audio handle implementation methods in this module.
#[derive(Debug, Clone)]
pub struct AudioHandleError {
    description: String,
    kind: AudioHandleErrorKind
}

impl fmt::Display for AudioHandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.description.fmt(f)
    }
}

impl Error for AudioHandleError {}

impl AudioHandleError {
    /// Returns the corresponding category for this error.
    pub fn kind(&self) -> AudioHandleErrorKind {
        self.kind
    }
}

impl From<(String, AudioHandleErrorKind)> for AudioHandleError {
    fn from((description, kind): (String, AudioHandleErrorKind)) -> Self {
        AudioHandleError { description, kind }
    }
}

/// Configuration errors become [AudioHandleErrorKind::InvalidArguments].
impl From<SoundError> for AudioHandleError {
    fn from(err: SoundError) -> Self {
        let kind = match err.kind() {
            SoundErrorKind::InvalidArgument|
            SoundErrorKind::UnsupportedFormat => AudioHandleErrorKind::InvalidArguments,
            SoundErrorKind::TimingViolation => AudioHandleErrorKind::AudioStream,
        };
        (err.to_string(), kind).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixerConfig;

    #[test]
    fn config_error_converts() {
        let config = MixerConfig { channels: 0, ..Default::default() };
        let err: AudioHandleError = config.validate().unwrap_err().into();
        assert_eq!(err.kind(), AudioHandleErrorKind::InvalidArguments);
        assert_eq!(err.to_string(), "number of channels must not be 0");
    }
}
