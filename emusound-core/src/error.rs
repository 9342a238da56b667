/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Errors reported by sound devices.
use core::fmt;
use std::error::Error;

/// A list specifying categories of [SoundError] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundErrorKind {
    /// A frequency, a sample count or another argument is out of range.
    InvalidArgument,
    /// The PCM sample format is not supported.
    UnsupportedFormat,
    /// A register write was timestamped earlier than the previously queued one.
    ///
    /// This is a bug in the event sequencing of the emulator core.
    TimingViolation,
}

/// A common error type returned by sound device methods.
#[derive(Debug, Clone)]
pub struct SoundError {
    description: String,
    kind: SoundErrorKind
}

pub type SoundResult<T> = Result<T, SoundError>;

impl fmt::Display for SoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.description.fmt(f)
    }
}

impl Error for SoundError {}

impl SoundError {
    /// Returns the corresponding category for this error.
    pub fn kind(&self) -> SoundErrorKind {
        self.kind
    }

    pub fn invalid_argument<S: Into<String>>(description: S) -> Self {
        (description.into(), SoundErrorKind::InvalidArgument).into()
    }

    pub fn unsupported_format<S: Into<String>>(description: S) -> Self {
        (description.into(), SoundErrorKind::UnsupportedFormat).into()
    }

    pub fn timing_violation<S: Into<String>>(description: S) -> Self {
        (description.into(), SoundErrorKind::TimingViolation).into()
    }
}

impl From<(String, SoundErrorKind)> for SoundError {
    fn from((description, kind): (String, SoundErrorKind)) -> Self {
        SoundError { description, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_and_display() {
        let err = SoundError::unsupported_format("unsupported bit depth: 12");
        assert_eq!(err.kind(), SoundErrorKind::UnsupportedFormat);
        assert_eq!(err.to_string(), "unsupported bit depth: 12");
        let err: SoundError = ("bad".to_string(), SoundErrorKind::InvalidArgument).into();
        assert_eq!(err.kind(), SoundErrorKind::InvalidArgument);
        let boxed: Box<dyn Error> = Box::new(SoundError::timing_violation("late"));
        assert_eq!(boxed.to_string(), "late");
    }
}
