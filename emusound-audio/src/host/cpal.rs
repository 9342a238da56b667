/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Audio device streaming implementation for [cpal](https://crates.io/crates/cpal).
//!
//! The [carousel][crate::carousel] consumer lives in the **cpal** audio thread, while the
//! producer is fed with the mixed audio from the emulation thread.
//!
//! Requires "cpal" feature to be enabled.
use core::convert::TryInto;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use cpal::{
    Stream,
    PlayStreamError, PauseStreamError, DefaultStreamConfigError, BuildStreamError,
    traits::{DeviceTrait, HostTrait, StreamTrait}
};

pub use cpal::SampleFormat;

use emusound_core::audio::{AudioSample, FromSample, fill_silence};
use crate::carousel::*;
use crate::config::MixerConfig;
use crate::mixer::render_interleaved;
pub use super::{AudioHandleError, AudioHandleErrorKind};

/// The struct for producing and controlling the audio playback.
///
/// The `T` parameter should be one of the [sample primitives][cpal::Sample].
pub struct AudioHandle<T: cpal::SizedSample + AudioSample> {
    /// The audio sample frequency of the output stream.
    pub sample_rate: u32,
    /// The number of audio channels in the output stream.
    pub channels: u8,
    /// The audio sample producer, interconnected with an audio consumer living in the audio thread.
    pub producer: AudioFrameProducer<T>,
    stream: Stream
}

/// The enum for producing and controlling the audio playback regardless of the sample format used.
#[non_exhaustive]
pub enum AudioHandleAnyFormat {
    I8(AudioHandle<i8>),
    I16(AudioHandle<i16>),
    I32(AudioHandle<i32>),
    U8(AudioHandle<u8>),
    U16(AudioHandle<u16>),
    F32(AudioHandle<f32>),
    F64(AudioHandle<f64>),
}

macro_rules! implement_any {
    ($me:ident, $ha:ident, $ex:expr) => {
        match $me {
            AudioHandleAnyFormat::I8($ha) => $ex,
            AudioHandleAnyFormat::I16($ha) => $ex,
            AudioHandleAnyFormat::I32($ha) => $ex,
            AudioHandleAnyFormat::U8($ha) => $ex,
            AudioHandleAnyFormat::U16($ha) => $ex,
            AudioHandleAnyFormat::F32($ha) => $ex,
            AudioHandleAnyFormat::F64($ha) => $ex,
        }
    };
}

impl AudioHandleAnyFormat {
    /// Returns the sample format of the current variant.
    pub fn sample_format(&self) -> SampleFormat {
        match self {
            AudioHandleAnyFormat::I8(..) => SampleFormat::I8,
            AudioHandleAnyFormat::I16(..) => SampleFormat::I16,
            AudioHandleAnyFormat::I32(..) => SampleFormat::I32,
            AudioHandleAnyFormat::U8(..) => SampleFormat::U8,
            AudioHandleAnyFormat::U16(..) => SampleFormat::U16,
            AudioHandleAnyFormat::F32(..) => SampleFormat::F32,
            AudioHandleAnyFormat::F64(..) => SampleFormat::F64,
        }
    }
    /// Returns the audio sample frequency of the output stream.
    pub fn sample_rate(&self) -> u32 {
        implement_any! { self, audio, audio.sample_rate }
    }
    /// Returns the number of audio channels in the output stream.
    pub fn channels(&self) -> u8 {
        implement_any! { self, audio, audio.channels }
    }
    /// Starts playback of the audio device.
    pub fn play(&self) -> Result<(), AudioHandleError> {
        implement_any! { self, audio, audio.play() }
    }
    /// Pauses playback of the audio device.
    pub fn pause(&self) -> Result<(), AudioHandleError> {
        implement_any! { self, audio, audio.pause() }
    }
    /// Converts the `mixed` samples into the stream format and sends them as the next frame.
    pub fn send_mixed(&mut self, mixed: &[i32]) -> AudioFrameResult<()> {
        implement_any! { self, audio, audio.send_mixed(mixed) }
    }
    /// Creates an instance of the [AudioHandleAnyFormat] on the default output device of `host`
    /// according to the provided mixer `config`.
    ///
    /// The stream uses the device's default sample format. Returns an error with
    /// [AudioHandleErrorKind::InvalidArguments] if that format is not supported.
    pub fn create(host: &cpal::Host, config: &MixerConfig) -> Result<Self, AudioHandleError> {
        config.validate()?;
        let device = host.default_output_device()
                     .ok_or_else(|| ("no default output device".to_string(),
                                    AudioHandleErrorKind::AudioSubsystem))?;
        let stream_config = cpal::StreamConfig {
            channels: config.channels.into(),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let sample_format = check_sample_format(device.default_output_config()?.sample_format())?;
        debug!("audio device default format: {:?}", sample_format);
        let (frame_samples, latency) = (config.frame_samples, config.latency);
        macro_rules! create {
            ($variant:ident, $ty:ty) => {
                AudioHandleAnyFormat::$variant(
                    AudioHandle::<$ty>::create_with_device_and_config(&device, &stream_config, frame_samples, latency)?
                )
            };
        }
        Ok(match sample_format {
            SampleFormat::I8 => create!(I8, i8),
            SampleFormat::I16 => create!(I16, i16),
            SampleFormat::I32 => create!(I32, i32),
            SampleFormat::U8 => create!(U8, u8),
            SampleFormat::U16 => create!(U16, u16),
            SampleFormat::F32 => create!(F32, f32),
            SampleFormat::F64 => create!(F64, f64),
            _ => return Err(unsupported_format(sample_format))
        })
    }
}

fn unsupported_format(sample_format: SampleFormat) -> AudioHandleError {
    (format!("unsupported audio sample format: {:?}", sample_format),
     AudioHandleErrorKind::InvalidArguments).into()
}

/// Returns `sample_format` if an [AudioHandleAnyFormat] variant exists for it.
pub fn check_sample_format(sample_format: SampleFormat) -> Result<SampleFormat, AudioHandleError> {
    match sample_format {
        SampleFormat::I8|SampleFormat::I16|SampleFormat::I32|
        SampleFormat::U8|SampleFormat::U16|
        SampleFormat::F32|SampleFormat::F64 => Ok(sample_format),
        _ => {
            error!("audio device sample format: {:?} is not supported", sample_format);
            Err(unsupported_format(sample_format))
        }
    }
}

impl<T: cpal::SizedSample + AudioSample> AudioHandle<T> {
    /// Starts playback of the audio device.
    pub fn play(&self) -> Result<(), AudioHandleError> {
        self.stream.play().map_err(From::from)
    }
    /// Pauses playback of the audio device.
    pub fn pause(&self) -> Result<(), AudioHandleError> {
        self.stream.pause().map_err(From::from)
    }
    /// Closes audio playback and frees underlying resources.
    pub fn close(self) {}
    /// Converts the `mixed` samples into the stream format and sends them as the next frame.
    ///
    /// Blocks until the audio thread releases one of the circulating frames.
    pub fn send_mixed(&mut self, mixed: &[i32]) -> AudioFrameResult<()>
        where T: FromSample<i16>
    {
        let channels = self.channels as usize;
        self.producer.render_frame(|frame| {
            frame.resize(mixed.len() * channels, T::silence());
            render_interleaved(mixed, frame, channels);
        });
        self.producer.send_frame()
    }
    /// Creates an instance of the [AudioHandle] from the provided **cpal** `device` with the
    /// desired audio parameters.
    ///
    /// * `config` specifies the desired audio parameters.
    /// * `frame_samples` is the expected number of samples in each frame, single channel-wise.
    /// * `latency` is the audio latency passed to the [create_carousel].
    pub fn create_with_device_and_config(
            device: &cpal::Device,
            config: &cpal::StreamConfig,
            frame_samples: usize,
            latency: usize,
        ) -> Result<Self, AudioHandleError>
    {
        let channels: u8 = config.channels.try_into()
                           .map_err(|_| (format!("number of channels: {} exceed the maximum value of 255", config.channels),
                                         AudioHandleErrorKind::InvalidArguments))?;
        let sample_rate = config.sample_rate.0;
        debug!("audio specs: {:?}", config);
        debug!("audio frame samples: {} latency: {}", frame_samples, latency);
        let (producer, mut consumer) = create_carousel::<T>(latency, frame_samples, channels);

        let data_fn = move |out: &mut [T], _: &_| match consumer.fill_buffer(out, false) {
            Ok(unfilled) => {
                if !unfilled.is_empty() {
                    fill_silence(unfilled);
                    debug!("missing buffer");
                }
            }
            Err(_) => {
                error!("fatal: producer terminated");
            }
        };

        let err_fn = |err| error!("an error occurred on stream: {}", err);

        let stream = device.build_output_stream(config, data_fn, err_fn, None)?;

        Ok(AudioHandle {
            sample_rate,
            channels,
            producer,
            stream
        })
    }
}

impl From<PlayStreamError> for AudioHandleError {
    fn from(e: PlayStreamError) -> Self {
        let kind = match e {
            PlayStreamError::DeviceNotAvailable => AudioHandleErrorKind::AudioSubsystem,
            _ => AudioHandleErrorKind::AudioStream
        };
        (e.to_string(), kind).into()
    }
}

impl From<PauseStreamError> for AudioHandleError {
    fn from(e: PauseStreamError) -> Self {
        let kind = match e {
            PauseStreamError::DeviceNotAvailable => AudioHandleErrorKind::AudioSubsystem,
            _ => AudioHandleErrorKind::AudioStream
        };
        (e.to_string(), kind).into()
    }
}

impl From<DefaultStreamConfigError> for AudioHandleError {
    fn from(e: DefaultStreamConfigError) -> Self {
        let kind = match e {
            DefaultStreamConfigError::StreamTypeNotSupported => AudioHandleErrorKind::InvalidArguments,
            _ => AudioHandleErrorKind::AudioSubsystem
        };
        (e.to_string(), kind).into()
    }
}

impl From<BuildStreamError> for AudioHandleError {
    fn from(e: BuildStreamError) -> Self {
        let kind = match e {
            BuildStreamError::DeviceNotAvailable => AudioHandleErrorKind::AudioSubsystem,
            BuildStreamError::StreamConfigNotSupported|
            BuildStreamError::InvalidArgument => AudioHandleErrorKind::InvalidArguments,
            _ => AudioHandleErrorKind::AudioStream
        };
        (e.to_string(), kind).into()
    }
}
