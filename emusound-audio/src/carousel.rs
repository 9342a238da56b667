/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Audio frames hand-off between the emulation and the audio backend threads.
//!
//! Sound devices and the mixer live entirely in the emulation thread. Only the finished frames
//! of the host sample format cross the thread boundary: a fixed set of frame buffers circulates
//! between the [AudioFrameProducer] and the [AudioFrameConsumer] over two bounded channels, so
//! no allocation nor locking takes place in the audio callback.
use core::fmt;
use core::mem::{replace, swap};
use std::error;
use std::sync::mpsc::{sync_channel, SyncSender, Receiver, SendError, RecvError, TryRecvError};

use emusound_core::audio::AudioSample;

pub type AudioFrameResult<T> = Result<T, AudioFrameError>;

/// Returned when the other end of the carousel has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFrameError;

impl fmt::Display for AudioFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the remote thread has been terminated")
    }
}

impl error::Error for AudioFrameError {}

impl<T> From<SendError<T>> for AudioFrameError {
    fn from(_error: SendError<T>) -> Self {
        AudioFrameError
    }
}

impl From<RecvError> for AudioFrameError {
    fn from(_error: RecvError) -> Self {
        AudioFrameError
    }
}

/// The emulation side of the carousel.
#[derive(Debug)]
pub struct AudioFrameProducer<T> {
    /// The frame being currently rendered, channel-interleaved.
    pub buffer: Vec<T>,
    rx: Receiver<Vec<T>>,
    consumer_tx: SyncSender<Vec<T>>,
}

/// The audio backend side of the carousel.
#[derive(Debug)]
pub struct AudioFrameConsumer<T> {
    buffer: Vec<T>,
    cursor: usize,
    producer_tx: SyncSender<Vec<T>>,
    rx: Receiver<Vec<T>>,
}

/// Creates an interconnected pair of a producer and a consumer.
///
/// * `latency` is the number of frames in circulation besides the one being rendered.
/// * `frame_samples` and `channels` determine the initial size of each frame buffer.
///
/// The consumer starts with `latency` silent frames queued, so playback may start immediately.
pub fn create_carousel<T>(latency: usize, frame_samples: usize, channels: u8) ->
                                (AudioFrameProducer<T>, AudioFrameConsumer<T>)
    where T: AudioSample
{
    let latency = latency.max(1);
    let frame = vec![T::silence(); frame_samples * channels as usize];
    let (producer_tx, producer_rx) = sync_channel::<Vec<T>>(latency + 1);
    let (consumer_tx, consumer_rx) = sync_channel::<Vec<T>>(latency + 1);
    for _ in 1..latency {
        // infallible, the channel capacity exceeds the number of frames and both ends are alive
        let _ = consumer_tx.send(frame.clone());
    }
    let _ = producer_tx.send(frame.clone());
    let producer = AudioFrameProducer { buffer: frame.clone(), rx: producer_rx, consumer_tx };
    let consumer = AudioFrameConsumer { buffer: frame, cursor: 0, producer_tx, rx: consumer_rx };
    (producer, consumer)
}

impl<T> AudioFrameProducer<T> {
    /// Gives access to the current frame buffer for rendering.
    pub fn render_frame<F: FnOnce(&mut Vec<T>)>(&mut self, render: F) {
        render(&mut self.buffer)
    }
    /// Sends the current frame to the consumer and waits for a recycled buffer.
    ///
    /// Returns an error if the consumer has been dropped.
    pub fn send_frame(&mut self) -> AudioFrameResult<()> {
        let buffer = replace(&mut self.buffer, self.rx.recv()?);
        self.consumer_tx.send(buffer).map_err(From::from)
    }
}

impl<T: Copy> AudioFrameConsumer<T> {
    /// Exposes the current frame as a slice.
    #[inline]
    pub fn current_frame(&self) -> &[T] {
        &self.buffer
    }
    /// Replaces the current frame with the next one if it's already available.
    ///
    /// Returns `Ok(false)` if no frame is waiting.
    pub fn next_frame(&mut self) -> AudioFrameResult<bool> {
        match self.rx.try_recv() {
            Ok(mut buffer) => {
                swap(&mut self.buffer, &mut buffer);
                self.producer_tx.send(buffer)?;
                self.cursor = 0;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(AudioFrameError),
        }
    }
    /// Fills `target` with the received frames without blocking.
    ///
    /// Returns the part of `target` left unfilled because there were no more frames waiting.
    /// If `ignore_missing` is `true` the last frame is repeated instead and the returned
    /// slice is always empty.
    pub fn fill_buffer<'a>(&mut self, mut target: &'a mut [T], ignore_missing: bool) -> AudioFrameResult<&'a mut [T]> {
        while !target.is_empty() {
            if self.cursor >= self.buffer.len() {
                if !self.next_frame()? {
                    if !ignore_missing || self.buffer.is_empty() {
                        break
                    }
                    self.cursor = 0;
                }
                continue
            }
            let source = &self.buffer[self.cursor..];
            let size = source.len().min(target.len());
            target[..size].copy_from_slice(&source[..size]);
            self.cursor += size;
            target = &mut target[size..];
        }
        Ok(target)
    }
}
