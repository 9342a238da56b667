/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A mixer pulling audio from sound devices.
//!
//! The devices are owned by the emulated machine, which needs them to receive register writes.
//! The mixer only keeps the per-channel settings and the time of the next sample to be rendered,
//! and borrows the devices for the duration of a [Mixer::mix] call.
//!
//! Every device is polled over the same window of the emulated time, so all devices are advanced
//! in lockstep, including the muted ones.
//!
//! A host sample rarely spans a whole number of clock ticks, so sample boundaries are not
//! accumulated from a rounded duration. The mixer counts the samples rendered since its anchor
//! and derives the start of the sample `n` as `anchor + n * MAIN_CLOCK_HZ / sample_rate`
//! (rounded down), thus exactly `sample_rate` samples are rendered per emulated second.
#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use emusound_core::{
    audio::{SoundDevice, FromSample},
    clock::{EmuTime, EmuDuration, MAIN_CLOCK_HZ},
    error::SoundResult
};
use crate::config::MixerConfig;
use crate::player::VOLUME_UNITY;

/// Per device mixing settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Q15 fixed-point volume.
    pub volume: i32,
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        ChannelSettings { volume: VOLUME_UNITY, muted: false }
    }
}

/// Sums audio of several [SoundDevice]s into a single 32-bit sample stream.
#[derive(Debug)]
pub struct Mixer {
    channels: Vec<ChannelSettings>,
    sample_rate: u32,
    sample_duration: EmuDuration,
    master_volume: i32,
    anchor: EmuTime,
    rendered: u64,
    scratch: Vec<i32>,
}

fn volume_to_q15(level: f32) -> i32 {
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    (level * VOLUME_UNITY as f32).round() as i32
}

/// Returns the number of ticks from the anchor to the start of the sample `n`.
#[inline]
fn sample_offset(n: u64, sample_rate: u32) -> u64 {
    (u128::from(n) * u128::from(MAIN_CLOCK_HZ) / u128::from(sample_rate)) as u64
}

/// Returns the number of samples that end at or before `ticks` from the anchor.
#[inline]
fn samples_within(ticks: u64, sample_rate: u32) -> u64 {
    (u128::from(ticks) * u128::from(sample_rate) / u128::from(MAIN_CLOCK_HZ)) as u64
}

#[inline]
fn scale(sample: i32, volume: i32) -> i32 {
    ((sample as i64 * volume as i64) >> 15) as i32
}

impl Mixer {
    /// Creates a new mixer from the validated `config`.
    pub fn new(config: &MixerConfig) -> SoundResult<Self> {
        config.validate()?;
        Ok(Mixer {
            channels: Vec::new(),
            sample_rate: config.sample_rate,
            sample_duration: EmuDuration::from_hz(MAIN_CLOCK_HZ, config.sample_rate),
            master_volume: volume_to_q15(config.master_volume),
            anchor: EmuTime::ZERO,
            rendered: 0,
            scratch: Vec::with_capacity(config.frame_samples),
        })
    }
    /// Anchors the start of the next rendered sample at `time`.
    pub fn reset(&mut self, time: EmuTime) {
        self.anchor = time;
        self.rendered = 0;
    }
    /// Returns the time of the next sample to be rendered.
    #[inline]
    pub fn time(&self) -> EmuTime {
        self.sample_time(self.rendered)
    }

    fn sample_time(&self, n: u64) -> EmuTime {
        self.anchor + EmuDuration::from_ticks(sample_offset(n, self.sample_rate))
    }
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    /// Returns the nominal duration of a single output sample, rounded to the nearest tick.
    #[inline]
    pub fn sample_duration(&self) -> EmuDuration {
        self.sample_duration
    }
    /// Changes the host sample rate and propagates it to `devices`.
    ///
    /// A `sample_rate` of `0` or above [MAIN_CLOCK_HZ] is ignored.
    pub fn set_output_rate(&mut self, sample_rate: u32, devices: &mut [&mut dyn SoundDevice]) {
        if sample_rate == 0 || u64::from(sample_rate) > MAIN_CLOCK_HZ {
            warn!("mixer: ignoring output rate {}", sample_rate);
            return
        }
        debug!("mixer: output rate {} -> {}", self.sample_rate, sample_rate);
        let time = self.time();
        self.reset(time);
        self.sample_rate = sample_rate;
        self.sample_duration = EmuDuration::from_hz(MAIN_CLOCK_HZ, sample_rate);
        for device in devices.iter_mut() {
            device.set_output_rate(sample_rate);
        }
    }
    /// Returns the settings of the device at `index` in the slice passed to [Mixer::mix].
    pub fn channel(&self, index: usize) -> ChannelSettings {
        self.channels.get(index).copied().unwrap_or_default()
    }
    /// Sets the volume of the device at `index`, `level` is clamped to the range `[0.0, 1.0]`.
    pub fn set_channel_volume(&mut self, index: usize, level: f32) {
        self.channel_mut(index).volume = volume_to_q15(level);
    }
    /// Mutes or unmutes the device at `index`.
    pub fn set_channel_muted(&mut self, index: usize, muted: bool) {
        self.channel_mut(index).muted = muted;
    }
    /// Sets the master volume, `level` is clamped to the range `[0.0, 1.0]`.
    pub fn set_master_volume(&mut self, level: f32) {
        self.master_volume = volume_to_q15(level);
    }

    fn channel_mut(&mut self, index: usize) -> &mut ChannelSettings {
        if self.channels.len() <= index {
            self.channels.resize(index + 1, ChannelSettings::default());
        }
        &mut self.channels[index]
    }
    /// Renders all the samples that end at or before `until`, replacing the content of `output`.
    ///
    /// Returns the number of rendered samples.
    pub fn mix(&mut self, devices: &mut [&mut dyn SoundDevice], until: EmuTime, output: &mut Vec<i32>) -> usize {
        let ticks = until.saturating_duration_since(self.anchor).ticks();
        let count = samples_within(ticks, self.sample_rate).saturating_sub(self.rendered) as usize;
        self.mix_samples(devices, count, output);
        count
    }
    /// Renders exactly `count` samples, replacing the content of `output`.
    ///
    /// The window is passed to the devices in at most two runs of a uniform whole-tick sample
    /// duration: the first `ticks % count` samples are one tick longer than the rest, so the
    /// window ends exactly where the next one starts.
    pub fn mix_samples(&mut self, devices: &mut [&mut dyn SoundDevice], count: usize, output: &mut Vec<i32>) {
        output.clear();
        output.resize(count, 0);
        if count == 0 {
            return
        }
        let start = self.time();
        let end = self.sample_time(self.rendered + count as u64);
        let (short, long) = (end - start).div_rem(EmuDuration::from_ticks(count as u64));
        let short = EmuDuration::from_ticks(short);
        let long_count = long.ticks() as usize;
        let long = short + EmuDuration::from_ticks(1);
        let split = start + long * long_count as u64;
        let scratch = &mut self.scratch;
        scratch.resize(count, 0);
        for (index, device) in devices.iter_mut().enumerate() {
            let ChannelSettings { volume, muted } = self.channels.get(index).copied().unwrap_or_default();
            let (head, tail) = scratch.split_at_mut(long_count);
            let mut audible = false;
            if !head.is_empty() {
                audible |= device.update_buffer(head, start, long);
            }
            if !tail.is_empty() {
                audible |= device.update_buffer(tail, split, short);
            }
            if !audible || muted {
                continue
            }
            for (p, &sample) in output.iter_mut().zip(scratch.iter()) {
                *p = p.saturating_add(scale(sample, volume));
            }
        }
        if self.master_volume != VOLUME_UNITY {
            for p in output.iter_mut() {
                *p = scale(*p, self.master_volume);
            }
        }
        trace!("mixer: {} samples from {:?} to {:?}", count, start, end);
        self.rendered += count as u64;
    }
}

/// Converts mixed samples into a channel-interleaved buffer of the host sample format.
///
/// Each mixed sample is saturated to 16 bits and copied to every output channel.
///
/// Returns the number of frames written, limited by the size of both buffers.
pub fn render_interleaved<S>(mixed: &[i32], output: &mut [S], channels: usize) -> usize
    where S: FromSample<i16> + Copy
{
    let channels = channels.max(1);
    let mut frames = 0;
    for (chans, &sample) in output.chunks_exact_mut(channels).zip(mixed.iter()) {
        chans.fill(S::from_sample(i16::from_sample(sample)));
        frames += 1;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(i32, u32);

    impl SoundDevice for Constant {
        fn name(&self) -> &str {
            "constant"
        }
        fn set_output_rate(&mut self, sample_rate: u32) {
            self.1 = sample_rate;
        }
        fn update_buffer(&mut self, buffer: &mut [i32], _start: EmuTime, _sample_duration: EmuDuration) -> bool {
            buffer.iter_mut().for_each(|p| *p = self.0);
            self.0 != 0
        }
    }

    /// Records the windows it has been asked to render.
    #[derive(Default)]
    struct Recorder(Vec<(EmuTime, EmuDuration, usize)>);

    impl SoundDevice for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn set_output_rate(&mut self, _sample_rate: u32) {}
        fn update_buffer(&mut self, buffer: &mut [i32], start: EmuTime, sample_duration: EmuDuration) -> bool {
            self.0.push((start, sample_duration, buffer.len()));
            buffer.iter_mut().for_each(|p| *p = 0);
            false
        }
    }

    #[test]
    fn mixes_devices() {
        let mut mixer = Mixer::new(&MixerConfig::default()).unwrap();
        let mut a = Constant(1000, 0);
        let mut b = Constant(-300, 0);
        let mut out = Vec::new();
        // the 10th sample ends at 10 * 28636360 / 44100 = 6493.5 ticks
        let until = EmuTime::from_ticks(6494);
        let count = mixer.mix(&mut [&mut a, &mut b], until, &mut out);
        assert_eq!(count, 10);
        assert_eq!(out, vec![700; 10]);
        assert_eq!(mixer.time(), EmuTime::from_ticks(6493));
        let count = mixer.mix(&mut [&mut a, &mut b], until, &mut out);
        assert_eq!(count, 0);
        assert!(out.is_empty());
        let count = mixer.mix(&mut [&mut a, &mut b], EmuTime::from_ticks(6493), &mut out);
        assert_eq!(count, 0);
    }

    #[test]
    fn emulated_second_yields_sample_rate_samples() {
        for &rate in &[44100u32, 48000, 22050, 96000, 11025] {
            let mut mixer = Mixer::new(&MixerConfig { sample_rate: rate, ..Default::default() }).unwrap();
            let mut a = Constant(1, 0);
            let mut out = Vec::new();
            let anchor = EmuTime::from_ticks(12345);
            mixer.reset(anchor);
            let one_second = EmuDuration::from_ticks(MAIN_CLOCK_HZ);
            assert_eq!(mixer.mix(&mut [&mut a], anchor + one_second, &mut out), rate as usize);
            assert_eq!(mixer.time(), anchor + one_second);
            // the same second rendered in video frames
            let mut total = 0;
            for frame in 1..=60u64 {
                let until = anchor + one_second + EmuDuration::from_ticks(MAIN_CLOCK_HZ * frame / 60);
                total += mixer.mix(&mut [&mut a], until, &mut out);
            }
            assert_eq!(total, rate as usize);
            assert_eq!(mixer.time(), anchor + one_second * 2);
        }
    }

    #[test]
    fn device_windows_are_contiguous() {
        let mut mixer = Mixer::new(&MixerConfig::default()).unwrap();
        let mut rec = Recorder::default();
        let mut out = Vec::new();
        for &count in &[1usize, 7, 882, 883, 100, 44100] {
            mixer.mix_samples(&mut [&mut rec], count, &mut out);
        }
        let mut time = EmuTime::ZERO;
        let mut samples = 0;
        for &(start, duration, len) in rec.0.iter() {
            assert_eq!(start, time);
            assert!(duration.ticks() == 649 || duration.ticks() == 650);
            time = start + duration * len as u64;
            samples += len;
        }
        assert_eq!(time, mixer.time());
        assert_eq!(samples, 1 + 7 + 882 + 883 + 100 + 44100);
        assert_eq!(mixer.time().ticks(), (samples as u64 * MAIN_CLOCK_HZ) / 44100);
    }

    #[test]
    fn rate_change_keeps_time() {
        let mut mixer = Mixer::new(&MixerConfig::default()).unwrap();
        let mut a = Constant(0, 0);
        let mut out = Vec::new();
        mixer.mix_samples(&mut [&mut a], 333, &mut out);
        let time = mixer.time();
        mixer.set_output_rate(48000, &mut [&mut a]);
        assert_eq!(mixer.time(), time);
        let one_second = EmuDuration::from_ticks(MAIN_CLOCK_HZ);
        assert_eq!(mixer.mix(&mut [&mut a], time + one_second, &mut out), 48000);
    }

    #[test]
    fn channel_settings_apply() {
        let mut mixer = Mixer::new(&MixerConfig::default()).unwrap();
        let mut a = Constant(1000, 0);
        let mut b = Constant(30000, 0);
        let mut out = Vec::new();
        mixer.set_channel_volume(0, 0.5);
        mixer.set_channel_muted(1, true);
        mixer.mix_samples(&mut [&mut a, &mut b], 4, &mut out);
        assert_eq!(out, vec![500; 4]);
        assert_eq!(mixer.channel(1), ChannelSettings { volume: VOLUME_UNITY, muted: true });
        mixer.set_channel_muted(1, false);
        mixer.set_master_volume(0.25);
        mixer.mix_samples(&mut [&mut a, &mut b], 2, &mut out);
        assert_eq!(out, vec![(30500 >> 2); 2]);
    }

    #[test]
    fn rate_change_propagates() {
        let mut mixer = Mixer::new(&MixerConfig::default()).unwrap();
        let mut a = Constant(0, 0);
        mixer.set_output_rate(48000, &mut [&mut a]);
        assert_eq!(a.1, 48000);
        assert_eq!(mixer.sample_rate(), 48000);
        assert_eq!(mixer.sample_duration(), EmuDuration::from_hz(MAIN_CLOCK_HZ, 48000));
        mixer.set_output_rate(0, &mut [&mut a]);
        assert_eq!(a.1, 48000);
    }

    #[test]
    fn renders_host_formats() {
        let mixed = [0, 40000, -40000, 16384];
        let mut out = [0i16; 8];
        assert_eq!(render_interleaved(&mixed, &mut out, 2), 4);
        assert_eq!(out, [0, 0, 32767, 32767, -32768, -32768, 16384, 16384]);
        let mut out = [0.0f32; 3];
        assert_eq!(render_interleaved(&mixed, &mut out, 1), 3);
        assert_eq!(out, [0.0, 1.0, -1.0]);
        let mut out = [0u16; 4];
        assert_eq!(render_interleaved(&mixed, &mut out, 1), 4);
        assert_eq!(out, [0x8000, 0xFFFF, 0, 0xC000]);
    }
}
