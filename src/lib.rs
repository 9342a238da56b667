/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    EMUSOUND is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    EMUSOUND is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! # EMUSOUND
//!
//! A library for rendering the audio of emulated home computers with time accuracy.
//!
//! Emulated devices produce sparse register writes at arbitrary moments of the emulated clock.
//! The components of this library turn them into a continuous, alias-free PCM stream at the host
//! sample rate:
//!
//! * [DacVoice][audio::dac::DacVoice] queues timed DAC writes and reconstructs the signal with
//!   band-limited steps,
//! * [SamplePlayer][audio::player::SamplePlayer] plays back pre-recorded PCM samples,
//! * [Mixer][audio::mixer::Mixer] pulls fixed windows of audio from every
//!   [SoundDevice][audio::SoundDevice] and sums them.
//!
//! ```
//! use emusound::audio::{SoundDevice, DacVoice, Mixer, MixerConfig};
//! use emusound::clock::{EmuTime, EmuDuration};
//!
//! let config = MixerConfig::default();
//! let mut mixer = Mixer::new(&config).unwrap();
//! let mut dac: DacVoice = DacVoice::new("dac", config.sample_rate);
//! dac.reset(EmuTime::ZERO);
//! dac.write(8000, EmuTime::from_ticks(10_000));
//! dac.write(-8000, EmuTime::from_ticks(20_000));
//!
//! let mut mixed = Vec::new();
//! let until = EmuTime::from_ticks(100_000);
//! let count = mixer.mix(&mut [&mut dac], until, &mut mixed);
//! assert_eq!(count, mixed.len());
//! assert_eq!(dac.last_value(), -8000);
//! ```
pub use emusound_core::clock;
pub use emusound_core::error;

/// Audio API and sound devices.
pub mod audio {
    pub use emusound_core::audio::*;
    pub use emusound_audio::*;
}
