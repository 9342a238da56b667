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
//! Audio rendering components of the EMUSOUND library.
//!
//! * [synth] - band-limited synthesis of amplitude steps.
//! * [dac] - a DAC voice turning timed register writes into audio.
//! * [player] - a PCM sample player with an exact fixed-ratio resampler.
//! * [mixer] - sums the devices' audio and converts it to the host sample format.
//! * [carousel] - passes mixed audio frames to the audio backend thread.
//! * [host] - native audio playback, requires the `cpal` feature.
pub mod carousel;
pub mod config;
pub mod dac;
pub mod host;
pub mod mixer;
pub mod player;
pub mod synth;

pub use dac::{DacVoice, TimedWrite};
pub use player::SamplePlayer;
pub use mixer::Mixer;
pub use config::MixerConfig;
