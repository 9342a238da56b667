/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Emulated clock timestamp and duration types.
//!
//! All emulated devices share a single main clock. Timestamps are measured in main clock ticks
//! counted from the start of the emulation session. Device clocks (CPU, PSG, VDP) are integer
//! fractions of the main clock, so every device event can be expressed without rounding.
use core::fmt;
use core::ops::{Add, Sub, AddAssign, SubAssign, Mul};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

/// The frequency of the emulated main clock in ticks per second.
pub const MAIN_CLOCK_HZ: u64 = 3_579_545 * 8;

/// A monotonic timestamp of the emulated main clock.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(transparent))]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmuTime(u64);

/// A span of the emulated main clock ticks.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(transparent))]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmuDuration(u64);

impl EmuTime {
    /// The start of the emulation session.
    pub const ZERO: EmuTime = EmuTime(0);

    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        EmuTime(ticks)
    }
    /// Returns the number of main clock ticks since the start of the session.
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }
    /// Returns the duration between `earlier` and `self`, or `None` if `earlier` is later than `self`.
    #[inline]
    pub fn checked_duration_since(self, earlier: EmuTime) -> Option<EmuDuration> {
        self.0.checked_sub(earlier.0).map(EmuDuration)
    }
    /// Returns the duration between `earlier` and `self`, saturating at zero.
    #[inline]
    pub fn saturating_duration_since(self, earlier: EmuTime) -> EmuDuration {
        EmuDuration(self.0.saturating_sub(earlier.0))
    }
}

impl EmuDuration {
    pub const ZERO: EmuDuration = EmuDuration(0);

    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        EmuDuration(ticks)
    }
    /// Returns the duration of a single period of `hz` measured with a clock of `tick_rate` ticks
    /// per second, rounded to the nearest tick.
    ///
    /// The result is never zero as long as `hz` is not `0`.
    ///
    /// # Panics
    /// Panics if `hz` is `0`.
    pub fn from_hz(tick_rate: u64, hz: u32) -> Self {
        assert!(hz != 0, "EmuDuration: frequency must not be 0");
        let hz = u64::from(hz);
        let ticks = (tick_rate + hz / 2) / hz;
        EmuDuration(ticks.max(1))
    }
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
    /// Returns the ratio of `self` to `other` as a real number.
    #[inline]
    pub fn div_duration(self, other: EmuDuration) -> f64 {
        self.0 as f64 / other.0 as f64
    }
    /// Returns how many whole `other` durations fit in `self` together with the remainder.
    ///
    /// # Panics
    /// Panics if `other` is zero.
    #[inline]
    pub fn div_rem(self, other: EmuDuration) -> (u64, EmuDuration) {
        (self.0 / other.0, EmuDuration(self.0 % other.0))
    }
}

impl fmt::Debug for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmuTime({})", self.0)
    }
}

impl fmt::Debug for EmuDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmuDuration({})", self.0)
    }
}

impl fmt::Display for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0 as f64 / MAIN_CLOCK_HZ as f64)
    }
}

/// Saturates at zero, so a timestamp earlier than `rhs` yields an empty duration.
impl Sub for EmuTime {
    type Output = EmuDuration;
    #[inline]
    fn sub(self, rhs: EmuTime) -> EmuDuration {
        self.saturating_duration_since(rhs)
    }
}

impl Add<EmuDuration> for EmuTime {
    type Output = EmuTime;
    #[inline]
    fn add(self, rhs: EmuDuration) -> EmuTime {
        EmuTime(self.0 + rhs.0)
    }
}

impl AddAssign<EmuDuration> for EmuTime {
    #[inline]
    fn add_assign(&mut self, rhs: EmuDuration) {
        self.0 += rhs.0
    }
}

impl Sub<EmuDuration> for EmuTime {
    type Output = EmuTime;
    #[inline]
    fn sub(self, rhs: EmuDuration) -> EmuTime {
        EmuTime(self.0.saturating_sub(rhs.0))
    }
}

impl Add for EmuDuration {
    type Output = EmuDuration;
    #[inline]
    fn add(self, rhs: EmuDuration) -> EmuDuration {
        EmuDuration(self.0 + rhs.0)
    }
}

impl AddAssign for EmuDuration {
    #[inline]
    fn add_assign(&mut self, rhs: EmuDuration) {
        self.0 += rhs.0
    }
}

impl Sub for EmuDuration {
    type Output = EmuDuration;
    #[inline]
    fn sub(self, rhs: EmuDuration) -> EmuDuration {
        EmuDuration(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for EmuDuration {
    #[inline]
    fn sub_assign(&mut self, rhs: EmuDuration) {
        self.0 = self.0.saturating_sub(rhs.0)
    }
}

impl Mul<u64> for EmuDuration {
    type Output = EmuDuration;
    #[inline]
    fn mul(self, rhs: u64) -> EmuDuration {
        EmuDuration(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_arithmetic() {
        let t0 = EmuTime::from_ticks(1000);
        let d = EmuDuration::from_ticks(250);
        let t1 = t0 + d * 4;
        assert_eq!(t1.ticks(), 2000);
        assert_eq!(t1 - t0, EmuDuration::from_ticks(1000));
        assert_eq!(t0 - t1, EmuDuration::ZERO);
        assert_eq!(t0.checked_duration_since(t1), None);
        assert_eq!((t1 - t0).div_duration(d), 4.0);
        assert_eq!(EmuDuration::from_ticks(1001).div_rem(d), (4, EmuDuration::from_ticks(1)));
        assert!(t0 < t1);
        let mut t = t0;
        t += d;
        assert_eq!(t, t0 + d);
        assert_eq!(t - d, t0);
    }

    #[test]
    fn duration_from_hz() {
        assert_eq!(EmuDuration::from_hz(MAIN_CLOCK_HZ, 44100).ticks(), 649);
        assert_eq!(EmuDuration::from_hz(1000, 1000).ticks(), 1);
        assert_eq!(EmuDuration::from_hz(1000, 3000).ticks(), 1);
        assert_eq!(EmuDuration::from_hz(1000, 3).ticks(), 333);
        assert_eq!(EmuDuration::from_hz(1000, 6).ticks(), 167);
    }

    #[cfg(feature = "snapshot")]
    #[test]
    fn time_serde() {
        let t = EmuTime::from_ticks(123456789);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "123456789");
        let t1: EmuTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, t1);
    }
}
