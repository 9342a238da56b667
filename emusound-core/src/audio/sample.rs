/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Various traits for types being used as audio samples and PCM decoding helpers.

/// Provides various methods to primitive types being used as audio samples.
pub trait AudioSample: Copy + Send + Default + 'static {
    /// Creates a silent sample value (with zero amplitude). Useful for filling buffers.
    #[inline(always)]
    fn silence() -> Self {
        Self::default()
    }
    fn max_pos_amplitude() -> Self;
    fn max_neg_amplitude() -> Self;
}

/// For converting samples between types.
pub trait FromSample<S> {
    /// Converts to Self a sample from the `other`.
    fn from_sample(other: S) -> Self;
}

/// For converting samples between types.
pub trait IntoSample<S> {
    /// Convert to `S` a sample type from `self`.
    fn into_sample(self) -> S;
}

impl<S: FromSample<T>, T> IntoSample<S> for T {
    #[inline]
    fn into_sample(self) -> S {
        S::from_sample(self)
    }
}

impl<T: AudioSample> FromSample<T> for T {
    #[inline(always)]
    fn from_sample(other: T) -> T {
        other
    }
}

macro_rules! impl_audio_sample_signed {
    ($($ty:ty),*) => {$(
        impl AudioSample for $ty {
            #[inline(always)] fn max_pos_amplitude() -> Self { <$ty>::MAX }
            #[inline(always)] fn max_neg_amplitude() -> Self { <$ty>::MIN }
        }
    )*};
}

macro_rules! impl_audio_sample_unsigned {
    ($($ty:ty),*) => {$(
        impl AudioSample for $ty {
            #[inline(always)]
            fn silence() -> Self {
                1 << (<$ty>::BITS - 1)
            }
            #[inline(always)] fn max_pos_amplitude() -> Self { <$ty>::MAX }
            #[inline(always)] fn max_neg_amplitude() -> Self { 0 }
        }
    )*};
}

impl_audio_sample_signed!(i8, i16, i32);
impl_audio_sample_unsigned!(u8, u16);

impl AudioSample for f32 {
    #[inline(always)] fn max_pos_amplitude() -> Self {  1.0 }
    #[inline(always)] fn max_neg_amplitude() -> Self { -1.0 }
}
impl AudioSample for f64 {
    #[inline(always)] fn max_pos_amplitude() -> Self {  1.0 }
    #[inline(always)] fn max_neg_amplitude() -> Self { -1.0 }
}

/// Mixed 32-bit sums are narrowed to 16 bits with saturation.
impl FromSample<i32> for i16 {
    #[inline]
    fn from_sample(other: i32) -> i16 {
        other.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

impl FromSample<i16> for i32 {
    #[inline]
    fn from_sample(other: i16) -> i32 {
        (other as i32) << 16
    }
}

impl FromSample<i16> for i8 {
    #[inline]
    fn from_sample(other: i16) -> i8 {
        (other >> 8) as i8
    }
}

impl FromSample<i16> for u16 {
    #[inline]
    fn from_sample(other: i16) -> u16 {
        (other as u16) ^ 0x8000
    }
}

impl FromSample<i16> for u8 {
    #[inline]
    fn from_sample(other: i16) -> u8 {
        ((other >> 8) as u8) ^ 0x80
    }
}

macro_rules! impl_float_from_i16 {
    ($($ft:ty),*) => {$(
        impl FromSample<i16> for $ft {
            #[inline]
            fn from_sample(other: i16) -> $ft {
                if other < 0 {
                    other as $ft / -(i16::MIN as $ft)
                } else {
                    other as $ft / i16::MAX as $ft
                }
            }
        }

        impl FromSample<$ft> for i16 {
            #[inline]
            fn from_sample(other: $ft) -> i16 {
                if other >= 0.0 {
                    (other.min(1.0) * i16::MAX as $ft) as i16
                } else {
                    (-other.max(-1.0) * i16::MIN as $ft) as i16
                }
            }
        }
    )*};
}

impl_float_from_i16!(f32, f64);

/// Decodes an unsigned 8-bit PCM sample, with `0x80` as the zero point, into a centered
/// 16-bit sample.
#[inline]
pub fn pcm_u8_to_i16(byte: u8) -> i16 {
    (byte as i16 - 0x80) << 8
}

/// Decodes a signed 16-bit little-endian PCM sample.
#[inline]
pub fn pcm_i16_le(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_u8_is_centered() {
        for (b, s) in vec![(0x80u8, 0i16), (0x00, -32768), (0x40, -16384), (0xFF, 32512), (0x81, 256)] {
            assert_eq!(pcm_u8_to_i16(b), s);
        }
    }

    #[test]
    fn pcm_i16_is_native() {
        assert_eq!(pcm_i16_le(0xFF, 0x7F), 0x7FFF);
        assert_eq!(pcm_i16_le(0x00, 0x80), i16::MIN);
        assert_eq!(pcm_i16_le(0x34, 0x12), 0x1234);
        assert_eq!(pcm_i16_le(0xFF, 0xFF), -1);
    }

    #[test]
    fn i16_from_i32_saturates() {
        for (f, t) in vec![(0i32, 0i16), (1234, 1234), (-40000, -32768), (40000, 32767), (32767, 32767)] {
            assert_eq!(i16::from_sample(f), t);
            assert_eq!(IntoSample::<i16>::into_sample(f), t);
        }
    }

    #[test]
    fn unsigned_from_i16() {
        for (f, t) in vec![(0i16, 32768u16), (1, 32769), (-16384, 16384), (32767, 65535), (-32768, 0)] {
            assert_eq!(u16::from_sample(f), t);
        }
        for (f, t) in vec![(0i16, 128u8), (256, 129), (-32768, 0), (32767, 255)] {
            assert_eq!(u8::from_sample(f), t);
        }
        assert_eq!(u8::silence(), 0x80);
        assert_eq!(u16::silence(), 0x8000);
    }

    #[test]
    fn float_from_i16() {
        for (f, t) in vec![(0i16, 0.0f32), (-16384, -0.5), (32767, 1.0), (-32768, -1.0)] {
            assert_eq!(f32::from_sample(f), t);
            assert_eq!(i16::from_sample(t), f);
        }
        assert_eq!(i16::from_sample(2.0f32), 32767);
        assert_eq!(i16::from_sample(-2.0f64), -32768);
    }

    #[test]
    fn wide_from_i16() {
        assert_eq!(i32::from_sample(-1i16), -65536);
        assert_eq!(i32::from_sample(i16::MAX), 0x7fff_0000);
        assert_eq!(i8::from_sample(i16::MIN), i8::MIN);
    }
}
