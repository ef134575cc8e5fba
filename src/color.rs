// SPDX: CC0-1.0

use crate::escape::PixelClassification;
use core::num::NonZeroU32;
use image::Rgb;
use thiserror::Error;

/// Length of one full sweep through the three bands.
pub const BAND_PERIOD: u32 = 768;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorMapper {
    pub inside: Rgb<u8>,
    pub iterations: NonZeroU32,
}

impl ColorMapper {
    pub const fn new(inside: Rgb<u8>, iterations: NonZeroU32) -> Self {
        Self { inside, iterations }
    }

    /// Color to commit for a pixel, or `None` when nothing should be drawn.
    pub fn color_for(&self, classification: &PixelClassification) -> Option<Rgb<u8>> {
        match classification {
            PixelClassification::Bounded => Some(self.inside),
            PixelClassification::Diverged(step) => Some(bands(self.scale(*step))),
            PixelClassification::Anomalous | PixelClassification::Fatal(_) => None,
        }
    }

    /// `floor(step * 255 / iterations) + 1`
    pub fn scale(&self, step: u32) -> u32 {
        let scaled = u64::from(step) * 255 / u64::from(self.iterations.get());
        // step < iterations keeps this at most 255, but steps are caller-supplied
        u32::try_from(scaled).unwrap_or(u32::MAX).saturating_add(1)
    }
}

/// Splits a scaled divergence value over red, green and blue.
pub fn bands(n: u32) -> Rgb<u8> {
    let n = n % BAND_PERIOD;
    let band = |offset: u32| n.saturating_sub(offset).min(255) as u8;
    Rgb([band(0), band(256), band(512)])
}

pub fn to_hex(Rgb([r, g, b]): Rgb<u8>) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected a color like '#ffffff'")]
pub struct ParseColorErr;

/// Parses `#rrggbb` (the `#` is optional).
pub fn from_hex(s: &str) -> Result<Rgb<u8>, ParseColorErr> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(ParseColorErr);
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorErr);
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::FatalReason;

    fn mapper(iterations: u32) -> ColorMapper {
        ColorMapper::new(Rgb([0xff; 3]), NonZeroU32::new(iterations).unwrap())
    }

    #[test]
    fn bounded_is_inside_color() {
        assert_eq!(
            mapper(20).color_for(&PixelClassification::Bounded),
            Some(Rgb([0xff, 0xff, 0xff]))
        );
    }

    #[test]
    fn anomalous_and_fatal_draw_nothing() {
        let m = mapper(20);
        assert_eq!(m.color_for(&PixelClassification::Anomalous), None);
        assert_eq!(
            m.color_for(&PixelClassification::Fatal(FatalReason::InvalidType)),
            None
        );
    }

    #[test]
    fn scaling() {
        let m = mapper(20);
        assert_eq!(m.scale(0), 1);
        assert_eq!(m.scale(1), 13);
        assert_eq!(m.scale(19), 243);
        assert_eq!(mapper(255).scale(254), 255);
    }

    #[test]
    fn band_layout() {
        assert_eq!(bands(1), Rgb([1, 0, 0]));
        assert_eq!(bands(255), Rgb([255, 0, 0]));
        assert_eq!(bands(256), Rgb([255, 0, 0]));
        assert_eq!(bands(300), Rgb([255, 44, 0]));
        assert_eq!(bands(600), Rgb([255, 255, 88]));
        assert_eq!(bands(767), Rgb([255, 255, 255]));
    }

    #[test]
    fn bands_repeat_every_period() {
        for n in [0, 1, 17, 255, 256, 511, 512, 700, 767] {
            assert_eq!(bands(n), bands(n + BAND_PERIOD));
            assert_eq!(bands(n), bands(n + 3 * BAND_PERIOD));
        }
        assert_eq!(bands(BAND_PERIOD), Rgb([0, 0, 0]));
    }

    #[test]
    fn diverged_color_is_deterministic() {
        let m = mapper(20);
        let a = m.color_for(&PixelClassification::Diverged(7));
        assert_eq!(a, m.color_for(&PixelClassification::Diverged(7)));
        assert_eq!(a, Some(bands(m.scale(7))));
    }

    #[test]
    fn hex() {
        assert_eq!(to_hex(Rgb([0xff, 0x0a, 0x00])), "#ff0a00");
        assert_eq!(from_hex("#ff0a00"), Ok(Rgb([0xff, 0x0a, 0x00])));
        assert_eq!(from_hex("00FF7f"), Ok(Rgb([0x00, 0xff, 0x7f])));
        assert_eq!(from_hex("#fff"), Err(ParseColorErr));
        assert_eq!(from_hex("#gg0000"), Err(ParseColorErr));
    }
}
