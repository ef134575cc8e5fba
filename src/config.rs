// SPDX: CC0-1.0

use crate::{color::to_hex, Complex, Number, Point};
use core::{fmt, num::NonZeroU32, str::FromStr};
use image::Rgb;
use thiserror::Error;

pub const DEFAULT_ITERATIONS: NonZeroU32 = nonzero(20);
pub const DEFAULT_SIDE: NonZeroU32 = nonzero(400);
pub const DEFAULT_ANOMALY_THRESHOLD: usize = 256;
pub const DEFAULT_DIVERGENCE_THRESHOLD: Number = 2.0;
/// Largest accepted image width or height.
pub const MAX_SIDE: u32 = 8192;

const fn nonzero(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(n) {
        Some(n) => n,
        None => panic!("zero passed to nonzero"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The varying coordinate seeds `C` (and `Z`, see [`MandelbrotSeed`]).
    Mandelbrot,
    /// `C` is the configured seed, the varying coordinate seeds `Z`.
    Julia,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MandelbrotSeed {
    /// `Z` starts at `C`
    Coordinate,
    /// `Z` starts at `0`
    Zero,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected one of: {expected}")]
pub struct ParseChoiceErr {
    expected: &'static str,
}

impl ParseChoiceErr {
    pub(crate) const fn new(expected: &'static str) -> Self {
        Self { expected }
    }
}

impl FromStr for Mode {
    type Err = ParseChoiceErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mandelbrot" | "m" => Ok(Self::Mandelbrot),
            "julia" | "j" => Ok(Self::Julia),
            _ => Err(ParseChoiceErr::new("mandelbrot, julia")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandelbrot => write!(f, "mandelbrot"),
            Self::Julia => write!(f, "julia"),
        }
    }
}

/// Image width or height, `1..=MAX_SIDE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Side(pub NonZeroU32);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected an integer from 1 to {MAX_SIDE}")]
pub struct ParseSideErr;

impl FromStr for Side {
    type Err = ParseSideErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<NonZeroU32>() {
            Ok(n) if n.get() <= MAX_SIDE => Ok(Self(n)),
            _ => Err(ParseSideErr),
        }
    }
}

impl FromStr for MandelbrotSeed {
    type Err = ParseChoiceErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coordinate" | "c" => Ok(Self::Coordinate),
            "zero" | "0" => Ok(Self::Zero),
            _ => Err(ParseChoiceErr::new("coordinate, zero")),
        }
    }
}

impl fmt::Display for MandelbrotSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinate => write!(f, "coordinate"),
            Self::Zero => write!(f, "zero"),
        }
    }
}

/// Affine window of the complex plane covered by the pixel grid.
///
/// Pixel column `0` maps to the left edge and pixel row `0` to the top edge,
/// so the imaginary axis grows upward while rows grow downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub center: Complex,
    /// width and height of the window in plane units
    pub span: Point<Number>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Complex::new(-0.5, 0.0),
            span: Point { x: 4.0, y: 4.0 },
        }
    }
}

impl Viewport {
    pub fn to_plane(&self, pixel: Point<u32>, size: Point<NonZeroU32>) -> Complex {
        let fx = Number::from(pixel.x) / Number::from(size.x.get());
        let fy = Number::from(pixel.y) / Number::from(size.y.get());
        Complex::new(
            self.center.real + (fx - 0.5) * self.span.x,
            self.center.imag + (0.5 - fy) * self.span.y,
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub iterations: NonZeroU32,
    pub mode: Mode,
    pub julia_seed: Complex,
    pub mandelbrot_seed: MandelbrotSeed,
    pub divergence_threshold: Number,
    pub anomaly_guard: bool,
    pub anomaly_threshold: usize,
    pub size: Point<NonZeroU32>,
    pub viewport: Viewport,
    pub inside_color: Rgb<u8>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            mode: Mode::Mandelbrot,
            julia_seed: Complex::new(-0.8, 0.156),
            mandelbrot_seed: MandelbrotSeed::Coordinate,
            divergence_threshold: DEFAULT_DIVERGENCE_THRESHOLD,
            anomaly_guard: true,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            size: Point {
                x: DEFAULT_SIDE,
                y: DEFAULT_SIDE,
            },
            viewport: Viewport::default(),
            inside_color: Rgb([0xff, 0xff, 0xff]),
        }
    }
}

impl fmt::Display for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("iterations", &self.iterations)
            .field("mode", &format_args!("{}", self.mode))
            .field("julia seed", &format_args!("{:#}", self.julia_seed))
            .field("mandelbrot seed", &format_args!("{}", self.mandelbrot_seed))
            .field("divergence threshold", &self.divergence_threshold)
            .field("anomaly guard", &self.anomaly_guard)
            .field("anomaly threshold", &self.anomaly_threshold)
            .field("width", &self.size.x)
            .field("height", &self.size.y)
            .field("center", &format_args!("{:#}", self.viewport.center))
            .field("span", &(self.viewport.span.x, self.viewport.span.y))
            .field("inside color", &format_args!("{}", to_hex(self.inside_color)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(x: u32, y: u32) -> Point<NonZeroU32> {
        Point {
            x: NonZeroU32::new(x).unwrap(),
            y: NonZeroU32::new(y).unwrap(),
        }
    }

    #[test]
    fn viewport_corners_and_center() {
        let vp = Viewport {
            center: Complex::ZERO,
            span: Point { x: 4.0, y: 4.0 },
        };
        let sz = size(100, 50);
        assert_eq!(vp.to_plane(Point { x: 0, y: 0 }, sz), Complex::new(-2.0, 2.0));
        assert_eq!(vp.to_plane(Point { x: 50, y: 25 }, sz), Complex::ZERO);
        assert_eq!(vp.to_plane(Point { x: 100, y: 50 }, sz), Complex::new(2.0, -2.0));
    }

    #[test]
    fn default_viewport_is_shifted_left() {
        let vp = Viewport::default();
        let p = vp.to_plane(Point { x: 200, y: 200 }, size(400, 400));
        assert_eq!(p, Complex::new(-0.5, 0.0));
    }

    #[test]
    fn parse_choices() {
        assert_eq!("julia".parse::<Mode>(), Ok(Mode::Julia));
        assert_eq!("m".parse::<Mode>(), Ok(Mode::Mandelbrot));
        assert!("burning ship".parse::<Mode>().is_err());
        assert_eq!("zero".parse::<MandelbrotSeed>(), Ok(MandelbrotSeed::Zero));
    }

    #[test]
    fn image_sides_are_bounded() {
        assert_eq!("400".parse::<Side>(), Ok(Side(size(400, 1).x)));
        assert_eq!("8192".parse::<Side>().map(|s| s.0.get()), Ok(MAX_SIDE));
        assert_eq!("8193".parse::<Side>(), Err(ParseSideErr));
        assert_eq!("100000".parse::<Side>(), Err(ParseSideErr));
        assert_eq!("0".parse::<Side>(), Err(ParseSideErr));
        assert_eq!("-3".parse::<Side>(), Err(ParseSideErr));
    }
}
