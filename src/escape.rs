// SPDX: CC0-1.0

use crate::{
    config::{MandelbrotSeed, Mode, RenderConfig},
    formula::{Formula, FormulaResult},
    Complex, Point,
};
use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FatalReason {
    /// the formula produced a value that is not a complex number
    InvalidType,
    /// the formula failed while evaluating
    EvaluationError(String),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidType => write!(f, "formula did not produce a complex number"),
            Self::EvaluationError(msg) => write!(f, "formula failed: {msg}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PixelClassification {
    /// never exceeded the divergence threshold within the iteration budget
    Bounded,
    /// exceeded the threshold at this (zero-based) step
    Diverged(u32),
    /// a component became NaN
    Anomalous,
    /// the whole render has to stop
    Fatal(FatalReason),
}

/// Starting `(Z, C)` for a plane coordinate.
pub fn seed(point: Complex, config: &RenderConfig) -> (Complex, Complex) {
    match config.mode {
        Mode::Mandelbrot => {
            let z = match config.mandelbrot_seed {
                MandelbrotSeed::Coordinate => point,
                MandelbrotSeed::Zero => Complex::ZERO,
            };
            (z, point)
        }
        Mode::Julia => (point, config.julia_seed),
    }
}

pub fn evaluate<F>(pixel: Point<u32>, config: &RenderConfig, formula: &F) -> PixelClassification
where
    F: Formula + ?Sized,
{
    let point = config.viewport.to_plane(pixel, config.size);
    evaluate_point(point, config, formula)
}

/// Iterates `formula` from the seeds of a plane coordinate.
pub fn evaluate_point<F>(point: Complex, config: &RenderConfig, formula: &F) -> PixelClassification
where
    F: Formula + ?Sized,
{
    let (mut z, c) = seed(point, config);
    for step in 0..config.iterations.get() {
        z = match formula.call(z, c) {
            FormulaResult::Value(z) => z,
            FormulaResult::InvalidType => {
                return PixelClassification::Fatal(FatalReason::InvalidType)
            }
            FormulaResult::EvaluationError(msg) => {
                return PixelClassification::Fatal(FatalReason::EvaluationError(msg))
            }
        };
        if z.is_nan() {
            return PixelClassification::Anomalous;
        }
        if z.magnitude() > config.divergence_threshold {
            return PixelClassification::Diverged(step);
        }
    }
    PixelClassification::Bounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn mandelbrot() -> crate::CompiledFormula {
        FormulaCompiler::default().compile("Z*Z + C").unwrap()
    }

    #[test]
    fn origin_is_bounded_far_point_diverges() {
        let f = mandelbrot();
        let config = RenderConfig::default();
        assert_eq!(
            evaluate_point(Complex::ZERO, &config, &f),
            PixelClassification::Bounded
        );
        match evaluate_point(Complex::new(2.0, 2.0), &config, &f) {
            PixelClassification::Diverged(step) => assert!(step < 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn seeding_rules() {
        let mut config = RenderConfig::default();
        let p = Complex::new(0.25, -0.5);
        assert_eq!(seed(p, &config), (p, p));
        config.mandelbrot_seed = MandelbrotSeed::Zero;
        assert_eq!(seed(p, &config), (Complex::ZERO, p));
        config.mode = Mode::Julia;
        assert_eq!(seed(p, &config), (p, config.julia_seed));
    }

    #[test]
    fn threshold_is_configurable() {
        let f = mandelbrot();
        let mut config = RenderConfig::default();
        // |1.5| escapes threshold 1 on the first step (1.5^2 + 1.5 = 3.75)
        let p = Complex::new(1.5, 0.0);
        config.divergence_threshold = 1.0;
        assert_eq!(evaluate_point(p, &config, &f), PixelClassification::Diverged(0));
        config.divergence_threshold = 1e6;
        assert!(matches!(
            evaluate_point(p, &config, &f),
            PixelClassification::Diverged(step) if step > 0
        ));
    }

    #[test]
    fn nan_is_anomalous() {
        let f = |_: Complex, _: Complex| FormulaResult::Value(Complex::new(f64::NAN, 0.0));
        assert_eq!(
            evaluate_point(Complex::ZERO, &RenderConfig::default(), &f),
            PixelClassification::Anomalous
        );
        // 0/0 under the default policy
        let f = FormulaCompiler::default().compile("Z / Z").unwrap();
        assert_eq!(
            evaluate_point(Complex::ZERO, &RenderConfig::default(), &f),
            PixelClassification::Anomalous
        );
    }

    #[test]
    fn wrong_type_is_fatal() {
        let f = |_: Complex, _: Complex| FormulaResult::InvalidType;
        assert_eq!(
            evaluate_point(Complex::ZERO, &RenderConfig::default(), &f),
            PixelClassification::Fatal(FatalReason::InvalidType)
        );
    }

    #[test]
    fn deterministic() {
        let f = mandelbrot();
        let config = RenderConfig::default();
        let pixel = Point { x: 123, y: 321 };
        let first = evaluate(pixel, &config, &f);
        for _ in 0..3 {
            assert_eq!(evaluate(pixel, &config, &f), first);
        }
    }
}
