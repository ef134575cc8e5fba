// SPDX: CC0-1.0

use core::num::NonZeroU32;
use escape_field::{
    escape::{self, PixelClassification},
    formula::{CompileError, FormulaCompiler},
    render::{RenderSession, StatusEvent},
    Complex, Formula, FormulaResult, Point, RenderConfig,
};
use image::RgbImage;

fn render(source: &str) -> RgbImage {
    let formula = FormulaCompiler::default().compile(source).unwrap();
    let config = RenderConfig {
        size: Point {
            x: NonZeroU32::new(24).unwrap(),
            y: NonZeroU32::new(24).unwrap(),
        },
        ..RenderConfig::default()
    };
    let mut img = RgbImage::new(24, 24);
    RenderSession::new(&formula, &config).run(&mut img, &mut Vec::<StatusEvent>::new());
    img
}

#[test]
fn spellings_of_the_quadratic_map_agree() {
    let reference = render("Z*Z + C");
    assert_eq!(render("C + Z * Z"), reference);
    assert_eq!(render("(Z*Z) + +C"), reference);
    // both go through the polar form
    assert_eq!(render("pow(Z, 2) + C"), render("Z^2 + C"));
}

#[test]
fn interpreter_matches_native_closure() {
    let compiled = FormulaCompiler::default().compile("Z*Z*Z + C").unwrap();
    let native = |z: Complex, c: Complex| FormulaResult::Value(z * z * z + c);
    let config = RenderConfig::default();
    for (re, im) in [(0.0, 0.0), (0.3, -0.2), (-1.0, 0.5), (1.5, 1.5)] {
        let c = Complex::new(re, im);
        assert_eq!(
            escape::evaluate_point(c, &config, &compiled),
            escape::evaluate_point(c, &config, &native)
        );
    }
}

#[test]
fn canary_rejections() {
    let compiler = FormulaCompiler::default();
    for source in ["", "Z +", "Z ** 2", "abs(Z", "sin(Z)", "Z.pow(2)", "window"] {
        assert!(
            compiler.compile(source).is_err(),
            "{source:?} should not compile"
        );
    }
    assert!(matches!(
        compiler.compile("sin(C)"),
        Err(CompileError::Eval(_))
    ));
    // real results only fail once rendered
    assert!(compiler.compile("1").is_ok());
    assert!(compiler.compile("re(Z)").is_ok());
}

#[test]
fn formula_results_flow_through_evaluation() {
    let config = RenderConfig::default();
    let formula = FormulaCompiler::default()
        .compile("constant(re(Z) * re(Z) - im(Z) * im(Z), 2 * re(Z) * im(Z)) + C")
        .unwrap();
    assert_eq!(
        formula.call(Complex::new(1.0, 2.0), Complex::ONE),
        FormulaResult::Value(Complex::new(-2.0, 4.0))
    );
    assert_eq!(
        escape::evaluate_point(Complex::ZERO, &config, &formula),
        PixelClassification::Bounded
    );
}
