// SPDX: CC0-1.0

use crate::{
    eval::{self, EvalErr, Program, Value},
    lex::{Lexer, SubStr},
    parse::{self, ParseErr},
    stdlib::{ArithmeticPolicy, FormulaEnvironment},
    Complex,
};
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of one formula invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum FormulaResult {
    Value(Complex),
    /// the formula produced something other than a complex number
    InvalidType,
    EvaluationError(String),
}

/// An iteration step `(Z, C) -> Z'`.
pub trait Formula {
    fn call(&self, z: Complex, c: Complex) -> FormulaResult;
}

impl<F> Formula for F
where
    F: Fn(Complex, Complex) -> FormulaResult,
{
    fn call(&self, z: Complex, c: Complex) -> FormulaResult {
        self(z, c)
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseErr),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalErr),
}

impl CompileError {
    /// Span of the formula responsible for the error, if there is one.
    pub fn loc(&self) -> Option<&SubStr> {
        match self {
            Self::Parse(err) => Some(&err.loc),
            Self::Eval(err) => err.op.as_ref().map(|op| &op.loc),
        }
    }
}

#[derive(Debug)]
pub struct CompiledFormula {
    source: Arc<String>,
    prog: Program,
    policy: ArithmeticPolicy,
}

impl CompiledFormula {
    pub fn source(&self) -> &Arc<String> {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.prog
    }

    pub const fn policy(&self) -> ArithmeticPolicy {
        self.policy
    }

    pub fn eval(&self, z: Complex, c: Complex, stack: &mut Vec<Value>) -> Result<Value, EvalErr> {
        eval::eval(&self.prog, &[Value::Complex(z), Value::Complex(c)], stack)
    }
}

impl Formula for CompiledFormula {
    fn call(&self, z: Complex, c: Complex) -> FormulaResult {
        let mut stack = Vec::new();
        match self.eval(z, c, &mut stack) {
            Ok(Value::Complex(z)) => FormulaResult::Value(z),
            Ok(Value::Real(_)) => FormulaResult::InvalidType,
            Err(err) => FormulaResult::EvaluationError(err.to_string()),
        }
    }
}

/// Turns formula text into a [`CompiledFormula`] bound to one environment.
#[derive(Clone, Debug, Default)]
pub struct FormulaCompiler {
    env: FormulaEnvironment,
}

impl FormulaCompiler {
    pub fn new(env: FormulaEnvironment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &FormulaEnvironment {
        &self.env
    }

    /// Parses `source`, then runs it once with `Z = C = 0` to catch what only
    /// shows up when evaluating: undefined names and real functions given
    /// complex arguments.
    ///
    /// Arithmetic failures in that run (e.g. `1/Z` under
    /// [`ArithmeticPolicy::Strict`]) depend on the argument values, not on the
    /// formula, and do not reject it. Neither does a real result: that is
    /// reported per call as [`FormulaResult::InvalidType`] and aborts a render.
    pub fn compile(&self, source: impl Into<String>) -> Result<CompiledFormula, CompileError> {
        let source = Arc::new(source.into());
        let prog = parse::parse(Lexer::new(&source), self.env.idents())?;
        let compiled = CompiledFormula {
            source: Arc::clone(&source),
            prog,
            policy: self.env.policy(),
        };

        let mut stack = Vec::new();
        match compiled.eval(Complex::ZERO, Complex::ZERO, &mut stack) {
            Ok(Value::Complex(_)) => {}
            Ok(val) => {
                debug!("canary for {source:?} produced a {}", val.type_name());
            }
            Err(err) if err.is_arithmetic() => {
                debug!("canary for {source:?} hit an arithmetic error: {err}");
            }
            Err(err) => return Err(err.into()),
        }

        debug!(
            "compiled {source:?} into {n} operations",
            n = compiled.prog.ops.len()
        );
        Ok(compiled)
    }
}

/// Holds the active formula. A failed compile never touches it.
#[derive(Debug, Default)]
pub struct FormulaSlot {
    compiler: FormulaCompiler,
    active: Option<Arc<CompiledFormula>>,
}

impl FormulaSlot {
    pub fn new(compiler: FormulaCompiler) -> Self {
        Self {
            compiler,
            active: None,
        }
    }

    pub fn compiler(&self) -> &FormulaCompiler {
        &self.compiler
    }

    /// Snapshot of the active formula; later swaps do not affect it.
    pub fn active(&self) -> Option<Arc<CompiledFormula>> {
        self.active.clone()
    }

    pub fn set_formula(
        &mut self,
        source: impl Into<String>,
    ) -> Result<Arc<CompiledFormula>, CompileError> {
        let compiled = Arc::new(self.compiler.compile(source)?);
        self.active = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Rebuilds the environment with `policy` and recompiles the active
    /// formula against it. On failure both stay as they were.
    pub fn set_policy(&mut self, policy: ArithmeticPolicy) -> Result<(), CompileError> {
        let compiler = FormulaCompiler::new(FormulaEnvironment::new(policy));
        let active = match self.active {
            Some(ref active) => Some(Arc::new(compiler.compile(active.source().as_str())?)),
            None => None,
        };
        self.compiler = compiler;
        self.active = active;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eval::EvalErrTyp, parse::ParseErrTyp};

    fn compile(src: &str) -> Result<CompiledFormula, CompileError> {
        FormulaCompiler::default().compile(src)
    }

    #[test]
    fn mandelbrot_step() {
        let f = compile("Z*Z + C").unwrap();
        assert_eq!(
            f.call(Complex::new(1.0, 1.0), Complex::new(0.5, 0.0)),
            FormulaResult::Value(Complex::new(0.5, 2.0))
        );
    }

    #[test]
    fn method_style_vocabulary() {
        let f = compile("pow(Z, 2) + constant(re(C), im(C)) * conj(constant(0, 1))").unwrap();
        // Z^2 + C * -i
        let z = Complex::new(0.0, 1.0);
        let c = Complex::new(2.0, 0.0);
        match f.call(z, c) {
            FormulaResult::Value(v) => {
                assert!((v.real - -1.0).abs() < 1e-12);
                assert!((v.imag - -2.0).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn real_result_compiles_but_is_invalid() {
        let f = compile("re(Z) + 1").unwrap();
        assert_eq!(f.call(Complex::ONE, Complex::ZERO), FormulaResult::InvalidType);
        let f = compile("1").unwrap();
        assert_eq!(f.call(Complex::ZERO, Complex::ZERO), FormulaResult::InvalidType);
    }

    #[test]
    fn constant_without_imaginary_part() {
        let f = compile("Z*Z + constant(1)").unwrap();
        let g = compile("Z*Z + 1").unwrap();
        let z = Complex::new(0.5, -2.0);
        assert_eq!(f.call(z, Complex::ZERO), g.call(z, Complex::ZERO));
        assert_eq!(
            f.call(Complex::I, Complex::ZERO),
            FormulaResult::Value(Complex::ZERO)
        );
    }

    #[test]
    fn rejects_undefined_names_at_canary() {
        let err = compile("Z*Z + c").unwrap_err();
        match &err {
            CompileError::Eval(EvalErr {
                typ: EvalErrTyp::UndefinedIdent { text },
                ..
            }) => assert_eq!(text.get(), "c"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.loc().map(|loc| loc.start()), Some(6));
    }

    #[test]
    fn rejects_real_function_of_complex() {
        assert!(matches!(compile("sin(Z)"), Err(CompileError::Eval(_))));
        assert!(compile("constant(sin(re(Z)), cos(im(Z)))").is_ok());
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(matches!(
            compile("Z*Z +"),
            Err(CompileError::Parse(ParseErr {
                typ: ParseErrTyp::MissingOperand,
                ..
            }))
        ));
    }

    #[test]
    fn strict_canary_tolerates_arithmetic() {
        let compiler = FormulaCompiler::new(FormulaEnvironment::new(ArithmeticPolicy::Strict));
        let f = compiler.compile("C / Z").unwrap();
        assert!(matches!(
            f.call(Complex::ZERO, Complex::ONE),
            FormulaResult::EvaluationError(_)
        ));
        assert!(matches!(
            f.call(Complex::ONE, Complex::ONE),
            FormulaResult::Value(v) if v == Complex::ONE
        ));
    }

    #[test]
    fn failed_compile_keeps_previous_formula() {
        let mut slot = FormulaSlot::default();
        assert!(slot.active().is_none());
        assert!(slot.set_formula("Z +").is_err());
        assert!(slot.active().is_none());

        slot.set_formula("Z*Z + C").unwrap();
        let before = slot.active().unwrap();
        assert!(slot.set_formula("Z*Z + ").is_err());
        assert!(slot.set_formula("5").is_err());
        let after = slot.active().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.source().as_str(), "Z*Z + C");
    }

    #[test]
    fn snapshot_survives_swap() {
        let mut slot = FormulaSlot::default();
        slot.set_formula("Z*Z + C").unwrap();
        let snapshot = slot.active().unwrap();
        slot.set_formula("Z*Z*Z + C").unwrap();
        assert_eq!(snapshot.source().as_str(), "Z*Z + C");
        assert_eq!(slot.active().unwrap().source().as_str(), "Z*Z*Z + C");
    }

    #[test]
    fn policy_switch_recompiles() {
        let mut slot = FormulaSlot::default();
        slot.set_formula("C / Z").unwrap();
        slot.set_policy(ArithmeticPolicy::Strict).unwrap();
        let active = slot.active().unwrap();
        assert_eq!(active.policy(), ArithmeticPolicy::Strict);
        assert!(matches!(
            active.call(Complex::ZERO, Complex::ONE),
            FormulaResult::EvaluationError(_)
        ));
    }

    #[test]
    fn closures_are_formulas() {
        let f = |z: Complex, c: Complex| FormulaResult::Value(z * z + c);
        assert_eq!(
            Formula::call(&f, Complex::I, Complex::ONE),
            FormulaResult::Value(Complex::ZERO)
        );
    }
}
