// SPDX: CC0-1.0

use crate::{complex::ArithmeticError, lex::SubStr, stdlib, Complex, Number};
use core::fmt;
use std::collections::HashMap;
use thiserror::Error;

/// A value on the evaluation stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Real(Number),
    Complex(Complex),
}

impl Value {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Real(_) => "real number",
            Self::Complex(_) => "complex number",
        }
    }

    /// Embeds a real as a complex number with zero imaginary part.
    pub fn to_complex(self) -> Complex {
        match self {
            Self::Real(re) => Complex::from_real(re),
            Self::Complex(z) => z,
        }
    }
}

impl From<Number> for Value {
    fn from(val: Number) -> Self {
        Self::Real(val)
    }
}

impl From<Complex> for Value {
    fn from(val: Complex) -> Self {
        Self::Complex(val)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(val) => write!(f, "{val}"),
            Self::Complex(val) => write!(f, "{val:#}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
        }
    }

    /// IEEE-propagating implementation, used when the environment does not
    /// override the operator by name.
    pub const fn fun(&self) -> Fun {
        match self {
            Self::Neg => Fun::new(1, stdlib::neg),
            Self::Add => Fun::new(2, stdlib::add),
            Self::Sub => Fun::new(2, stdlib::sub),
            Self::Mul => Fun::new(2, stdlib::mul),
            Self::Div => Fun::new(2, stdlib::div),
            Self::Pow => Fun::new(2, stdlib::pow),
        }
    }
}

#[derive(Clone, Debug)]
pub enum OperationTyp {
    Val(Value),
    /// formula argument by position (`Z` is 0, `C` is 1)
    Arg(usize),
    /// `argc` values are popped as arguments
    Call {
        name: IdentKey,
        fun: Fun,
        argc: usize,
    },
    /// identifier unknown at compile time, fails when evaluated
    Ident,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Arg(idx) => write!(f, "push {} (argument {idx})", self.loc),
            OperationTyp::Call { name, argc, .. } => write!(f, "call '{name}' ({argc})"),
            OperationTyp::Ident => write!(f, "push {} (undefined)", self.loc),
        }
    }
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum FunErr {
    #[error("expected {expected} argument{}, but found {found}", plural(.expected))]
    Arity { expected: usize, found: usize },
    #[error("argument {position} must be a real number, but found a {found}")]
    ExpectedReal {
        position: usize,
        found: &'static str,
    },
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

#[derive(Debug, Error)]
pub enum EvalErrTyp {
    #[error("cannot evaluate empty program")]
    Empty,

    #[error(
        "function '{name}' requires {arity} argument{}, but found {found}",
        plural(.arity)
    )]
    MissingArgs {
        name: IdentKey,
        arity: usize,
        found: usize,
    },

    #[error(
        "expected {expected} value{} on the stack but found {found}",
        plural(.expected)
    )]
    StackMismatch { expected: usize, found: usize },

    #[error("undefined identifier '{text}'")]
    UndefinedIdent { text: SubStr },

    #[error("argument '{text}' is declared but no value was given for it")]
    UnboundArg { text: SubStr },

    #[error("in '{name}': {source}")]
    Fun { name: IdentKey, source: FunErr },
}

#[derive(Debug, Error)]
#[error("{typ}")]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

impl EvalErr {
    /// Whether the failure came from arithmetic on particular values (e.g.
    /// dividing by zero) rather than from the shape of the program.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self.typ,
            EvalErrTyp::Fun {
                source: FunErr::Arithmetic(_),
                ..
            }
        )
    }
}

pub type FunResult = Result<Value, FunErr>;

/// Accepted argument counts, `min..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn contains(&self, n: usize) -> bool {
        self.min <= n && n <= self.max
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{} argument{}", self.max, plural(&self.max))
        } else {
            write!(f, "{} to {} arguments", self.min, self.max)
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub arity: Arity,
    pub fun: fn(&[Value]) -> FunResult,
}

impl Fun {
    pub const fn new(arity: usize, fun: fn(&[Value]) -> FunResult) -> Self {
        Self {
            arity: Arity::exactly(arity),
            fun,
        }
    }

    /// Takes `min` to `max` arguments; the function sees only those given.
    pub const fn optional(min: usize, max: usize, fun: fn(&[Value]) -> FunResult) -> Self {
        Self {
            arity: Arity { min, max },
            fun,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Ident {
    Arg(usize),
    Const(Value),
    Fun(Fun),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Arg(_) => "argument",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

pub type Idents = HashMap<IdentKey, Ident>;

/// Formula in reverse polish notation, with every known identifier already
/// resolved against the environment it was parsed with.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }
}

pub fn eval(prog: &Program, args: &[Value], stack: &mut Vec<Value>) -> Result<Value, EvalErr> {
    fn eval_fun(
        stack: &mut Vec<Value>,
        op: &Operation,
        name: &IdentKey,
        fun: &Fun,
        argc: usize,
    ) -> Result<Value, EvalErr> {
        let len = stack.len();
        if len < argc {
            return Err(EvalErr {
                typ: EvalErrTyp::MissingArgs {
                    name: name.clone(),
                    arity: argc,
                    found: len,
                },
                op: Some(op.clone()),
            });
        }
        // stack: ...a, b, c, d
        //                 ^^^^ args if argc is 2
        let base = len - argc;
        let val = (fun.fun)(&stack[base..]).map_err(|source| EvalErr {
            typ: EvalErrTyp::Fun {
                name: name.clone(),
                source,
            },
            op: Some(op.clone()),
        })?;
        stack.truncate(base);
        Ok(val)
    }

    if prog.ops.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            op: None,
        });
    }

    stack.clear();

    for op in prog.ops() {
        let val = match &op.typ {
            OperationTyp::Val(val) => *val,

            OperationTyp::Arg(idx) => match args.get(*idx) {
                Some(val) => *val,
                None => {
                    return Err(EvalErr {
                        typ: EvalErrTyp::UnboundArg {
                            text: op.loc.clone(),
                        },
                        op: Some(op.clone()),
                    })
                }
            },

            OperationTyp::Call { name, fun, argc } => eval_fun(stack, op, name, fun, *argc)?,

            OperationTyp::Ident => {
                return Err(EvalErr {
                    typ: EvalErrTyp::UndefinedIdent {
                        text: op.loc.clone(),
                    },
                    op: Some(op.clone()),
                })
            }
        };
        stack.push(val);
    }

    match stack.as_slice() {
        [val] => Ok(*val),
        _ => Err(EvalErr {
            typ: EvalErrTyp::StackMismatch {
                expected: 1,
                found: stack.len(),
            },
            op: None,
        }),
    }
}
