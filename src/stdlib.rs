// SPDX: CC0-1.0

use crate::{
    complex::ArithmeticError,
    config::ParseChoiceErr,
    eval::{Fun, FunErr, FunResult, Ident, IdentKey, Idents, OperatorTyp, Value},
    Complex, Number,
};
use core::{f64::consts, fmt, str::FromStr};
use std::collections::HashMap; // assumes Number = f64

pub const Z: &str = "Z";
pub const C: &str = "C";

/// What division and exponentiation do with exact zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArithmeticPolicy {
    /// Let IEEE-754 infinities and NaNs flow through.
    #[default]
    Propagate,
    /// Fail the evaluation instead of producing a special value.
    Strict,
}

impl FromStr for ArithmeticPolicy {
    type Err = ParseChoiceErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propagate" => Ok(Self::Propagate),
            "strict" => Ok(Self::Strict),
            _ => Err(ParseChoiceErr::new("propagate, strict")),
        }
    }
}

impl fmt::Display for ArithmeticPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagate => write!(f, "propagate"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// The complete symbol table a formula can see: its two arguments, the real
/// math vocabulary, and the complex constructors.
#[derive(Clone, Debug)]
pub struct FormulaEnvironment {
    idents: Idents,
    policy: ArithmeticPolicy,
}

impl Default for FormulaEnvironment {
    fn default() -> Self {
        Self::new(ArithmeticPolicy::default())
    }
}

impl FormulaEnvironment {
    pub fn new(policy: ArithmeticPolicy) -> Self {
        Self {
            idents: standard_idents(policy),
            policy,
        }
    }

    pub fn idents(&self) -> &Idents {
        &self.idents
    }

    pub const fn policy(&self) -> ArithmeticPolicy {
        self.policy
    }

    /// Closest known identifier to `name`, if any is reasonably similar.
    pub fn most_similar(&self, name: &str) -> Option<(&IdentKey, &Ident)> {
        let name = name.to_ascii_lowercase();
        self.idents
            .iter()
            .map(|(k, v)| {
                (
                    strsim::normalized_damerau_levenshtein(&name, &k.get().to_ascii_lowercase()),
                    (k, v),
                )
            })
            .filter(|(sim, _)| *sim > 0.3)
            .reduce(|(acc_sim, acc_kv), (elem_sim, elem_kv)| {
                // ties go to the lexicographically smaller key so output is stable
                if elem_sim > acc_sim
                    || (elem_sim == acc_sim && elem_kv.0.get() < acc_kv.0.get())
                {
                    (elem_sim, elem_kv)
                } else {
                    (acc_sim, acc_kv)
                }
            })
            .map(|(_, kv)| kv)
    }
}

pub fn standard_idents(policy: ArithmeticPolicy) -> Idents {
    let mut ret = HashMap::new();

    ret.insert(Z.into(), Ident::Arg(0));
    ret.insert(C.into(), Ident::Arg(1));

    // operators
    for op in [
        OperatorTyp::Neg,
        OperatorTyp::Add,
        OperatorTyp::Sub,
        OperatorTyp::Mul,
        OperatorTyp::Div,
        OperatorTyp::Pow,
    ] {
        ret.insert(op.name().into(), Ident::Fun(op.fun()));
    }
    if policy == ArithmeticPolicy::Strict {
        ret.insert("div".into(), fun(2, div_strict));
        ret.insert("pow".into(), fun(2, pow_strict));
    }

    // complex
    ret.insert("constant".into(), Ident::Fun(Fun::optional(1, 2, constant)));
    ret.insert("re".into(), fun(1, re));
    ret.insert("im".into(), fun(1, im));
    ret.insert("conj".into(), fun(1, conj));
    ret.insert("theta".into(), fun(1, theta));
    ret.insert("abs".into(), fun(1, abs));

    // exponential & logarithmic
    ret.insert("exp".into(), fun(1, exp));
    ret.insert("expm1".into(), fun(1, expm1));
    let log = match policy {
        ArithmeticPolicy::Propagate => fun(1, log),
        ArithmeticPolicy::Strict => fun(1, log_strict),
    };
    ret.insert("log".into(), log.clone());
    ret.insert("ln".into(), log);
    ret.insert("log1p".into(), fun(1, log1p));
    ret.insert("log10".into(), fun(1, log10));
    ret.insert("log2".into(), fun(1, log2));
    ret.insert("sqrt".into(), fun(1, sqrt));
    ret.insert("cbrt".into(), fun(1, cbrt));
    ret.insert("hypot".into(), fun(2, hypot));

    // trig
    ret.insert("sin".into(), fun(1, sin));
    ret.insert("cos".into(), fun(1, cos));
    ret.insert("tan".into(), fun(1, tan));
    ret.insert("asin".into(), fun(1, asin));
    ret.insert("acos".into(), fun(1, acos));
    ret.insert("atan".into(), fun(1, atan));
    ret.insert("atan2".into(), fun(2, atan2));
    ret.insert("sinh".into(), fun(1, sinh));
    ret.insert("cosh".into(), fun(1, cosh));
    ret.insert("tanh".into(), fun(1, tanh));
    ret.insert("asinh".into(), fun(1, asinh));
    ret.insert("acosh".into(), fun(1, acosh));
    ret.insert("atanh".into(), fun(1, atanh));

    // rounding & misc
    ret.insert("floor".into(), fun(1, floor));
    ret.insert("ceil".into(), fun(1, ceil));
    ret.insert("round".into(), fun(1, round));
    ret.insert("trunc".into(), fun(1, trunc));
    ret.insert("fround".into(), fun(1, fround));
    ret.insert("sign".into(), fun(1, sign));
    ret.insert("max".into(), fun(2, max));
    ret.insert("min".into(), fun(2, min));

    for (name, val) in [
        ("PI", consts::PI),
        ("E", consts::E),
        ("LN2", consts::LN_2),
        ("LN10", consts::LN_10),
        ("LOG2E", consts::LOG2_E),
        ("LOG10E", consts::LOG10_E),
        ("SQRT2", consts::SQRT_2),
        ("SQRT1_2", consts::FRAC_1_SQRT_2),
        ("pi", consts::PI),
        ("tau", consts::TAU),
        ("e", consts::E),
    ] {
        ret.insert(name.into(), Ident::Const(Value::Real(val)));
    }
    ret
}

fn fun(arity: usize, f: fn(&[Value]) -> FunResult) -> Ident {
    Ident::Fun(Fun::new(arity, f))
}

fn expect_n<const N: usize>(args: &[Value]) -> Result<[Value; N], FunErr> {
    args.try_into().map_err(|_| FunErr::Arity {
        expected: N,
        found: args.len(),
    })
}

fn reals<const N: usize>(args: &[Value]) -> Result<[Number; N], FunErr> {
    let vals = expect_n::<N>(args)?;
    let mut ret = [0.0; N];
    for (position, (dst, val)) in ret.iter_mut().zip(vals).enumerate() {
        *dst = match val {
            Value::Real(val) => val,
            Value::Complex(_) => {
                return Err(FunErr::ExpectedReal {
                    position: position + 1,
                    found: val.type_name(),
                })
            }
        };
    }
    Ok(ret)
}

macro_rules! real_fun {
    ($($name:ident(|$($arg:ident),+| $body:expr);)+) => {
        $(
            pub fn $name(args: &[Value]) -> FunResult {
                let [$($arg),+] = reals(args)?;
                Ok(Value::Real($body))
            }
        )+
    };
}

real_fun! {
    exp(|x| x.exp());
    expm1(|x| x.exp_m1());
    log(|x| x.ln());
    log1p(|x| x.ln_1p());
    log10(|x| x.log10());
    log2(|x| x.log2());
    sqrt(|x| x.sqrt());
    cbrt(|x| x.cbrt());
    hypot(|x, y| x.hypot(y));
    sin(|x| x.sin());
    cos(|x| x.cos());
    tan(|x| x.tan());
    asin(|x| x.asin());
    acos(|x| x.acos());
    atan(|x| x.atan());
    atan2(|y, x| y.atan2(x));
    sinh(|x| x.sinh());
    cosh(|x| x.cosh());
    tanh(|x| x.tanh());
    asinh(|x| x.asinh());
    acosh(|x| x.acosh());
    atanh(|x| x.atanh());
    floor(|x| x.floor());
    ceil(|x| x.ceil());
    // ties toward positive infinity
    round(|x| (x + 0.5).floor());
    trunc(|x| x.trunc());
    fround(|x| x as f32 as Number);
    sign(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() });
    // NaN wins, unlike f64::max/min
    max(|x, y| if x.is_nan() || y.is_nan() { Number::NAN } else { x.max(y) });
    min(|x, y| if x.is_nan() || y.is_nan() { Number::NAN } else { x.min(y) });
}

pub fn log_strict(args: &[Value]) -> FunResult {
    let [x] = reals(args)?;
    if x <= 0.0 {
        Err(ArithmeticError::LogOfNonPositive.into())
    } else {
        Ok(Value::Real(x.ln()))
    }
}

/// `constant(re)` is `re + 0i`
pub fn constant(args: &[Value]) -> FunResult {
    let z = match args.len() {
        1 => {
            let [re] = reals(args)?;
            Complex::from_real(re)
        }
        _ => {
            let [re, im] = reals(args)?;
            Complex::new(re, im)
        }
    };
    Ok(Value::Complex(z))
}

pub fn re(args: &[Value]) -> FunResult {
    let [z] = expect_n(args)?;
    Ok(Value::Real(z.to_complex().real))
}

pub fn im(args: &[Value]) -> FunResult {
    let [z] = expect_n(args)?;
    Ok(Value::Real(z.to_complex().imag))
}

pub fn conj(args: &[Value]) -> FunResult {
    let [z] = expect_n(args)?;
    Ok(match z {
        Value::Real(x) => Value::Real(x),
        Value::Complex(z) => Value::Complex(z.conjugate()),
    })
}

/// Angle; a complex argument gives a real-valued complex result.
pub fn theta(args: &[Value]) -> FunResult {
    let [z] = expect_n(args)?;
    Ok(match z {
        Value::Real(x) => Value::Real(0.0_f64.atan2(x)),
        Value::Complex(z) => Value::Complex(Complex::from_real(z.theta())),
    })
}

/// Absolute value; a complex argument gives its magnitude as a real-valued
/// complex result.
pub fn abs(args: &[Value]) -> FunResult {
    let [z] = expect_n(args)?;
    Ok(match z {
        Value::Real(x) => Value::Real(x.abs()),
        Value::Complex(z) => Value::Complex(z.abs()),
    })
}

pub fn neg(args: &[Value]) -> FunResult {
    let [x] = expect_n(args)?;
    Ok(match x {
        Value::Real(x) => Value::Real(-x),
        Value::Complex(z) => Value::Complex(-z),
    })
}

pub fn add(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] => Value::Real(x + y),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().add(y, None)),
        [x, Value::Complex(y)] => Value::Complex(x.to_complex().add(y.real, y.imag)),
    })
}

pub fn sub(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] => Value::Real(x - y),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().subtract(y, None)),
        [x, Value::Complex(y)] => Value::Complex(x.to_complex().subtract(y.real, y.imag)),
    })
}

pub fn mul(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] => Value::Real(x * y),
        [Value::Real(x), Value::Complex(y)] => Value::Complex(y.multiply(x, None)),
        [Value::Complex(x), Value::Real(y)] => Value::Complex(x.multiply(y, None)),
        [Value::Complex(x), Value::Complex(y)] => Value::Complex(x.multiply(y.real, y.imag)),
    })
}

pub fn div(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] => Value::Real(x / y),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().divide(y, None)),
        [x, Value::Complex(y)] => Value::Complex(x.to_complex().divide(y.real, y.imag)),
    })
}

pub fn div_strict(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(_), Value::Real(y)] if y == 0.0 => {
            return Err(ArithmeticError::DivisionByZero.into())
        }
        [Value::Real(x), Value::Real(y)] => Value::Real(x / y),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().checked_divide(y, None)?),
        [x, Value::Complex(y)] => Value::Complex(x.to_complex().checked_divide(y.real, y.imag)?),
    })
}

/// Real base and real exponent stay real; anything else raises in the complex
/// plane, with a real exponent taking the polar shortcut.
pub fn pow(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] => Value::Real(x.powf(y)),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().power_to(y, None)),
        [x, Value::Complex(y)] => Value::Complex(x.to_complex().power_to(y.real, y.imag)),
    })
}

pub fn pow_strict(args: &[Value]) -> FunResult {
    Ok(match expect_n(args)? {
        [Value::Real(x), Value::Real(y)] if x == 0.0 && y < 0.0 => {
            return Err(ArithmeticError::ZeroToNegativePower.into())
        }
        [Value::Real(x), Value::Real(y)] => Value::Real(x.powf(y)),
        [x, Value::Real(y)] => Value::Complex(x.to_complex().checked_power_to(y, None)?),
        [x, Value::Complex(y)] => {
            Value::Complex(x.to_complex().checked_power_to(y.real, y.imag)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Arity;

    fn c(re: Number, im: Number) -> Value {
        Value::Complex(Complex::new(re, im))
    }

    #[test]
    fn mixed_arithmetic_promotes_reals() {
        assert_eq!(add(&[c(1.0, 2.0), Value::Real(3.0)]), Ok(c(4.0, 2.0)));
        assert_eq!(add(&[Value::Real(3.0), c(1.0, 2.0)]), Ok(c(4.0, 2.0)));
        assert_eq!(sub(&[Value::Real(3.0), c(1.0, 2.0)]), Ok(c(2.0, -2.0)));
        assert_eq!(mul(&[Value::Real(2.0), c(1.0, 2.0)]), Ok(c(2.0, 4.0)));
        assert_eq!(mul(&[Value::Real(2.0), Value::Real(3.0)]), Ok(Value::Real(6.0)));
    }

    #[test]
    fn constant_imaginary_part_is_optional() {
        assert_eq!(constant(&[Value::Real(2.0)]), Ok(c(2.0, 0.0)));
        assert_eq!(
            constant(&[Value::Real(2.0), Value::Real(-1.0)]),
            Ok(c(2.0, -1.0))
        );
    }

    #[test]
    fn real_functions_reject_complex() {
        assert_eq!(
            sin(&[c(0.0, 0.0)]),
            Err(FunErr::ExpectedReal {
                position: 1,
                found: "complex number"
            })
        );
        assert_eq!(
            constant(&[Value::Real(1.0), c(0.0, 0.0)]),
            Err(FunErr::ExpectedReal {
                position: 2,
                found: "complex number"
            })
        );
        assert_eq!(
            sin(&[Value::Real(0.0), Value::Real(1.0)]),
            Err(FunErr::Arity {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn abs_and_theta_follow_argument_type() {
        assert_eq!(abs(&[Value::Real(-2.0)]), Ok(Value::Real(2.0)));
        assert_eq!(abs(&[c(3.0, -4.0)]), Ok(c(5.0, 0.0)));
        assert_eq!(theta(&[c(0.0, 0.0)]), Ok(c(0.0, 0.0)));
        assert_eq!(theta(&[Value::Real(-1.0)]), Ok(Value::Real(consts::PI)));
    }

    #[test]
    fn strict_division_and_power() {
        let zero = c(0.0, 0.0);
        assert!(matches!(div(&[c(1.0, 0.0), zero]), Ok(Value::Complex(z)) if z.is_nan()));
        assert_eq!(
            div_strict(&[c(1.0, 0.0), zero]),
            Err(FunErr::Arithmetic(ArithmeticError::DivisionByZero))
        );
        assert_eq!(
            div_strict(&[Value::Real(1.0), Value::Real(0.0)]),
            Err(FunErr::Arithmetic(ArithmeticError::DivisionByZero))
        );
        assert_eq!(
            pow_strict(&[zero, c(2.0, 1.0)]),
            Err(FunErr::Arithmetic(ArithmeticError::LogOfNonPositive))
        );
        assert_eq!(pow_strict(&[zero, Value::Real(2.0)]), Ok(zero));
        assert_eq!(
            log_strict(&[Value::Real(0.0)]),
            Err(FunErr::Arithmetic(ArithmeticError::LogOfNonPositive))
        );
    }

    #[test]
    fn js_flavoured_rounding_and_sign() {
        assert_eq!(round(&[Value::Real(-2.5)]), Ok(Value::Real(-2.0)));
        assert_eq!(round(&[Value::Real(2.5)]), Ok(Value::Real(3.0)));
        assert_eq!(sign(&[Value::Real(0.0)]), Ok(Value::Real(0.0)));
        assert_eq!(sign(&[Value::Real(-7.0)]), Ok(Value::Real(-1.0)));
        assert!(matches!(max(&[Value::Real(1.0), Value::Real(Number::NAN)]), Ok(Value::Real(x)) if x.is_nan()));
    }

    #[test]
    fn environment_has_arguments_and_vocabulary() {
        let env = FormulaEnvironment::default();
        assert!(matches!(env.idents().get(&Z.into()), Some(Ident::Arg(0))));
        assert!(matches!(env.idents().get(&C.into()), Some(Ident::Arg(1))));
        assert!(matches!(env.idents().get(&"constant".into()), Some(Ident::Fun(f)) if f.arity == (Arity { min: 1, max: 2 })));
        assert!(matches!(env.idents().get(&"PI".into()), Some(Ident::Const(_))));
        assert!(env.idents().get(&"random".into()).is_none());
    }

    #[test]
    fn suggests_similar_names() {
        let env = FormulaEnvironment::default();
        let (key, ident) = env.most_similar("constnt").unwrap();
        assert_eq!(key.get(), "constant");
        assert_eq!(ident.kind(), "function");
        assert!(env.most_similar("qqqqqqqqqqqqqqqq").is_none());
    }
}
