// SPDX: CC0-1.0

use crate::Number;
use core::{fmt, ops};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("zero raised to a negative power")]
    ZeroToNegativePower,
    #[error("logarithm of zero or a negative number")]
    LogOfNonPositive,
}

/// Immutable complex number. Every operation returns a new value.
///
/// Methods taking an optional imaginary operand (`im: impl Into<Option<Number>>`)
/// treat `None` as a bare real. For `multiply`, `divide` and `power_to` the
/// real-only form takes a different code path than `Some(0.0)`, which matters
/// at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex {
    pub real: Number,
    pub imag: Number,
}

impl Complex {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 0.0);
    pub const I: Self = Self::new(0.0, 1.0);

    #[inline]
    pub const fn new(real: Number, imag: Number) -> Self {
        Self { real, imag }
    }

    #[inline]
    pub const fn from_real(real: Number) -> Self {
        Self::new(real, 0.0)
    }

    pub fn conjugate(self) -> Self {
        Self::new(self.real, -self.imag)
    }

    pub fn add(self, re: Number, im: impl Into<Option<Number>>) -> Self {
        Self::new(self.real + re, self.imag + im.into().unwrap_or(0.0))
    }

    pub fn subtract(self, re: Number, im: impl Into<Option<Number>>) -> Self {
        Self::new(self.real - re, self.imag - im.into().unwrap_or(0.0))
    }

    pub fn multiply(self, re: Number, im: impl Into<Option<Number>>) -> Self {
        match im.into() {
            Some(im) => Self::new(
                self.real * re - self.imag * im,
                self.real * im + self.imag * re,
            ),
            None => Self::new(self.real * re, self.imag * re),
        }
    }

    /// Division with IEEE-754 semantics: a zero divisor yields infinities or
    /// NaN rather than an error.
    pub fn divide(self, re: Number, im: impl Into<Option<Number>>) -> Self {
        match im.into() {
            Some(im) => {
                let divisor = re * re + im * im;
                Self::new(
                    (self.real * re + self.imag * im) / divisor,
                    (self.imag * re - self.real * im) / divisor,
                )
            }
            None => Self::new(self.real / re, self.imag / re),
        }
    }

    pub fn checked_divide(
        self,
        re: Number,
        im: impl Into<Option<Number>>,
    ) -> Result<Self, ArithmeticError> {
        let im = im.into();
        let divisor = match im {
            Some(im) => re * re + im * im,
            None => re,
        };
        if divisor == 0.0 {
            Err(ArithmeticError::DivisionByZero)
        } else {
            Ok(self.divide(re, im))
        }
    }

    /// Raises `self` to a real (`im == None`) or complex power.
    ///
    /// A real exponent scales the polar form directly. A complex exponent goes
    /// through `exp(w * ln(z))`:
    /// magnitude `exp(ln|z| * re - arg(z) * im)`, angle `arg(z) * re + ln|z| * im`.
    pub fn power_to(self, re: Number, im: impl Into<Option<Number>>) -> Self {
        let magnitude = self.magnitude();
        let angle = self.theta();
        match im.into() {
            Some(im) => {
                let ln_magnitude = magnitude.ln();
                Self::from_polar(
                    (ln_magnitude * re - angle * im).exp(),
                    angle * re + ln_magnitude * im,
                )
            }
            None => Self::from_polar(magnitude.powf(re), angle * re),
        }
    }

    pub fn checked_power_to(
        self,
        re: Number,
        im: impl Into<Option<Number>>,
    ) -> Result<Self, ArithmeticError> {
        let im = im.into();
        if self.magnitude() == 0.0 {
            // ln(0) appears in the complex form no matter the exponent
            if im.is_some() {
                return Err(ArithmeticError::LogOfNonPositive);
            }
            if re < 0.0 {
                return Err(ArithmeticError::ZeroToNegativePower);
            }
        }
        Ok(self.power_to(re, im))
    }

    pub fn from_polar(magnitude: Number, angle: Number) -> Self {
        Self::new(magnitude * angle.cos(), magnitude * angle.sin())
    }

    /// Magnitude as a real-valued complex number.
    pub fn abs(self) -> Self {
        Self::from_real(self.magnitude())
    }

    pub fn magnitude(self) -> Number {
        (self.real * self.real + self.imag * self.imag).sqrt()
    }

    pub fn theta(self) -> Number {
        self.imag.atan2(self.real)
    }

    pub fn is_nan(self) -> bool {
        self.real.is_nan() || self.imag.is_nan()
    }

    /// Renders `<real><sign><|imag|>i`. With `round`, a component whose absolute
    /// value exceeds 1.5 is shown as its nearest integer; smaller components
    /// keep full precision.
    pub fn format(self, round: bool) -> String {
        fn component(val: Number, round: bool) -> String {
            let val = if round && val.abs() > 1.5 {
                // ties toward positive infinity
                (val + 0.5).floor()
            } else {
                val
            };
            if val == 0.0 {
                // no "-0"
                String::from("0")
            } else if val.is_infinite() {
                String::from(if val < 0.0 { "-Infinity" } else { "Infinity" })
            } else {
                val.to_string()
            }
        }

        format!(
            "{real}{sign}{imag}i",
            real = component(self.real, round),
            sign = if self.imag < 0.0 { '-' } else { '+' },
            imag = component(self.imag.abs(), round),
        )
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(!f.alternate()))
    }
}

impl From<Number> for Complex {
    fn from(real: Number) -> Self {
        Self::from_real(real)
    }
}

impl ops::Neg for Complex {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.real, -self.imag)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $inherent:ident) => {
        impl ops::$trait for Complex {
            type Output = Self;
            fn $method(self, rhs: Self) -> Self {
                self.$inherent(rhs.real, rhs.imag)
            }
        }

        impl ops::$trait<Number> for Complex {
            type Output = Self;
            fn $method(self, rhs: Number) -> Self {
                self.$inherent(rhs, None)
            }
        }
    };
}

impl_binop!(Add, add, add);
impl_binop!(Sub, sub, subtract);
impl_binop!(Mul, mul, multiply);
impl_binop!(Div, div, divide);
