// SPDX: CC0-1.0

//! Escape-time fractal rendering driven by a user-supplied iteration formula
//! `f(Z, C)`.
//!
//! The formula is compiled by a small sandboxed interpreter ([`formula`]) that
//! only knows about complex arithmetic and a fixed math vocabulary
//! ([`stdlib`]). [`escape`] iterates it per coordinate, [`color`] turns the
//! classification into a color and [`render`] scans the pixel grid one column
//! at a time.

pub mod color;
pub mod complex;
pub mod config;
pub mod escape;
pub mod eval;
pub mod formula;
pub mod lex;
pub mod parse;
pub mod render;
pub mod shell;
pub mod stdlib;

pub use complex::Complex;
pub use config::RenderConfig;
pub use formula::{CompiledFormula, Formula, FormulaResult, FormulaSlot};

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}
