// SPDX: CC0-1.0

use crate::{
    escape::FatalReason,
    eval::{EvalErrTyp, FunErr, Program},
    formula::CompileError,
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::ParseErrTyp,
    render::{StatusEvent, StatusSink},
    stdlib::FormulaEnvironment,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetFormula,
    PrintProg,
    Render,
    SetConfig,
    SetPolicy,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetFormula,
            Self::Render,
            Self::SetConfig,
            Self::SetPolicy,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetFormula => "set the iteration formula f(Z, C)",
            Self::PrintProg => "print program compiled from the formula (for debugging)",
            Self::Render => "render the active formula to a png",
            Self::SetConfig => "set render parameters",
            Self::SetPolicy => "choose how division by zero and friends are handled",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetFormula => "set",
            Self::PrintProg => "prog",
            Self::Render => "render",
            Self::SetConfig => "config",
            Self::SetPolicy => "policy",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn formula_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no formula is set")
}

/// Prints a rejected formula with the offending span underlined, followed
/// by whatever hints apply to the error.
pub fn explain_compile_error<W: Write>(
    mut out: W,
    source: &Arc<String>,
    err: &CompileError,
    env: &FormulaEnvironment,
) -> io::Result<()> {
    let span = err
        .loc()
        .cloned()
        // NOTE(unicode)
        .unwrap_or_else(|| SubStr::all(Arc::clone(source)));
    underline(&mut out, &span)?;
    writeln!(out, "{}", StatusEvent::compile_failed(err))?;

    match err {
        CompileError::Parse(err) => match &err.typ {
            ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
                out,
                "note: available tokens are numbers, identifiers, and symbols +-*/^,()"
            )?,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
                TokTyp::XGreater | TokTyp::XLess => writeln!(
                    out,
                    "note: expected an expression but found an inequality"
                )?,
                TokTyp::XEqual => {
                    writeln!(out, "note: expected an expression but found an equation")?
                }
                TokTyp::XPipe => writeln!(
                    out,
                    "note: use the 'abs' function to compute absolute value"
                )?,
                TokTyp::XMember => writeln!(
                    out,
                    "note: methods are written as functions, so 'Z.abs()' would be 'abs(Z)'"
                )?,
                _ => {}
            },
            ParseErrTyp::ParseNum(_) => {
                writeln!(out, "note: parsing as floating point number")?
            }
            ParseErrTyp::MissingOperator => writeln!(
                out,
                "note: implicit multiplication is not supported, so for example '2Z' would be '2*Z'"
            )?,
            ParseErrTyp::ExpectedCall { name } => {
                writeln!(out, "note: try '{name}(Z)'")?
            }
            _ => {}
        },

        CompileError::Eval(err) => match &err.typ {
            EvalErrTyp::UndefinedIdent { text } => {
                if let Some((key, ident)) = env.most_similar(text.get()) {
                    writeln!(
                        out,
                        "note: {kind} '{key}' has a similar name",
                        kind = ident.kind()
                    )?;
                }
            }
            EvalErrTyp::Fun {
                source: FunErr::ExpectedReal { .. },
                ..
            } => writeln!(
                out,
                "note: use 're' and 'im' to get the parts of a complex number, and 'constant' to build one"
            )?,
            _ => {}
        },
    }
    Ok(())
}

/// Prints status events as they arrive.
#[derive(Debug)]
pub struct StatusPrinter<W: Write> {
    out: W,
    err: Option<io::Error>,
}

impl<W: Write> StatusPrinter<W> {
    pub const fn new(out: W) -> Self {
        Self { out, err: None }
    }

    /// First write error, if any event failed to print.
    pub fn finish(self) -> io::Result<()> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<W: Write> StatusPrinter<W> {
    fn print(&mut self, event: &StatusEvent) -> io::Result<()> {
        writeln!(self.out, "{event}")?;
        if let StatusEvent::FatalAborted {
            reason: FatalReason::InvalidType,
            ..
        } = event
        {
            writeln!(
                self.out,
                "note: wrap real results with 'constant', for example 'constant(re(Z))'"
            )?;
        }
        Ok(())
    }
}

impl<W: Write> StatusSink for StatusPrinter<W> {
    fn report(&mut self, event: StatusEvent) {
        if self.err.is_some() {
            return;
        }
        if let Err(err) = self.print(&event) {
            self.err = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn explain(src: &str) -> String {
        let compiler = FormulaCompiler::default();
        let source = Arc::new(String::from(src));
        let err = compiler.compile(source.as_str()).unwrap_err();
        let mut out = Vec::new();
        explain_compile_error(&mut out, &source, &err, compiler.env()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn commands_round_trip() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert_eq!("plot".parse::<Command>(), Err(()));
    }

    #[test]
    fn underlines_undefined_name_and_suggests() {
        let text = explain("Z*Z + PIE");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Z*Z + PIE"));
        assert_eq!(lines.next(), Some("      ^^^"));
        assert!(text.contains("undefined identifier 'PIE'"));
        assert!(text.contains("note: constant 'PI' has a similar name"));
    }

    #[test]
    fn member_access_hint() {
        assert!(explain("Z.abs()").contains("'abs(Z)'"));
    }

    #[test]
    fn real_result_hint_on_abort() {
        let mut buf = Vec::new();
        let mut printer = StatusPrinter::new(&mut buf);
        printer.report(StatusEvent::FatalAborted {
            pixel: crate::Point { x: 0, y: 0 },
            reason: FatalReason::InvalidType,
        });
        printer.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("formula did not produce a complex number at pixel (0, 0)"));
        assert!(text.contains("note: wrap real results"));
    }

    #[test]
    fn status_printer_writes_lines() {
        let mut buf = Vec::new();
        let mut printer = StatusPrinter::new(&mut buf);
        printer.report(StatusEvent::AnomalyThresholdExceeded {
            column: 3,
            max_in_column: 300,
            halted: false,
        });
        printer.finish().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Max NaNs found in 1 column is 300\n"
        );
    }
}
