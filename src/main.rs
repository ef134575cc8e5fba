// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::num::NonZeroU32;
use escape_field::{
    color,
    config::{MandelbrotSeed, Mode, Side, MAX_SIDE},
    render::{ColumnStep, RenderOutcome, RenderSession},
    shell::{self, Command, StatusPrinter},
    stdlib::ArithmeticPolicy,
    Complex, FormulaSlot, Number, RenderConfig,
};
use image::RgbImage;
use log::info;
use std::{
    io::{stdout, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
};

const DEFAULT_FORMULA: &str = "Z*Z + C";

fn output_png_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "png"
    )
}

fn main() -> ExitCode {
    env_logger::init();
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct State {
    slot: FormulaSlot,
    config: RenderConfig,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State::default();
    let mut stdout = BufWriter::new(stdout());
    set_formula(&mut stdout, &mut state, DEFAULT_FORMULA)?;

    loop {
        if let Some(active) = state.slot.active() {
            writeln!(stdout, "f(Z, C) = {}", active.source())?;
        } else {
            writeln!(stdout, "f(Z, C) is not set")?;
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetFormula => {
                    let input = shell::input(&mut stdout, "f(Z, C) = ")?;
                    if !input.is_empty() {
                        set_formula(&mut stdout, &mut state, input)?;
                    }
                }

                Command::Render => render(&mut stdout, &state)?,

                Command::SetConfig => set_config(&mut stdout, &mut state.config)?,

                Command::SetPolicy => set_policy(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    if let Some(active) = state.slot.active() {
                        shell::dump_program(
                            &mut stdout,
                            active.program(),
                            format_args!("program ({})", active.policy()),
                        )?;
                    } else {
                        shell::formula_undefined(&mut stdout)?;
                    }
                }
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn set_formula<W: Write>(
    mut out: W,
    state: &mut State,
    input: impl Into<String>,
) -> anyhow::Result<()> {
    let source = Arc::new(input.into());
    if let Err(err) = state.slot.set_formula(source.as_str()) {
        writeln!(out)?;
        shell::explain_compile_error(&mut out, &source, &err, state.slot.compiler().env())?;
        if state.slot.active().is_some() {
            writeln!(out, "note: keeping the previous formula")?;
        }
    }
    Ok(())
}

fn set_policy<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let current = state.slot.compiler().env().policy();
    writeln!(out, "note: strict rejects division by zero, 0^-n and log(0)")?;
    let policy = match shell::read_fromstr::<_, ArithmeticPolicy>(
        &mut out,
        format_args!("?policy (is {current}) = "),
        true,
    )? {
        Ok(Some(policy)) => policy,
        Ok(None) | Err(_) => return Ok(()),
    };

    if let Err(err) = state.slot.set_policy(policy) {
        if let Some(active) = state.slot.active() {
            writeln!(out)?;
            shell::explain_compile_error(
                &mut out,
                active.source(),
                &err,
                state.slot.compiler().env(),
            )?;
        }
        writeln!(out, "note: policy is still {current}")?;
    }
    Ok(())
}

fn set_config<W: Write>(mut out: W, config: &mut RenderConfig) -> anyhow::Result<()> {
    writeln!(out, "config = {config:#}")?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    match shell::read_fromstr::<_, NonZeroU32>(
        &mut out,
        format_args!("?iterations (is {cur}) = ", cur = config.iterations),
        true,
    )? {
        Ok(Some(new)) => config.iterations = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    writeln!(out, "note: width and height must be integers from 1 to {MAX_SIDE}")?;
    for (name, dst) in [("width", &mut config.size.x), ("height", &mut config.size.y)] {
        match shell::read_fromstr::<_, Side>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(Side(new))) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    match shell::read_fromstr::<_, Mode>(
        &mut out,
        format_args!("?mode (is {cur}) = ", cur = config.mode),
        true,
    )? {
        Ok(Some(new)) => config.mode = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    match shell::read_fromstr::<_, MandelbrotSeed>(
        &mut out,
        format_args!("?mandelbrot seed (is {cur}) = ", cur = config.mandelbrot_seed),
        true,
    )? {
        Ok(Some(new)) => config.mandelbrot_seed = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    let Complex {
        real: mut julia_re,
        imag: mut julia_im,
    } = config.julia_seed;
    let Complex {
        real: mut center_re,
        imag: mut center_im,
    } = config.viewport.center;
    for (name, dst) in [
        ("julia seed re", &mut julia_re),
        ("julia seed im", &mut julia_im),
        ("center re", &mut center_re),
        ("center im", &mut center_im),
        ("span x", &mut config.viewport.span.x),
        ("span y", &mut config.viewport.span.y),
        ("divergence threshold", &mut config.divergence_threshold),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }
    config.julia_seed = Complex::new(julia_re, julia_im);
    config.viewport.center = Complex::new(center_re, center_im);

    match shell::read_fromstr::<_, bool>(
        &mut out,
        format_args!("?anomaly guard (is {cur}) = ", cur = config.anomaly_guard),
        true,
    )? {
        Ok(Some(new)) => config.anomaly_guard = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    match shell::read_fromstr::<_, usize>(
        &mut out,
        format_args!(
            "?anomaly threshold (is {cur}) = ",
            cur = config.anomaly_threshold
        ),
        true,
    )? {
        Ok(Some(new)) => config.anomaly_threshold = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    let input = shell::input(
        &mut out,
        format_args!(
            "?inside color (is {cur}) = ",
            cur = color::to_hex(config.inside_color)
        ),
    )?;
    if !input.is_empty() {
        match color::from_hex(&input) {
            Ok(new) => config.inside_color = new,
            Err(err) => writeln!(out, "parse error: {err}")?,
        }
    }

    Ok(())
}

fn render<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let formula = match state.slot.active() {
        Some(formula) => formula,
        None => {
            shell::formula_undefined(&mut out)?;
            return Ok(());
        }
    };
    let config = &state.config;
    let mut img = RgbImage::new(config.size.x.get(), config.size.y.get());

    let summary = {
        let mut status = StatusPrinter::new(&mut out);
        let mut session = RenderSession::new(&*formula, config);
        let summary = loop {
            match session.next_column(&mut img, &mut status) {
                ColumnStep::Continue => {}
                ColumnStep::Done(summary) => break summary,
            }
        };
        status.finish()?;
        summary
    };

    match summary.outcome {
        RenderOutcome::Completed => writeln!(out, "render ok")?,
        RenderOutcome::FatalAborted => {
            writeln!(out, "render aborted")?;
            return Ok(());
        }
        RenderOutcome::AnomalyHalted => {
            writeln!(
                out,
                "note: turn the anomaly guard off in 'config' to draw past NaNs"
            )?;
        }
    }

    let path = output_png_filename(Local::now());
    img.save(&path)
        .with_context(|| format!("failed to write {path}"))?;
    info!(
        "wrote {path} ({n} pixels drawn)",
        n = summary.progress.pixels_written
    );
    writeln!(out, "wrote {path}")?;
    Ok(())
}
