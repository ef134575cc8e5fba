// SPDX: CC0-1.0

use crate::{
    color::ColorMapper,
    config::RenderConfig,
    escape::{self, FatalReason, PixelClassification},
    formula::{CompileError, Formula},
    Point,
};
use core::fmt;
use image::{Rgb, RgbImage};
use log::{info, warn};

/// Write-only destination for rendered pixels.
pub trait PixelSink {
    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>);
}

impl PixelSink for RgbImage {
    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        if x < self.width() && y < self.height() {
            self.put_pixel(x, y, color);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatusEvent {
    CompileFailed {
        message: String,
    },
    FatalAborted {
        pixel: Point<u32>,
        reason: FatalReason,
    },
    /// A column hit more consecutive anomalies than allowed. `max_in_column`
    /// is the running maximum over all columns so far.
    AnomalyThresholdExceeded {
        column: u32,
        max_in_column: usize,
        halted: bool,
    },
}

impl StatusEvent {
    pub fn compile_failed(err: &CompileError) -> Self {
        Self::CompileFailed {
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompileFailed { message } => write!(f, "{message}"),
            Self::FatalAborted { pixel, reason } => write!(
                f,
                "{reason} at pixel ({x}, {y}), halting",
                x = pixel.x,
                y = pixel.y
            ),
            Self::AnomalyThresholdExceeded {
                max_in_column,
                halted,
                ..
            } => {
                write!(f, "Max NaNs found in 1 column is {max_in_column}")?;
                if *halted {
                    write!(f, "\nToo many NaNs. Halting.")?;
                }
                Ok(())
            }
        }
    }
}

/// Write-only channel for compile errors, aborts and anomaly reports.
pub trait StatusSink {
    fn report(&mut self, event: StatusEvent);
}

impl StatusSink for Vec<StatusEvent> {
    fn report(&mut self, event: StatusEvent) {
        self.push(event);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    FatalAborted,
    AnomalyHalted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub columns: u32,
    pub pixels_written: u64,
    pub anomalies: u64,
    /// longest run of consecutive anomalies seen in a single column
    pub max_consecutive_anomalies: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSummary {
    pub progress: Progress,
    pub outcome: RenderOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnStep {
    Continue,
    Done(RenderSummary),
}

/// Column-major scan of the pixel grid.
///
/// Each call to [`next_column`](Self::next_column) evaluates one column and
/// hands control back to the caller, which may simply stop calling (or drop
/// the session) to cancel the render.
#[derive(Debug)]
pub struct RenderSession<'a, F: ?Sized> {
    formula: &'a F,
    config: &'a RenderConfig,
    colors: ColorMapper,
    column: u32,
    prev_tripped: bool,
    progress: Progress,
    outcome: Option<RenderOutcome>,
}

impl<'a, F> RenderSession<'a, F>
where
    F: Formula + ?Sized,
{
    pub fn new(formula: &'a F, config: &'a RenderConfig) -> Self {
        info!(
            "rendering {w}x{h}, {mode} mode, {n} iterations",
            w = config.size.x,
            h = config.size.y,
            mode = config.mode,
            n = config.iterations,
        );
        Self {
            formula,
            config,
            colors: ColorMapper::new(config.inside_color, config.iterations),
            column: 0,
            prev_tripped: false,
            progress: Progress::default(),
            outcome: None,
        }
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    fn finish(&mut self, outcome: RenderOutcome) -> ColumnStep {
        self.outcome = Some(outcome);
        let summary = RenderSummary {
            progress: self.progress,
            outcome,
        };
        info!("render finished: {summary:?}");
        ColumnStep::Done(summary)
    }

    pub fn next_column<P, S>(&mut self, pixels: &mut P, status: &mut S) -> ColumnStep
    where
        P: PixelSink + ?Sized,
        S: StatusSink + ?Sized,
    {
        if let Some(outcome) = self.outcome {
            return ColumnStep::Done(RenderSummary {
                progress: self.progress,
                outcome,
            });
        }

        let x = self.column;
        let mut consecutive = 0;
        let mut tripped = false;
        for y in 0..self.config.size.y.get() {
            let pixel = Point { x, y };
            let class = escape::evaluate(pixel, self.config, self.formula);
            match class {
                PixelClassification::Fatal(reason) => {
                    warn!("fatal formula result at ({x}, {y}): {reason}");
                    status.report(StatusEvent::FatalAborted { pixel, reason });
                    return self.finish(RenderOutcome::FatalAborted);
                }
                PixelClassification::Anomalous => {
                    consecutive += 1;
                    self.progress.anomalies += 1;
                    self.progress.max_consecutive_anomalies =
                        self.progress.max_consecutive_anomalies.max(consecutive);
                    if self.config.anomaly_guard && consecutive > self.config.anomaly_threshold {
                        tripped = true;
                        break;
                    }
                }
                class => {
                    consecutive = 0;
                    if let Some(color) = self.colors.color_for(&class) {
                        pixels.set_pixel(x, y, color);
                        self.progress.pixels_written += 1;
                    }
                }
            }
        }

        self.column += 1;
        self.progress.columns += 1;

        if tripped {
            let halted = self.prev_tripped;
            warn!(
                "column {x} exceeded {n} consecutive anomalies{halt}",
                n = self.config.anomaly_threshold,
                halt = if halted { ", halting" } else { "" }
            );
            status.report(StatusEvent::AnomalyThresholdExceeded {
                column: x,
                max_in_column: self.progress.max_consecutive_anomalies,
                halted,
            });
            if halted {
                return self.finish(RenderOutcome::AnomalyHalted);
            }
        }
        self.prev_tripped = tripped;

        if self.column >= self.config.size.x.get() {
            self.finish(RenderOutcome::Completed)
        } else {
            ColumnStep::Continue
        }
    }

    /// Drives the scan to the end without yielding.
    pub fn run<P, S>(&mut self, pixels: &mut P, status: &mut S) -> RenderSummary
    where
        P: PixelSink + ?Sized,
        S: StatusSink + ?Sized,
    {
        loop {
            if let ColumnStep::Done(summary) = self.next_column(pixels, status) {
                return summary;
            }
        }
    }
}
