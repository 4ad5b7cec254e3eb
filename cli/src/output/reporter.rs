//! `TerminalReporter` — Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each `step()` gets a spinner; starting the next step (or calling
/// `success()`) ticks the previous one off. Elsewhere steps are plain
/// `"  → {message}"` lines.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    current: RefCell<Option<(ProgressBar, String)>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            current: RefCell::new(None),
        }
    }

    fn finish_current(&self) {
        if let Some((pb, msg)) = self.current.borrow_mut().take() {
            progress::finish_ok(&pb, msg.trim_end_matches("..."));
        }
    }

    /// Mark the running step as failed, if any. Called by the command layer
    /// before it prints the error.
    pub fn fail_current(&self) {
        if let Some((pb, msg)) = self.current.borrow_mut().take() {
            progress::finish_error(&pb, msg.trim_end_matches("..."));
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.finish_current();
        if self.ctx.show_progress() {
            let pb = progress::spinner(message);
            *self.current.borrow_mut() = Some((pb, message.to_string()));
        } else {
            self.ctx.step(message);
        }
    }

    fn success(&self, message: &str) {
        self.finish_current();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        match &*self.current.borrow() {
            Some((pb, _)) => pb.suspend(|| self.ctx.warn(message)),
            None => self.ctx.warn(message),
        }
    }

    fn detail(&self, line: &str) {
        match &*self.current.borrow() {
            Some((pb, _)) => pb.suspend(|| self.ctx.detail(line)),
            None => self.ctx.detail(line),
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some((pb, _)) = self.current.get_mut().take() {
            pb.finish_and_clear();
        }
    }
}
