//! Labelled terminal output for the runner.
//!
//! Every line starts with a short label (`Building`, `Found`, `Deployed`,
//! `Failed`, `Note`). The [`Tone`] of a line picks both its colour and its
//! stream: progress goes to stdout, problems go to stderr. Labels are coloured
//! only when the target stream is a terminal. The `*_to_with_tty` writers take
//! the stream and the TTY decision as arguments so tests can render into a
//! buffer.

use console::{Color, Term, style};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Kind of labelled line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Action,
    Success,
    Fail,
    Note,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Action => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Fail => Color::Red,
            Tone::Note => Color::Yellow,
        }
    }

    fn is_problem(self) -> bool {
        matches!(self, Tone::Fail | Tone::Note)
    }
}

/// Write `label msg` (or just `label` when `msg` is empty).
pub fn labeled_to_with_tty(w: &mut dyn Write, tone: Tone, label: &str, msg: &str, is_tty: bool) {
    let label = if is_tty {
        style(label).bold().fg(tone.color()).to_string()
    } else {
        label.to_string()
    };
    let _ = if msg.is_empty() {
        writeln!(w, "{label}")
    } else {
        writeln!(w, "{label} {msg}")
    };
}

/// Write an indented, dimmed detail line.
pub fn detail_to_with_tty(w: &mut dyn Write, msg: &str, is_tty: bool) {
    let line = format!("  {msg}");
    let _ = if is_tty {
        writeln!(w, "{}", style(line).dim())
    } else {
        writeln!(w, "{line}")
    };
}

/// Write captured tool output indented under a heading, skipping blank text.
pub fn block_to_with_tty(w: &mut dyn Write, heading: &str, text: &str, is_tty: bool) {
    let text = text.trim_end();
    if text.trim().is_empty() {
        return;
    }
    labeled_to_with_tty(w, Tone::Note, heading, "", is_tty);
    for line in text.lines() {
        let _ = writeln!(w, "    {line}");
    }
}

fn emit(tone: Tone, label: &str, msg: &str) {
    if tone.is_problem() {
        labeled_to_with_tty(&mut io::stderr(), tone, label, msg, Term::stderr().is_term());
    } else {
        labeled_to_with_tty(&mut io::stdout(), tone, label, msg, Term::stdout().is_term());
    }
}

pub fn action(label: &str, msg: &str) {
    emit(Tone::Action, label, msg);
}

pub fn success(label: &str, msg: &str) {
    emit(Tone::Success, label, msg);
}

pub fn fail(label: &str, msg: &str) {
    emit(Tone::Fail, label, msg);
}

pub fn note(msg: &str) {
    emit(Tone::Note, "Note", msg);
}

pub fn detail(msg: &str) {
    detail_to_with_tty(&mut io::stdout(), msg, Term::stdout().is_term());
}

/// `detail`, but only in verbose mode.
pub fn verbose_detail(msg: &str) {
    if is_verbose() {
        detail(msg);
    }
}

/// Captured tool output on stdout (verbose progress).
pub fn stdout_block(heading: &str, text: &str) {
    block_to_with_tty(&mut io::stdout(), heading, text, Term::stdout().is_term());
}

/// Captured tool output on stderr (failures).
pub fn stderr_block(heading: &str, text: &str) {
    block_to_with_tty(&mut io::stderr(), heading, text, Term::stderr().is_term());
}

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}
