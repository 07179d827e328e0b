// src/progress.rs

//! Liveness reporting while the queue is non-empty.
//!
//! The scheduler calls [`ProgressReporter::tick`] on every progress tick and
//! [`ProgressReporter::done`] once when the indicator stops. Reporters are
//! purely observational and can be swapped at runtime.

use std::io::{self, Write};

/// Something that shows the user the queue is still working.
pub trait ProgressReporter: Send {
    fn tick(&mut self);
    fn done(&mut self);
}

/// Reporter that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn tick(&mut self) {}
    fn done(&mut self) {}
}

/// Default glyph sequence for [`GlyphSpinner`].
pub const SPINNER_GLYPHS: [char; 4] = ['|', '/', '-', '\\'];

/// Cycles through a fixed glyph sequence, redrawing a single status line.
pub struct GlyphSpinner<W: Write + Send = io::Stderr> {
    label: String,
    glyphs: Vec<char>,
    frame: usize,
    out: W,
}

impl GlyphSpinner<io::Stderr> {
    pub fn stderr(label: impl Into<String>) -> Self {
        Self::new(label, io::stderr())
    }
}

impl<W: Write + Send> GlyphSpinner<W> {
    pub fn new(label: impl Into<String>, out: W) -> Self {
        Self {
            label: label.into(),
            glyphs: SPINNER_GLYPHS.to_vec(),
            frame: 0,
            out,
        }
    }

    /// Glyph shown on the next tick.
    pub fn current_glyph(&self) -> char {
        self.glyphs[self.frame % self.glyphs.len()]
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressReporter for GlyphSpinner<W> {
    fn tick(&mut self) {
        let glyph = self.current_glyph();
        self.frame = (self.frame + 1) % self.glyphs.len();
        // Progress output is best effort.
        let _ = write!(self.out, "\r{} {}", self.label, glyph);
        let _ = self.out.flush();
    }

    fn done(&mut self) {
        self.frame = 0;
        let _ = writeln!(self.out, "\r{} done", self.label);
        let _ = self.out.flush();
    }
}
