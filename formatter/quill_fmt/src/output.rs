//! Output sink and line buffer.
//!
//! The write pass emits text fragments through the [`Sink`] trait. The real
//! implementation, [`LineSink`], buffers pending whitespace so trailing
//! blanks are dropped and newline runs collapse, follows the input along to
//! decide where blank lines survive, and records which toks land on which
//! output lines. [`LineCounter`] implements the same contract cheaply for
//! callers that only need to know how many lines something would take.

use rustc_hash::FxHashMap;
use std::ops::Range;

use quill_ir::{newlines, LineMaps, Tok, TokRange, TokenModel};

use crate::indent::BreakOutcomes;
use crate::ops::BlankLineWanted;
use crate::options::FormatOptions;

/// Receives the laid-out document in writing order.
pub trait Sink {
    /// Emit a text fragment covering `range` of the input's numbered toks
    /// (empty for structural text like spaces and newlines).
    fn append(&mut self, text: &str, range: TokRange);

    /// Set the leading spaces for the next non-whitespace character. Not an
    /// immediate write.
    fn indent(&mut self, indent: usize);
}

/// Counts the line breaks a subtree would produce, nothing more.
#[derive(Debug, Default)]
pub struct LineCounter {
    breaks: usize,
}

impl LineCounter {
    pub fn new() -> LineCounter {
        LineCounter::default()
    }

    /// Line breaks seen so far.
    pub fn line_breaks(&self) -> usize {
        self.breaks
    }
}

impl Sink for LineCounter {
    fn append(&mut self, text: &str, _range: TokRange) {
        self.breaks += newlines::count(text);
    }

    fn indent(&mut self, _indent: usize) {}
}

/// The real output sink: assembles final lines and the output-side
/// tok-to-line maps while following along the input for blank-line context.
pub struct LineSink<'i, 'a> {
    input: &'i TokenModel,
    blank_lines: &'a FxHashMap<usize, BlankLineWanted>,
    outcomes: &'a BreakOutcomes,
    /// Closest corresponding input line.
    i_line: usize,
    /// End of the last appended tok range.
    last_k: Option<usize>,
    /// Buffered whitespace; dropped if a newline arrives first.
    spaces_pending: String,
    /// Buffered line breaks; more than two never survive.
    newlines_pending: usize,
    line: String,
    lines: Vec<String>,
    maps: LineMaps,
}

impl<'i, 'a> LineSink<'i, 'a> {
    pub fn new(
        input: &'i TokenModel,
        blank_lines: &'a FxHashMap<usize, BlankLineWanted>,
        outcomes: &'a BreakOutcomes,
    ) -> LineSink<'i, 'a> {
        LineSink {
            input,
            blank_lines,
            outcomes,
            i_line: 0,
            last_k: None,
            spaces_pending: String::new(),
            newlines_pending: 0,
            line: String::new(),
            lines: Vec::new(),
            maps: LineMaps::new(),
        }
    }

    /// Decide whether a blank line belongs right before the content in
    /// `range`. Walks the input forward to see whether it skipped blank
    /// lines here, then lets any explicit request at this token win --
    /// except before comments, whose original separation is preserved even
    /// without a request.
    fn resolve_blank_line(&mut self, lo: usize) {
        let mut saw_newlines = false;
        let line_count = self.input.line_count();
        while self.i_line < line_count {
            let ending = self.input.line_maps().ending(self.i_line);
            let passed = match ending.bounds() {
                None => true,
                Some((_, end)) => end <= lo,
            };
            if !passed {
                break;
            }
            if self.input.line_maps().containing(self.i_line).is_empty() {
                saw_newlines = true;
            }
            self.i_line += 1;
        }
        let wanted = self
            .last_k
            .and_then(|k| self.blank_lines.get(&k))
            .and_then(|w| w.wanted(self.outcomes));
        let is_comment = self.input.tok(lo).is_some_and(Tok::is_comment);
        let add_blank = if is_comment {
            saw_newlines || wanted == Some(true)
        } else {
            wanted.unwrap_or(saw_newlines)
        };
        if add_blank {
            self.newlines_pending = self.newlines_pending.max(2);
        }
    }

    fn flush_line(&mut self) {
        // Blank lines at the very start of output are dropped.
        if !self.lines.is_empty() || !self.line.is_empty() {
            let finished = std::mem::take(&mut self.line);
            self.lines.push(finished);
        }
    }

    /// Flush the unfinished line and seal the maps with an end-of-input
    /// entry one line past the end, then package everything the caller
    /// needs to query or patch the result.
    pub fn finish(
        mut self,
        boundaries: Vec<(usize, usize)>,
        options: FormatOptions,
    ) -> FormatOutput<'i> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.lines.push(line);
        }
        if let Some(eof) = self.input.tok_count().checked_sub(1) {
            let eof = TokRange::singleton(eof);
            let line = self.lines.len();
            self.maps.union_starting(line, eof);
            self.maps.union_containing(line, eof);
            self.maps.union_ending(line, eof);
        }
        let tok_lines = self.maps.tok_to_line_map(self.lines.len());
        FormatOutput {
            input: self.input,
            lines: self.lines,
            maps: self.maps,
            tok_lines,
            boundaries,
            options,
        }
    }
}

impl Sink for LineSink<'_, '_> {
    fn append(&mut self, text: &str, range: TokRange) {
        if let Some((lo, _)) = range.bounds() {
            self.resolve_blank_line(lo);
        }
        if newlines::is_newline(text) {
            // A structural line break: never more than one pending from
            // these, and pending spaces before it die.
            self.newlines_pending = self.newlines_pending.max(1);
            self.spaces_pending.clear();
        } else {
            let mut range0_set = false;
            let mut ranges_set = false;
            let mut idx = 0;
            while idx < text.len() {
                if let Some(nl) = newlines::newline_at(text, idx) {
                    self.spaces_pending.clear();
                    self.newlines_pending += 1;
                    idx += nl;
                    continue;
                }
                let Some(ch) = text[idx..].chars().next() else {
                    break;
                };
                idx += ch.len_utf8();
                if ch == ' ' || ch == '\t' {
                    self.spaces_pending.push(ch);
                    continue;
                }
                while self.newlines_pending > 0 {
                    self.flush_line();
                    self.newlines_pending -= 1;
                    ranges_set = false;
                }
                if !self.spaces_pending.is_empty() {
                    self.line.push_str(&self.spaces_pending);
                    self.spaces_pending.clear();
                }
                self.line.push(ch);
                if !range.is_empty() {
                    let current = self.lines.len();
                    if !range0_set {
                        self.maps.union_starting(current, range);
                        range0_set = true;
                    }
                    if !ranges_set {
                        self.maps.union_containing(current, range);
                        ranges_set = true;
                    }
                }
            }
            if !range.is_empty() {
                self.maps.union_ending(self.lines.len(), range);
            }
        }
        if let Some((_, end)) = range.bounds() {
            self.last_k = Some(end);
        }
    }

    fn indent(&mut self, indent: usize) {
        self.spaces_pending.clear();
        for _ in 0..indent {
            self.spaces_pending.push(' ');
        }
    }
}

/// The finished output of one formatting invocation: final lines, the
/// output-side tok maps, and the partial-format boundary set.
#[derive(Debug)]
pub struct FormatOutput<'a> {
    input: &'a TokenModel,
    lines: Vec<String>,
    maps: LineMaps,
    tok_lines: FxHashMap<usize, Range<usize>>,
    /// Closed tok-index ranges where partial reformats may start or stop.
    boundaries: Vec<(usize, usize)>,
    options: FormatOptions,
}

impl<'a> FormatOutput<'a> {
    pub fn input(&self) -> &'a TokenModel {
        self.input
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Output line `j` without its terminator; empty for out-of-range `j`.
    pub fn line(&self, j: usize) -> &str {
        self.lines.get(j).map_or("", String::as_str)
    }

    /// The output-side per-line tok maps.
    pub fn line_maps(&self) -> &LineMaps {
        &self.maps
    }

    /// The closed-open range of output lines the numbered tok `k` lies on.
    pub fn tok_line_range(&self, k: usize) -> Option<Range<usize>> {
        self.tok_lines.get(&k).cloned()
    }

    pub(crate) fn boundaries(&self) -> &[(usize, usize)] {
        &self.boundaries
    }

    /// The full formatted text: every line terminated with the configured
    /// separator. An empty output stays empty.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push_str(&self.options.line_separator);
        }
        out
    }

    /// Minimal edits that reformat the requested character ranges of the
    /// original text; see [`crate::replacement`].
    pub fn format_replacements(&self, requested: &[Range<usize>]) -> Vec<crate::replacement::Replacement> {
        crate::replacement::generate(self, requested)
    }
}
