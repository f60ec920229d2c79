//! Per-line tok-range maps.
//!
//! Both sides of the pipeline keep the same three maps per line: the toks
//! that begin on the line, the toks lying on it in any part, and the toks
//! that end on it. The replacement generator walks these maps to align
//! input positions with output positions.

use rustc_hash::FxHashMap;
use std::ops::Range;

use crate::newlines;
use crate::range::TokRange;
use crate::tok::Tok;

/// Tok ranges per line. Lines not yet recorded read as empty.
#[derive(Clone, Debug, Default)]
pub struct LineMaps {
    starting: Vec<TokRange>,
    containing: Vec<TokRange>,
    ending: Vec<TokRange>,
}

fn union_at(ranges: &mut Vec<TokRange>, line: usize, range: TokRange) {
    if range.is_empty() {
        return;
    }
    if ranges.len() <= line {
        ranges.resize(line + 1, TokRange::EMPTY);
    }
    ranges[line] = ranges[line].union(range);
}

fn get(ranges: &[TokRange], line: usize) -> TokRange {
    ranges.get(line).copied().unwrap_or(TokRange::EMPTY)
}

impl LineMaps {
    pub fn new() -> LineMaps {
        LineMaps::default()
    }

    /// Build the maps for a fully materialized tok sequence (the input side).
    /// Multi-line toks are recorded on every line they touch.
    pub fn compute<'a>(toks: impl IntoIterator<Item = &'a Tok>) -> LineMaps {
        let mut maps = LineMaps::new();
        let mut line = 0;
        for tok in toks {
            let line0 = line;
            line += newlines::count(&tok.original_text);
            if let Some(k) = tok.index {
                let r = TokRange::singleton(k);
                maps.union_starting(line0, r);
                for i in line0..=line {
                    maps.union_containing(i, r);
                }
                maps.union_ending(line, r);
            }
        }
        maps
    }

    /// Record toks beginning on `line`.
    pub fn union_starting(&mut self, line: usize, range: TokRange) {
        union_at(&mut self.starting, line, range);
    }

    /// Record toks lying on `line` in any part.
    pub fn union_containing(&mut self, line: usize, range: TokRange) {
        union_at(&mut self.containing, line, range);
    }

    /// Record toks ending on `line`.
    pub fn union_ending(&mut self, line: usize, range: TokRange) {
        union_at(&mut self.ending, line, range);
    }

    /// The toks beginning on `line`.
    pub fn starting(&self, line: usize) -> TokRange {
        get(&self.starting, line)
    }

    /// The toks lying on `line` in any part.
    pub fn containing(&self, line: usize) -> TokRange {
        get(&self.containing, line)
    }

    /// The toks ending on `line`.
    pub fn ending(&self, line: usize) -> TokRange {
        get(&self.ending, line)
    }

    /// Invert the per-line map into a per-tok map: each numbered tok index
    /// maps to the closed-open range of lines it lies on. Looks one line
    /// past `line_count` so the end-of-input entry is included.
    pub fn tok_to_line_map(&self, line_count: usize) -> FxHashMap<usize, Range<usize>> {
        let mut map: FxHashMap<usize, Range<usize>> = FxHashMap::default();
        for line in 0..=line_count {
            for k in self.containing(line).indices() {
                map.entry(k)
                    .and_modify(|r| r.end = line + 1)
                    .or_insert(line..line + 1);
            }
        }
        map
    }
}
