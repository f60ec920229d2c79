//! Replacement generation for partial reformatting.
//!
//! Given the finished output and a set of requested character ranges, this
//! produces the minimal set of byte-range edits that make the requested
//! regions byte-identical to a full reformat while leaving everything else
//! untouched. Requested ranges are mapped to token ranges, expanded to the
//! nearest partial-format boundaries, and merged; each merged region is
//! rendered from the output line buffer via the tok-to-line maps.

use std::ops::Range;

use quill_ir::{newlines, RangeSet, Token};
use tracing::debug;

use crate::output::FormatOutput;

/// One edit against the original text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    /// Closed-open byte range in the original text.
    pub range: Range<usize>,
    /// Text that replaces the range.
    pub text: String,
}

impl Replacement {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Replacement {
        Replacement {
            range,
            text: text.into(),
        }
    }
}

/// Apply a non-overlapping replacement set. Edits are applied in
/// descending-start order so earlier offsets stay valid.
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> String {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut out = text.to_owned();
    for replacement in ordered {
        let start = replacement.range.start.min(out.len());
        let end = replacement.range.end.min(out.len());
        out.replace_range(start..end, &replacement.text);
    }
    out
}

/// The boundary region containing tok `k`, if any.
fn region_containing(boundaries: &[(usize, usize)], k: usize) -> Option<(usize, usize)> {
    let idx = boundaries.partition_point(|&(start, _)| start <= k);
    let candidate = *boundaries.get(idx.checked_sub(1)?)?;
    (candidate.0 <= k && k <= candidate.1).then_some(candidate)
}

/// Expand a closed tok range to partial-format boundaries. A range whose
/// ends fall outside every boundary region cannot be reformatted in
/// isolation and contributes nothing.
fn expand_to_boundaries(
    boundaries: &[(usize, usize)],
    lo: usize,
    hi: usize,
) -> Option<(usize, usize)> {
    let lo_region = region_containing(boundaries, lo)?;
    let hi_region = region_containing(boundaries, hi)?;
    Some((lo_region.0, hi_region.1))
}

pub(crate) fn generate(out: &FormatOutput<'_>, requested: &[Range<usize>]) -> Vec<Replacement> {
    let input = out.input();
    let text = input.text();
    let bytes = text.as_bytes();
    let sep = out.options().line_separator.clone();

    // Requested character ranges become merged, boundary-aligned tok
    // regions. Whitespace-only requests map to no tokens and drop out here.
    let mut regions = RangeSet::new();
    for range in requested {
        let length = range.end.saturating_sub(range.start);
        let tok_range = input.character_range_to_tok_range(range.start, length);
        let Some((lo, hi_excl)) = tok_range.bounds() else {
            continue;
        };
        let Some((lo, hi)) = expand_to_boundaries(out.boundaries(), lo, hi_excl - 1) else {
            continue;
        };
        regions.add(lo, hi + 1);
    }

    let mut replacements = Vec::new();
    for region in regions.iter() {
        let lo = region.start;
        let hi = region.end - 1;
        let (Some(start_tok), Some(end_tok)) = (
            input.token_at_tok(lo).map(Token::start_tok),
            input.token_at_tok(hi).map(Token::end_tok),
        ) else {
            continue;
        };
        let (Some(start_k), Some(end_k)) = (start_tok.index, end_tok.index) else {
            continue;
        };
        let (Some(start_lines), Some(end_lines)) =
            (out.tok_line_range(start_k), out.tok_line_range(end_k))
        else {
            continue;
        };
        if out.line_count() == 0 {
            continue;
        }

        // Absorb whitespace before the first tok; the replacement restores
        // layout from the formatted output instead.
        let mut replace_from = start_tok.position;
        while replace_from > 0 && bytes[replace_from - 1].is_ascii_whitespace() {
            replace_from -= 1;
        }

        let first_line = start_lines.start;
        // The end-of-input tok sits on a phantom line one past the buffer.
        let last_line = end_lines
            .end
            .saturating_sub(1)
            .min(out.line_count().saturating_sub(1));
        let mut replacement_text = String::new();
        if replace_from > 0 {
            // The edit begins right after earlier content: open on a fresh
            // line, re-emitting any blank separation the output carries.
            replacement_text.push_str(&sep);
            let mut j = first_line;
            while j > 0 && out.line(j - 1).is_empty() {
                replacement_text.push_str(&sep);
                j -= 1;
            }
        }
        for j in first_line..=last_line {
            if j > first_line {
                replacement_text.push_str(&sep);
            }
            replacement_text.push_str(out.line(j));
        }

        // Absorb horizontal whitespace and at most one line terminator
        // after the last tok; whatever terminator bordered the original
        // span closes the replacement, keeping the following line's
        // indentation untouched.
        let mut replace_to = (end_tok.position + end_tok.len()).min(text.len());
        let mut trailing: Option<&str> = None;
        if hi + 1 >= input.tok_count() {
            // The region reaches the end of input; take the rest.
            replace_to = text.len();
        } else {
            while replace_to < text.len() && matches!(bytes[replace_to], b' ' | b'\t') {
                replace_to += 1;
            }
            if let Some(nl) = newlines::newline_at(text, replace_to) {
                trailing = Some(&text[replace_to..replace_to + nl]);
                replace_to += nl;
            }
        }
        replacement_text.push_str(trailing.unwrap_or(&sep));

        replacements.push(Replacement::new(replace_from..replace_to, replacement_text));
    }
    debug!(
        requested = requested.len(),
        emitted = replacements.len(),
        "replacement generation"
    );
    replacements
}
