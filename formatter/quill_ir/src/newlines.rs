//! Platform-independent line-terminator handling.
//!
//! All three common terminators (`\r\n`, `\n`, `\r`) are recognized
//! everywhere; the engine emits whatever separator the caller configures.

use std::ops::Range;

use crate::range::RangeSet;

/// The recognized line terminators, longest first so `\r\n` wins over `\r`.
const BREAKS: [&str; 3] = ["\r\n", "\n", "\r"];

/// Count the line breaks in `text`.
pub fn count(text: &str) -> usize {
    let mut n = 0;
    let mut idx = 0;
    let bytes = text.as_bytes();
    while idx < bytes.len() {
        match bytes[idx] {
            b'\r' => {
                n += 1;
                idx += if bytes.get(idx + 1) == Some(&b'\n') { 2 } else { 1 };
            }
            b'\n' => {
                n += 1;
                idx += 1;
            }
            _ => idx += 1,
        }
    }
    n
}

/// Byte offset of the first line break in `text`, or `None`.
pub fn first_break(text: &str) -> Option<usize> {
    text.find(['\n', '\r'])
}

/// Is the entire input a single recognized line break?
pub fn is_newline(text: &str) -> bool {
    BREAKS.contains(&text)
}

/// Length of the line terminator starting at byte `idx`, or `None`.
pub fn newline_at(text: &str, idx: usize) -> Option<usize> {
    BREAKS
        .iter()
        .find(|b| text[idx..].starts_with(**b))
        .map(|b| b.len())
}

/// The terminating line break of `text`, or `None` if it does not end in one.
pub fn trailing(text: &str) -> Option<&'static str> {
    BREAKS.iter().find(|b| text.ends_with(**b)).copied()
}

/// Does `text` contain any line breaks?
pub fn contains_breaks(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// The first line separator in `text`, or `"\n"` if there is none.
pub fn guess_line_separator(text: &str) -> &'static str {
    let bytes = text.as_bytes();
    for (idx, b) in bytes.iter().enumerate() {
        match b {
            b'\r' => {
                if bytes.get(idx + 1) == Some(&b'\n') {
                    return "\r\n";
                }
                return "\r";
            }
            b'\n' => return "\n",
            _ => {}
        }
    }
    "\n"
}

/// Byte offsets of line starts in `text`, always beginning with `0`.
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut idx = 0;
    while idx < text.len() {
        match newline_at(text, idx) {
            Some(len) => {
                idx += len;
                starts.push(idx);
            }
            None => idx += 1,
        }
    }
    starts
}

/// Split `text` into lines without their terminators. A trailing terminator
/// does not produce an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < text.len() {
        match newline_at(text, idx) {
            Some(len) => {
                lines.push(&text[start..idx]);
                idx += len;
                start = idx;
            }
            None => idx += 1,
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Convert zero-indexed closed-open line ranges to character ranges,
/// excluding each range's trailing terminator so that blank lines map to
/// empty ranges. Out-of-range lines are clamped away.
pub fn line_ranges_to_char_ranges(
    text: &str,
    line_ranges: impl IntoIterator<Item = Range<usize>>,
) -> RangeSet {
    let mut starts = line_starts(text);
    starts.push(text.len() + 1);
    let line_count = starts.len() - 1;
    let mut out = RangeSet::new();
    for range in line_ranges {
        let lo = range.start.min(line_count);
        let hi = range.end.min(line_count);
        if lo >= hi {
            continue;
        }
        out.add(starts[lo], starts[hi].saturating_sub(1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mixed_terminators() {
        assert_eq!(count("a\nb\r\nc\rd"), 3);
        assert_eq!(count("no breaks"), 0);
        assert_eq!(count("\r\n"), 1);
    }

    #[test]
    fn first_break_finds_either_kind() {
        assert_eq!(first_break("ab\ncd"), Some(2));
        assert_eq!(first_break("ab\rcd"), Some(2));
        assert_eq!(first_break("abcd"), None);
    }

    #[test]
    fn newline_at_prefers_crlf() {
        assert_eq!(newline_at("a\r\nb", 1), Some(2));
        assert_eq!(newline_at("a\rb", 1), Some(1));
        assert_eq!(newline_at("ab", 1), None);
    }

    #[test]
    fn guesses_dominant_separator() {
        assert_eq!(guess_line_separator("a\r\nb\nc"), "\r\n");
        assert_eq!(guess_line_separator("a\nb"), "\n");
        assert_eq!(guess_line_separator("plain"), "\n");
    }

    #[test]
    fn line_starts_include_origin() {
        assert_eq!(line_starts("ab\ncd\n"), vec![0, 3, 6]);
        assert_eq!(line_starts(""), vec![0]);
    }

    #[test]
    fn split_lines_drops_terminators() {
        assert_eq!(split_lines("ab\r\ncd\n"), vec!["ab", "cd"]);
        assert_eq!(split_lines("ab"), vec!["ab"]);
        assert_eq!(split_lines(""), Vec::<&str>::new());
    }

    #[test]
    fn trailing_terminator() {
        assert_eq!(trailing("x\r\n"), Some("\r\n"));
        assert_eq!(trailing("x\n"), Some("\n"));
        assert_eq!(trailing("x"), None);
    }

    #[test]
    fn line_ranges_map_to_line_bodies() {
        let text = "aa\nbbb\ncc\n";
        let got: Vec<_> = line_ranges_to_char_ranges(text, [1..2]).iter().collect();
        // Line 1 is "bbb", without its terminator.
        assert_eq!(got, vec![3..6]);
    }

    #[test]
    fn line_ranges_clamp_out_of_bounds() {
        let text = "aa\n";
        assert!(line_ranges_to_char_ranges(text, [5..9]).is_empty());
        let got: Vec<_> = line_ranges_to_char_ranges(text, [0..50]).iter().collect();
        assert_eq!(got, vec![0..3]);
    }

    #[test]
    fn separate_line_ranges_stay_separate() {
        let text = "aa\nbb\ncc\n";
        let got: Vec<_> = line_ranges_to_char_ranges(text, [0..1, 1..2]).iter().collect();
        assert_eq!(got, vec![0..2, 3..5]);
    }
}
