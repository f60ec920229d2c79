//! Partial reformatting: replacement generation and application.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{format_source, partial_format, replacements_for};
use pretty_assertions::assert_eq;

/// Byte range of the first occurrence of `needle` in `haystack`.
fn span_of(haystack: &str, needle: &str) -> std::ops::Range<usize> {
    let start = haystack.find(needle).unwrap();
    start..start + needle.len()
}

#[test]
fn interior_statement_yields_exactly_one_replacement() {
    let source = "{\n    a = b;\n    cc = dd;\n    e = f;\n}\n";
    let replacements = replacements_for(source, &[span_of(source, "cc")]);
    assert_eq!(replacements.len(), 1);
    let replacement = &replacements[0];
    // The edit absorbs the statement's leading whitespace and ends after
    // its trailing newline; the rest of the block is untouched.
    assert_eq!(
        &source[replacement.range.clone()],
        "\n    cc = dd;\n"
    );
    assert_eq!(replacement.text, "\n    cc = dd;\n");
}

#[test]
fn already_formatted_region_patches_to_itself() {
    let source = "{\n    a = b;\n    cc = dd;\n    e = f;\n}\n";
    assert_eq!(partial_format(source, &[span_of(source, "cc")]), source);
}

#[test]
fn only_the_requested_statement_is_reformatted() {
    let source = "{\n    a   =    b;\n    cc=dd;\n    e =  f;\n}\n";
    let patched = partial_format(source, &[span_of(source, "cc")]);
    assert_eq!(patched, "{\n    a   =    b;\n    cc = dd;\n    e =  f;\n}\n");
}

#[test]
fn bytes_outside_replacement_ranges_are_untouched() {
    let source = "{\n    a   =    b;\n    cc=dd;\n    e =  f;\n}\n";
    let replacements = replacements_for(source, &[span_of(source, "cc")]);
    let patched = common::partial_format(source, &[span_of(source, "cc")]);
    // Everything before the first range and after the last range is
    // byte-identical to the input.
    let first = replacements.first().unwrap();
    assert_eq!(patched[..first.range.start], source[..first.range.start]);
    let last = replacements.last().unwrap();
    assert_eq!(
        patched[patched.len() - (source.len() - last.range.end)..],
        source[last.range.end..]
    );
}

#[test]
fn whitespace_only_selection_yields_nothing() {
    let source = "a = b;\n\nc = d;\n";
    let blank = source.find("\n\n").unwrap() + 1;
    assert!(replacements_for(source, &[blank..blank + 1]).is_empty());
}

#[test]
fn out_of_bounds_request_is_clamped_not_fatal() {
    let source = "a = b;\n";
    let replacements = replacements_for(source, &[5_000..6_000]);
    assert!(replacements.is_empty());
}

#[test]
fn overlapping_requests_merge() {
    let source = "a = b;\ncc = dd;\ne = f;\n";
    let r1 = span_of(source, "cc = dd");
    let r2 = span_of(source, "dd;\ne");
    let replacements = replacements_for(source, &[r1, r2]);
    assert_eq!(replacements.len(), 1);
}

#[test]
fn replacements_are_sorted_and_disjoint() {
    let source = "aa=b;\ncc=dd;\nee=ff;\ngg=hh;\n";
    let ranges = [span_of(source, "aa"), span_of(source, "ee"), span_of(source, "gg")];
    let replacements = replacements_for(source, &ranges);
    for pair in replacements.windows(2) {
        assert!(
            pair[0].range.end <= pair[1].range.start,
            "overlap between {:?} and {:?}",
            pair[0].range,
            pair[1].range
        );
    }
}

#[test]
fn full_range_request_equals_full_format() {
    let source = "{\na=b;\ncc  =  dd(x,y);\n}\n";
    assert_eq!(
        partial_format(source, &[0..source.len()]),
        format_source(source)
    );
}

#[test]
fn partial_format_then_full_format_matches_full_format() {
    let source = "{\na=b;\ncc=dd;\n}\n";
    let patched = partial_format(source, &[span_of(source, "cc")]);
    assert_eq!(format_source(&patched), format_source(source));
}

#[test]
fn zero_length_range_formats_the_statement_under_the_cursor() {
    let source = "a = b;\ncc=dd;\ne = f;\n";
    let cursor = source.find("cc").unwrap();
    let patched = partial_format(source, &[cursor..cursor]);
    assert_eq!(patched, "a = b;\ncc = dd;\ne = f;\n");
}

#[test]
fn blank_separation_survives_partial_format() {
    let source = "a = b;\n\ncc=dd;\n";
    let patched = partial_format(source, &[span_of(source, "cc")]);
    assert_eq!(patched, "a = b;\n\ncc = dd;\n");
}

#[test]
fn line_based_requests_select_statements() {
    let source = "a = b;\ncc=dd;\ne = f;\n";
    let ranges: Vec<_> = quill_ir::newlines::line_ranges_to_char_ranges(source, [1..2])
        .iter()
        .collect();
    let patched = partial_format(source, &ranges);
    assert_eq!(patched, "a = b;\ncc = dd;\ne = f;\n");
}

#[test]
fn replacement_text_uses_the_output_layout() {
    let source = "a = b;\ncc            =          dd;\n";
    let replacements = replacements_for(source, &[span_of(source, "cc")]);
    assert_eq!(replacements.len(), 1);
    assert_eq!(replacements[0].text, "\ncc = dd;\n");
}
