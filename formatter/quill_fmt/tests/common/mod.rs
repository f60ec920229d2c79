//! Shared test support: a small lexer and a statement-language visitor,
//! standing in for the external collaborators that feed the engine.
//!
//! The toy language is C-shaped: `name = call(args, ...);` statements,
//! `{ ... }` blocks, `//` line comments and `/* */` block comments
//! (`/** */` for documentation). It is deliberately tiny; the point is to
//! drive the whole pipeline the way a real visitor would.

#![allow(dead_code)]

use std::ops::Range;

use quill_fmt::{
    apply_replacements, BlankLineWanted, FillMode, FormatEngine, FormatOptions, Indent, OpsBuilder,
    Replacement,
};
use quill_ir::{newlines, Tok, TokKind, Token, TokenModel};

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lex `source` into a token model. Every byte is covered by exactly one
/// tok; tokens and comments are numbered; a final empty token holds
/// whatever trails the last real token.
pub fn lex(source: &str) -> TokenModel {
    let bytes = source.as_bytes();
    let mut toks = Vec::new();
    let mut pos = 0;
    let mut column = 0;
    let mut index = 0;
    while pos < source.len() {
        let rest = &source[pos..];
        let (kind, len) = if let Some(nl) = newlines::newline_at(source, pos) {
            (TokKind::Newline, nl)
        } else if rest.starts_with("/*") {
            let end = rest.find("*/").map_or(rest.len(), |i| i + 2);
            let kind = if rest.starts_with("/**") && end > 4 {
                TokKind::DocComment
            } else {
                TokKind::BlockComment
            };
            (kind, end)
        } else if rest.starts_with("//") {
            let end = newlines::first_break(rest).unwrap_or(rest.len());
            (TokKind::LineComment, end)
        } else if bytes[pos] == b' ' || bytes[pos] == b'\t' {
            let mut end = pos;
            while end < source.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
                end += 1;
            }
            (TokKind::Whitespace, end - pos)
        } else if is_word_byte(bytes[pos]) {
            let mut end = pos;
            while end < source.len() && is_word_byte(bytes[end]) {
                end += 1;
            }
            (TokKind::Token, end - pos)
        } else {
            (TokKind::Token, 1)
        };
        let text = &source[pos..pos + len];
        let numbered = !matches!(kind, TokKind::Whitespace | TokKind::Newline);
        let tok_index = if numbered {
            index += 1;
            Some(index - 1)
        } else {
            None
        };
        toks.push(Tok::new(kind, tok_index, pos, column, text));
        column = match text.rfind('\n') {
            Some(i) => text.len() - i - 1,
            None => column + len,
        };
        pos += len;
    }
    // End-of-input token holding trailing comments and whitespace.
    toks.push(Tok::new(
        TokKind::Token,
        Some(index),
        source.len(),
        column,
        "",
    ));

    // Group non-token toks under tokens: trailing toks stay with the token
    // they share a line with, everything else leads the next token.
    let mut tokens = Vec::new();
    let mut k = 0;
    while k < toks.len() {
        let mut before = Vec::new();
        while toks[k].kind != TokKind::Token {
            before.push(toks[k].clone());
            k += 1;
        }
        let tok = toks[k].clone();
        k += 1;
        let mut after = Vec::new();
        while k < toks.len() && toks[k].kind != TokKind::Token && !toks[k].is_newline() {
            let multiline = newlines::contains_breaks(&toks[k].original_text);
            after.push(toks[k].clone());
            k += 1;
            if multiline {
                break;
            }
        }
        tokens.push(Token::new(tok, before, after));
    }
    TokenModel::new(source, tokens)
}

/// Emit ops for the toy statement language: statements separated by forced
/// breaks with input blank lines preserved, call arguments in a +8 level
/// with unified breaks, assignments continuing at +4, and every statement
/// and block marked as a partial-format boundary.
pub fn emit_ops(model: &TokenModel) -> OpsBuilder<'_> {
    let mut builder = OpsBuilder::new(model);
    let texts: Vec<String> = model
        .tokens()
        .iter()
        .map(|token| token.tok.original_text.clone())
        .collect();
    let end = texts.len().saturating_sub(1); // excludes the end-of-input token
    let mut i = 0;
    emit_items(&mut builder, &texts, &mut i, end);
    builder.sync(model.text().len());
    builder.drain();
    builder
}

fn emit_items(builder: &mut OpsBuilder<'_>, texts: &[String], i: &mut usize, end: usize) {
    let mut first = true;
    while *i < end && texts[*i] != "}" {
        builder.mark_for_partial_format();
        if !first {
            builder.blank_line(BlankLineWanted::Preserve);
        }
        first = false;
        if texts[*i] == "{" {
            emit_block(builder, texts, i, end);
        } else {
            emit_statement(builder, texts, i, end);
        }
        builder.forced_break();
    }
}

fn emit_block(builder: &mut OpsBuilder<'_>, texts: &[String], i: &mut usize, end: usize) {
    builder.token("{");
    *i += 1;
    builder.open(Indent::constant(4));
    builder.forced_break();
    emit_items(builder, texts, i, end);
    builder.close();
    builder.forced_break();
    if *i < end && texts[*i] == "}" {
        builder.token("}");
        *i += 1;
    }
}

fn emit_statement(builder: &mut OpsBuilder<'_>, texts: &[String], i: &mut usize, end: usize) {
    builder.open(Indent::ZERO);
    let mut prev_word = false;
    while *i < end {
        let text = texts[*i].as_str();
        *i += 1;
        match text {
            ";" => {
                builder.token(";");
                break;
            }
            "(" => {
                builder.token("(");
                builder.open(Indent::constant(8));
                builder.break_with(FillMode::Unified, "", Indent::ZERO, None);
                prev_word = false;
            }
            ")" => {
                builder.close();
                builder.token(")");
                prev_word = true;
            }
            "," => {
                builder.token(",");
                builder.break_with(FillMode::Unified, " ", Indent::ZERO, None);
                prev_word = false;
            }
            "=" => {
                builder.space();
                builder.token("=");
                builder.break_with(FillMode::Unified, " ", Indent::constant(4), None);
                prev_word = false;
            }
            word => {
                if prev_word {
                    builder.space();
                }
                builder.token(word);
                prev_word = true;
            }
        }
    }
    builder.close();
}

pub fn engine() -> FormatEngine {
    FormatEngine::new(FormatOptions::default())
}

pub fn engine_with_width(max_width: usize) -> FormatEngine {
    FormatEngine::new(FormatOptions {
        max_width,
        ..FormatOptions::default()
    })
}

/// Full format at the default width.
pub fn format_source(source: &str) -> String {
    format_with(source, &engine())
}

pub fn format_with(source: &str, engine: &FormatEngine) -> String {
    let model = lex(source);
    match engine.format_builder(emit_ops(&model)) {
        Ok(out) => out.text(),
        Err(err) => panic!("format failed: {err}"),
    }
}

/// Replacements for the requested character ranges.
pub fn replacements_for(source: &str, ranges: &[Range<usize>]) -> Vec<Replacement> {
    let model = lex(source);
    match engine().format_builder(emit_ops(&model)) {
        Ok(out) => out.format_replacements(ranges),
        Err(err) => panic!("format failed: {err}"),
    }
}

/// Partial format: compute replacements for `ranges` and apply them.
pub fn partial_format(source: &str, ranges: &[Range<usize>]) -> String {
    apply_replacements(source, &replacements_for(source, ranges))
}
