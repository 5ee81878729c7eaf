// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

use crate::response::ParseErrorKind;

/// A call body decoded into its parts, before the scanner wraps it into a
/// [`crate::CallRecord`] with its raw span and stream ordinal.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    /// Non-fatal issues, currently only [`ParseErrorKind::DuplicateKey`].
    pub annotations: Vec<ParseErrorKind>,
}

/// Decode a raw call body (the text between the markers) into a function
/// name and argument mapping.
///
/// Two payload shapes are accepted: a parenthesized keyword list
/// (`get_weather(location='Paris', days=3)`) and a brace-delimited object
/// (`get_weather {"location": "Paris"}`). Values follow the JSON grammar;
/// single-quoted scalar strings are accepted as well since that is what the
/// fenced python convention produces. A `print(...)` wrapper around the
/// whole call is stripped first, for the same reason.
pub fn decode_call(body: &str) -> Result<DecodedCall, ParseErrorKind> {
    let mut body = body.trim();

    if body.starts_with("print(") && body.ends_with(')') {
        body = body["print(".len()..body.len() - 1].trim();
    }

    let name = parse_name(body)?;
    let payload = body[name.len()..].trim();
    if payload.is_empty() {
        return Err(ParseErrorKind::MalformedPayload(
            "missing argument payload".to_string(),
        ));
    }

    let (arguments, annotations) = if let Some(rest) = payload.strip_prefix('(') {
        // The scanner may have consumed the closing parenthesis together
        // with the end marker, so a missing one is tolerated here.
        let inner = rest.trim_end();
        let inner = inner.strip_suffix(')').unwrap_or(inner);
        parse_entries(inner, PayloadShape::KeywordList)?
    } else if payload.starts_with('{') {
        let inner = payload
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            .ok_or_else(|| {
                ParseErrorKind::MalformedPayload("unterminated argument object".to_string())
            })?;
        parse_entries(inner, PayloadShape::JsonObject)?
    } else {
        return Err(ParseErrorKind::MalformedPayload(format!(
            "expected '(' or '{{' argument payload, found `{}`",
            payload
        )));
    };

    Ok(DecodedCall {
        name: name.to_string(),
        arguments,
        annotations,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PayloadShape {
    /// `key=value, ...` with bare identifier keys
    KeywordList,
    /// `"key": value, ...`
    JsonObject,
}

fn parse_name(body: &str) -> Result<&str, ParseErrorKind> {
    let mut len = 0;
    for (i, c) in body.char_indices() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        };
        if !valid {
            break;
        }
        len = i + c.len_utf8();
    }
    if len == 0 {
        return Err(ParseErrorKind::MissingName);
    }
    Ok(&body[..len])
}

fn parse_entries(
    inner: &str,
    shape: PayloadShape,
) -> Result<(Map<String, Value>, Vec<ParseErrorKind>), ParseErrorKind> {
    let mut arguments = Map::new();
    let mut annotations = Vec::new();

    for piece in split_top_level(inner, ',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let sep = match shape {
            PayloadShape::KeywordList => '=',
            PayloadShape::JsonObject => ':',
        };
        let sep_idx = find_top_level(piece, sep).ok_or_else(|| {
            ParseErrorKind::MalformedPayload(format!("expected `key{}value`, found `{}`", sep, piece))
        })?;

        let key_token = piece[..sep_idx].trim();
        let key = match shape {
            PayloadShape::KeywordList => {
                if key_token.is_empty() {
                    return Err(ParseErrorKind::MalformedPayload(format!(
                        "empty argument name in `{}`",
                        piece
                    )));
                }
                key_token.to_string()
            }
            PayloadShape::JsonObject => serde_json::from_str::<String>(key_token).map_err(|_| {
                ParseErrorKind::MalformedPayload(format!("invalid object key `{}`", key_token))
            })?,
        };

        let value = decode_value(piece[sep_idx + sep.len_utf8()..].trim())?;
        if arguments.insert(key.clone(), value).is_some() {
            annotations.push(ParseErrorKind::DuplicateKey(key));
        }
    }

    Ok((arguments, annotations))
}

/// Split on `sep` occurrences that sit outside quoted literals and outside
/// any nested bracket.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn find_top_level(text: &str, sep: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn decode_value(token: &str) -> Result<Value, ParseErrorKind> {
    if token.starts_with('\'') {
        return decode_single_quoted(token);
    }
    serde_json::from_str(token)
        .map_err(|_| ParseErrorKind::MalformedPayload(format!("invalid literal `{}`", token)))
}

// Single-quoted strings are not JSON; decode them by hand with the usual
// escape set so `location='Riyadh, Saudi Arabia'` round-trips.
fn decode_single_quoted(token: &str) -> Result<Value, ParseErrorKind> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token[1..].chars();
    loop {
        match chars.next() {
            None => {
                return Err(ParseErrorKind::MalformedPayload(format!(
                    "unterminated string literal `{}`",
                    token
                )))
            }
            Some('\'') => break,
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(c @ ('\'' | '"' | '\\')) => out.push(c),
                _ => {
                    return Err(ParseErrorKind::MalformedPayload(format!(
                        "invalid escape in `{}`",
                        token
                    )))
                }
            },
            Some(c) => out.push(c),
        }
    }
    if chars.next().is_some() {
        return Err(ParseErrorKind::MalformedPayload(format!(
            "trailing characters after string literal `{}`",
            token
        )));
    }
    Ok(Value::String(out))
}
