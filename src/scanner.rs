// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental marker scanning
//!
//! [`ScanState`] turns an ordered sequence of text fragments into an ordered
//! sequence of [`Emission`]s, holding back just enough trailing text to
//! resolve markers split across fragment boundaries. Unlike a regex pass
//! over the accumulated text, each fragment is scanned once; work per
//! fragment is proportional to its length.

use anyhow::Context;

use crate::config::ScanConfig;
use crate::decoder;
use crate::matcher::{MarkerMatcher, MarkerScan};
use crate::response::{CallRecord, Emission, ParseErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanMode {
    /// Outside any call; scanning for the start marker.
    Plain,
    /// Start marker seen; accumulating the function name token.
    CallName,
    /// Inside the argument payload; tracking bracket depth and quotes.
    CallBody,
}

/// Per-stream scanner state.
///
/// One instance is scoped to exactly one response stream: feed fragments in
/// arrival order with [`push`](Self::push), then signal end-of-stream with
/// [`finish`](Self::finish). Feeding after `finish` is a caller bug and
/// panics; malformed *data* never does.
pub struct ScanState {
    config: ScanConfig,
    matcher: MarkerMatcher,
    mode: ScanMode,
    /// Plain text held back because it could be a marker prefix; always
    /// shorter than the start marker.
    holdback: String,
    /// The call segment accumulated since the start marker, verbatim.
    call_buf: String,
    /// Structural opens contributed by the start marker itself.
    marker_depth: usize,
    depth: usize,
    depth_was_positive: bool,
    in_string: Option<char>,
    escaped: bool,
    calls_emitted: usize,
    finished: bool,
}

impl ScanState {
    pub fn new(config: ScanConfig) -> anyhow::Result<Self> {
        let matcher = MarkerMatcher::new(vec![config.start_marker.clone()])
            .context("scan config requires a valid start marker")?;
        let marker_depth = config
            .start_marker
            .chars()
            .filter(|c| matches!(c, '(' | '[' | '{'))
            .count();
        Ok(Self {
            config,
            matcher,
            mode: ScanMode::Plain,
            holdback: String::new(),
            call_buf: String::new(),
            marker_depth,
            depth: 0,
            depth_was_positive: false,
            in_string: None,
            escaped: false,
            calls_emitted: 0,
            finished: false,
        })
    }

    /// Feed the next fragment, returning every emission it resolved.
    ///
    /// A single fragment can complete nothing (all of it buffered), one or
    /// several calls, or any mix of plain text and calls.
    pub fn push(&mut self, fragment: &str) -> Vec<Emission> {
        assert!(
            !self.finished,
            "ScanState::push called after finish(); one state is scoped to one stream"
        );

        let mut out = Vec::new();
        let text = if self.holdback.is_empty() {
            fragment.to_string()
        } else {
            let mut text = std::mem::take(&mut self.holdback);
            text.push_str(fragment);
            text
        };

        let mut rest = text.as_str();
        loop {
            match self.mode {
                ScanMode::Plain => match self.matcher.scan(rest) {
                    MarkerScan::Complete { start, end } => {
                        if start > 0 {
                            out.push(Emission::PlainText(rest[..start].to_string()));
                        }
                        self.begin_call(&rest[start..end]);
                        rest = &rest[end..];
                    }
                    MarkerScan::Partial { start } => {
                        if start > 0 {
                            out.push(Emission::PlainText(rest[..start].to_string()));
                        }
                        self.holdback = rest[start..].to_string();
                        debug_assert!(self.holdback.len() < self.matcher.max_pattern_len());
                        tracing::trace!(holdback = %self.holdback, "holding possible marker prefix");
                        break;
                    }
                    MarkerScan::None => {
                        if !rest.is_empty() {
                            out.push(Emission::PlainText(rest.to_string()));
                        }
                        break;
                    }
                },
                ScanMode::CallName | ScanMode::CallBody => {
                    match self.consume_call(rest, &mut out) {
                        Some(consumed) => rest = &rest[consumed..],
                        None => break,
                    }
                }
            }
        }
        out
    }

    /// Signal end-of-stream. A call still being accumulated surfaces as a
    /// truncation error carrying the unfinished buffer verbatim; held-back
    /// plain text is flushed.
    pub fn finish(&mut self) -> Vec<Emission> {
        assert!(
            !self.finished,
            "ScanState::finish called twice; one state is scoped to one stream"
        );
        self.finished = true;

        let mut out = Vec::new();
        if self.mode == ScanMode::Plain {
            if !self.holdback.is_empty() {
                out.push(Emission::PlainText(std::mem::take(&mut self.holdback)));
            }
        } else {
            tracing::debug!("stream ended inside a tool call");
            out.push(Emission::ParseError {
                error: ParseErrorKind::TruncatedStream,
                raw: std::mem::take(&mut self.call_buf),
            });
            self.reset_to_plain();
        }
        out
    }

    fn begin_call(&mut self, marker: &str) {
        tracing::debug!(marker, "tool call marker detected");
        self.call_buf.clear();
        self.call_buf.push_str(marker);
        self.mode = ScanMode::CallName;
        self.depth = self.marker_depth;
        self.depth_was_positive = self.marker_depth > 0;
        self.in_string = None;
        self.escaped = false;
    }

    fn reset_to_plain(&mut self) {
        self.mode = ScanMode::Plain;
        self.depth = 0;
        self.depth_was_positive = false;
        self.in_string = None;
        self.escaped = false;
    }

    /// Whether bracket balance alone may terminate the call. When the start
    /// marker carries no structural opens but an end marker is configured
    /// (fence-style conventions), balance inside the payload is meaningless
    /// as a terminator and only the end marker counts.
    fn balance_terminates(&self) -> bool {
        self.marker_depth > 0 || self.config.end_marker.is_empty()
    }

    /// Consume characters of `input` into the current call. Returns how many
    /// bytes were consumed if the call ended within `input`, or `None` if
    /// all of it was absorbed and the call is still open.
    fn consume_call(&mut self, input: &str, out: &mut Vec<Emission>) -> Option<usize> {
        for (i, c) in input.char_indices() {
            self.call_buf.push(c);

            if self.escaped {
                self.escaped = false;
                continue;
            }
            if let Some(quote) = self.in_string {
                if c == '\\' {
                    self.escaped = true;
                } else if c == quote {
                    self.in_string = None;
                }
                continue;
            }

            match c {
                '"' | '\'' if self.mode == ScanMode::CallBody => {
                    self.in_string = Some(c);
                    continue;
                }
                '(' | '[' | '{' => {
                    self.depth += 1;
                    self.depth_was_positive = true;
                    if self.mode == ScanMode::CallName {
                        self.mode = ScanMode::CallBody;
                    }
                }
                ')' | ']' | '}' => {
                    if self.depth == 0 {
                        // A close with nothing open can never balance out.
                        let raw = std::mem::take(&mut self.call_buf);
                        out.push(Emission::ParseError {
                            error: ParseErrorKind::MalformedPayload(
                                "unbalanced closing bracket".to_string(),
                            ),
                            raw,
                        });
                        self.reset_to_plain();
                        return Some(i + c.len_utf8());
                    }
                    self.depth -= 1;
                    if self.depth == 0 && self.depth_was_positive && self.balance_terminates() {
                        self.complete_call(out, true);
                        return Some(i + c.len_utf8());
                    }
                }
                _ => {}
            }

            if !self.config.end_marker.is_empty() && self.call_buf.ends_with(&self.config.end_marker)
            {
                self.complete_call(out, false);
                return Some(i + c.len_utf8());
            }
        }
        None
    }

    fn complete_call(&mut self, out: &mut Vec<Emission>, via_balance: bool) {
        let raw = std::mem::take(&mut self.call_buf);
        let mut body = &raw[self.config.start_marker.len()..];
        if via_balance {
            // The trailing closers that re-balanced the start marker's own
            // opens belong to the markers, not the payload.
            for _ in 0..self.marker_depth {
                match body.strip_suffix(|c: char| matches!(c, ')' | ']' | '}')) {
                    Some(stripped) => body = stripped,
                    None => break,
                }
            }
        } else {
            body = body.strip_suffix(&self.config.end_marker).unwrap_or(body);
        }
        let body = body.trim();

        tracing::debug!(body, "tool call segment complete");
        match decoder::decode_call(body) {
            Ok(decoded) => {
                self.calls_emitted += 1;
                out.push(Emission::ToolCall(CallRecord {
                    id: format!("call-{}", self.calls_emitted),
                    name: decoded.name,
                    arguments: decoded.arguments,
                    raw,
                    annotations: decoded.annotations,
                }));
            }
            Err(error) => {
                tracing::debug!(%error, "tool call body failed to decode");
                out.push(Emission::ParseError { error, raw });
            }
        }
        self.reset_to_plain();
    }
}

/// Batch entry point: scan a complete response text in one go.
///
/// Equivalent to feeding the whole text as a single fragment followed by
/// end-of-stream, with adjacent plain-text emissions coalesced, so a
/// call-free input yields exactly one `PlainText`.
pub fn scan_text(text: &str, config: &ScanConfig) -> anyhow::Result<Vec<Emission>> {
    let mut state = ScanState::new(config.clone())?;
    let mut emissions = state.push(text);
    emissions.extend(state.finish());
    Ok(coalesce_plain_text(emissions))
}

/// Merge runs of adjacent `PlainText` emissions. Fragment boundaries can
/// split one logical run of text into several emissions; coalescing gives a
/// canonical sequence for comparing streamed and batch output.
pub fn coalesce_plain_text(emissions: Vec<Emission>) -> Vec<Emission> {
    let mut out: Vec<Emission> = Vec::with_capacity(emissions.len());
    for emission in emissions {
        match (out.last_mut(), emission) {
            (Some(Emission::PlainText(prev)), Emission::PlainText(next)) => prev.push_str(&next),
            (_, emission) => out.push(emission),
        }
    }
    out
}
