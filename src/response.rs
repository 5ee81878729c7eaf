// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why a call body (or the stream carrying it) could not be decoded cleanly.
///
/// Every variant surfaces as an [`Emission::ParseError`] or as a non-fatal
/// annotation on a [`CallRecord`]; none of them abort the stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ParseErrorKind {
    /// The argument payload was not well-formed structured data.
    #[error("malformed argument payload: {0}")]
    MalformedPayload(String),
    /// No function name token was found in the call body.
    #[error("missing function name")]
    MissingName,
    /// An argument key appeared more than once; the last occurrence was kept.
    /// Recoverable: attached as an annotation, never a hard failure.
    #[error("duplicate argument key `{0}`, last occurrence kept")]
    DuplicateKey(String),
    /// The stream ended while a call was still being accumulated.
    #[error("stream ended inside a tool call")]
    TruncatedStream,
}

/// A decoded tool call invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Ordinal id within the stream (`call-1`, `call-2`, ...). Deterministic
    /// so identical inputs produce identical emission sequences.
    pub id: String,
    /// The invoked function name.
    pub name: String,
    /// Decoded argument mapping.
    pub arguments: Map<String, Value>,
    /// The original text span the call was decoded from, markers included.
    pub raw: String,
    /// Non-fatal issues noticed while decoding (e.g. duplicate keys).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<ParseErrorKind>,
}

/// One unit of scanner output.
///
/// Concatenating the [`Emission::raw_text`] of every emission in order
/// reconstructs the scanned input exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Emission {
    /// Ordinary content outside any tool call, safe to pass through.
    PlainText(String),
    /// A completed, decoded tool call.
    ToolCall(CallRecord),
    /// A call segment that could not be decoded; `raw` carries the original
    /// span verbatim so the caller can log it or fall back to plain text.
    ParseError { error: ParseErrorKind, raw: String },
}

impl Emission {
    /// The slice of the original input this emission covers.
    pub fn raw_text(&self) -> &str {
        match self {
            Emission::PlainText(text) => text,
            Emission::ToolCall(record) => &record.raw,
            Emission::ParseError { raw, .. } => raw,
        }
    }
}
