// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Streaming extraction of tool call invocations from model output
//!
//! Generative models weave structured function-call invocations into
//! otherwise ordinary text, wrapped in marker conventions the prompt
//! template dictates. This crate separates the two: plain content passes
//! through untouched, completed calls are decoded into normalized
//! [`CallRecord`]s, and malformed segments surface as recoverable
//! [`Emission::ParseError`]s without aborting the stream.
//!
//! The scanner is incremental. Text can arrive as one complete string or as
//! arbitrarily-split deltas; markers straddling a fragment boundary are held
//! back (never more than the marker length minus one) until the next
//! fragment resolves them, and the emission sequence always reconstructs the
//! input exactly.
//!
//! ```
//! use dynamo_toolcall::{scan_text, Emission, ScanConfig};
//!
//! let emissions =
//!     scan_text("before {{call: foo(a=1)}} after", &ScanConfig::default()).unwrap();
//! assert_eq!(emissions.len(), 3);
//! match &emissions[1] {
//!     Emission::ToolCall(record) => {
//!         assert_eq!(record.name, "foo");
//!         assert_eq!(record.arguments["a"], 1);
//!     }
//!     other => panic!("expected a tool call, got {:?}", other),
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod matcher;
pub mod response;
pub mod scanner;
pub mod stream;

// Re-export main types and functions for convenience
pub use config::{available_presets, get_preset_map, ScanConfig};
pub use decoder::{decode_call, DecodedCall};
pub use matcher::{MarkerMatcher, MarkerScan};
pub use response::{CallRecord, Emission, ParseErrorKind};
pub use scanner::{coalesce_plain_text, scan_text, ScanState};
pub use stream::scan_stream;
