// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};

use crate::config::ScanConfig;
use crate::response::Emission;
use crate::scanner::ScanState;

/// Apply tool-call extraction to a stream of text deltas.
///
/// Each delta is processed synchronously as it arrives; emissions are
/// yielded in arrival order, and end-of-stream handling (truncation
/// reporting, holdback flush) runs when the input stream terminates. The
/// emission sequence is the same one [`crate::scan_text`] produces for the
/// concatenated deltas, up to plain-text segmentation at delta boundaries.
pub fn scan_stream<S>(
    input: S,
    config: ScanConfig,
) -> anyhow::Result<impl Stream<Item = Emission> + Send>
where
    S: Stream<Item = String> + Send + 'static,
{
    let mut state = ScanState::new(config)?;
    Ok(stream! {
        pin_mut!(input);
        while let Some(delta) = input.next().await {
            for emission in state.push(&delta) {
                yield emission;
            }
        }
        for emission in state.finish() {
            yield emission;
        }
    })
}
