// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Multi-pattern marker detection with partial suffix matching
//!
//! Finds complete start markers in a chunk of streaming text, and detects
//! marker fragments left dangling at the end of a chunk so they can be held
//! back until the next chunk resolves them. The held suffix is always a
//! proper prefix of a marker, bounding lookahead at (marker length - 1).

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use anyhow::Context;
use std::collections::HashMap;

/// Result of scanning a chunk for markers. All positions are byte offsets
/// into the scanned text and always fall on UTF-8 character boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerScan {
    /// A complete marker occupies `start..end`; everything before `start`
    /// is safe to emit, everything from `end` is unscanned remainder.
    Complete { start: usize, end: usize },
    /// `start..` is a proper prefix of some marker; emit everything before
    /// it and hold the rest until more text arrives.
    Partial { start: usize },
    /// No complete or partial marker anywhere; the whole text is safe.
    None,
}

/// Complete-marker matching via Aho-Corasick plus a character trie for
/// detecting marker prefixes dangling at a chunk boundary.
pub struct MarkerMatcher {
    complete: AhoCorasick,
    prefix_trie: PrefixTrie,
    max_pattern_len: usize,
}

impl MarkerMatcher {
    pub fn new(patterns: Vec<String>) -> anyhow::Result<Self> {
        if patterns.is_empty() || patterns.iter().any(|p| p.is_empty()) {
            anyhow::bail!("marker patterns must be non-empty");
        }

        let complete = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .context("failed to build marker automaton")?;

        let max_pattern_len = patterns.iter().map(|p| p.len()).max().unwrap_or(0);
        let prefix_trie = PrefixTrie::new(&patterns);

        Ok(Self {
            complete,
            prefix_trie,
            max_pattern_len,
        })
    }

    /// Longest pattern length in bytes; an upper bound (exclusive) on how
    /// much text [`MarkerScan::Partial`] can ask the caller to hold.
    pub fn max_pattern_len(&self) -> usize {
        self.max_pattern_len
    }

    /// Scan `text` for the leftmost complete marker, falling back to the
    /// earliest suffix that could still grow into one.
    pub fn scan(&self, text: &str) -> MarkerScan {
        if let Some(mat) = self.complete.find(text) {
            return MarkerScan::Complete {
                start: mat.start(),
                end: mat.end(),
            };
        }

        // No complete match. Look for a partial at ANY suffix position,
        // earliest first, so as much text as possible is released and only
        // the minimal tail is held. "n<T" holds "<T", not the whole chunk.
        for (i, _) in text.char_indices() {
            if self.prefix_trie.is_proper_prefix(&text[i..]) {
                return MarkerScan::Partial { start: i };
            }
        }

        MarkerScan::None
    }
}

/// Trie over pattern characters for prefix queries.
struct PrefixTrie {
    root: TrieNode,
}

#[derive(Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    is_complete: bool,
}

impl PrefixTrie {
    fn new(patterns: &[String]) -> Self {
        let mut root = TrieNode::default();
        for pattern in patterns {
            let mut current = &mut root;
            for ch in pattern.chars() {
                current = current.children.entry(ch).or_default();
            }
            current.is_complete = true;
        }
        PrefixTrie { root }
    }

    /// True if `text` is a prefix of some pattern without being a complete
    /// pattern itself.
    fn is_proper_prefix(&self, text: &str) -> bool {
        let mut current = &self.root;
        for ch in text.chars() {
            match current.children.get(&ch) {
                Some(node) => current = node,
                None => return false,
            }
        }
        !current.is_complete
    }
}
