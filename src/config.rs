// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::OnceLock;

/// Marker convention for one stream of model output.
///
/// The delimiter strings are configuration, not logic: they must stay in
/// lock-step with whatever the prompt template instructs the model to emit,
/// and each scanner instance carries its own copy so concurrent streams can
/// use different conventions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScanConfig {
    /// Literal text that opens a tool-call segment (e.g. `{{call: `).
    pub start_marker: String,
    /// Literal text that closes a tool-call segment. An empty string selects
    /// balanced-bracket termination: the call ends when every structural
    /// bracket opened since the start marker has been closed.
    pub end_marker: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::double_brace()
    }
}

impl ScanConfig {
    /// Double-brace convention:
    /// `{{call: get_weather(location="Paris")}}`
    pub fn double_brace() -> Self {
        Self {
            start_marker: "{{call: ".to_string(),
            end_marker: ")}}".to_string(),
        }
    }

    /// Fenced convention used by Gemma-family models:
    /// ```` ```tool_code\nprint(get_weather(location='Paris'))\n``` ````
    pub fn tool_code() -> Self {
        Self {
            start_marker: "```tool_code".to_string(),
            end_marker: "```".to_string(),
        }
    }

    /// Look up a preset by name, failing with the list of known presets.
    pub fn named(name: &str) -> anyhow::Result<Self> {
        match get_preset_map().get(name) {
            Some(config) => Ok(config.clone()),
            None => anyhow::bail!(
                "marker preset '{}' is not defined. Available presets: {:?}",
                name,
                available_presets()
            ),
        }
    }
}

static PRESET_MAP: OnceLock<HashMap<&'static str, ScanConfig>> = OnceLock::new();

// Always update this map when adding a new preset
pub fn get_preset_map() -> &'static HashMap<&'static str, ScanConfig> {
    PRESET_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("double_brace", ScanConfig::double_brace());
        map.insert("tool_code", ScanConfig::tool_code());
        map.insert("default", ScanConfig::default());
        map
    })
}

pub fn available_presets() -> Vec<&'static str> {
    get_preset_map().keys().copied().collect()
}
