// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

/*

- These tests run the full extraction pipeline the way a response assembler
  would drive it: concrete model-output shapes fed whole and as streamed
  deltas, asserting the emission sequences agree. Chunk boundaries are the
  main source of regressions here, so several tests split inputs at every
  position rather than at hand-picked offsets.

- The fenced `tool_code` cases mirror captured Gemma-family output; the
  double-brace cases cover the default convention. Adding a convention means
  adding a preset and mirroring one of the existing test groups so the
  invariants hold for it too.

*/

use dynamo_toolcall::{
    coalesce_plain_text, scan_text, CallRecord, Emission, ParseErrorKind, ScanConfig, ScanState,
};

/// Feed `text` one character at a time and return the coalesced emissions.
fn scan_char_by_char(text: &str, config: &ScanConfig) -> Vec<Emission> {
    let mut state = ScanState::new(config.clone()).unwrap();
    let mut emissions = Vec::new();
    for c in text.chars() {
        emissions.extend(state.push(&c.to_string()));
    }
    emissions.extend(state.finish());
    coalesce_plain_text(emissions)
}

fn expect_call(emission: &Emission) -> &CallRecord {
    match emission {
        Emission::ToolCall(record) => record,
        other => panic!("expected tool call, got {:?}", other),
    }
}

#[test]
fn double_brace_end_to_end() {
    let input = "before {{call: foo(a=1)}} after";
    let emissions = scan_text(input, &ScanConfig::named("default").unwrap()).unwrap();

    assert_eq!(emissions.len(), 3);
    assert_eq!(emissions[0], Emission::PlainText("before ".to_string()));
    let record = expect_call(&emissions[1]);
    assert_eq!(record.name, "foo");
    assert_eq!(record.arguments["a"], 1);
    assert_eq!(emissions[2], Emission::PlainText(" after".to_string()));
}

#[test]
fn tool_code_fenced_output() {
    // Shape captured from a Gemma-family model with the fenced convention.
    let input = "Here's the weather information:\n\n```tool_code\nprint(get_weather(location='Riyadh, Saudi Arabia'))\n```\n\nI'll get that information for you.";
    let config = ScanConfig::tool_code();
    let emissions = scan_text(input, &config).unwrap();

    assert_eq!(emissions.len(), 3);
    assert_eq!(
        emissions[0],
        Emission::PlainText("Here's the weather information:\n\n".to_string())
    );
    let record = expect_call(&emissions[1]);
    assert_eq!(record.name, "get_weather");
    assert_eq!(record.arguments["location"], "Riyadh, Saudi Arabia");
    assert_eq!(
        record.raw,
        "```tool_code\nprint(get_weather(location='Riyadh, Saudi Arabia'))\n```"
    );
    assert_eq!(
        emissions[2],
        Emission::PlainText("\n\nI'll get that information for you.".to_string())
    );

    // Parentheses balancing inside the fence must not end the call early;
    // feeding character by character exercises that along every boundary.
    assert_eq!(scan_char_by_char(input, &config), emissions);
}

#[test]
fn char_by_char_matches_batch() {
    let config = ScanConfig::default();
    let inputs = [
        "no calls at all",
        "before {{call: foo(a=1)}} after",
        "{{call: first(x=1)}}{{call: second(y=\"two, three\")}}",
        "unfinished {{call: f(a=",
        "looks like {{ a call but isn't",
    ];
    for input in inputs {
        assert_eq!(
            scan_char_by_char(input, &config),
            scan_text(input, &config).unwrap(),
            "char-by-char divergence for {:?}",
            input
        );
    }
}

#[test]
fn every_two_fragment_split_matches_batch() {
    let config = ScanConfig::tool_code();
    let input = "ok:\n```tool_code\nprint(lookup(id=42, tags=[\"a\", \"b\"]))\n``` done";
    let batch = scan_text(input, &config).unwrap();
    for split in 0..=input.len() {
        if !input.is_char_boundary(split) {
            continue;
        }
        let mut state = ScanState::new(config.clone()).unwrap();
        let mut emissions = state.push(&input[..split]);
        emissions.extend(state.push(&input[split..]));
        emissions.extend(state.finish());
        assert_eq!(
            coalesce_plain_text(emissions),
            batch,
            "divergence when splitting at byte {}",
            split
        );
    }
}

#[test]
fn round_trip_over_mixed_content() {
    let config = ScanConfig::default();
    let inputs = [
        "text 世界 {{call: f(s=\"héllo\")}} més text",
        "malformed {{call: f(a={\"x\":1)}} rest",
        "two {{call: a(x=1)}}{{call: b(y=2)}} calls",
        "truncated {{call: f(",
        "dangling partial {{",
    ];
    for input in inputs {
        let emissions = scan_text(input, &config).unwrap();
        let rebuilt: String = emissions.iter().map(|e| e.raw_text()).collect();
        assert_eq!(rebuilt, *input, "round trip failed for {:?}", input);
    }
}

#[test]
fn malformed_call_does_not_poison_later_calls() {
    let input = "a {{call: broken(a={\"x\":1)}} b {{call: fine(y=2)}} c";
    let emissions = scan_text(input, &ScanConfig::default()).unwrap();

    assert_eq!(emissions.len(), 5);
    assert!(matches!(
        emissions[1],
        Emission::ParseError {
            error: ParseErrorKind::MalformedPayload(_),
            ..
        }
    ));
    let record = expect_call(&emissions[3]);
    assert_eq!(record.name, "fine");
    // The ordinal counts decoded calls, not attempted segments.
    assert_eq!(record.id, "call-1");
    assert_eq!(emissions[4], Emission::PlainText(" c".to_string()));
}

#[test]
fn truncation_mid_call_keeps_earlier_emissions() {
    let mut state = ScanState::new(ScanConfig::default()).unwrap();
    let mut emissions = state.push("first {{call: done(a=1)}} then {{call: half(b=");
    emissions.extend(state.finish());

    assert_eq!(emissions.len(), 4);
    assert_eq!(expect_call(&emissions[1]).name, "done");
    assert_eq!(emissions[2], Emission::PlainText(" then ".to_string()));
    assert_eq!(
        emissions[3],
        Emission::ParseError {
            error: ParseErrorKind::TruncatedStream,
            raw: "{{call: half(b=".to_string(),
        }
    );
}

#[test]
fn emissions_serialize_to_json() {
    let emissions = scan_text("hi {{call: f(a=1)}}", &ScanConfig::default()).unwrap();
    let json = serde_json::to_string(&emissions).unwrap();
    let back: Vec<Emission> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, emissions);
}
