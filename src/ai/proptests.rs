//! Property-based tests for the normalization layer
//!
//! Invariants covered:
//! - data-URI payloads survive a provider round trip bit-for-bit
//! - extraction is deterministic (same raw body, same outcome)
//! - classification flags every non-success reason, retries only NO_IMAGE
//! - MIME sniffing and data-URI construction agree

use super::classify::classify;
use super::extract::{extract_chat, generation_id};
use super::types::{ImageInput, Payload};
use base64::Engine as _;
use proptest::prelude::*;
use serde_json::json;

fn arb_image_format() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("png"),
        Just("jpeg"),
        Just("gif"),
        Just("webp"),
    ]
}

fn arb_image_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..256)
}

/// Finish reasons that are neither success synonyms nor NO_IMAGE. The
/// strategy only emits uppercase, so the lowercase success synonyms cannot
/// collide; "completed" is excluded case-insensitively anyway.
fn arb_error_reason() -> impl Strategy<Value = String> {
    "[A-Z_]{1,20}".prop_filter("must not be a success reason", |r| {
        r != "STOP" && r != "NO_IMAGE" && !r.eq_ignore_ascii_case("completed")
    })
}

proptest! {
    #[test]
    fn prop_data_uri_round_trip(bytes in arb_image_bytes(), format in arb_image_format()) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let raw = json!({"choices": [{"message": {"images": [
            {"image_url": {"url": format!("data:image/{format};base64,{encoded}")}}
        ]}}]});

        match extract_chat(&raw).payload {
            Payload::Image { bytes: decoded, format: got } => {
                prop_assert_eq!(decoded, bytes);
                prop_assert_eq!(got, format);
            }
            other => prop_assert!(false, "expected Image, got {:?}", other),
        }
    }

    #[test]
    fn prop_extract_is_deterministic(content in "[a-zA-Z0-9 .,!?]{0,200}", id in proptest::option::of("[a-z0-9-]{4,24}")) {
        let raw = json!({"id": id, "choices": [{"message": {"content": content}}]});
        let first = extract_chat(&raw);
        let second = extract_chat(&raw);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_generation_id_survives_every_shape(id in "[a-z0-9-]{4,24}", content in "[a-z ]{1,50}") {
        let shapes = vec![
            json!({"id": id.as_str(), "choices": [{"message": {"content": content}}]}),
            json!({"id": id.as_str(), "choices": [{"message": {"images": [
                {"image_url": {"url": "data:image/png;base64,AAAA"}}]}}]}),
            json!({"id": id.as_str(), "data": [{"url": "https://x.example/a.png"}]}),
            json!({"id": id.as_str(), "nothing": "recognizable"}),
        ];
        for raw in shapes {
            let chat = extract_chat(&raw);
            prop_assert_eq!(chat.generation_id.as_deref(), Some(id.as_str()));
            let gen_id = generation_id(&raw);
            prop_assert_eq!(gen_id.as_deref(), Some(id.as_str()));
        }
    }

    #[test]
    fn prop_unknown_native_reason_is_terminal(reason in arb_error_reason()) {
        let raw = json!({"choices": [{"native_finish_reason": reason}]});
        let verdict = classify(&raw);
        prop_assert!(verdict.has_error);
        prop_assert!(!verdict.retryable);
    }

    #[test]
    fn prop_success_reasons_never_error(native in prop_oneof![Just("STOP"), Just("completed"), Just("")],
                                        generic in prop_oneof![Just("stop"), Just("completed"), Just("")]) {
        let raw = json!({"choices": [{
            "native_finish_reason": native,
            "finish_reason": generic
        }]});
        prop_assert!(!classify(&raw).has_error);
    }

    #[test]
    fn prop_data_uri_prefix_matches_sniffed_mime(bytes in arb_image_bytes()) {
        let image = ImageInput { bytes };
        let uri = image.to_data_uri();
        let expected = format!("data:{};base64,", image.mime_type());
        prop_assert!(uri.starts_with(&expected));
        let payload = &uri[expected.len()..];
        let decoded = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        prop_assert_eq!(decoded, image.bytes);
    }

    #[test]
    fn prop_embedded_url_is_extracted(prefix in "[a-zA-Z ,.]{1,40}", path in "[a-z0-9/]{1,20}") {
        prop_assume!(!prefix.contains("http"));
        let url = format!("https://cdn.example.com/{path}");
        let content = format!("{prefix} {url} and more text");
        let raw = json!({"choices": [{"message": {"content": content}}]});
        match extract_chat(&raw).payload {
            Payload::ImageRef { url: got } => prop_assert_eq!(got, url),
            other => prop_assert!(false, "expected ImageRef, got {:?}", other),
        }
    }
}
