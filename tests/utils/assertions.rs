//! Test assertion helpers for verifying delivered messages
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;

use super::mocks::MockChannel;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Asserts the channel received at least one message of the given type and
/// returns the last one.
pub async fn assert_received(channel: &MockChannel, message_type: &str) -> Value {
    let matching = channel.messages_of_type(message_type).await;
    assert!(
        !matching.is_empty(),
        "expected a '{message_type}' message, got types {:?}",
        channel.message_types().await
    );
    matching.last().cloned().unwrap()
}

/// Asserts the channel received no message of the given type.
pub async fn assert_not_received(channel: &MockChannel, message_type: &str) {
    let matching = channel.messages_of_type(message_type).await;
    assert!(
        matching.is_empty(),
        "expected no '{message_type}' message, got {matching:?}"
    );
}

/// Member ids carried by a `participants` payload, sorted for comparison.
pub fn participant_ids(message: &Value) -> Vec<String> {
    let mut ids: Vec<String> = message["users"]
        .as_array()
        .expect("participants carries a users array")
        .iter()
        .map(|u| u["userId"].as_str().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    ids
}
