//! Flatten assistant replies into plain-text answers.

use crate::assistant::{Message, MessageContent, Role};

/// Plain-text answers from the assistant's messages, in source order.
///
/// Messages by other roles are skipped. Plain strings are kept as-is,
/// structured items are unwrapped to their nested text, and unrecognized
/// items are dropped.
pub fn flatten_answers(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .flat_map(|message| message.content.iter())
        .filter_map(MessageContent::text)
        .map(str::to_string)
        .collect()
}
