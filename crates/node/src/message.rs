//! Fixed-size text messages carried by the event queue.

use core::fmt::{self, Write as _};

use crate::edge::Edge;

/// Size of every queued message in bytes.
pub const MESSAGE_LEN: usize = 32;

/// A human-readable event record padded with NUL bytes to [`MESSAGE_LEN`].
///
/// Messages carry no sequence number and no timestamp; their order is the
/// order in which they entered the queue.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventMessage {
    bytes: [u8; MESSAGE_LEN],
}

impl EventMessage {
    /// Builds a message from `text`, truncated to [`MESSAGE_LEN`] bytes.
    pub fn new(text: &str) -> Self {
        let mut bytes = [0u8; MESSAGE_LEN];
        let len = floor_char_boundary(text, MESSAGE_LEN);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self { bytes }
    }

    /// `"\n Falling edge detected on B1 \n"` and friends.
    pub fn edge(edge: Edge, source: &str) -> Self {
        let mut text = heapless::String::<64>::new();
        // Overlong source labels are cut by `new`; the 64-byte scratch buffer
        // only fails for labels that would be truncated anyway.
        let _ = write!(text, "\n {} edge detected on {} \n", edge.label(), source);
        Self::new(&text)
    }

    /// The text without its NUL padding.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self
            .bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(MESSAGE_LEN);
        &self.bytes[..len]
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    /// All [`MESSAGE_LEN`] bytes including padding.
    pub fn raw(&self) -> &[u8; MESSAGE_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventMessage").field(&self.as_str()).finish()
    }
}

impl fmt::Display for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    if text.len() <= max {
        return text.len();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_messages_match_log_format() {
        assert_eq!(
            EventMessage::edge(Edge::Falling, "B1").as_str(),
            "\n Falling edge detected on B1 \n"
        );
        assert_eq!(
            EventMessage::edge(Edge::Rising, "B2").as_str(),
            "\n Rising edge detected on B2 \n"
        );
    }

    #[test]
    fn padding_is_not_part_of_the_text() {
        let message = EventMessage::new("\n heartbeat \n");
        assert_eq!(message.as_bytes(), b"\n heartbeat \n");
        assert_eq!(message.raw().len(), MESSAGE_LEN);
        assert!(message.raw()[13..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let message = EventMessage::new("0123456789012345678901234567890é");
        assert_eq!(message.as_bytes().len(), 31);

        let exact = EventMessage::new("abcdefghijklmnopqrstuvwxyz012345");
        assert_eq!(exact.as_bytes().len(), MESSAGE_LEN);
        assert_eq!(exact.as_str(), "abcdefghijklmnopqrstuvwxyz012345");
    }

    #[test]
    fn long_source_label_is_cut() {
        let message = EventMessage::edge(Edge::Falling, "VeryLongButtonName");
        assert_eq!(message.as_bytes().len(), MESSAGE_LEN);
        assert!(message.as_str().starts_with("\n Falling edge detected on Very"));
    }
}
