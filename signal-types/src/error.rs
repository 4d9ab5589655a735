//! Error types for the Orion signaling wire format.

/// Errors produced while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame is not a valid JSON object of a known shape.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientMessage;

    #[test]
    fn wire_error_display_includes_cause() {
        let err = ClientMessage::from_json("{").unwrap_err();
        let WireError::Malformed(_) = err;
        assert!(err.to_string().starts_with("malformed frame"));
    }
}
