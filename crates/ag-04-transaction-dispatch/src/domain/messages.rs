//! Request and response payloads exchanged with a connection.

use std::borrow::Cow;

/// Bytes received from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub payload: Vec<u8>,
    /// Peer address, when the connection knows it.
    pub peer: Option<String>,
}

impl Request {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            peer: None,
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Bytes to send back to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Estimated heap plus inline footprint, used as the cache size hint.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Response>() + self.payload.len()
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Response::new(text.as_bytes())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Response::new(text.into_bytes())
    }
}
