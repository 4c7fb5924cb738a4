//! # Default Strategies
//!
//! What a fresh dispatcher uses until an adapter replaces a step: chunked
//! receive with an adaptive window, plain send, a fixed `default` routing
//! key, SHA-256 request hashing and deep-copy cloning.

use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{Request, Response, TransactionError, DEFAULT_MESSAGE_ID};
use crate::ports::{
    CloneStrategy, Connection, HashStrategy, IdentifyStrategy, PacketDump, ReceiveStrategy,
    SendStrategy, TransactionHandler,
};

/// Longest wait for the first chunk, and the cap on the adaptive window.
pub const DEFAULT_RECEIVE_WINDOW: Duration = Duration::from_millis(2048);

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Multiplier applied to the first chunk's latency to size the window for
/// the rest of the message.
const WINDOW_SCALE: u32 = 1024;

/// Floor on the tail window, so a first chunk that was already buffered
/// still leaves time to pick up the rest of the message.
const MIN_TAIL_WINDOW: Duration = Duration::from_millis(1);

/// Reads a request in chunks until the connection goes quiet.
///
/// The first chunk may take up to `window`. Its latency, scaled by 1024,
/// becomes the budget for the remaining chunks (capped at `window` minus
/// that latency); every later chunk spends from the budget. A fast peer is
/// therefore read with a short tail wait and a slow one with a long one.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedReceiver {
    pub chunk_size: usize,
    pub window: Duration,
}

impl Default for ChunkedReceiver {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            window: DEFAULT_RECEIVE_WINDOW,
        }
    }
}

impl ChunkedReceiver {
    /// Budget for the chunks after the first one.
    fn tail_window(&self, first_chunk: Duration) -> Duration {
        let scaled = first_chunk.saturating_mul(WINDOW_SCALE);
        if scaled > self.window {
            self.window.saturating_sub(first_chunk)
        } else {
            scaled.max(MIN_TAIL_WINDOW)
        }
    }
}

impl ReceiveStrategy for ChunkedReceiver {
    fn receive(
        &self,
        connection: &mut dyn Connection,
        dump: Option<&dyn PacketDump>,
    ) -> Result<Request, TransactionError> {
        let mut payload = Vec::with_capacity(self.chunk_size.max(1024));
        let mut chunk = vec![0u8; self.chunk_size.max(1)];
        let mut remaining = self.window;
        let mut first = true;
        let mut failed = false;

        while !remaining.is_zero() {
            let timer = Instant::now();
            match connection.receive_chunk(&mut chunk, remaining) {
                Ok(read) => payload.extend_from_slice(&chunk[..read]),
                Err(e) => {
                    debug!(error = %e, received = payload.len(), "Receive stopped");
                    failed = true;
                    break;
                }
            }
            let elapsed = timer.elapsed();

            if first {
                remaining = self.tail_window(elapsed);
                first = false;
            } else {
                remaining = remaining.saturating_sub(elapsed);
            }
        }

        if payload.is_empty() {
            return Err(if failed {
                TransactionError::Read
            } else {
                TransactionError::Timeout
            });
        }

        if let Some(dump) = dump {
            dump.dump(&payload);
        }

        let mut request = Request::new(payload);
        request.peer = connection.peer();
        Ok(request)
    }
}

/// Writes the response payload as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSender;

impl SendStrategy for PlainSender {
    fn send(
        &self,
        connection: &mut dyn Connection,
        response: &Response,
        dump: Option<&dyn PacketDump>,
    ) -> Result<usize, TransactionError> {
        if response.is_empty() {
            return Err(TransactionError::InvalidResult);
        }

        connection.send(&response.payload).map_err(|e| {
            debug!(error = %e, "Send failed");
            TransactionError::Write
        })?;

        if let Some(dump) = dump {
            dump.dump(&response.payload);
        }
        Ok(response.len())
    }
}

/// Routes every non-empty request to the `default` handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdentifier;

impl IdentifyStrategy for DefaultIdentifier {
    fn identify(&self, request: &Request) -> Option<String> {
        (!request.is_empty()).then(|| DEFAULT_MESSAGE_ID.to_string())
    }
}

/// Lower-case hex SHA-256 of the request payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hash;

impl HashStrategy for Sha256Hash {
    fn hash(&self, request: &Request) -> Option<Vec<u8>> {
        if request.is_empty() {
            return None;
        }
        let digest = Sha256::digest(&request.payload);
        Some(hex::encode(digest).into_bytes())
    }
}

/// Copies the payload; the size estimate is the payload plus the response
/// struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepClone;

impl CloneStrategy for DeepClone {
    fn clone_response(&self, response: &Response) -> Option<(Response, usize)> {
        if response.is_empty() {
            return None;
        }
        let copy = response.clone();
        let size = copy.memory_size();
        Some((copy, size))
    }
}

/// Replies with the request payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl TransactionHandler for EchoHandler {
    fn handle(&self, request: &Request) -> Option<Response> {
        (!request.is_empty()).then(|| Response::new(request.payload.clone()))
    }
}

/// Release strategy that simply drops the value.
pub fn drop_release<T>(item: T) {
    drop(item);
}
