//! Built-in line protocol.
//!
//! | Request | Reply |
//! |---------|-------|
//! | `ping` | `PONG\r\n` |
//! | `echo <text>` | `<text>` as sent |
//! | `status` | server status entries as one JSON line |
//! | anything else | the request, echoed back |
//!
//! Requests are routed by their first token ([`LineIdentifier`]). Status
//! replies are never cached.

use std::sync::Weak;

use ag_04_transaction_dispatch::{
    DispatchError, EchoHandler, HashStrategy, IdentifyStrategy, LineIdentifier, Request,
    Response, Sha256Hash, TransactionDispatcher, DEFAULT_MESSAGE_ID,
};
use ag_05_server::Server;
use tracing::warn;

pub const PING_ID: &str = "ping";
pub const ECHO_ID: &str = "echo";
pub const STATUS_ID: &str = "status";
pub const PONG: &str = "PONG\r\n";

/// Request hash that leaves `status` requests out of the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeHash;

impl HashStrategy for NodeHash {
    fn hash(&self, request: &Request) -> Option<Vec<u8>> {
        if LineIdentifier.identify(request).as_deref() == Some(STATUS_ID) {
            return None;
        }
        Sha256Hash.hash(request)
    }
}

pub fn ping(_: &Request) -> Option<Response> {
    Some(Response::from(PONG))
}

/// Everything after the `echo` token and the whitespace following it.
pub fn echo(request: &Request) -> Option<Response> {
    let text = request.text();
    let rest = text.trim_start().strip_prefix(ECHO_ID)?.trim_start_matches([' ', '\t']);
    (!rest.is_empty()).then(|| Response::new(rest.as_bytes().to_vec()))
}

/// Status entries of `server` as a JSON array terminated by CRLF. `None`
/// once the server is gone or no longer running.
pub fn status(server: &Weak<Server>) -> Option<Response> {
    let server = server.upgrade()?;
    let entries = server.get_status().ok()?;
    match serde_json::to_string(&entries) {
        Ok(mut body) => {
            body.push_str("\r\n");
            Some(Response::new(body))
        }
        Err(e) => {
            warn!(error = %e, "Failed to encode status reply");
            None
        }
    }
}

/// Install the line protocol on `dispatcher`. `server` is held weakly; the
/// server owns the dispatcher.
pub fn register_protocol(
    dispatcher: &TransactionDispatcher,
    server: Weak<Server>,
) -> Result<(), DispatchError> {
    dispatcher.set_identify_strategy(LineIdentifier);
    dispatcher.set_hash_strategy(NodeHash);

    dispatcher.add_handler(false, PING_ID, "ping", ping)?;
    dispatcher.add_handler(false, ECHO_ID, "echo", echo)?;
    dispatcher.add_handler(false, STATUS_ID, "status", move |_: &Request| {
        status(&server)
    })?;
    dispatcher.add_handler(false, DEFAULT_MESSAGE_ID, "echo-all", EchoHandler)?;
    Ok(())
}
