//! Strategy traits for each step of a transaction.

use super::connection::Connection;
use crate::domain::{Request, Response, TransactionError};

/// Sink for raw request and response bytes.
pub trait PacketDump: Send + Sync {
    fn dump(&self, bytes: &[u8]);
}

impl<F> PacketDump for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn dump(&self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Reads one request off a connection.
pub trait ReceiveStrategy: Send + Sync {
    fn receive(
        &self,
        connection: &mut dyn Connection,
        dump: Option<&dyn PacketDump>,
    ) -> Result<Request, TransactionError>;
}

impl<F> ReceiveStrategy for F
where
    F: Fn(&mut dyn Connection, Option<&dyn PacketDump>) -> Result<Request, TransactionError>
        + Send
        + Sync,
{
    fn receive(
        &self,
        connection: &mut dyn Connection,
        dump: Option<&dyn PacketDump>,
    ) -> Result<Request, TransactionError> {
        self(connection, dump)
    }
}

/// Writes one response, returning the bytes sent.
pub trait SendStrategy: Send + Sync {
    fn send(
        &self,
        connection: &mut dyn Connection,
        response: &Response,
        dump: Option<&dyn PacketDump>,
    ) -> Result<usize, TransactionError>;
}

impl<F> SendStrategy for F
where
    F: Fn(&mut dyn Connection, &Response, Option<&dyn PacketDump>) -> Result<usize, TransactionError>
        + Send
        + Sync,
{
    fn send(
        &self,
        connection: &mut dyn Connection,
        response: &Response,
        dump: Option<&dyn PacketDump>,
    ) -> Result<usize, TransactionError> {
        self(connection, response, dump)
    }
}

/// Extracts the routing key. `None` or an empty string fails the
/// transaction with `FailedIdent`.
pub trait IdentifyStrategy: Send + Sync {
    fn identify(&self, request: &Request) -> Option<String>;
}

impl<F> IdentifyStrategy for F
where
    F: Fn(&Request) -> Option<String> + Send + Sync,
{
    fn identify(&self, request: &Request) -> Option<String> {
        self(request)
    }
}

/// Derives the cache key. `None` or an empty key skips the cache for this
/// request.
pub trait HashStrategy: Send + Sync {
    fn hash(&self, request: &Request) -> Option<Vec<u8>>;
}

impl<F> HashStrategy for F
where
    F: Fn(&Request) -> Option<Vec<u8>> + Send + Sync,
{
    fn hash(&self, request: &Request) -> Option<Vec<u8>> {
        self(request)
    }
}

/// Deep-copies a response and estimates the copy's memory size.
pub trait CloneStrategy: Send + Sync {
    fn clone_response(&self, response: &Response) -> Option<(Response, usize)>;
}

impl<F> CloneStrategy for F
where
    F: Fn(&Response) -> Option<(Response, usize)> + Send + Sync,
{
    fn clone_response(&self, response: &Response) -> Option<(Response, usize)> {
        self(response)
    }
}

/// Final disposal of a request or response once the dispatcher is done
/// with it.
pub trait ReleaseStrategy<T>: Send + Sync {
    fn release(&self, item: T);
}

impl<T, F> ReleaseStrategy<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn release(&self, item: T) {
        self(item)
    }
}

/// Produces a response for a request. `None` is a null result.
pub trait TransactionHandler: Send + Sync {
    fn handle(&self, request: &Request) -> Option<Response>;
}

impl<F> TransactionHandler for F
where
    F: Fn(&Request) -> Option<Response> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Option<Response> {
        self(request)
    }
}
