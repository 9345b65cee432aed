use crate::types::TicketId;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("no draft ticket with id {0}")]
    UnknownTicket(TicketId),
    #[error("a ticket holds at most {max} numbers, got {got}")]
    TooManyNumbers { got: usize, max: usize },
    #[error("number {0} is outside 1..=35")]
    OutOfRange(u8),
    #[error("number {0} was picked twice")]
    Duplicate(u8),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {reason}")]
    Unreachable { url: String, reason: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: &'static str, status: u16 },
    /// The backend refused the request and said why.
    #[error("{0}")]
    Rejected(String),
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unreadable draw boundary {0:?}")]
    InvalidTimestamp(String),
}

impl BackendError {
    /// Human-readable reason supplied by the backend, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            BackendError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("no user identity yet")]
    MissingIdentity,
    #[error("a deposit address request is already in flight")]
    InFlight,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage key {key:?} is longer than {max} bytes")]
    KeyTooLong { key: String, max: u32 },
    #[error("cannot open storage file {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("cannot encode value for {key:?}: {reason}")]
    Encode { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
