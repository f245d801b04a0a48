//! Error types for the route table client.
//!
//! Three failure classes are kept apart so the user can tell them apart:
//!
//! - [`ValidationError`]: bad or missing parameters, caught before anything
//!   is sent
//! - [`TransportError`]: the request could not be exchanged with the
//!   forwarding engine, or the engine rejected it
//! - [`DecodeError`]: a response record could not be interpreted
//!
//! A dump wraps transport and decode failures in [`DumpError`] together with
//! the round number and the marker to resume from.

use crate::codec::Operation;
use std::fmt;
use std::io;
use thiserror::Error;
use vrouter_types::{AddressFamily, ParseError, RouteKey};

/// Result type alias for route table client operations.
pub type Result<T> = std::result::Result<T, RtError>;

/// Parameters that do not form a valid request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field the operation needs was not supplied.
    #[error("{operation} on {family} table requires {field}")]
    MissingField {
        operation: Operation,
        family: AddressFamily,
        field: &'static str,
    },

    /// A field was supplied but its value is out of range or inconsistent.
    #[error("invalid {field} for {operation} on {family} table: {reason}")]
    InvalidField {
        operation: Operation,
        family: AddressFamily,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field, .. }
            | ValidationError::InvalidField { field, .. } => field,
        }
    }
}

/// Failures exchanging messages with the forwarding engine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket level failure.
    #[error("netlink {operation} failed: {source}")]
    Socket {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// The generic netlink family is not registered (module not loaded).
    #[error("generic netlink family '{0}' not found; is the vrouter module loaded?")]
    FamilyNotFound(String),

    /// The forwarding engine answered with a negative status.
    #[error("request rejected with error {errno}: {}", os_error(.errno))]
    Rejected { errno: i32 },

    /// No response arrived within the configured receive timeout.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The peer closed the exchange without a status object.
    #[error("response ended without a status")]
    MissingStatus,

    /// The envelope around the records was malformed.
    #[error("malformed response envelope: {0}")]
    Envelope(String),

    /// No transport exists on this platform.
    #[error("netlink transport is not supported on this platform")]
    Unsupported,
}

impl TransportError {
    pub(crate) fn socket(operation: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Socket { operation, source },
        }
    }
}

fn os_error(errno: &i32) -> io::Error {
    io::Error::from_raw_os_error(*errno)
}

/// A response record that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than the fixed header or the declared variable fields.
    #[error("record truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Family tag outside inet, inet6 and bridge.
    #[error("unknown family tag {0}")]
    UnknownFamily(u8),

    /// Operation code not valid in a route object.
    #[error("unknown operation code {0}")]
    UnknownOperation(u8),

    /// Unknown object kind inside a frame.
    #[error("unknown object kind {0}")]
    UnknownObject(u16),

    /// Address bytes not matching the family width.
    #[error("{family} {field} carries {actual} bytes, expected {expected}")]
    AddressSize {
        family: AddressFamily,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A record from another table than the one being dumped.
    #[error("{actual} record in a {expected} dump")]
    FamilyMismatch {
        expected: AddressFamily,
        actual: AddressFamily,
    },

    /// Field value rejected by the key types.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] ParseError),
}

/// Where a failed or interrupted dump can be resumed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint(pub Option<RouteKey>);

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(key) => write!(f, "after {key}"),
            None => f.write_str("from the start"),
        }
    }
}

/// A dump that stopped before the table was exhausted.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("dump round {round} failed (resume {resume}): {source}")]
    Transport {
        round: u32,
        resume: ResumePoint,
        #[source]
        source: TransportError,
    },

    #[error("dump round {round} returned an undecodable record (resume {resume}): {source}")]
    Decode {
        round: u32,
        resume: ResumePoint,
        #[source]
        source: DecodeError,
    },

    #[error("dump round {round} could not be built: {source}")]
    Request {
        round: u32,
        #[source]
        source: ValidationError,
    },

    /// The engine reported more data but returned nothing past the marker.
    #[error("dump round {round} made no progress past the marker (resume {resume})")]
    Stalled { round: u32, resume: ResumePoint },
}

impl DumpError {
    /// Round in which the dump stopped (1-based).
    pub fn round(&self) -> u32 {
        match self {
            DumpError::Transport { round, .. }
            | DumpError::Decode { round, .. }
            | DumpError::Request { round, .. }
            | DumpError::Stalled { round, .. } => *round,
        }
    }

    /// The last key that was fully processed, if any.
    pub fn resume_after(&self) -> Option<RouteKey> {
        match self {
            DumpError::Transport { resume, .. }
            | DumpError::Decode { resume, .. }
            | DumpError::Stalled { resume, .. } => resume.0,
            DumpError::Request { .. } => None,
        }
    }
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Top level error for route table client operations.
#[derive(Debug, Error)]
pub enum RtError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl RtError {
    /// Process exit status for this error: 2 for usage problems, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            RtError::Validation(_) | RtError::Config(_) => 2,
            _ => 1,
        }
    }
}
