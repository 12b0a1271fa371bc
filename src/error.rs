//! Error types.

use trust_dns_client::rr::{LowerName, RecordType};
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible ACME Mole error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a query names a record this server has no answer for: a
    /// TXT lookup for a name that was never presented, or a CNAME query for
    /// anything but the authoritative domain. Maps to NXDOMAIN on the wire
    /// and is not treated as a failure.
    #[error("no record for \"{0}\"")]
    NameError(LowerName),

    /// Returned for query types outside the supported TXT/CNAME/A/NS/SOA set.
    /// Maps to SERVFAIL and stops processing of the remaining questions in
    /// the message.
    #[error("unimplemented record type {0}")]
    UnimplementedRecordType(RecordType),

    /// Returned by [`RecordStore::get`][crate::store::RecordStore::get] when
    /// the key has no stored value. Absence is not a backend failure.
    #[error("key \"{0}\" not found in store")]
    KeyNotFound(String),

    /// Returned when a store backend fails at init or on a Get/Set/Delete
    /// round trip. On the DNS read path this becomes SERVFAIL; on the
    /// Present/CleanUp path it is surfaced to the controller, which retries.
    #[error("store backend error")]
    Store(#[from] sqlx::Error),

    /// Returned when required identity or store configuration is missing or
    /// malformed at startup. Fatal: the process does not start.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Returned when the configured public address can't be used as A record
    /// rdata for the authoritative domain.
    #[error("\"{0}\" is not an IPv4 address")]
    InvalidAddress(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON (e.g. the `STORE_CONFIG` environment
    /// variable) fails due to invalid content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a DNS name or message can't be parsed or encoded.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
