//! ACME Mole
//!
//! A minimal authoritative nameserver whose one job is solving
//! [RFC-8555][RFC-8555] [DNS-01] challenges for its own domain: a
//! certificate-management controller presents a challenge token, the CA
//! queries the matching `_acme-challenge` TXT record back out of this
//! server, and the controller cleans up. Everything else the server answers
//! (A/NS/SOA/CNAME) is the bare minimum needed to look authoritative while
//! that happens.
//!
//! Challenge tokens live in a pluggable byte-oriented [store][crate::store]
//! (in-memory, SQLite or PostgreSQL), keyed by fully-qualified domain name.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod challenge;
pub mod config;
pub mod dns;
pub mod error;
#[doc(hidden)]
pub mod mole;
pub mod store;

pub use api::new as new_api;
pub use challenge::Presenter;
pub use config::{Config, SharedConfig};
pub use dns::new as new_dns;
pub use store::{DynRecordStore, InMemoryStore, PostgresStore, RecordStore, SqliteStore, StoreKind};
