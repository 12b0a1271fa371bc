//! Minimal authoritative DNS-over-UDP server.
//!
//! ACME Mole answers just enough DNS to satisfy [RFC-8555][RFC-8555]
//! [DNS-01] challenge validation against itself. Five query types are
//! supported, every synthesized record has a 5 second TTL, and at most one
//! record is returned per question.
//!
//! # TXT
//!
//! The dynamic path. A `TXT` query is answered with the challenge token most
//! recently [presented][crate::challenge::Presenter::present] for the
//! queried name, looked up in the [record store][crate::store] by the
//! lowercase dot-terminated form of the name. A name with no presented token
//! is NXDOMAIN.
//!
//! ```bash
//! ❯ dig @127.0.0.1 +short _acme-challenge.acme.com TXT
//! "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"
//! ```
//!
//! # A and CNAME
//!
//! `A` queries are answered with loopback for every name, except the
//! authoritative domain itself when `PUBLIC_IP` is a literal address, which
//! answers with that address. When `PUBLIC_IP` is instead a CNAME target
//! (any value that doesn't parse as an IP), the domain keeps the loopback
//! `A` answer and a `CNAME` query for the domain returns the target. `CNAME`
//! queries for any other name are NXDOMAIN.
//!
//! # NS and SOA
//!
//! Answered for any queried name, zone membership unchecked, straight from
//! the configured identity. The SOA carries all-zero numeric fields; this
//! server is not a real zone primary and doesn't pretend to publish zone
//! timing metadata.
//!
//! Anything else (MX, AAAA, ...) is a server failure.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

mod handlers;
pub mod server;

pub use server::{new, Server};
