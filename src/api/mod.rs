//! HTTP API for presenting and cleaning up challenge records.
//!
//! The certificate-management controller drives this API while solving a
//! [DNS-01] challenge: present the token, let the CA validate against the
//! [DNS server][crate::dns], then clean up. Both operations are idempotent.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the
//!   service is operational.
//!
//! ## `/present` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   { "fqdn": "_acme-challenge.acme.com.", "txt": "XXXXXXXXXXXXXXXXXXXXXXX" }
//!   ```
//!
//!   Stores `txt` under both key variants for `fqdn` (the literal name and
//!   the lowercased name with the authoritative domain appended). Repeating
//!   a present is an overwrite, not an error. Returns HTTP 200 (OK) with the
//!   echoed token:
//!
//!   ```json
//!   { "txt": "XXXXXXXXXXXXXXXXXXXXXXX" }
//!   ```
//!
//!   Tokens that don't look like [RFC-8555][RFC-8555] [DNS-01] challenge
//!   responses (base64url, 32 bytes decoded) are accepted but logged at
//!   warn; non-ACME users of the TXT store are on their own.
//!
//! ## `/cleanup` (POST)
//!
//!   Same body as `/present`. Deletes both key variants for `fqdn`,
//!   whatever token is stored; cleaning up a never-presented name is a
//!   no-op. Returns HTTP 200 (OK) with an empty JSON object `{}`.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
