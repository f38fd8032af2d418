//! Minimal DNS client
//!
//! Resolves domain names from SOCKS requests to IPv4 addresses with a single
//! UDP "A" query against a configured server.

mod query;
mod resolver;

pub use query::{build_query, parse_response, DNS_HEADER_LEN, MAX_RESPONSE_LEN};
pub use resolver::Resolver;
