//! SOCKS command parsing module
//!
//! Handles parsing SOCKS requests and building replies.

mod parser;
mod reply;

pub use parser::{read_host, read_port, read_request, read_version};
pub use reply::{build_reply, send_reply, send_reply_best_effort};
