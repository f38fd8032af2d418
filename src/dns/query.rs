//! DNS query encoding and response scanning
//!
//! Builds a single-question "A" query and extracts an IPv4 address from the
//! response with a fixed-offset scan rather than a full record walk.

use anyhow::{bail, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

/// Length of the fixed DNS header
pub const DNS_HEADER_LEN: usize = 12;

/// Largest response accepted (no EDNS0)
pub const MAX_RESPONSE_LEN: usize = 512;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

const QTYPE_A: u16 = 1;
const QCLASS_IN: u16 = 1;

/// First byte of a name compression pointer
const COMPRESSION_POINTER: u8 = 0xC0;

/// Build an A/IN query for `domain`
///
/// # Layout
///
/// ```text
/// +----+-------+---------+---------+---------+---------+-------+-------+--------+
/// | ID | FLAGS | QDCOUNT | ANCOUNT | NSCOUNT | ARCOUNT | QNAME | QTYPE | QCLASS |
/// +----+-------+---------+---------+---------+---------+-------+-------+--------+
/// | 2  |   2   |  2 (=1) |  2 (=0) |  2 (=0) |  2 (=0) |  var  | 2 (=1)| 2 (=1) |
/// +----+-------+---------+---------+---------+---------+-------+-------+--------+
/// ```
pub fn build_query(id: u16, domain: &str) -> Result<Bytes> {
    let name = domain.trim_end_matches('.');
    if name.is_empty() {
        bail!("Empty domain name");
    }

    let mut buf = BytesMut::with_capacity(DNS_HEADER_LEN + name.len() + 6);
    buf.put_u16(id);
    buf.put_u16(0); // flags
    buf.put_u16(1); // qdcount
    buf.put_u16(0); // ancount
    buf.put_u16(0); // nscount
    buf.put_u16(0); // arcount

    for label in name.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            bail!("Invalid label in domain name: {:?}", domain);
        }
        buf.put_u8(label.len() as u8);
        buf.put_slice(label.as_bytes());
    }
    buf.put_u8(0);

    buf.put_u16(QTYPE_A);
    buf.put_u16(QCLASS_IN);

    Ok(buf.freeze())
}

/// Extract the IPv4 address from a response to the query with id `id`
///
/// Locates the first `0xC0` byte after the header and reads the four bytes
/// that follow the pointer's second byte. Responses with compression
/// pointers ahead of the answer, or CNAME chains, are misread.
pub fn parse_response(response: &[u8], id: u16) -> Option<Ipv4Addr> {
    if response.len() < DNS_HEADER_LEN {
        return None;
    }
    if u16::from_be_bytes([response[0], response[1]]) != id {
        return None;
    }

    let marker = response[DNS_HEADER_LEN..]
        .iter()
        .position(|&b| b == COMPRESSION_POINTER)?
        + DNS_HEADER_LEN;
    let start = marker + 2;
    let octets: [u8; 4] = response.get(start..start + 4)?.try_into().ok()?;

    Some(Ipv4Addr::from(octets))
}
