//! DNS query construction for probing.
//!
//! Probes only need a well-formed question; the answer is never inspected,
//! so this stays a small wire-format writer instead of a full DNS library.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::{Error, Result};

const HEADER_LEN: usize = 12;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

/// Standard query with recursion desired.
const QUERY_FLAGS: u16 = 0x0100;
const CLASS_IN: u16 = 1;

/// Query name used when none is configured.
pub const DEFAULT_QUERY_NAME: &str = "example.com";

/// DNS record type of the probe question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordType {
    #[default]
    A,
    Ns,
    Cname,
    Soa,
    Ptr,
    Mx,
    Txt,
    Aaaa,
    Srv,
    Https,
    Other(u16),
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Ptr => 12,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Srv => 33,
            RecordType::Https => 65,
            RecordType::Other(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            6 => RecordType::Soa,
            12 => RecordType::Ptr,
            15 => RecordType::Mx,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            33 => RecordType::Srv,
            65 => RecordType::Https,
            other => RecordType::Other(other),
        }
    }
}

impl FromStr for RecordType {
    type Err = Error;

    /// Accepts mnemonics (`A`, `aaaa`), `TYPE<n>` or a bare number.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let parsed = match upper.as_str() {
            "A" => RecordType::A,
            "NS" => RecordType::Ns,
            "CNAME" => RecordType::Cname,
            "SOA" => RecordType::Soa,
            "PTR" => RecordType::Ptr,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "AAAA" => RecordType::Aaaa,
            "SRV" => RecordType::Srv,
            "HTTPS" => RecordType::Https,
            other => {
                let digits = other.strip_prefix("TYPE").unwrap_or(other);
                let code = digits
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidRecordType(s.to_string()))?;
                RecordType::from_code(code)
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Ns => f.write_str("NS"),
            RecordType::Cname => f.write_str("CNAME"),
            RecordType::Soa => f.write_str("SOA"),
            RecordType::Ptr => f.write_str("PTR"),
            RecordType::Mx => f.write_str("MX"),
            RecordType::Txt => f.write_str("TXT"),
            RecordType::Aaaa => f.write_str("AAAA"),
            RecordType::Srv => f.write_str("SRV"),
            RecordType::Https => f.write_str("HTTPS"),
            RecordType::Other(code) => write!(f, "TYPE{}", code),
        }
    }
}

/// A single-question DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub id: u16,
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuery {
    /// Build a query for `name` with a random transaction ID.
    ///
    /// Fails with [`Error::InvalidQueryName`] if `name` cannot be encoded.
    pub fn new(name: &str, record_type: RecordType) -> Result<Self> {
        Self::with_id(rand::random(), name, record_type)
    }

    /// Build a query with a fixed transaction ID.
    pub fn with_id(id: u16, name: &str, record_type: RecordType) -> Result<Self> {
        let domain = validate_name(name)?;

        Ok(Self {
            id,
            domain,
            qtype: record_type.code(),
            qclass: CLASS_IN,
        })
    }

    /// Parse a DNS query from raw bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN + 1 {
            return None;
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let qdcount = u16::from_be_bytes([data[4], data[5]]);
        if qdcount == 0 {
            return None;
        }

        let mut pos = HEADER_LEN;
        let mut labels = Vec::new();

        loop {
            let label_len = *data.get(pos)? as usize;
            pos += 1;
            if label_len == 0 {
                break;
            }
            // Queries never carry compression pointers.
            if label_len > MAX_LABEL_LEN || pos + label_len > data.len() {
                return None;
            }
            let label = std::str::from_utf8(&data[pos..pos + label_len]).ok()?;
            labels.push(label.to_string());
            pos += label_len;
        }

        if labels.is_empty() || pos + 4 > data.len() {
            return None;
        }
        let qtype = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let qclass = u16::from_be_bytes([data[pos + 2], data[pos + 3]]);

        Some(Self {
            id,
            domain: labels.join(".").to_lowercase(),
            qtype,
            qclass,
        })
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::from_code(self.qtype)
    }

    /// Encode the query to wire format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_LEN + self.domain.len() + 6);

        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&QUERY_FLAGS.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ANCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ARCOUNT

        encode_domain(&mut data, &self.domain);
        data.extend_from_slice(&self.qtype.to_be_bytes());
        data.extend_from_slice(&self.qclass.to_be_bytes());

        data
    }

    /// Wire format encoded as unpadded base64url, ready for a `dns=` parameter.
    pub fn to_url_param(&self) -> String {
        encode_for_url(&self.to_bytes())
    }
}

/// Encode bytes with the URL-safe base64 alphabet and no `=` padding.
pub fn encode_for_url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an unpadded base64url `dns=` parameter.
pub fn decode_from_url(param: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(param.trim_end_matches('=')).ok()
}

fn encode_domain(buf: &mut Vec<u8>, domain: &str) {
    for label in domain.split('.') {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// Check that `name` fits in a DNS question; returns it without the trailing dot.
fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(Error::invalid_name(name, "empty name"));
    }

    // Length bytes plus the root label.
    let mut wire_len = 1;
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(Error::invalid_name(name, "empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::invalid_name(name, "label longer than 63 bytes"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(Error::invalid_name(name, "label contains invalid characters"));
        }
        wire_len += 1 + label.len();
    }

    if wire_len > MAX_NAME_LEN {
        return Err(Error::invalid_name(name, "name longer than 255 bytes"));
    }

    Ok(trimmed.to_string())
}
