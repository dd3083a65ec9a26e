//! DNS message parsing and construction.
//!
//! Only what an address-lookup client needs: building A queries, parsing
//! the answer section of a response (following compression pointers), and
//! building responses so loopback test servers can talk to the client.

use std::net::{IpAddr, Ipv4Addr};

use crate::answer::AnswerSet;

pub const HEADER_LEN: usize = 12;
pub const TYPE_A: u16 = 1;
pub const CLASS_IN: u16 = 1;

pub const FLAG_QR: u16 = 0x8000;
pub const FLAG_TC: u16 = 0x0200;
pub const FLAG_RD: u16 = 0x0100;
pub const FLAG_RA: u16 = 0x0080;

pub const RCODE_NOERROR: u8 = 0;
pub const RCODE_SERVFAIL: u8 = 2;
pub const RCODE_NXDOMAIN: u8 = 3;
pub const RCODE_REFUSED: u8 = 5;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_JUMPS: usize = 16;

/// A parsed DNS query.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub id: u16,
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuery {
    /// Build an IN A query for `domain`.
    ///
    /// Returns `None` if `domain` cannot be encoded as a DNS name. A single
    /// trailing dot is accepted and dropped.
    pub fn address(id: u16, domain: &str) -> Option<Self> {
        let domain = domain.strip_suffix('.').unwrap_or(domain);
        if domain.is_empty() {
            return None;
        }

        let mut encoded_len = 1;
        for label in domain.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return None;
            }
            encoded_len += 1 + label.len();
        }
        if encoded_len > MAX_NAME_LEN {
            return None;
        }

        Some(Self {
            id,
            domain: domain.to_lowercase(),
            qtype: TYPE_A,
            qclass: CLASS_IN,
        })
    }

    /// Parse a DNS query from raw bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN + 1 {
            return None;
        }

        let id = u16::from_be_bytes([data[0], data[1]]);

        // Parse domain name
        let mut pos = HEADER_LEN;
        let mut domain_parts = Vec::new();

        while pos < data.len() {
            let label_len = data[pos] as usize;
            if label_len == 0 {
                pos += 1;
                break;
            }
            pos += 1;
            if pos + label_len > data.len() {
                return None;
            }
            let label = std::str::from_utf8(&data[pos..pos + label_len]).ok()?;
            domain_parts.push(label.to_string());
            pos += label_len;
        }

        if domain_parts.is_empty() {
            return None;
        }

        // Parse QTYPE and QCLASS
        if pos + 4 > data.len() {
            return None;
        }
        let qtype = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let qclass = u16::from_be_bytes([data[pos + 2], data[pos + 3]]);

        Some(Self {
            id,
            domain: domain_parts.join(".").to_lowercase(),
            qtype,
            qclass,
        })
    }

    /// Encode the query to wire format bytes, recursion desired.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_LEN + self.domain.len() + 6);

        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&FLAG_RD.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ANCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ARCOUNT

        encode_domain(&mut data, &self.domain);
        data.extend_from_slice(&self.qtype.to_be_bytes());
        data.extend_from_slice(&self.qclass.to_be_bytes());

        data
    }
}

/// A DNS response.
#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
}

/// A DNS question section entry.
#[derive(Debug, Clone)]
pub struct DnsQuestion {
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// A DNS resource record.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl DnsResponse {
    /// Answer `query` with one A record per address.
    ///
    /// An empty `addrs` yields NXDOMAIN, which is what an honest resolver
    /// says about a name that does not exist.
    pub fn answer(query: &DnsQuery, addrs: &[Ipv4Addr]) -> Self {
        let rcode = if addrs.is_empty() {
            RCODE_NXDOMAIN
        } else {
            RCODE_NOERROR
        };

        Self {
            id: query.id,
            flags: FLAG_QR | FLAG_RD | FLAG_RA | rcode as u16,
            questions: vec![DnsQuestion {
                domain: query.domain.clone(),
                qtype: query.qtype,
                qclass: query.qclass,
            }],
            answers: addrs
                .iter()
                .map(|addr| DnsRecord {
                    name: query.domain.clone(),
                    rtype: TYPE_A,
                    class: CLASS_IN,
                    ttl: 300,
                    rdata: addr.octets().to_vec(),
                })
                .collect(),
        }
    }

    /// An empty response carrying only `rcode`.
    pub fn error(query: &DnsQuery, rcode: u8) -> Self {
        let mut response = Self::answer(query, &[]);
        response.flags = (response.flags & !0x000F) | (rcode & 0x0F) as u16;
        response
    }

    /// Encode the response to wire format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(512);

        // Header
        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&self.flags.to_be_bytes());
        data.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        data.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        data.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ARCOUNT

        // Questions
        for q in &self.questions {
            encode_domain(&mut data, &q.domain);
            data.extend_from_slice(&q.qtype.to_be_bytes());
            data.extend_from_slice(&q.qclass.to_be_bytes());
        }

        // Answers
        for a in &self.answers {
            // Use compression pointer if this is the first question's domain
            if !self.questions.is_empty() && a.name == self.questions[0].domain {
                data.extend_from_slice(&[0xC0, 0x0C]); // Pointer to offset 12
            } else {
                encode_domain(&mut data, &a.name);
            }
            data.extend_from_slice(&a.rtype.to_be_bytes());
            data.extend_from_slice(&a.class.to_be_bytes());
            data.extend_from_slice(&a.ttl.to_be_bytes());
            data.extend_from_slice(&(a.rdata.len() as u16).to_be_bytes());
            data.extend_from_slice(&a.rdata);
        }

        data
    }

    /// Parse the header, question and answer sections of a response.
    ///
    /// Authority and additional sections are ignored.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }

        let id = read_u16(data, 0)?;
        let flags = read_u16(data, 2)?;
        let qdcount = read_u16(data, 4)? as usize;
        let ancount = read_u16(data, 6)? as usize;

        let mut pos = HEADER_LEN;

        let mut questions = Vec::with_capacity(qdcount.min(4));
        for _ in 0..qdcount {
            let (domain, next) = read_name(data, pos)?;
            questions.push(DnsQuestion {
                domain,
                qtype: read_u16(data, next)?,
                qclass: read_u16(data, next + 2)?,
            });
            pos = next + 4;
        }

        let mut answers = Vec::with_capacity(ancount.min(32));
        for _ in 0..ancount {
            let (name, next) = read_name(data, pos)?;
            let rtype = read_u16(data, next)?;
            let class = read_u16(data, next + 2)?;
            let ttl = u32::from_be_bytes(data.get(next + 4..next + 8)?.try_into().ok()?);
            let rdlength = read_u16(data, next + 8)? as usize;
            let start = next + 10;
            let rdata = data.get(start..start + rdlength)?.to_vec();
            answers.push(DnsRecord {
                name,
                rtype,
                class,
                ttl,
                rdata,
            });
            pos = start + rdlength;
        }

        Some(Self {
            id,
            flags,
            questions,
            answers,
        })
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_QR != 0
    }

    pub fn is_truncated(&self) -> bool {
        self.flags & FLAG_TC != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }

    /// The IN A addresses in the answer section. Other record types
    /// (CNAMEs in a chain, stray AAAA) are skipped.
    pub fn addresses(&self) -> AnswerSet {
        self.answers
            .iter()
            .filter(|r| r.rtype == TYPE_A && r.class == CLASS_IN)
            .filter_map(|r| {
                let octets: [u8; 4] = r.rdata.as_slice().try_into().ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            })
            .collect()
    }
}

fn encode_domain(buf: &mut Vec<u8>, domain: &str) {
    for label in domain.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a possibly compressed name starting at `pos`.
///
/// Returns the name and the offset just past it in the original stream.
fn read_name(data: &[u8], mut pos: usize) -> Option<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut end = None;
    let mut jumps = 0;

    loop {
        let len = *data.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len & 0xC0 == 0xC0 {
            let low = *data.get(pos + 1)? as usize;
            if end.is_none() {
                end = Some(pos + 2);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return None;
            }
            pos = ((len & 0x3F) << 8) | low;
            continue;
        }
        if len > MAX_LABEL_LEN {
            return None;
        }
        let label = data.get(pos + 1..pos + 1 + len)?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += 1 + len;
    }

    Some((labels.join(".").to_lowercase(), end.unwrap_or(pos)))
}
