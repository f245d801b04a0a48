//! Wire encoding of route objects and response frames.
//!
//! A frame is a sequence of objects, each prefixed by its kind and length:
//!
//! ```text
//! +----------+------------+------------------------+
//! | kind u16 | length u16 | body (length bytes)    |
//! +----------+------------+------------------------+
//! ```
//!
//! Route objects (kind 1) carry a 28-byte fixed header followed by the
//! variable-length prefix, MAC and marker bytes. Response objects (kind 2)
//! carry a single signed status code. All integers are big-endian.

use crate::error::DecodeError;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Cursor, Read};

/// Object kind of a route object.
pub const OBJECT_ROUTE: u16 = 1;
/// Object kind of a response (status) object.
pub const OBJECT_RESPONSE: u16 = 2;

/// Size of the fixed part of a route object.
pub const ROUTE_HEADER_LEN: usize = 28;
const OBJECT_HEADER_LEN: usize = 4;
const RESPONSE_BODY_LEN: usize = 4;

/// Response code bit set while more dump records are pending.
pub const DUMP_INCOMPLETE: i32 = 0x4000_0000;

/// Label value sent when no label is configured.
pub const NO_LABEL: i32 = -1;

/// Operation requested by a route object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Delete,
    Dump,
}

impl Operation {
    pub const fn code(self) -> u8 {
        match self {
            Operation::Add => 0,
            Operation::Delete => 2,
            Operation::Dump => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(Operation::Add),
            2 => Ok(Operation::Delete),
            3 => Ok(Operation::Dump),
            other => Err(DecodeError::UnknownOperation(other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::Dump => "dump",
        })
    }
}

/// One route object as it travels on the wire, in either direction.
///
/// Requests and response records share this layout; which fields are
/// meaningful depends on the operation and family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMessage {
    pub operation: Operation,
    pub family_tag: u8,
    pub rid: u16,
    pub vrf_id: i32,
    pub next_hop_id: i32,
    pub label: i32,
    pub label_flags: u16,
    pub prefix_len: u8,
    pub replace_prefix_len: u8,
    pub index: i32,
    pub prefix: Vec<u8>,
    pub mac: Vec<u8>,
    pub marker: Vec<u8>,
    pub marker_prefix_len: u8,
}

impl RouteMessage {
    /// An empty message for `operation` on the family with wire tag `family_tag`.
    pub fn new(operation: Operation, family_tag: u8) -> Self {
        Self {
            operation,
            family_tag,
            rid: 0,
            vrf_id: 0,
            next_hop_id: 0,
            label: NO_LABEL,
            label_flags: 0,
            prefix_len: 0,
            replace_prefix_len: 0,
            index: -1,
            prefix: Vec::new(),
            mac: Vec::new(),
            marker: Vec::new(),
            marker_prefix_len: 0,
        }
    }

    /// Encoded body length.
    pub fn encoded_len(&self) -> usize {
        ROUTE_HEADER_LEN + self.prefix.len() + self.mac.len() + self.marker.len()
    }

    /// Encodes the route object body (without the object header).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_body(&mut buf);
        buf
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        // Writes into a Vec cannot fail.
        let _ = self.try_write_body(buf);
    }

    fn try_write_body(&self, buf: &mut Vec<u8>) -> std::io::Result<()> {
        buf.write_u8(self.operation.code())?;
        buf.write_u8(self.family_tag)?;
        buf.write_u16::<BigEndian>(self.rid)?;
        buf.write_i32::<BigEndian>(self.vrf_id)?;
        buf.write_i32::<BigEndian>(self.next_hop_id)?;
        buf.write_i32::<BigEndian>(self.label)?;
        buf.write_u16::<BigEndian>(self.label_flags)?;
        buf.write_u8(self.prefix_len)?;
        buf.write_u8(self.replace_prefix_len)?;
        buf.write_i32::<BigEndian>(self.index)?;
        buf.write_u8(field_len(&self.prefix))?;
        buf.write_u8(field_len(&self.mac))?;
        buf.write_u8(field_len(&self.marker))?;
        buf.write_u8(self.marker_prefix_len)?;
        buf.extend_from_slice(&self.prefix);
        buf.extend_from_slice(&self.mac);
        buf.extend_from_slice(&self.marker);
        Ok(())
    }

    /// Decodes a route object body.
    ///
    /// Only the envelope is checked here: the fixed header must be present
    /// and the declared variable fields must fit. Family specific checks
    /// belong to the response decoder.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() < ROUTE_HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: ROUTE_HEADER_LEN,
                actual: body.len(),
            });
        }

        let mut cur = Cursor::new(body);
        let header = read_header(&mut cur).map_err(|_| DecodeError::Truncated {
            needed: ROUTE_HEADER_LEN,
            actual: body.len(),
        })?;

        let needed = ROUTE_HEADER_LEN
            + usize::from(header.prefix_size)
            + usize::from(header.mac_size)
            + usize::from(header.marker_size);
        if body.len() < needed {
            return Err(DecodeError::Truncated {
                needed,
                actual: body.len(),
            });
        }

        let truncated = |_| DecodeError::Truncated {
            needed,
            actual: body.len(),
        };
        let prefix = read_vec(&mut cur, header.prefix_size).map_err(truncated)?;
        let mac = read_vec(&mut cur, header.mac_size).map_err(truncated)?;
        let marker = read_vec(&mut cur, header.marker_size).map_err(truncated)?;

        Ok(Self {
            operation: Operation::from_code(header.op)?,
            family_tag: header.family_tag,
            rid: header.rid,
            vrf_id: header.vrf_id,
            next_hop_id: header.next_hop_id,
            label: header.label,
            label_flags: header.label_flags,
            prefix_len: header.prefix_len,
            replace_prefix_len: header.replace_prefix_len,
            index: header.index,
            prefix,
            mac,
            marker,
            marker_prefix_len: header.marker_prefix_len,
        })
    }
}

struct RawHeader {
    op: u8,
    family_tag: u8,
    rid: u16,
    vrf_id: i32,
    next_hop_id: i32,
    label: i32,
    label_flags: u16,
    prefix_len: u8,
    replace_prefix_len: u8,
    index: i32,
    prefix_size: u8,
    mac_size: u8,
    marker_size: u8,
    marker_prefix_len: u8,
}

fn read_header(cur: &mut Cursor<&[u8]>) -> std::io::Result<RawHeader> {
    Ok(RawHeader {
        op: cur.read_u8()?,
        family_tag: cur.read_u8()?,
        rid: cur.read_u16::<BigEndian>()?,
        vrf_id: cur.read_i32::<BigEndian>()?,
        next_hop_id: cur.read_i32::<BigEndian>()?,
        label: cur.read_i32::<BigEndian>()?,
        label_flags: cur.read_u16::<BigEndian>()?,
        prefix_len: cur.read_u8()?,
        replace_prefix_len: cur.read_u8()?,
        index: cur.read_i32::<BigEndian>()?,
        prefix_size: cur.read_u8()?,
        mac_size: cur.read_u8()?,
        marker_size: cur.read_u8()?,
        marker_prefix_len: cur.read_u8()?,
    })
}

fn read_vec(cur: &mut Cursor<&[u8]>, len: u8) -> std::io::Result<Vec<u8>> {
    let mut out = vec![0u8; usize::from(len)];
    cur.read_exact(&mut out)?;
    Ok(out)
}

fn field_len(field: &[u8]) -> u8 {
    // Address fields are at most 16 bytes.
    u8::try_from(field.len()).unwrap_or(u8::MAX)
}

/// Raw body of one route object received from the forwarding engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord(pub Vec<u8>);

impl WireRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&RouteMessage> for WireRecord {
    fn from(message: &RouteMessage) -> Self {
        WireRecord(message.encode())
    }
}

/// Contents of a received frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub records: Vec<WireRecord>,
    /// Status code of the response object, if the frame carried one.
    pub status: Option<i32>,
}

impl Frame {
    /// Builds a frame holding `records` and, optionally, a status object.
    pub fn new(records: Vec<WireRecord>, status: Option<i32>) -> Self {
        Self { records, status }
    }

    /// Frame carrying a single request.
    pub fn request(message: &RouteMessage) -> Self {
        Self::new(vec![WireRecord::from(message)], None)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for record in &self.records {
            write_object(&mut buf, OBJECT_ROUTE, record.as_bytes());
        }
        if let Some(code) = self.status {
            write_object(&mut buf, OBJECT_RESPONSE, &code.to_be_bytes());
        }
        buf
    }

    /// Splits a frame into route records and the status code.
    ///
    /// Route bodies are not decoded here, so a malformed record surfaces
    /// from the response decoder with its position in the stream intact.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut frame = Frame::default();
        let mut cur = Cursor::new(buf);

        while (cur.position() as usize) < buf.len() {
            let offset = cur.position() as usize;
            let truncated = |needed: usize| DecodeError::Truncated {
                needed,
                actual: buf.len() - offset,
            };
            let kind = cur
                .read_u16::<BigEndian>()
                .map_err(|_| truncated(OBJECT_HEADER_LEN))?;
            let len = cur
                .read_u16::<BigEndian>()
                .map_err(|_| truncated(OBJECT_HEADER_LEN))?;
            let mut body = vec![0u8; usize::from(len)];
            cur.read_exact(&mut body)
                .map_err(|_| truncated(OBJECT_HEADER_LEN + usize::from(len)))?;

            match kind {
                OBJECT_ROUTE => frame.records.push(WireRecord(body)),
                OBJECT_RESPONSE => {
                    let code = Cursor::new(&body[..])
                        .read_i32::<BigEndian>()
                        .map_err(|_| DecodeError::Truncated {
                            needed: RESPONSE_BODY_LEN,
                            actual: body.len(),
                        })?;
                    frame.status = Some(code);
                }
                other => return Err(DecodeError::UnknownObject(other)),
            }
        }

        Ok(frame)
    }
}

fn write_object(buf: &mut Vec<u8>, kind: u16, body: &[u8]) {
    let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&body[..usize::from(len)]);
}
