//! Thrift wire reader
//!
//! Reads one top-level struct (no message envelope) from binary or compact
//! protocol bytes into a [`StructValue`].

use std::cell::Cell;
use std::fmt;
use std::io::{self, Read};
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thrift::protocol::{
    TBinaryInputProtocol, TCompactInputProtocol, TInputProtocol, TType,
};
use thrift::{ProtocolError, ProtocolErrorKind, TransportError, TransportErrorKind};
use tracing::trace;

use super::{Scalar, StructValue, Value};
use crate::error::{Result, ThriftyError};

/// Upper bound on up-front allocation for container elements
const MAX_PREALLOCATION: usize = 1024;

/// Thrift wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Binary,
    Compact,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Binary => write!(f, "binary"),
            Protocol::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Protocol::Binary),
            "compact" => Ok(Protocol::Compact),
            other => Err(format!("unknown protocol '{}' (expected binary or compact)", other)),
        }
    }
}

/// Decode one struct from `bytes`.
///
/// Struct and container nesting deeper than `max_depth` fails with
/// [`ThriftyError::RecursionLimitExceeded`]. String and binary lengths are
/// checked against the bytes left in the message before anything is
/// allocated.
pub fn read_struct(bytes: &[u8], protocol: Protocol, max_depth: usize) -> Result<StructValue> {
    let transport = SliceTransport::new(bytes);
    let value = match protocol {
        Protocol::Binary => {
            let input = TBinaryInputProtocol::new(transport.clone(), true);
            WireReader::new(input, transport.clone(), protocol, max_depth).read_struct()?
        }
        Protocol::Compact => {
            let input = TCompactInputProtocol::new(transport.clone());
            WireReader::new(input, transport.clone(), protocol, max_depth).read_struct()?
        }
    };

    trace!(
        %protocol,
        fields = value.len(),
        trailing = transport.remaining().len(),
        "read wire struct"
    );
    Ok(value)
}

/// Read transport over a borrowed message whose position is shared between
/// clones, so the reader can see how many bytes the protocol has left.
#[derive(Debug, Clone)]
struct SliceTransport<'a> {
    bytes: &'a [u8],
    position: Rc<Cell<usize>>,
}

impl<'a> SliceTransport<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: Rc::new(Cell::new(0)),
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.position.get().min(self.bytes.len())..]
    }

    fn take(&self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining.len() {
            return Err(ThriftyError::WireFormat(thrift::Error::Transport(
                TransportError::new(
                    TransportErrorKind::EndOfFile,
                    format!("needed {} bytes, {} left", len, remaining.len()),
                ),
            )));
        }
        self.position.set(self.position.get() + len);
        Ok(&remaining[..len])
    }
}

impl Read for SliceTransport<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position.set(self.position.get() + n);
        Ok(n)
    }
}

struct WireReader<'a, P> {
    input: P,
    transport: SliceTransport<'a>,
    protocol: Protocol,
    max_depth: usize,
    path: Vec<String>,
}

impl<'a, P: TInputProtocol> WireReader<'a, P> {
    fn new(input: P, transport: SliceTransport<'a>, protocol: Protocol, max_depth: usize) -> Self {
        Self {
            input,
            transport,
            protocol,
            max_depth,
            path: Vec::new(),
        }
    }

    fn enter(&mut self, segment: String) -> Result<()> {
        self.path.push(segment);
        if self.path.len() > self.max_depth {
            return Err(ThriftyError::RecursionLimitExceeded {
                limit: self.max_depth,
                path: self.path.join(""),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.path.pop();
    }

    fn read_struct(&mut self) -> Result<StructValue> {
        let mut value = StructValue::new();
        self.input.read_struct_begin()?;
        loop {
            let field = self.input.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            let id = field.id.ok_or_else(|| {
                protocol_error(ProtocolErrorKind::InvalidData, "field header without id")
            })?;
            let element = self.read_value(field.field_type, format!("/{}", id))?;
            self.input.read_field_end()?;
            value.insert(id, element);
        }
        self.input.read_struct_end()?;
        Ok(value)
    }

    fn read_value(&mut self, ttype: TType, segment: String) -> Result<Value> {
        let value = match ttype {
            TType::Bool => Scalar::Bool(self.input.read_bool()?).into(),
            TType::I08 => Scalar::Byte(self.input.read_i8()?).into(),
            TType::I16 => Scalar::I16(self.input.read_i16()?).into(),
            TType::I32 => Scalar::I32(self.input.read_i32()?).into(),
            TType::I64 => Scalar::I64(self.input.read_i64()?).into(),
            TType::Double => Scalar::Double(self.input.read_double()?).into(),
            TType::String => {
                let bytes = self.read_bytes()?;
                match String::from_utf8(bytes) {
                    Ok(s) => Scalar::String(s).into(),
                    Err(e) => Scalar::Binary(e.into_bytes()).into(),
                }
            }
            TType::Struct => {
                self.enter(segment)?;
                let value = self.read_struct()?;
                self.leave();
                Value::Struct(value)
            }
            TType::List => {
                let header = self.input.read_list_begin()?;
                self.enter(segment)?;
                let items = self.read_elements(header.element_type, header.size)?;
                self.leave();
                self.input.read_list_end()?;
                Value::List(items)
            }
            TType::Set => {
                let header = self.input.read_set_begin()?;
                self.enter(segment)?;
                let items = self.read_elements(header.element_type, header.size)?;
                self.leave();
                self.input.read_set_end()?;
                Value::List(items)
            }
            TType::Map => {
                let header = self.input.read_map_begin()?;
                self.enter(segment)?;
                let entries = self.read_entries(header.key_type, header.value_type, header.size)?;
                self.leave();
                self.input.read_map_end()?;
                Value::Map(entries)
            }
            other => {
                return Err(ThriftyError::UnsupportedWireType(format!("{:?}", other)));
            }
        };
        Ok(value)
    }

    /// Length-prefixed string or binary, read straight off the transport.
    /// Both protocols keep no state around these reads.
    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = match self.protocol {
            Protocol::Binary => {
                let prefix = SliceTransport::take(&self.transport, 4)?;
                let len = i32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
                usize::try_from(len).map_err(|_| {
                    protocol_error(
                        ProtocolErrorKind::NegativeSize,
                        format!("negative string length {}", len),
                    )
                })?
            }
            Protocol::Compact => self.read_varint_u32()? as usize,
        };

        let left = self.transport.remaining().len();
        if len > left {
            return Err(protocol_error(
                ProtocolErrorKind::SizeLimit,
                format!("string length {} exceeds the {} bytes left", len, left),
            ));
        }
        Ok(SliceTransport::take(&self.transport, len)?.to_vec())
    }

    fn read_varint_u32(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = SliceTransport::take(&self.transport, 1)?[0];
            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(protocol_error(ProtocolErrorKind::InvalidData, "varint longer than 5 bytes"))
    }

    fn read_elements(&mut self, element_type: TType, size: i32) -> Result<Vec<Value>> {
        let size = container_size(size)?;
        let mut items = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        for index in 0..size {
            items.push(self.read_value(element_type, format!("[{}]", index))?);
        }
        Ok(items)
    }

    fn read_entries(
        &mut self,
        key_type: Option<TType>,
        value_type: Option<TType>,
        size: i32,
    ) -> Result<Vec<(Value, Value)>> {
        let size = container_size(size)?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let (key_type, value_type) = match (key_type, value_type) {
            (Some(k), Some(v)) => (k, v),
            _ => {
                return Err(protocol_error(
                    ProtocolErrorKind::InvalidData,
                    "non-empty map without element types",
                ))
            }
        };

        let mut entries = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        for index in 0..size {
            let key = self.read_value(key_type, format!("{{{}}}", index))?;
            let value = self.read_value(value_type, format!("[{}]", index))?;
            entries.push((key, value));
        }
        Ok(entries)
    }
}

fn container_size(size: i32) -> Result<usize> {
    usize::try_from(size).map_err(|_| {
        protocol_error(
            ProtocolErrorKind::NegativeSize,
            format!("negative container size {}", size),
        )
    })
}

fn protocol_error(kind: ProtocolErrorKind, message: impl Into<String>) -> ThriftyError {
    ThriftyError::WireFormat(thrift::Error::Protocol(ProtocolError::new(kind, message)))
}
