//! Protocol selection and the record-level conveniences.
//!
//! A marshaled payload starts with the protocol's magic and version, both
//! u16 little endian; [`select_protocol_and_apply`] reads them and runs the
//! transform with the matching reader. [`apply_with_protocol`] does the same
//! for payloads whose protocol is known out of band.

use crate::error::{CoreError, Result};
use crate::protocol::{Reader, Writer};
use crate::reflection::Record;
use crate::runtime_schema::RuntimeSchema;
use crate::schema::Schema;
use crate::serializer::{Marshaler, Serializer};
use crate::to::To;
use crate::transform::{ToValue, Transform};
use crate::value::StructValue;
use crate::value_reader::ValueReader;
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

#[cfg(feature = "compact")]
use crate::compact::{CompactReader, CompactWriter, COMPACT_MAGIC, COMPACT_VERSION};
#[cfg(feature = "json")]
use crate::json::{JsonDocument, JsonWriter, JSON_MAGIC, JSON_VERSION};
#[cfg(feature = "simple")]
use crate::simple::{SimpleReader, SimpleVersion, SimpleWriter, SIMPLE_MAGIC};

/// Protocols a payload can be read with, identified by magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ProtocolType {
    /// The body is itself a marshaled payload carrying its own header.
    Marshaled = 0,
    #[cfg(feature = "compact")]
    Compact = COMPACT_MAGIC,
    #[cfg(feature = "simple")]
    Simple = SIMPLE_MAGIC,
    #[cfg(feature = "json")]
    SimpleJson = JSON_MAGIC,
}

impl ProtocolType {
    pub fn from_magic(magic: u16) -> Option<Self> {
        match magic {
            0 => Some(ProtocolType::Marshaled),
            #[cfg(feature = "compact")]
            COMPACT_MAGIC => Some(ProtocolType::Compact),
            #[cfg(feature = "simple")]
            SIMPLE_MAGIC => Some(ProtocolType::Simple),
            #[cfg(feature = "json")]
            JSON_MAGIC => Some(ProtocolType::SimpleJson),
            _ => None,
        }
    }

    pub fn magic(self) -> u16 {
        self as u16
    }
}

/// Split a marshaled payload into magic, version and body.
pub fn read_header(input: &[u8]) -> Result<(u16, u16, &[u8])> {
    if input.len() < 4 {
        return Err(CoreError::UnknownProtocol { magic: None });
    }
    let (header, body) = input.split_at(4);
    Ok((LittleEndian::read_u16(&header[..2]), LittleEndian::read_u16(&header[2..]), body))
}

/// Read the header of `input` and apply `transform` to the body with the
/// protocol it names. Returns the protocol and whether the transform stopped
/// early.
pub fn select_protocol_and_apply<S: Schema, T: Transform>(
    input: &[u8],
    schema: S,
    transform: &mut T,
) -> Result<(ProtocolType, bool)> {
    let (magic, version, body) = read_header(input)?;
    let protocol = ProtocolType::from_magic(magic)
        .filter(|p| *p != ProtocolType::Marshaled)
        .ok_or(CoreError::UnknownProtocol { magic: Some(magic) })?;
    debug!(?protocol, version, len = body.len(), "selected protocol");
    let done = apply_with_protocol(body, protocol, version, schema, transform)?;
    Ok((protocol, done))
}

/// Apply `transform` to a payload body of a known protocol and version.
pub fn apply_with_protocol<S: Schema, T: Transform>(
    input: &[u8],
    protocol: ProtocolType,
    version: u16,
    schema: S,
    transform: &mut T,
) -> Result<bool> {
    let unknown = || CoreError::UnknownProtocol { magic: Some(protocol.magic()) };
    match protocol {
        ProtocolType::Marshaled => select_protocol_and_apply(input, schema, transform).map(|(_, done)| done),
        #[cfg(feature = "compact")]
        ProtocolType::Compact => {
            if version != COMPACT_VERSION {
                return Err(unknown());
            }
            CompactReader::new(input).parse(transform, schema, false)
        }
        #[cfg(feature = "simple")]
        ProtocolType::Simple => {
            let version = SimpleVersion::from_u16(version).ok_or_else(unknown)?;
            SimpleReader::new(input, version).parse(transform, schema, false)
        }
        #[cfg(feature = "json")]
        ProtocolType::SimpleJson => {
            if version != JSON_VERSION {
                return Err(unknown());
            }
            JsonDocument::parse(input)?.reader().parse(transform, schema, false)
        }
    }
}

/// Write `record` with `writer`, without a header.
pub fn serialize<W: Writer>(record: &dyn Record, writer: &mut W) -> Result<()> {
    let value = record.to_struct_value();
    ValueReader::new(&value)
        .parse(&mut Serializer::new(writer), record.record_schema(), false)
        .map(drop)
}

/// Write `record` with `writer`, preceded by the protocol header.
pub fn marshal<W: Writer>(record: &dyn Record, writer: &mut W) -> Result<()> {
    let value = record.to_struct_value();
    ValueReader::new(&value)
        .parse(&mut Marshaler::new(writer), record.record_schema(), false)
        .map(drop)
}

/// Read a `T` from a reader positioned at a payload body.
pub fn deserialize<T: Record + Default, R: Reader>(reader: &mut R) -> Result<T> {
    let mut record = T::default();
    reader.parse(&mut To::new(&mut record), T::schema(), false)?;
    Ok(record)
}

/// Read a `T` from a marshaled payload of any enabled protocol.
pub fn unmarshal<T: Record + Default>(input: &[u8]) -> Result<T> {
    let mut record = T::default();
    select_protocol_and_apply(input, T::schema(), &mut To::new(&mut record))?;
    Ok(record)
}

/// Marshal `record` into a new buffer with the default version of
/// `protocol`.
pub fn marshal_to_vec(record: &dyn Record, protocol: ProtocolType) -> Result<Vec<u8>> {
    match protocol {
        ProtocolType::Marshaled => Err(CoreError::Unsupported("marshaled is not a writable protocol".into())),
        #[cfg(feature = "compact")]
        ProtocolType::Compact => {
            let mut writer = CompactWriter::new(Vec::new());
            marshal(record, &mut writer)?;
            Ok(writer.into_inner())
        }
        #[cfg(feature = "simple")]
        ProtocolType::Simple => {
            let mut writer = SimpleWriter::new(Vec::new(), SimpleVersion::default());
            marshal(record, &mut writer)?;
            Ok(writer.into_inner())
        }
        #[cfg(feature = "json")]
        ProtocolType::SimpleJson => {
            let mut writer = JsonWriter::new();
            marshal(record, &mut writer)?;
            writer.into_bytes()
        }
    }
}

/// Marshal a dynamic value described by a runtime schema.
pub fn marshal_value<W: Writer>(value: &StructValue, schema: RuntimeSchema<'_>, writer: &mut W) -> Result<()> {
    ValueReader::new(value)
        .parse(&mut Marshaler::new(writer), schema, false)
        .map(drop)
}

/// Unmarshal into a dynamic value. Fields unknown to `schema` are kept.
pub fn unmarshal_value<S: Schema>(input: &[u8], schema: S) -> Result<StructValue> {
    let mut to = ToValue::new();
    select_protocol_and_apply(input, schema, &mut to)?;
    Ok(to.into_struct())
}

/// Rewrite a payload body of protocol `from` with `writer`, without
/// materializing it. Unknown fields are carried over when both sides are
/// tagged.
pub fn transcode<S: Schema, W: Writer>(
    input: &[u8],
    from: ProtocolType,
    version: u16,
    schema: S,
    writer: &mut W,
) -> Result<()> {
    apply_with_protocol(input, from, version, schema, &mut Serializer::new(writer)).map(drop)
}
