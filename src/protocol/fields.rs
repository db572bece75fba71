//! Payload field codec.
//!
//! Command inputs and outputs are flat lists of fixed-width unsigned
//! integers. Each field carries an ordinal `index` describing its position
//! in the payload; the codec orders fields by that index, independent of
//! declaration order, and packs each value big-endian into exactly its
//! declared byte width:
//!
//! ```text
//! ┌────────────┬────────────┬──────┬────────────┐
//! │ field @0   │ field @1   │  ..  │ field @n   │
//! │ size0 B BE │ size1 B BE │      │ sizeN B BE │
//! └────────────┴────────────┴──────┴────────────┘
//! ```
//!
//! Decoding is the mirror image: slice the payload cumulatively by declared
//! widths and read each slice as a big-endian unsigned integer. Trailing
//! bytes beyond the declared fields are ignored.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Result, RovercomError};

/// Maximum field width in bytes (values are `u64`).
pub const MAX_FIELD_SIZE: usize = 8;

/// Describes one payload field: its name, byte width, and ordinal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, used as the key in a decoded [`FieldMap`].
    pub name: &'static str,
    /// Width on the wire in bytes (1..=8).
    pub size: usize,
    /// Ordinal position within the payload. Fields are packed in ascending
    /// index order regardless of declaration order.
    pub index: usize,
}

impl FieldSpec {
    /// Create a descriptor with an arbitrary width (validated at use).
    pub const fn new(name: &'static str, size: usize, index: usize) -> Self {
        Self { name, size, index }
    }

    /// One-byte unsigned field.
    pub const fn uint8(name: &'static str, index: usize) -> Self {
        Self::new(name, 1, index)
    }

    /// Two-byte unsigned field.
    pub const fn uint16(name: &'static str, index: usize) -> Self {
        Self::new(name, 2, index)
    }

    /// Four-byte unsigned field.
    pub const fn uint32(name: &'static str, index: usize) -> Self {
        Self::new(name, 4, index)
    }

    /// Eight-byte unsigned field.
    pub const fn uint64(name: &'static str, index: usize) -> Self {
        Self::new(name, 8, index)
    }

    /// Pair this descriptor with a value for encoding.
    pub const fn with_value(self, value: u64) -> FieldValue {
        FieldValue { spec: self, value }
    }
}

/// A field descriptor paired with the value to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValue {
    pub spec: FieldSpec,
    pub value: u64,
}

/// Decoded payload fields, keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldMap {
    values: HashMap<&'static str, u64>,
}

impl FieldMap {
    /// Look up a field by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Look up a field that the caller knows must be present.
    pub fn require(&self, name: &'static str) -> Result<u64> {
        self.values
            .get(name)
            .copied()
            .ok_or(RovercomError::MissingField(name))
    }

    /// Number of decoded fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no fields were decoded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn check_size(spec: &FieldSpec) -> Result<()> {
    if spec.size == 0 || spec.size > MAX_FIELD_SIZE {
        return Err(RovercomError::InvalidFieldSize(spec.size));
    }
    Ok(())
}

/// Encode a list of field values into one payload buffer.
///
/// Fields are packed in ascending ordinal order. A value that does not fit
/// its declared width is rejected; nothing is silently truncated.
///
/// # Example
///
/// ```
/// use rovercom::protocol::{encode_fields, FieldSpec};
///
/// let payload = encode_fields(&[
///     FieldSpec::uint8("minor", 1).with_value(2),
///     FieldSpec::uint8("major", 0).with_value(1),
/// ])
/// .unwrap();
/// assert_eq!(&payload[..], &[1, 2]);
/// ```
pub fn encode_fields(fields: &[FieldValue]) -> Result<Bytes> {
    let mut ordered: Vec<&FieldValue> = fields.iter().collect();
    ordered.sort_by_key(|f| f.spec.index);

    let mut buf = Vec::with_capacity(ordered.iter().map(|f| f.spec.size).sum());
    for field in ordered {
        check_size(&field.spec)?;
        if field.spec.size < MAX_FIELD_SIZE && field.value >> (field.spec.size * 8) != 0 {
            return Err(RovercomError::FieldOverflow {
                name: field.spec.name,
                value: field.value,
                size: field.spec.size,
            });
        }
        let be = field.value.to_be_bytes();
        buf.extend_from_slice(&be[MAX_FIELD_SIZE - field.spec.size..]);
    }
    Ok(Bytes::from(buf))
}

/// Decode a payload into named fields according to the given descriptors.
///
/// Descriptors are applied in ascending ordinal order, each consuming its
/// declared width. A payload shorter than the sum of widths is rejected;
/// trailing bytes are ignored.
pub fn decode_fields(specs: &[FieldSpec], payload: &[u8]) -> Result<FieldMap> {
    let mut ordered: Vec<&FieldSpec> = specs.iter().collect();
    ordered.sort_by_key(|s| s.index);

    let mut expected = 0usize;
    for spec in &ordered {
        check_size(spec)?;
        expected += spec.size;
    }
    if payload.len() < expected {
        return Err(RovercomError::ShortPayload {
            expected,
            actual: payload.len(),
        });
    }

    let mut values = HashMap::with_capacity(ordered.len());
    let mut offset = 0usize;
    for spec in ordered {
        let slice = &payload[offset..offset + spec.size];
        let value = slice.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        values.insert(spec.name, value);
        offset += spec.size;
    }
    Ok(FieldMap { values })
}
