//! Binary decoder

use std::collections::BTreeMap;

use super::reader::ByteReader;
use crate::error::{CodecError, CodecResult};
use crate::schema::{Primitive, Schema, SchemaDefinition};
use crate::value::Value;

/// Most items of a zero-width schema (`null`, empty record, `fixed` of size
/// 0) a single array or map may hold
pub const MAX_ZERO_WIDTH_ITEMS: usize = 1 << 16;

/// Named types nested deeper than this count as zero-width
const MAX_WIDTH_DEPTH: usize = 8;

pub(super) struct Decoder<'a> {
    definition: &'a SchemaDefinition,
}

impl<'a> Decoder<'a> {
    pub(super) fn new(definition: &'a SchemaDefinition) -> Self {
        Self { definition }
    }

    pub(super) fn read(&self, schema: &Schema, reader: &mut ByteReader<'_>) -> CodecResult<Value> {
        match self.definition.resolve(schema)? {
            Schema::Primitive(primitive) => read_primitive(*primitive, reader),
            Schema::Fixed(fixed) => Ok(Value::Fixed(reader.read_exact(fixed.size)?.to_vec())),
            Schema::Enum(enum_schema) => {
                let index = reader.read_long()?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| enum_schema.symbols.get(i))
                    .map(|symbol| Value::Enum(symbol.clone()))
                    .ok_or_else(|| CodecError::EnumIndexOutOfRange {
                        name: enum_schema.name.fullname(),
                        index,
                    })
            }
            Schema::Array(items) => {
                let mut values = Vec::new();
                let width = self.min_width(items, 0);
                self.read_blocks(reader, width, |reader| {
                    values.push(self.read(items, reader)?);
                    Ok(())
                })?;
                Ok(Value::Array(values))
            }
            Schema::Map(values_schema) => {
                let mut entries = BTreeMap::new();
                // every entry carries at least its key length
                let width = 1 + self.min_width(values_schema, 0);
                self.read_blocks(reader, width, |reader| {
                    let key = read_string(reader)?;
                    entries.insert(key, self.read(values_schema, reader)?);
                    Ok(())
                })?;
                Ok(Value::Map(entries))
            }
            Schema::Record(record) => record
                .fields
                .iter()
                .map(|field| Ok((field.name.clone(), self.read(&field.schema, reader)?)))
                .collect::<CodecResult<Vec<_>>>()
                .map(Value::Record),
            Schema::Union(union) => {
                let index = reader.read_long()?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| union.branches().get(i))
                    .ok_or(CodecError::UnionIndexOutOfRange {
                        index,
                        len: union.branches().len(),
                    })?;
                self.read(branch, reader)
            }
            Schema::Reference(name) => Err(CodecError::UnknownName(name.fullname())),
        }
    }

    /// Arrays and maps are a series of blocks terminated by a zero count.
    /// A negative count is followed by the block size in bytes.
    ///
    /// Counts are checked before any item is read: items of `width` bytes
    /// must fit in the remaining input, zero-width items are capped at
    /// [`MAX_ZERO_WIDTH_ITEMS`] per collection.
    fn read_blocks(
        &self,
        reader: &mut ByteReader<'_>,
        width: usize,
        mut item: impl FnMut(&mut ByteReader<'_>) -> CodecResult<()>,
    ) -> CodecResult<()> {
        let mut total = 0usize;
        loop {
            let mut count = reader.read_long()?;
            if count == 0 {
                return Ok(());
            }
            if count < 0 {
                count = count.checked_neg().ok_or(CodecError::NegativeLength(count))?;
                reader.read_long()?;
            }

            let limit = match width {
                0 => MAX_ZERO_WIDTH_ITEMS - total,
                width => reader.remaining() / width,
            };
            let count = usize::try_from(count)
                .ok()
                .filter(|count| *count <= limit)
                .ok_or(CodecError::BlockTooLarge { count, limit })?;
            total += count;

            for _ in 0..count {
                item(reader)?;
            }
        }
    }

    /// Lower bound on the bytes any value of `schema` encodes to
    fn min_width(&self, schema: &Schema, depth: usize) -> usize {
        if depth > MAX_WIDTH_DEPTH {
            return 0;
        }
        let Ok(schema) = self.definition.resolve(schema) else {
            return 0;
        };

        match schema {
            Schema::Primitive(Primitive::Null) => 0,
            Schema::Primitive(Primitive::Float) => 4,
            Schema::Primitive(Primitive::Double) => 8,
            Schema::Primitive(_) => 1,
            Schema::Fixed(fixed) => fixed.size,
            Schema::Record(record) => usize::from(
                record
                    .fields
                    .iter()
                    .any(|field| self.min_width(&field.schema, depth + 1) > 0),
            ),
            Schema::Enum(_) | Schema::Array(_) | Schema::Map(_) | Schema::Union(_) => 1,
            Schema::Reference(_) => 0,
        }
    }
}

fn read_primitive(primitive: Primitive, reader: &mut ByteReader<'_>) -> CodecResult<Value> {
    Ok(match primitive {
        Primitive::Null => Value::Null,
        Primitive::Boolean => match reader.read_byte()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            other => return Err(CodecError::InvalidBoolean(other)),
        },
        Primitive::Int => Value::Int(reader.read_int()?),
        Primitive::Long => Value::Long(reader.read_long()?),
        Primitive::Float => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(reader.read_exact(4)?);
            Value::Float(f32::from_le_bytes(raw))
        }
        Primitive::Double => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(reader.read_exact(8)?);
            Value::Double(f64::from_le_bytes(raw))
        }
        Primitive::Bytes => {
            let len = reader.read_len()?;
            Value::Bytes(reader.read_exact(len)?.to_vec())
        }
        Primitive::String => Value::String(read_string(reader)?),
    })
}

fn read_string(reader: &mut ByteReader<'_>) -> CodecResult<String> {
    let len = reader.read_len()?;
    let bytes = reader.read_exact(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidUtf8(e.to_string()))
}
