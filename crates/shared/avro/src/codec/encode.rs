//! Binary encoder

use serde_json::Value as Json;

use super::reader::write_long;
use crate::error::{CodecError, CodecResult};
use crate::schema::{Primitive, RecordSchema, Schema, SchemaDefinition, UnionSchema};
use crate::validate::is_valid;
use crate::value::{UnionSelector, Value, latin1_bytes};

pub(super) struct Encoder<'a> {
    definition: &'a SchemaDefinition,
}

impl<'a> Encoder<'a> {
    pub(super) fn new(definition: &'a SchemaDefinition) -> Self {
        Self { definition }
    }

    pub(super) fn write(&self, schema: &Schema, value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
        let schema = self.definition.resolve(schema)?;

        match schema {
            Schema::Primitive(primitive) => write_primitive(*primitive, value, out),
            Schema::Fixed(fixed) => {
                let bytes = match value {
                    Value::Fixed(bytes) | Value::Bytes(bytes) => bytes.clone(),
                    Value::String(s) => latin1_bytes(s).ok_or_else(|| mismatch(schema, value))?,
                    _ => return Err(mismatch(schema, value)),
                };
                if bytes.len() != fixed.size {
                    return Err(CodecError::FixedSize {
                        name: fixed.name.fullname(),
                        expected: fixed.size,
                        actual: bytes.len(),
                    });
                }
                out.extend_from_slice(&bytes);
                Ok(())
            }
            Schema::Enum(enum_schema) => {
                let (Value::Enum(symbol) | Value::String(symbol)) = value else {
                    return Err(mismatch(schema, value));
                };
                let index = enum_schema
                    .index_of(symbol)
                    .ok_or_else(|| CodecError::UnknownSymbol {
                        name: enum_schema.name.fullname(),
                        symbol: symbol.clone(),
                    })?;
                write_long(index as i64, out);
                Ok(())
            }
            Schema::Array(items) => {
                let Value::Array(values) = value else {
                    return Err(mismatch(schema, value));
                };
                if !values.is_empty() {
                    write_long(values.len() as i64, out);
                    for item in values {
                        self.write(items, item, out)?;
                    }
                }
                write_long(0, out);
                Ok(())
            }
            Schema::Map(values_schema) => {
                let entries: Vec<(&str, &Value)> = match value {
                    Value::Map(entries) => entries.iter().map(|(k, v)| (k.as_str(), v)).collect(),
                    Value::Record(fields) => fields.iter().map(|(k, v)| (k.as_str(), v)).collect(),
                    _ => return Err(mismatch(schema, value)),
                };
                if !entries.is_empty() {
                    write_long(entries.len() as i64, out);
                    for (key, entry) in entries {
                        write_bytes(key.as_bytes(), out);
                        self.write(values_schema, entry, out)?;
                    }
                }
                write_long(0, out);
                Ok(())
            }
            Schema::Record(record) => self.write_record(record, value, out),
            Schema::Union(union) => self.write_union(union, value, out),
            Schema::Reference(name) => Err(CodecError::UnknownName(name.fullname())),
        }
    }

    fn write_record(&self, record: &RecordSchema, value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
        if !matches!(value, Value::Record(_) | Value::Map(_)) {
            return Err(CodecError::TypeMismatch {
                expected: record.name.fullname(),
                found: value.describe().to_string(),
            });
        }

        for field in &record.fields {
            match (value.field(&field.name), &field.default) {
                (Some(field_value), _) => self.write(&field.schema, field_value, out)?,
                (None, Some(default)) => self.write_default(&field.schema, default, out)?,
                (None, None) => {
                    return Err(CodecError::MissingField {
                        record: record.name.fullname(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Field defaults of a union type always describe its first branch.
    fn write_default(&self, schema: &Schema, default: &Json, out: &mut Vec<u8>) -> CodecResult<()> {
        let value = Value::from_json(default.clone());
        match self.definition.resolve(schema)? {
            Schema::Union(union) => {
                let first = union
                    .branches()
                    .first()
                    .ok_or_else(|| CodecError::InvalidSchema("empty union".to_string()))?;
                write_long(0, out);
                self.write(first, &value, out)
            }
            resolved => self.write(resolved, &value, out),
        }
    }

    fn write_union(&self, union: &UnionSchema, value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
        let (index, branch, inner) = match value {
            Value::Selected(selector) => self.select_by_name(union, selector)?,
            plain => {
                let (index, branch) = union
                    .branches()
                    .iter()
                    .enumerate()
                    .find(|(_, branch)| is_valid(self.definition, branch, plain))
                    .ok_or_else(|| CodecError::NoMatchingBranch(plain.describe().to_string()))?;
                (index, branch, plain)
            }
        };

        write_long(index as i64, out);
        self.write(branch, inner, out)
    }

    fn select_by_name<'v, 's>(
        &self,
        union: &'s UnionSchema,
        selector: &'v UnionSelector,
    ) -> CodecResult<(usize, &'s Schema, &'v Value)> {
        let (index, branch) = union
            .find_branch(&selector.type_name)
            .ok_or_else(|| CodecError::UnionBranchNotFound(selector.type_name.clone()))?;

        if !is_valid(self.definition, branch, &selector.value) {
            return Err(CodecError::UnionBranchRejected(branch.branch_name()));
        }
        Ok((index, branch, &selector.value))
    }
}

fn write_primitive(primitive: Primitive, value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
    match (primitive, value) {
        (Primitive::Null, Value::Null) => {}
        (Primitive::Boolean, Value::Boolean(b)) => out.push(u8::from(*b)),
        (Primitive::Int, Value::Int(i)) => write_long(i64::from(*i), out),
        (Primitive::Int, Value::Long(l)) => {
            let i = i32::try_from(*l).map_err(|_| CodecError::IntOverflow(*l))?;
            write_long(i64::from(i), out)
        }
        (Primitive::Long, Value::Int(i)) => write_long(i64::from(*i), out),
        (Primitive::Long, Value::Long(l)) => write_long(*l, out),
        (Primitive::Float, Value::Float(f)) => out.extend_from_slice(&f.to_le_bytes()),
        (Primitive::Float, Value::Double(d)) => out.extend_from_slice(&(*d as f32).to_le_bytes()),
        (Primitive::Float, Value::Int(i)) => out.extend_from_slice(&(*i as f32).to_le_bytes()),
        (Primitive::Float, Value::Long(l)) => out.extend_from_slice(&(*l as f32).to_le_bytes()),
        (Primitive::Double, Value::Double(d)) => out.extend_from_slice(&d.to_le_bytes()),
        (Primitive::Double, Value::Float(f)) => out.extend_from_slice(&f64::from(*f).to_le_bytes()),
        (Primitive::Double, Value::Int(i)) => out.extend_from_slice(&f64::from(*i).to_le_bytes()),
        (Primitive::Double, Value::Long(l)) => out.extend_from_slice(&(*l as f64).to_le_bytes()),
        (Primitive::Bytes, Value::Bytes(bytes)) => write_bytes(bytes, out),
        (Primitive::Bytes, Value::String(s)) => {
            let bytes = latin1_bytes(s).ok_or_else(|| CodecError::TypeMismatch {
                expected: "bytes".to_string(),
                found: "string with code points above 0xFF".to_string(),
            })?;
            write_bytes(&bytes, out)
        }
        (Primitive::String, Value::String(s)) => write_bytes(s.as_bytes(), out),
        (primitive, value) => {
            return Err(CodecError::TypeMismatch {
                expected: primitive.type_name().to_string(),
                found: value.describe().to_string(),
            });
        }
    }
    Ok(())
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_long(bytes.len() as i64, out);
    out.extend_from_slice(bytes);
}

fn mismatch(schema: &Schema, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected: schema.branch_name(),
        found: value.describe().to_string(),
    }
}
