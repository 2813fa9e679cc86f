//! Structural validation of values against schemas
//!
//! The same acceptance rules the encoder applies, without producing bytes.
//! Used to pick a union branch by shape and to check an explicitly selected
//! branch before encoding.

use crate::schema::{Primitive, Schema, SchemaDefinition};
use crate::value::{Value, latin1_bytes};

/// True when `value` can be encoded with `schema`.
pub fn is_valid(definition: &SchemaDefinition, schema: &Schema, value: &Value) -> bool {
    let Ok(schema) = definition.resolve(schema) else {
        return false;
    };

    match (schema, value) {
        (Schema::Primitive(primitive), value) => primitive_accepts(*primitive, value),
        (Schema::Fixed(fixed), Value::Fixed(bytes) | Value::Bytes(bytes)) => {
            bytes.len() == fixed.size
        }
        (Schema::Fixed(fixed), Value::String(s)) => {
            latin1_bytes(s).is_some_and(|bytes| bytes.len() == fixed.size)
        }
        (Schema::Enum(enum_schema), Value::Enum(symbol) | Value::String(symbol)) => {
            enum_schema.index_of(symbol).is_some()
        }
        (Schema::Array(items), Value::Array(values)) => {
            values.iter().all(|v| is_valid(definition, items, v))
        }
        (Schema::Map(values_schema), Value::Map(entries)) => entries
            .values()
            .all(|v| is_valid(definition, values_schema, v)),
        (Schema::Map(values_schema), Value::Record(fields)) => fields
            .iter()
            .all(|(_, v)| is_valid(definition, values_schema, v)),
        (Schema::Record(record), Value::Record(_) | Value::Map(_)) => {
            record.fields.iter().all(|field| match value.field(&field.name) {
                Some(v) => is_valid(definition, &field.schema, v),
                None => field.default.is_some(),
            })
        }
        (Schema::Union(union), Value::Selected(selector)) => union
            .find_branch(&selector.type_name)
            .is_some_and(|(_, branch)| is_valid(definition, branch, &selector.value)),
        (Schema::Union(union), value) => union
            .branches()
            .iter()
            .any(|branch| is_valid(definition, branch, value)),
        _ => false,
    }
}

fn primitive_accepts(primitive: Primitive, value: &Value) -> bool {
    match (primitive, value) {
        (Primitive::Null, Value::Null) => true,
        (Primitive::Boolean, Value::Boolean(_)) => true,
        (Primitive::Int, Value::Int(_)) => true,
        (Primitive::Int, Value::Long(l)) => i32::try_from(*l).is_ok(),
        (Primitive::Long, Value::Int(_) | Value::Long(_)) => true,
        (Primitive::Float | Primitive::Double, Value::Float(_) | Value::Double(_)) => true,
        (Primitive::Float | Primitive::Double, Value::Int(_) | Value::Long(_)) => true,
        (Primitive::Bytes, Value::Bytes(_)) => true,
        (Primitive::Bytes, Value::String(s)) => latin1_bytes(s).is_some(),
        (Primitive::String, Value::String(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Name, RecordField, RecordSchema};

    fn record(name: &str, fields: Vec<RecordField>) -> Schema {
        Schema::Record(RecordSchema {
            name: Name::new(name),
            fields,
        })
    }

    #[test]
    fn test_primitive_promotion() {
        let def = SchemaDefinition::new(Schema::Primitive(Primitive::Long)).unwrap();
        assert!(is_valid(&def, def.root(), &Value::Int(3)));
        assert!(!is_valid(&def, def.root(), &Value::from("3")));

        let def = SchemaDefinition::new(Schema::Primitive(Primitive::Int)).unwrap();
        assert!(is_valid(&def, def.root(), &Value::Long(7)));
        assert!(!is_valid(&def, def.root(), &Value::Long(i64::MAX)));
    }

    #[test]
    fn test_record_missing_field_uses_default() {
        let def = SchemaDefinition::new(record(
            "Order",
            vec![
                RecordField::new("id", Schema::Primitive(Primitive::String)),
                RecordField::new("note", Schema::Primitive(Primitive::String))
                    .with_default(serde_json::json!("")),
            ],
        ))
        .unwrap();

        let with_default = Value::record([("id", Value::from("o-1"))]);
        assert!(is_valid(&def, def.root(), &with_default));

        let missing_required = Value::record([("note", Value::from("x"))]);
        assert!(!is_valid(&def, def.root(), &missing_required));
    }

    #[test]
    fn test_union_selector_validation() {
        let def = SchemaDefinition::new(
            Schema::union(vec![
                record(
                    "created",
                    vec![RecordField::new("id", Schema::Primitive(Primitive::String))],
                ),
                Schema::Primitive(Primitive::Null),
            ])
            .unwrap(),
        )
        .unwrap();

        let ok = Value::selected("created", Value::record([("id", Value::from("a"))]));
        let wrong_shape = Value::selected("created", Value::Long(1));
        let unknown = Value::selected("deleted", Value::Null);

        assert!(is_valid(&def, def.root(), &ok));
        assert!(!is_valid(&def, def.root(), &wrong_shape));
        assert!(!is_valid(&def, def.root(), &unknown));
    }
}
