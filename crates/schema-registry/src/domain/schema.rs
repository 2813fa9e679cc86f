use courier_avro::SchemaDefinition;

/// One version of a schema as stored under a subject
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredSchema {
    pub subject: String,
    pub id: u32,
    pub version: u32,
    pub definition: SchemaDefinition,
}

impl RegisteredSchema {
    pub fn is_union(&self) -> bool {
        self.definition.is_union()
    }
}
