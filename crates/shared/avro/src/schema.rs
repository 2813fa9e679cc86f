//! Schema model
//!
//! A closed set of schema kinds plus a [`SchemaDefinition`] that owns the
//! root schema and every named type declared inside it. Named types used a
//! second time appear as [`Schema::Reference`] and are resolved through the
//! definition.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::{Map, Value as Json};

use crate::error::{CodecError, CodecResult};

/// Primitive Avro types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Primitive::Null),
            "boolean" => Some(Primitive::Boolean),
            "int" => Some(Primitive::Int),
            "long" => Some(Primitive::Long),
            "float" => Some(Primitive::Float),
            "double" => Some(Primitive::Double),
            "bytes" => Some(Primitive::Bytes),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }
}

/// Name of a named type (record, enum, fixed)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    name: String,
    namespace: Option<String>,
}

impl Name {
    /// Build a name from a possibly dotted full name (`com.acme.Order`).
    pub fn new(fullname: impl AsRef<str>) -> Self {
        Self::with_namespace(fullname, None)
    }

    /// Build a name, falling back to `namespace` when `name` is not dotted.
    pub fn with_namespace(name: impl AsRef<str>, namespace: Option<&str>) -> Self {
        let name = name.as_ref();
        match name.rsplit_once('.') {
            Some((ns, short)) => Name {
                name: short.to_string(),
                namespace: Some(ns.to_string()),
            },
            None => Name {
                name: name.to_string(),
                namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// True when `candidate` is either the short name or the full name.
    pub fn matches(&self, candidate: &str) -> bool {
        candidate == self.name || candidate == self.fullname()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: Schema,
    pub default: Option<Json>,
}

impl RecordField {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Json) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub symbols: Vec<String>,
    pub default: Option<String>,
}

impl EnumSchema {
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Ordered list of union branches
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    branches: Vec<Schema>,
}

impl UnionSchema {
    /// Unions may not directly contain other unions.
    pub fn new(branches: Vec<Schema>) -> CodecResult<Self> {
        if branches.iter().any(|b| matches!(b, Schema::Union(_))) {
            return Err(CodecError::InvalidSchema(
                "unions may not immediately contain other unions".to_string(),
            ));
        }
        Ok(Self { branches })
    }

    pub fn branches(&self) -> &[Schema] {
        &self.branches
    }

    /// Locate a branch by exact name match, in declaration order.
    pub fn find_branch(&self, type_name: &str) -> Option<(usize, &Schema)> {
        self.branches
            .iter()
            .enumerate()
            .find(|(_, branch)| branch.matches_name(type_name))
    }
}

/// Schema kinds understood by the codec
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(Primitive),
    Fixed(FixedSchema),
    Record(RecordSchema),
    Enum(EnumSchema),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(UnionSchema),
    /// Use of a named type declared elsewhere in the same definition
    Reference(Name),
}

impl Schema {
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn map(values: Schema) -> Self {
        Schema::Map(Box::new(values))
    }

    pub fn union(branches: Vec<Schema>) -> CodecResult<Self> {
        Ok(Schema::Union(UnionSchema::new(branches)?))
    }

    /// Kind name used in error messages and for unnamed union branches.
    pub fn kind(&self) -> &'static str {
        match self {
            Schema::Primitive(p) => p.type_name(),
            Schema::Fixed(_) => "fixed",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Union(_) => "union",
            Schema::Reference(_) => "reference",
        }
    }

    pub fn type_name(&self) -> Option<&Name> {
        match self {
            Schema::Fixed(f) => Some(&f.name),
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Name a union branch is selected by: full name for named types,
    /// kind name otherwise.
    pub fn branch_name(&self) -> String {
        match self.type_name() {
            Some(name) => name.fullname(),
            None => self.kind().to_string(),
        }
    }

    pub fn matches_name(&self, candidate: &str) -> bool {
        match self.type_name() {
            Some(name) => name.matches(candidate),
            None => self.kind() == candidate,
        }
    }
}

/// A parsed schema together with every named type it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    root: Schema,
    named: HashMap<String, Schema>,
}

impl SchemaDefinition {
    /// Wrap a programmatically built schema, indexing its named types.
    pub fn new(root: Schema) -> CodecResult<Self> {
        let mut named = HashMap::new();
        collect_named(&root, &mut named)?;
        check_references(&root, &named)?;
        Ok(Self { root, named })
    }

    /// Parse the JSON form of a schema (as stored by a schema registry).
    pub fn parse(json: &str) -> CodecResult<Self> {
        let json: Json = serde_json::from_str(json)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &Json) -> CodecResult<Self> {
        let mut parser = Parser::default();
        let root = parser.parse(json, None)?;
        Self::new(root)
    }

    pub fn root(&self) -> &Schema {
        &self.root
    }

    pub fn lookup(&self, fullname: &str) -> Option<&Schema> {
        self.named.get(fullname)
    }

    /// Follow a reference to its declaration; other schemas resolve to themselves.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> CodecResult<&'a Schema> {
        match schema {
            Schema::Reference(name) => self
                .named
                .get(&name.fullname())
                .ok_or_else(|| CodecError::UnknownName(name.fullname())),
            other => Ok(other),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self.resolve(&self.root), Ok(Schema::Union(_)))
    }
}

fn collect_named(schema: &Schema, named: &mut HashMap<String, Schema>) -> CodecResult<()> {
    if let Some(name) = schema.type_name()
        && !matches!(schema, Schema::Reference(_))
    {
        let fullname = name.fullname();
        if let Some(existing) = named.get(&fullname) {
            if existing != schema {
                return Err(CodecError::InvalidSchema(format!(
                    "named type {} declared twice",
                    fullname
                )));
            }
            return Ok(());
        }
        named.insert(fullname, schema.clone());
    }

    match schema {
        Schema::Record(record) => {
            for field in &record.fields {
                collect_named(&field.schema, named)?;
            }
        }
        Schema::Array(items) => collect_named(items, named)?,
        Schema::Map(values) => collect_named(values, named)?,
        Schema::Union(union) => {
            for branch in union.branches() {
                collect_named(branch, named)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_references(schema: &Schema, named: &HashMap<String, Schema>) -> CodecResult<()> {
    match schema {
        Schema::Reference(name) if !named.contains_key(&name.fullname()) => {
            Err(CodecError::UnknownName(name.fullname()))
        }
        Schema::Record(record) => record
            .fields
            .iter()
            .try_for_each(|f| check_references(&f.schema, named)),
        Schema::Array(items) => check_references(items, named),
        Schema::Map(values) => check_references(values, named),
        Schema::Union(union) => union
            .branches()
            .iter()
            .try_for_each(|b| check_references(b, named)),
        _ => Ok(()),
    }
}

/// JSON schema parser. Named types become visible as soon as their
/// declaration starts, so records may refer to themselves.
#[derive(Default)]
struct Parser {
    defined: HashSet<String>,
}

impl Parser {
    fn parse(&mut self, json: &Json, namespace: Option<&str>) -> CodecResult<Schema> {
        match json {
            Json::String(type_name) => self.parse_type_name(type_name, namespace),
            Json::Array(branches) => {
                let branches = branches
                    .iter()
                    .map(|b| self.parse(b, namespace))
                    .collect::<CodecResult<Vec<_>>>()?;
                Schema::union(branches)
            }
            Json::Object(object) => self.parse_complex(object, namespace),
            other => Err(CodecError::InvalidSchema(format!(
                "expected a type name, object or array, got {}",
                other
            ))),
        }
    }

    fn parse_type_name(&self, type_name: &str, namespace: Option<&str>) -> CodecResult<Schema> {
        if let Some(primitive) = Primitive::from_type_name(type_name) {
            return Ok(Schema::Primitive(primitive));
        }

        let qualified = Name::with_namespace(type_name, namespace).fullname();
        for candidate in [qualified.as_str(), type_name] {
            if self.defined.contains(candidate) {
                return Ok(Schema::Reference(Name::new(candidate)));
            }
        }

        Err(CodecError::UnsupportedSchemaKind(type_name.to_string()))
    }

    fn parse_complex(
        &mut self,
        object: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> CodecResult<Schema> {
        let type_value = object
            .get("type")
            .ok_or_else(|| CodecError::InvalidSchema("missing \"type\" attribute".to_string()))?;

        let type_name = match type_value {
            Json::String(type_name) => type_name.as_str(),
            nested => return self.parse(nested, namespace),
        };

        match type_name {
            "record" => self.parse_record(object, namespace),
            "enum" => self.parse_enum(object, namespace),
            "fixed" => self.parse_fixed(object, namespace),
            "array" => {
                let items = object
                    .get("items")
                    .ok_or_else(|| CodecError::InvalidSchema("array without items".to_string()))?;
                Ok(Schema::array(self.parse(items, namespace)?))
            }
            "map" => {
                let values = object
                    .get("values")
                    .ok_or_else(|| CodecError::InvalidSchema("map without values".to_string()))?;
                Ok(Schema::map(self.parse(values, namespace)?))
            }
            other => self.parse_type_name(other, namespace),
        }
    }

    fn declare(&mut self, object: &Map<String, Json>, namespace: Option<&str>) -> CodecResult<Name> {
        let short = string_attr(object, "name")?;
        let namespace = object
            .get("namespace")
            .and_then(Json::as_str)
            .or(namespace);
        let name = Name::with_namespace(short, namespace);

        if !self.defined.insert(name.fullname()) {
            return Err(CodecError::InvalidSchema(format!(
                "named type {} declared twice",
                name
            )));
        }
        Ok(name)
    }

    fn parse_record(
        &mut self,
        object: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> CodecResult<Schema> {
        let name = self.declare(object, namespace)?;
        let inner_namespace = name.namespace().map(str::to_string);

        let fields_json = object
            .get("fields")
            .and_then(Json::as_array)
            .ok_or_else(|| CodecError::InvalidSchema(format!("record {} without fields", name)))?;

        let mut fields = Vec::with_capacity(fields_json.len());
        for field in fields_json {
            let field = field.as_object().ok_or_else(|| {
                CodecError::InvalidSchema(format!("record {} has a non-object field", name))
            })?;
            let field_name = string_attr(field, "name")?;
            let field_type = field.get("type").ok_or_else(|| {
                CodecError::InvalidSchema(format!("field {}.{} without type", name, field_name))
            })?;

            fields.push(RecordField {
                name: field_name.to_string(),
                schema: self.parse(field_type, inner_namespace.as_deref())?,
                default: field.get("default").cloned(),
            });
        }

        Ok(Schema::Record(RecordSchema { name, fields }))
    }

    fn parse_enum(
        &mut self,
        object: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> CodecResult<Schema> {
        let name = self.declare(object, namespace)?;
        let symbols = object
            .get("symbols")
            .and_then(Json::as_array)
            .ok_or_else(|| CodecError::InvalidSchema(format!("enum {} without symbols", name)))?
            .iter()
            .map(|s| {
                s.as_str().map(str::to_string).ok_or_else(|| {
                    CodecError::InvalidSchema(format!("enum {} has a non-string symbol", name))
                })
            })
            .collect::<CodecResult<Vec<_>>>()?;

        Ok(Schema::Enum(EnumSchema {
            name,
            symbols,
            default: object
                .get("default")
                .and_then(Json::as_str)
                .map(str::to_string),
        }))
    }

    fn parse_fixed(
        &mut self,
        object: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> CodecResult<Schema> {
        let name = self.declare(object, namespace)?;
        let size = object
            .get("size")
            .and_then(Json::as_u64)
            .ok_or_else(|| CodecError::InvalidSchema(format!("fixed {} without size", name)))?;

        Ok(Schema::Fixed(FixedSchema {
            name,
            size: size as usize,
        }))
    }
}

fn string_attr<'a>(object: &'a Map<String, Json>, key: &str) -> CodecResult<&'a str> {
    object
        .get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| CodecError::InvalidSchema(format!("missing string attribute \"{}\"", key)))
}
