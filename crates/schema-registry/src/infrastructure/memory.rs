use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_avro::SchemaDefinition;
use parking_lot::RwLock;

use crate::domain::{RegisteredSchema, RegistryErrorCode, SchemaRegistry, Subject};
use crate::error::{RegistryError, RegistryResult};

#[derive(Default)]
struct State {
    /// Schema text by id - 1
    schemas: Vec<String>,
    /// Ids of every version of a subject, oldest first
    subjects: HashMap<String, Vec<u32>>,
}

/// Registry kept in process memory
///
/// Behaves like the HTTP registry, error codes included: ids are global and
/// reused when the same schema text is registered under another subject.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    state: RwLock<State>,
    lookups: AtomicUsize,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn get_schema(&self, id: u32) -> RegistryResult<String> {
        self.count();
        let state = self.state.read();
        (id as usize)
            .checked_sub(1)
            .and_then(|index| state.schemas.get(index))
            .cloned()
            .ok_or_else(|| RegistryError::api(RegistryErrorCode::SchemaNotFound, "Schema not found"))
    }

    fn register_schema(&self, subject: &Subject, schema: &str) -> RegistryResult<u32> {
        self.count();
        SchemaDefinition::parse(schema)
            .map_err(|e| RegistryError::api(RegistryErrorCode::InvalidSchema, e.to_string()))?;

        let mut state = self.state.write();
        let id = match state.schemas.iter().position(|s| s == schema) {
            Some(index) => index as u32 + 1,
            None => {
                state.schemas.push(schema.to_string());
                state.schemas.len() as u32
            }
        };

        let versions = state.subjects.entry(subject.to_string()).or_default();
        if !versions.contains(&id) {
            versions.push(id);
        }
        Ok(id)
    }

    fn get_registered_schema_id(
        &self,
        subject: &Subject,
        schema: &str,
    ) -> RegistryResult<Option<u32>> {
        self.count();
        let state = self.state.read();
        let Some(versions) = state.subjects.get(subject.as_str()) else {
            return Ok(None);
        };
        Ok(versions
            .iter()
            .copied()
            .find(|id| state.schemas.get(*id as usize - 1).is_some_and(|s| s == schema)))
    }

    fn get_subject_schema(
        &self,
        subject: &Subject,
        version: Option<u32>,
    ) -> RegistryResult<RegisteredSchema> {
        self.count();
        let state = self.state.read();
        let versions = state.subjects.get(subject.as_str()).ok_or_else(|| {
            RegistryError::api(
                RegistryErrorCode::SubjectNotFound,
                format!("Subject '{}' not found.", subject),
            )
        })?;

        let (version, id) = match version {
            Some(v) => (v as usize)
                .checked_sub(1)
                .and_then(|index| versions.get(index))
                .map(|id| (v, *id)),
            None => versions.last().map(|id| (versions.len() as u32, *id)),
        }
        .ok_or_else(|| RegistryError::api(RegistryErrorCode::VersionNotFound, "Version not found."))?;

        let schema = state
            .schemas
            .get(id as usize - 1)
            .ok_or_else(|| RegistryError::api(RegistryErrorCode::SchemaNotFound, "Schema not found"))?;

        Ok(RegisteredSchema {
            subject: subject.to_string(),
            id,
            version,
            definition: SchemaDefinition::parse(schema)?,
        })
    }
}
