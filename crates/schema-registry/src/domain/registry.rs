use crate::domain::{RegisteredSchema, Subject};
use crate::error::RegistryResult;

/// Port for schema registry lookups
///
/// Every call is one round trip to the registry. Nothing is cached.
pub trait SchemaRegistry: Send + Sync {
    /// Schema text registered under `id`
    fn get_schema(&self, id: u32) -> RegistryResult<String>;

    /// Register `schema` under `subject`, returning its id
    fn register_schema(&self, subject: &Subject, schema: &str) -> RegistryResult<u32>;

    /// Id of `schema` under `subject`, or `None` when the registry knows
    /// neither the subject nor the schema
    fn get_registered_schema_id(
        &self,
        subject: &Subject,
        schema: &str,
    ) -> RegistryResult<Option<u32>>;

    /// A specific version of `subject`, or the latest one
    fn get_subject_schema(
        &self,
        subject: &Subject,
        version: Option<u32>,
    ) -> RegistryResult<RegisteredSchema>;
}
