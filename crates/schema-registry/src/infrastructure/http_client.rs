use courier_avro::SchemaDefinition;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::domain::{RegisteredSchema, RegistryErrorCode, SchemaRegistry, Subject};
use crate::error::{RegistryError, RegistryResult};

const PATH_SCHEMA_BY_ID: &str = "/schemas/ids";
const PATH_SUBJECTS: &str = "/subjects";

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {code} - {message}")]
    Api { code: i32, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convert infrastructure HttpError to domain RegistryError
impl From<HttpError> for RegistryError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Http(e) => RegistryError::Network(e.to_string()),
            HttpError::Api { code, message } => {
                RegistryError::api(RegistryErrorCode::from_code(code), message)
            }
            HttpError::Parse(msg) => RegistryError::Parse(msg),
        }
    }
}

/// Blocking client for a Confluent-compatible schema registry
/// Infrastructure component - handles HTTP communication
#[derive(Clone)]
pub struct HttpSchemaRegistry {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpSchemaRegistry {
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(HttpSchemaRegistry {
            client,
            base_url: config.base_uri.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "registry GET");
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()?;

        self.handle_response(resp)
    }

    fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, HttpError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "registry POST");
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(body)
            .send()?;

        self.handle_response(resp)
    }

    /// Registry errors come back as `{"error_code": .., "message": ..}` with
    /// any HTTP status, so the body decides, not the status line.
    fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> Result<T, HttpError> {
        let status = resp.status();
        let text = resp.text()?;

        let json: Json = serde_json::from_str(&text)
            .map_err(|e| HttpError::Parse(format!("HTTP {}: {}: {}", status, e, text)))?;

        if let Some(code) = json.get("error_code") {
            return Err(HttpError::Api {
                code: code.as_i64().and_then(|c| i32::try_from(c).ok()).unwrap_or(-1),
                message: json
                    .get("message")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        serde_json::from_value(json).map_err(|e| HttpError::Parse(e.to_string()))
    }
}

impl SchemaRegistry for HttpSchemaRegistry {
    fn get_schema(&self, id: u32) -> RegistryResult<String> {
        let resp: SchemaResponse = self.get(&format!("{}/{}", PATH_SCHEMA_BY_ID, id))?;
        Ok(resp.schema)
    }

    fn register_schema(&self, subject: &Subject, schema: &str) -> RegistryResult<u32> {
        let resp: IdResponse = self.post(
            &format!("{}/{}/versions", PATH_SUBJECTS, subject),
            &SchemaRequest { schema },
        )?;
        Ok(resp.id)
    }

    fn get_registered_schema_id(
        &self,
        subject: &Subject,
        schema: &str,
    ) -> RegistryResult<Option<u32>> {
        let result: Result<IdResponse, RegistryError> = self
            .post(&format!("{}/{}", PATH_SUBJECTS, subject), &SchemaRequest { schema })
            .map_err(RegistryError::from);

        match result {
            Ok(resp) => Ok(Some(resp.id)),
            Err(e) if e.is_not_found() => {
                debug!(%subject, error = %e, "schema not registered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn get_subject_schema(
        &self,
        subject: &Subject,
        version: Option<u32>,
    ) -> RegistryResult<RegisteredSchema> {
        let version = version.map_or_else(|| "latest".to_string(), |v| v.to_string());
        let resp: SubjectVersionResponse =
            self.get(&format!("{}/{}/versions/{}", PATH_SUBJECTS, subject, version))?;

        Ok(RegisteredSchema {
            definition: SchemaDefinition::parse(&resp.schema)?,
            subject: resp.subject,
            id: resp.id,
            version: resp.version,
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct SchemaRequest<'a> {
    schema: &'a str,
}

#[derive(Deserialize)]
struct SchemaResponse {
    schema: String,
}

#[derive(Deserialize)]
struct IdResponse {
    id: u32,
}

#[derive(Deserialize)]
struct SubjectVersionResponse {
    subject: String,
    id: u32,
    version: u32,
    schema: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_conversion() {
        let err: RegistryError = HttpError::Api {
            code: 40403,
            message: "Schema not found".to_string(),
        }
        .into();
        assert!(err.is_not_found());

        let err: RegistryError = HttpError::Parse("bad".to_string()).into();
        assert_eq!(err, RegistryError::Parse("bad".to_string()));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let registry = HttpSchemaRegistry::new(&RegistryConfig::new("http://registry:8081/")).unwrap();
        assert_eq!(registry.base_url, "http://registry:8081");
    }
}
