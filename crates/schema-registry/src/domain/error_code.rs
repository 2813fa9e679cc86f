use std::fmt;

/// Error codes reported in a registry error body (`{"error_code": ...}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryErrorCode {
    SubjectNotFound,
    VersionNotFound,
    SchemaNotFound,
    InvalidSchema,
    InvalidVersion,
    IncompatibleSchema,
    /// 500xx family
    Server(i32),
    Other(i32),
}

impl RegistryErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            40401 => RegistryErrorCode::SubjectNotFound,
            40402 => RegistryErrorCode::VersionNotFound,
            40403 => RegistryErrorCode::SchemaNotFound,
            42201 => RegistryErrorCode::InvalidSchema,
            42202 => RegistryErrorCode::InvalidVersion,
            40901 => RegistryErrorCode::IncompatibleSchema,
            50000..=50099 => RegistryErrorCode::Server(code),
            other => RegistryErrorCode::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            RegistryErrorCode::SubjectNotFound => 40401,
            RegistryErrorCode::VersionNotFound => 40402,
            RegistryErrorCode::SchemaNotFound => 40403,
            RegistryErrorCode::InvalidSchema => 42201,
            RegistryErrorCode::InvalidVersion => 42202,
            RegistryErrorCode::IncompatibleSchema => 40901,
            RegistryErrorCode::Server(code) | RegistryErrorCode::Other(code) => *code,
        }
    }

    /// Subject or schema unknown to the registry
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryErrorCode::SubjectNotFound | RegistryErrorCode::SchemaNotFound
        )
    }
}

impl fmt::Display for RegistryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
