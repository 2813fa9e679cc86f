use std::fmt;

/// Registry namespace under which the versions of one schema live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject(String);

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Subject(name.into())
    }

    /// Subject for the values of `topic`
    pub fn of_value(topic: &str) -> Self {
        Subject(format!("{}-value", topic))
    }

    /// Subject for the keys of `topic`
    pub fn of_key(topic: &str) -> Self {
        Subject(format!("{}-key", topic))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
