use serde::{Deserialize, Serialize};

/// A typed value bound to a named statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlValue {
    Blob(Vec<u8>),
    Double(f64),
    Long(i64),
    String(String),
    Null,
}

impl SqlValue {
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: SqlValue,
}

/// Ordered set of named parameters for one statement execution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSet(Vec<SqlParameter>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set extended with one more parameter.
    pub fn with(mut self, name: &str, value: SqlValue) -> Self {
        self.0.push(SqlParameter {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlParameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
