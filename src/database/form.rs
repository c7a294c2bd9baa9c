use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::TypeError;

pub type FormData = HashMap<String, Value>;

/// JSON object body with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    /// Whether `key` is present with a non-null value.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.get(key).is_some_and(|value| !value.is_null())
    }

    /// Integer given either as a JSON number or as a string of digits.
    pub fn get_number<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => number(value),
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Not a valid string.")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Vec<Value>, TypeError> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => Ok(values.to_owned()),
            Some(_) => Err(TypeError::new("Expected a list of items.")),
            None => Err(TypeError::new("Invalid key")),
        }
    }
}

/// Parses an integer out of a JSON number or a digit string.
pub fn number<T>(value: &Value) -> Result<T, TypeError>
where
    T: FromStr,
{
    let text = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(TypeError::new("A valid integer is required.")),
    };

    text.parse()
        .map_err(|_e| TypeError::new("A valid integer is required."))
}

/// Query string parameters, keeping repeated keys.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, value)| value.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid value for {key}"))),
            _ => Ok(None),
        }
    }

    /// `1`/`true` enable a flag; anything else leaves it off.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(
            self.get_str(key).map(str::to_lowercase).as_deref(),
            Some("1" | "true")
        )
    }
}
