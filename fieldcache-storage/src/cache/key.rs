//! Cache key generation for resolved fields.
//!
//! A key identifies one field of one parent object under one set of
//! arguments:
//!
//! ```text
//! <namespace>:<object>:<type>:<field>[:<arguments>]
//! ```
//!
//! Arguments are rendered as one compact JSON object with its names sorted,
//! so argument order in a query never changes the key and no two argument
//! sets share a rendering.

use std::fmt;

use serde_json::Value;

/// Object clause used when a field has no parent object.
pub const ROOT_OBJECT: &str = "root";

/// Something that can identify itself inside a cache key.
pub trait CacheKeySource {
    /// Stable identity of this object, e.g. `"User/42"`.
    fn cache_key(&self) -> String;
}

impl CacheKeySource for str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl CacheKeySource for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

/// Structured cache key for a field resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    object: Option<String>,
    type_name: String,
    field_name: String,
    arguments: Vec<(String, String)>,
}

impl CacheKey {
    /// Key for `type_name.field_name` with no parent object and no arguments.
    pub fn new(
        namespace: impl Into<String>,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object: None,
            type_name: type_name.into(),
            field_name: field_name.into(),
            arguments: Vec::new(),
        }
    }

    /// Scope the key to a parent object.
    pub fn with_object<S: CacheKeySource + ?Sized>(mut self, object: &S) -> Self {
        self.object = Some(object.cache_key());
        self
    }

    /// Add the field arguments.
    ///
    /// Only a JSON object contributes; anything else leaves the key unchanged.
    /// Every value, strings included, is rendered as compact JSON.
    pub fn with_arguments(mut self, arguments: &Value) -> Self {
        if let Some(map) = arguments.as_object() {
            let mut pairs: Vec<(String, String)> = map
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect();
            pairs.sort();
            self.arguments = pairs;
        }
        self
    }

    /// The namespace clause.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The object clause, `root` when there is no parent object.
    pub fn object(&self) -> &str {
        self.object.as_deref().unwrap_or(ROOT_OBJECT)
    }

    /// The rendered key.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.namespace,
            self.object(),
            self.type_name,
            self.field_name
        )?;

        if !self.arguments.is_empty() {
            let rendered: Vec<String> = self
                .arguments
                .iter()
                .map(|(name, value)| format!("{}:{}", Value::from(name.as_str()), value))
                .collect();
            write!(f, ":{{{}}}", rendered.join(","))?;
        }

        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
