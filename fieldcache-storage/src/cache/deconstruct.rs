//! Turning resolved values into storable documents.

use fieldcache_core::{CacheResult, DeconstructError, Document};
use serde::Serialize;

/// Transforms a resolved value into its cache-safe document.
///
/// Implementations are pure: no side effects, same input, same document.
pub trait Deconstructor<T: ?Sized>: Send + Sync {
    /// Produce the document to store for `value`.
    fn perform(&self, value: &T) -> CacheResult<Document>;
}

/// Deconstructs any serializable value through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeconstructor;

impl<T: Serialize + ?Sized> Deconstructor<T> for JsonDeconstructor {
    fn perform(&self, value: &T) -> CacheResult<Document> {
        serde_json::to_value(value).map_err(|e| {
            DeconstructError::Serialization {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcache_core::CacheError;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct User {
        name: String,
        tags: Vec<&'static str>,
    }

    #[test]
    fn test_struct_becomes_object() {
        let user = User {
            name: "Ada".to_string(),
            tags: vec!["admin"],
        };
        let document = JsonDeconstructor.perform(&user).unwrap();
        assert_eq!(document, json!({"name": "Ada", "tags": ["admin"]}));
    }

    #[test]
    fn test_lists_and_scalars() {
        assert_eq!(
            JsonDeconstructor.perform(&vec![1, 2, 3]).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(JsonDeconstructor.perform(&Option::<i32>::None).unwrap(), json!(null));
        assert_eq!(JsonDeconstructor.perform("plain").unwrap(), json!("plain"));
    }

    #[test]
    fn test_documents_pass_through() {
        let document = json!({"already": {"a": "document"}});
        assert_eq!(JsonDeconstructor.perform(&document).unwrap(), document);
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut grid = HashMap::new();
        grid.insert((1, 2), "cell");

        let err = JsonDeconstructor.perform(&grid).unwrap_err();
        assert!(matches!(err, CacheError::Deconstruct(_)));
    }
}
