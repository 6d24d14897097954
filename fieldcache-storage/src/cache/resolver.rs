//! Field-level entry point for query executors.
//!
//! An executor resolving a field hands over the field's cache metadata and a
//! description of the resolution (type, field, parent object, arguments,
//! whether the request forces a refresh). Uncached fields resolve directly;
//! cached fields get a key and go through a [`CacheMarshal`].

use std::sync::Arc;

use fieldcache_core::{CacheResult, FieldCacheConfig};
use serde_json::Value;

use super::context::CacheContext;
use super::deconstruct::{Deconstructor, JsonDeconstructor};
use super::deferred::Resolution;
use super::key::{CacheKey, CacheKeySource};
use super::marshal::{CacheMarshal, Fetched};

/// Description of a single field resolution.
#[derive(Clone, Copy)]
pub struct ResolveRequest<'a> {
    type_name: &'a str,
    field_name: &'a str,
    object: Option<&'a dyn CacheKeySource>,
    arguments: Option<&'a Value>,
    force: bool,
}

impl<'a> ResolveRequest<'a> {
    /// Resolution of `type_name.field_name` on the root object, not forced.
    pub fn new(type_name: &'a str, field_name: &'a str) -> Self {
        Self {
            type_name,
            field_name,
            object: None,
            arguments: None,
            force: false,
        }
    }

    /// Set the parent object.
    pub fn with_object(mut self, object: &'a dyn CacheKeySource) -> Self {
        self.object = Some(object);
        self
    }

    /// Set the field arguments.
    pub fn with_arguments(mut self, arguments: &'a Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Bypass the store lookup and overwrite.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Whether this request forces a refresh.
    pub fn force(&self) -> bool {
        self.force
    }

    /// The cache key for this resolution under `namespace`.
    pub fn cache_key(&self, namespace: &str) -> CacheKey {
        let mut key = CacheKey::new(namespace, self.type_name, self.field_name);
        if let Some(object) = self.object {
            key = key.with_object(object);
        }
        if let Some(arguments) = self.arguments {
            key = key.with_arguments(arguments);
        }
        key
    }
}

impl std::fmt::Debug for ResolveRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveRequest")
            .field("type_name", &self.type_name)
            .field("field_name", &self.field_name)
            .field("object", &self.object.map(|o| o.cache_key()))
            .field("arguments", &self.arguments)
            .field("force", &self.force)
            .finish()
    }
}

/// Routes field resolutions through the cache when the field asks for it.
pub struct FieldResolver<D = JsonDeconstructor> {
    ctx: CacheContext,
    deconstructor: Arc<D>,
}

impl FieldResolver {
    /// Resolver deconstructing through `serde_json`.
    pub fn new(ctx: CacheContext) -> Self {
        Self::with_deconstructor(ctx, Arc::new(JsonDeconstructor))
    }
}

impl<D> FieldResolver<D> {
    /// Resolver with a custom deconstructor shared by every marshal it creates.
    pub fn with_deconstructor(ctx: CacheContext, deconstructor: Arc<D>) -> Self {
        Self { ctx, deconstructor }
    }

    /// The bound context.
    pub fn context(&self) -> &CacheContext {
        &self.ctx
    }

    /// Marshal for the key `request` maps to.
    pub fn marshal_for(&self, request: &ResolveRequest<'_>) -> CacheMarshal<D> {
        let key = request.cache_key(self.ctx.namespace());
        CacheMarshal::with_deconstructor(self.ctx.clone(), key, Arc::clone(&self.deconstructor))
    }

    /// Resolve one field.
    ///
    /// A disabled field invokes `resolve` directly and never touches the
    /// store. An enabled field is read through the cache with the field's
    /// options and the request's force flag.
    pub async fn resolve<T, F>(
        &self,
        field: &FieldCacheConfig,
        request: &ResolveRequest<'_>,
        resolve: F,
    ) -> CacheResult<Fetched<T>>
    where
        T: Send + 'static,
        D: Deconstructor<T> + 'static,
        F: FnOnce() -> CacheResult<Resolution<T>>,
    {
        match field {
            FieldCacheConfig::Disabled => resolve().map(Fetched::Resolved),
            FieldCacheConfig::Enabled(options) => {
                self.marshal_for(request)
                    .read(options, request.force(), resolve)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CacheStore, InMemoryCacheStore};
    use fieldcache_core::{CacheOptions, CacheSettings};
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (FieldResolver, Arc<InMemoryCacheStore>) {
        let store = Arc::new(InMemoryCacheStore::new());
        let ctx = CacheContext::new(CacheSettings::new().with_namespace("gql"), store.clone())
            .unwrap();
        (FieldResolver::new(ctx), store)
    }

    #[test]
    fn test_request_key() {
        let parent = "User/42".to_string();
        let args = json!({"first": 2});
        let request = ResolveRequest::new("User", "friends")
            .with_object(&parent)
            .with_arguments(&args);

        assert_eq!(
            request.cache_key("gql").render(),
            r#"gql:User/42:User:friends:{"first":2}"#
        );
        assert!(format!("{:?}", request).contains("User/42"));
    }

    #[tokio::test]
    async fn test_disabled_field_skips_store() {
        let (resolver, store) = setup();
        let request = ResolveRequest::new("Query", "now");

        let fetched = resolver
            .resolve(&FieldCacheConfig::Disabled, &request, || {
                Ok(Resolution::ready(json!("12:00")))
            })
            .await
            .unwrap();

        assert!(fetched.is_resolved());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_enabled_field_reads_through() {
        let (resolver, store) = setup();
        let field = FieldCacheConfig::Enabled(CacheOptions::new().with_expiry(Duration::from_secs(30)));
        let request = ResolveRequest::new("Query", "featured");

        let first = resolver
            .resolve(&field, &request, || Ok(Resolution::ready(json!([1, 2]))))
            .await
            .unwrap();
        assert!(first.is_resolved());

        let ttl = store.ttl("gql:root:Query:featured").await.unwrap();
        assert!(ttl <= Duration::from_secs(30));

        let second = resolver
            .resolve::<Value, _>(&field, &request, || panic!("should be cached"))
            .await
            .unwrap();
        assert_eq!(second.into_document(), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_distinct_arguments_never_share_an_entry() {
        let (resolver, _store) = setup();
        let field = FieldCacheConfig::enabled();
        let packed = json!({"a": "1,b=2"});
        let split = json!({"a": "1", "b": "2"});

        let first = resolver
            .resolve(
                &field,
                &ResolveRequest::new("Query", "search").with_arguments(&packed),
                || Ok(Resolution::ready(json!("packed result"))),
            )
            .await
            .unwrap();
        assert!(first.is_resolved());

        let second = resolver
            .resolve(
                &field,
                &ResolveRequest::new("Query", "search").with_arguments(&split),
                || Ok(Resolution::ready(json!("split result"))),
            )
            .await
            .unwrap();
        assert!(second.is_resolved());
        assert_eq!(
            second.into_resolution().and_then(|r| r.as_ready().cloned()),
            Some(json!("split result"))
        );
    }

    #[tokio::test]
    async fn test_forced_request_refreshes() {
        let (resolver, store) = setup();
        store
            .write("gql:root:Query:featured", json!("old"), Duration::from_secs(60))
            .await
            .unwrap();

        let request = ResolveRequest::new("Query", "featured").with_force(true);
        let fetched = resolver
            .resolve(&FieldCacheConfig::enabled(), &request, || {
                Ok(Resolution::ready(json!("new")))
            })
            .await
            .unwrap();

        assert!(fetched.is_resolved());
        assert_eq!(
            store.read("gql:root:Query:featured").await.unwrap(),
            Some(json!("new"))
        );
    }
}
