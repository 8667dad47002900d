use crate::error::{RegistryError, StoreError};
use crate::ports::{Clock, SubscriptionStore, WriteShape};
use crate::subscription::deliverable_set;
use crate::types::subscription::{RawSubscription, SubscriptionDescriptor};

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use tracing::{debug, warn};

/// Durable write attempts, in order. The first success wins.
pub const WRITE_ORDER: [WriteShape; 2] = [WriteShape::Document, WriteShape::Structured];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOutcome {
    DurableDocument,
    DurableStructured,
    Fallback,
}

impl StorageOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageOutcome::DurableDocument => "durable-document",
            StorageOutcome::DurableStructured => "durable-structured",
            StorageOutcome::Fallback => "fallback",
        }
    }

    /// Backend name reported to clients.
    pub fn backend(self) -> &'static str {
        match self {
            StorageOutcome::DurableDocument | StorageOutcome::DurableStructured => "supabase",
            StorageOutcome::Fallback => "memory",
        }
    }
}

impl From<WriteShape> for StorageOutcome {
    fn from(shape: WriteShape) -> Self {
        match shape {
            WriteShape::Document => StorageOutcome::DurableDocument,
            WriteShape::Structured => StorageOutcome::DurableStructured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResult {
    pub outcome: StorageOutcome,
    /// Reason code of the last durable failure when the fallback was used.
    pub reason: Option<String>,
}

/// Subscription registry over a durable store with an in-process fallback.
pub struct Registry<S, C> {
    durable: S,
    fallback: Arc<MemoryStore>,
    clock: C,
}

impl<S, C> Registry<S, C>
where
    S: SubscriptionStore,
    C: Clock,
{
    pub fn new(durable: S, fallback: Arc<MemoryStore>, clock: C) -> Self {
        Self {
            durable,
            fallback,
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn register(&self, raw: RawSubscription) -> Result<RegisterResult, RegistryError> {
        let descriptor = raw.normalize(self.clock.now())?;

        let mut last_error: Option<StoreError> = None;
        for shape in WRITE_ORDER {
            match self.durable.write(shape, &descriptor).await {
                Ok(()) => {
                    // A stale fallback copy would shadow this write on read.
                    self.fallback.remove(&descriptor.endpoint);
                    debug!(
                        endpoint = %descriptor.endpoint,
                        shape = shape.as_str(),
                        "subscription stored durably"
                    );
                    return Ok(RegisterResult {
                        outcome: shape.into(),
                        reason: None,
                    });
                }
                Err(StoreError::NotConfigured) => {
                    last_error = Some(StoreError::NotConfigured);
                    break;
                }
                Err(err) => {
                    warn!(
                        endpoint = %descriptor.endpoint,
                        shape = shape.as_str(),
                        error = %err,
                        "durable subscription write failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let reason = last_error.map(|err| err.code());
        debug!(
            endpoint = %descriptor.endpoint,
            reason = reason.as_deref().unwrap_or_default(),
            "subscription stored in fallback store"
        );
        self.fallback.upsert(descriptor);
        Ok(RegisterResult {
            outcome: StorageOutcome::Fallback,
            reason,
        })
    }

    /// Active, deliverable subscriptions, one per endpoint.
    ///
    /// Durable rows come first and fallback entries are merged after them;
    /// the newest `updated_at` wins per endpoint, the fallback copy on a tie.
    pub async fn list_active(&self) -> Vec<SubscriptionDescriptor> {
        let durable = match self.durable.list_active().await {
            Ok(rows) => rows,
            Err(StoreError::NotConfigured) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "durable subscription read failed, serving fallback store");
                Vec::new()
            }
        };
        deliverable_set(durable.into_iter().chain(self.fallback.snapshot()))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::types::subscription::RawKeys;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    #[derive(Debug, Clone)]
    pub(crate) struct FixedClock(pub(crate) OffsetDateTime);

    impl FixedClock {
        pub(crate) fn new() -> Self {
            Self(OffsetDateTime::parse("2025-01-12T09:30:00Z", &Rfc3339).expect("parse now"))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    /// In-memory stand-in for the durable backend.
    ///
    /// Both shapes replace any existing row for the endpoint.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub(crate) rows: Mutex<Vec<SubscriptionDescriptor>>,
        pub(crate) writes: Mutex<Vec<WriteShape>>,
        pub(crate) rejected: HashSet<WriteShape>,
        pub(crate) not_configured: bool,
        pub(crate) read_fails: bool,
    }

    impl FakeStore {
        pub(crate) fn rejecting(shapes: &[WriteShape]) -> Self {
            Self {
                rejected: shapes.iter().copied().collect(),
                ..Default::default()
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self {
                rejected: WRITE_ORDER.into_iter().collect(),
                read_fails: true,
                ..Default::default()
            }
        }

        pub(crate) fn writes(&self) -> Vec<WriteShape> {
            self.writes.lock().expect("writes lock").clone()
        }
    }

    impl SubscriptionStore for FakeStore {
        type WriteFut<'a>
            = std::future::Ready<Result<(), StoreError>>
        where
            Self: 'a;
        type ListFut<'a>
            = std::future::Ready<Result<Vec<SubscriptionDescriptor>, StoreError>>
        where
            Self: 'a;

        fn write<'a>(
            &'a self,
            shape: WriteShape,
            descriptor: &'a SubscriptionDescriptor,
        ) -> Self::WriteFut<'a> {
            if self.not_configured {
                return std::future::ready(Err(StoreError::NotConfigured));
            }
            self.writes.lock().expect("writes lock").push(shape);
            if self.rejected.contains(&shape) {
                return std::future::ready(Err(StoreError::Rejected {
                    status: 400,
                    body: format!("{} shape not supported", shape.as_str()),
                }));
            }
            let mut rows = self.rows.lock().expect("rows lock");
            rows.retain(|row| row.endpoint != descriptor.endpoint);
            rows.push(descriptor.clone());
            std::future::ready(Ok(()))
        }

        fn list_active<'a>(&'a self) -> Self::ListFut<'a> {
            if self.not_configured {
                return std::future::ready(Err(StoreError::NotConfigured));
            }
            if self.read_fails {
                return std::future::ready(Err(StoreError::Decode("boom".to_string())));
            }
            let rows = self.rows.lock().expect("rows lock");
            std::future::ready(Ok(rows.iter().filter(|row| row.is_active).cloned().collect()))
        }
    }

    pub(crate) fn raw(endpoint: &str, auth: Option<&str>, p256dh: Option<&str>) -> RawSubscription {
        RawSubscription {
            endpoint: Some(endpoint.to_string()),
            keys: Some(RawKeys {
                auth: auth.map(str::to_string),
                p256dh: p256dh.map(str::to_string),
            }),
            ..Default::default()
        }
    }

    fn registry(store: FakeStore) -> Registry<FakeStore, FixedClock> {
        Registry::new(store, Arc::new(MemoryStore::new()), FixedClock::new())
    }

    #[tokio::test]
    async fn register__should_prefer_document_shape() {
        // Given
        let registry = registry(FakeStore::default());

        // When
        let result = registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register");

        // Then
        assert_eq!(result.outcome, StorageOutcome::DurableDocument);
        assert_eq!(result.reason, None);
        assert_eq!(registry.durable.writes(), vec![WriteShape::Document]);
    }

    #[tokio::test]
    async fn register__should_try_structured_shape_when_document_rejected() {
        // Given
        let registry = registry(FakeStore::rejecting(&[WriteShape::Document]));

        // When
        let result = registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register");

        // Then
        assert_eq!(result.outcome, StorageOutcome::DurableStructured);
        assert_eq!(
            registry.durable.writes(),
            vec![WriteShape::Document, WriteShape::Structured]
        );
        assert!(registry.fallback.is_empty());
    }

    #[tokio::test]
    async fn register__should_fall_back_to_memory_when_durable_store_unavailable() {
        // Given
        let registry = registry(FakeStore::unavailable());

        // When
        let result = registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register");
        let active = registry.list_active().await;

        // Then
        assert_eq!(result.outcome, StorageOutcome::Fallback);
        assert_eq!(result.outcome.backend(), "memory");
        assert_eq!(result.reason.as_deref(), Some("supabase-rejected-400"));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].endpoint, "https://push.example/1");
    }

    #[tokio::test]
    async fn register__should_skip_durable_attempts_when_not_configured() {
        // Given
        let registry = registry(FakeStore {
            not_configured: true,
            ..Default::default()
        });

        // When
        let result = registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register");

        // Then
        assert_eq!(result.outcome, StorageOutcome::Fallback);
        assert_eq!(result.reason.as_deref(), Some("supabase-not-configured"));
        assert_eq!(registry.list_active().await.len(), 1);
    }

    #[tokio::test]
    async fn register__should_reject_missing_endpoint_before_storage() {
        // Given
        let registry = registry(FakeStore::default());

        // When
        let result = registry.register(RawSubscription::default()).await;

        // Then
        assert!(matches!(result, Err(RegistryError::InvalidSubscription(_))));
        assert!(registry.durable.writes().is_empty());
        assert!(registry.fallback.is_empty());
    }

    #[tokio::test]
    async fn list_active__should_replace_on_reregistration() {
        // Given
        let registry = registry(FakeStore::default());
        registry
            .register(raw("https://push.example/1", Some("a1"), Some("p1")))
            .await
            .expect("register first");

        // When
        registry
            .register(raw("https://push.example/1", Some("a2"), Some("p2")))
            .await
            .expect("register second");
        let active = registry.list_active().await;

        // Then
        assert_eq!(registry.durable.rows.lock().expect("rows lock").len(), 1);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].auth_key.as_deref(), Some("a2"));
        assert_eq!(active[0].p256dh_key.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn list_active__should_be_unchanged_by_identical_registration() {
        // Given
        let registry = registry(FakeStore::rejecting(&[WriteShape::Document]));
        registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register");
        registry
            .register(raw("https://push.example/2", Some("a"), Some("p")))
            .await
            .expect("register");
        let mut before = registry.list_active().await;

        // When
        registry
            .register(raw("https://push.example/1", Some("a"), Some("p")))
            .await
            .expect("register again");
        let mut after = registry.list_active().await;

        // Then
        assert_eq!(before.len(), 2);
        before.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        after.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn list_active__should_omit_subscriptions_without_credentials() {
        // Given
        let registry = registry(FakeStore::default());
        registry
            .register(raw("https://push.example/no-auth", None, Some("p")))
            .await
            .expect("register no auth");
        registry
            .register(raw("https://push.example/no-p256dh", Some("a"), None))
            .await
            .expect("register no p256dh");
        registry
            .register(raw("https://push.example/ok", Some("a"), Some("p")))
            .await
            .expect("register ok");

        // When
        let active = registry.list_active().await;

        // Then
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].endpoint, "https://push.example/ok");
    }

    #[tokio::test]
    async fn list_active__should_serve_fallback_when_durable_read_fails() {
        // Given
        let store = FakeStore {
            read_fails: true,
            ..Default::default()
        };
        let registry = registry(store);
        let descriptor = raw("https://push.example/1", Some("a"), Some("p"))
            .normalize(registry.clock.now())
            .expect("normalize");
        registry.fallback.upsert(descriptor);

        // When
        let active = registry.list_active().await;

        // Then
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].endpoint, "https://push.example/1");
    }

    #[tokio::test]
    async fn register__should_clear_fallback_copy_after_durable_success() {
        // Given
        let registry = registry(FakeStore::default());
        let descriptor = raw("https://push.example/1", Some("old"), Some("p"))
            .normalize(registry.clock.now())
            .expect("normalize");
        registry.fallback.upsert(descriptor);

        // When
        registry
            .register(raw("https://push.example/1", Some("new"), Some("p")))
            .await
            .expect("register");
        let active = registry.list_active().await;

        // Then
        assert!(registry.fallback.is_empty());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].auth_key.as_deref(), Some("new"));
    }
}
