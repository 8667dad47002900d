use crate::types::subscription::SubscriptionDescriptor;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Process-lifetime fallback store.
///
/// Constructed once at startup and shared by reference. Contents are lost
/// on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, SubscriptionDescriptor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, descriptor: SubscriptionDescriptor) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(descriptor.endpoint.clone(), descriptor);
    }

    pub fn remove(&self, endpoint: &str) -> Option<SubscriptionDescriptor> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(endpoint)
    }

    pub fn snapshot(&self) -> Vec<SubscriptionDescriptor> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn descriptor(endpoint: &str, auth: &str) -> SubscriptionDescriptor {
        SubscriptionDescriptor {
            endpoint: endpoint.to_string(),
            auth_key: Some(auth.to_string()),
            p256dh_key: Some("p256".to_string()),
            owner_id: None,
            is_active: true,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn upsert__should_overwrite_same_endpoint() {
        // Given
        let store = MemoryStore::new();

        // When
        store.upsert(descriptor("https://push.example/1", "first"));
        store.upsert(descriptor("https://push.example/1", "second"));

        // Then
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].auth_key.as_deref(), Some("second"));
    }

    #[test]
    fn remove__should_drop_entry() {
        // Given
        let store = MemoryStore::new();
        store.upsert(descriptor("https://push.example/1", "auth"));

        // When
        let removed = store.remove("https://push.example/1");

        // Then
        assert!(removed.is_some());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn upsert__should_handle_concurrent_writers() {
        // Given
        let store = Arc::new(MemoryStore::new());

        // When
        let mut tasks = tokio::task::JoinSet::new();
        for index in 0..32 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                store.upsert(descriptor(&format!("https://push.example/{}", index % 8), "auth"));
                store.snapshot().len()
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.expect("join task");
        }

        // Then
        assert_eq!(store.len(), 8);
    }
}
