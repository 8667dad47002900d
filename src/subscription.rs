use crate::error::RegistryError;
use crate::types::subscription::{RawKeys, RawSubscription, SubscriptionDescriptor};

use std::collections::HashMap;

use serde_json::json;
use time::OffsetDateTime;

impl RawSubscription {
    /// Produces the canonical descriptor, stamped with `now`.
    ///
    /// Nested `keys` win over flat fields when both are present. Blank
    /// strings count as absent. Only a missing endpoint is an error.
    pub fn normalize(self, now: OffsetDateTime) -> Result<SubscriptionDescriptor, RegistryError> {
        let endpoint = non_blank(self.endpoint)
            .ok_or(RegistryError::InvalidSubscription("endpoint is required"))?;
        let RawKeys { auth, p256dh } = self.keys.unwrap_or_default();

        Ok(SubscriptionDescriptor {
            endpoint,
            auth_key: non_blank(auth).or_else(|| non_blank(self.auth_key)),
            p256dh_key: non_blank(p256dh).or_else(|| non_blank(self.p256dh_key)),
            owner_id: non_blank(self.user_id),
            is_active: true,
            updated_at: now,
        })
    }
}

impl SubscriptionDescriptor {
    pub fn is_deliverable(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && has_value(self.auth_key.as_deref())
            && has_value(self.p256dh_key.as_deref())
    }

    /// Browser-shaped JSON document, as stored in the `subscription` column.
    pub fn to_document(&self) -> serde_json::Value {
        json!({
            "endpoint": self.endpoint,
            "keys": {
                "auth": self.auth_key,
                "p256dh": self.p256dh_key,
            },
        })
    }
}

/// Collapses `descriptors` to one entry per endpoint and keeps only the
/// active, deliverable ones.
///
/// The entry with the newest `updated_at` wins for each endpoint; on a tie
/// the later one does. The surviving entry keeps the position of the
/// endpoint's first appearance.
pub fn deliverable_set<I>(descriptors: I) -> Vec<SubscriptionDescriptor>
where
    I: IntoIterator<Item = SubscriptionDescriptor>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<SubscriptionDescriptor> = Vec::new();
    for descriptor in descriptors {
        match positions.get(&descriptor.endpoint) {
            Some(&index) => {
                if descriptor.updated_at >= unique[index].updated_at {
                    unique[index] = descriptor;
                }
            }
            None => {
                positions.insert(descriptor.endpoint.clone(), unique.len());
                unique.push(descriptor);
            }
        }
    }
    unique
        .into_iter()
        .filter(|descriptor| descriptor.is_active && descriptor.is_deliverable())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn has_value(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}
