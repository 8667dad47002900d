use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Canonical record of one push recipient.
///
/// Keyed by `endpoint`. A descriptor can be stored without credentials but
/// only becomes deliverable once both keys are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDescriptor {
    pub endpoint: String,
    pub auth_key: Option<String>,
    pub p256dh_key: Option<String>,
    pub owner_id: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Subscription as posted by a browser client.
///
/// Accepts the `PushSubscription.toJSON()` shape (`keys.auth`,
/// `keys.p256dh`) as well as flat credential fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubscription {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub keys: Option<RawKeys>,
    #[serde(default, alias = "auth")]
    pub auth_key: Option<String>,
    #[serde(default, alias = "p256dh")]
    pub p256dh_key: Option<String>,
    #[serde(default, rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawKeys {
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub p256dh: Option<String>,
}
