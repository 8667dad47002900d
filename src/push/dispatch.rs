use crate::error::BroadcastError;
use crate::ports::{Clock, PushSender, SubscriptionStore};
use crate::registry::Registry;
use crate::types::push::VapidConfig;
use crate::types::subscription::SubscriptionDescriptor;

use super::vapid::VapidConfigStatus;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub const DEFAULT_TITLE: &str = "Notificação";
pub const DEFAULT_BODY: &str = "Mensagem";
pub const DEFAULT_URL: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl BroadcastMessage {
    /// Absent or blank parts fall back to the defaults.
    pub fn new(title: Option<String>, body: Option<String>, url: Option<String>) -> Self {
        Self {
            title: or_default(title, DEFAULT_TITLE),
            body: or_default(body, DEFAULT_BODY),
            url: or_default(url, DEFAULT_URL),
        }
    }
}

impl Default for BroadcastMessage {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// JSON body handed to the service worker's `push` handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub data: NotificationData,
    pub tag: String,
    pub renotify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    pub url: String,
}

impl NotificationPayload {
    /// The tag replaces a still-visible notification from an earlier
    /// broadcast; `renotify` makes the replacement alert again.
    pub fn new(message: &BroadcastMessage, created_at: OffsetDateTime) -> Self {
        Self {
            title: message.title.clone(),
            body: message.body.clone(),
            data: NotificationData {
                url: message.url.clone(),
            },
            tag: format!("broadcast-{}", created_at.unix_timestamp_nanos() / 1_000_000),
            renotify: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastResult {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

/// Sends `message` to every active, deliverable subscription.
///
/// Fails before reading the registry when VAPID keys are missing. Delivery
/// failures are counted, never returned.
pub async fn broadcast_all<St, C, S, F>(
    vapid: VapidConfigStatus,
    make_sender: F,
    registry: &Registry<St, C>,
    message: &BroadcastMessage,
) -> Result<BroadcastResult, BroadcastError>
where
    St: SubscriptionStore,
    C: Clock,
    S: PushSender,
    F: FnOnce(VapidConfig) -> Result<S, BroadcastError>,
{
    let vapid = match vapid {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            return Err(BroadcastError::Configuration(
                "both VAPID public and private keys are required",
            ));
        }
        VapidConfigStatus::Missing => {
            return Err(BroadcastError::Configuration("VAPID keys are not set"));
        }
    };
    let sender = make_sender(vapid)?;

    let payload = NotificationPayload::new(message, registry.clock().now());
    let encoded: Arc<[u8]> = serde_json::to_vec(&payload)?.into();
    let subscriptions = registry.list_active().await;

    let result = deliver_all(&sender, subscriptions, encoded).await;
    info!(
        tag = %payload.tag,
        sent = result.sent,
        failed = result.failed,
        total = result.total,
        "broadcast finished"
    );
    Ok(result)
}

/// Delivers `payload` to each subscription in its own task and waits for
/// all of them.
pub(crate) async fn deliver_all<S: PushSender>(
    sender: &S,
    subscriptions: Vec<SubscriptionDescriptor>,
    payload: Arc<[u8]>,
) -> BroadcastResult {
    let total = subscriptions.len();
    let sent = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let mut tasks = JoinSet::new();
    for subscription in subscriptions {
        let sender = sender.clone();
        let payload = Arc::clone(&payload);
        let sent = Arc::clone(&sent);
        let failed = Arc::clone(&failed);
        tasks.spawn(async move {
            match sender.send(&subscription, &payload).await {
                Ok(()) => {
                    sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    warn!(endpoint = %subscription.endpoint, error = %err, "push delivery failed");
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "push delivery task did not complete");
        }
    }

    BroadcastResult {
        sent: sent.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        total,
    }
}
