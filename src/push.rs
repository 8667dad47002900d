use crate::adapters::WebPushSender;
use crate::config;
use crate::error::BroadcastError;
use crate::ports::{Clock, SubscriptionStore};
use crate::registry::Registry;

mod dispatch;
pub(crate) mod vapid;

pub use dispatch::{
    BroadcastMessage, BroadcastResult, NotificationData, NotificationPayload, broadcast_all,
};
pub use vapid::{VapidConfigStatus, VapidCredentials, load_vapid_config};

/// Broadcasts over real Web Push using the VAPID keys from `config`.
pub async fn broadcast<St, C>(
    config: &config::AppConfig,
    registry: &Registry<St, C>,
    message: &BroadcastMessage,
) -> Result<BroadcastResult, BroadcastError>
where
    St: SubscriptionStore,
    C: Clock,
{
    broadcast_all(
        load_vapid_config(config),
        |vapid| {
            WebPushSender::new(vapid).map_err(|err| BroadcastError::SenderInit(err.to_string()))
        },
        registry,
        message,
    )
    .await
}
