use std::pin::Pin;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::DeliveryError;
use crate::ports;
use crate::types::push::VapidConfig;
use crate::types::subscription::SubscriptionDescriptor;

mod supabase;

pub use supabase::{DurableStore, SupabaseStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ports::Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Error = DeliveryError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a SubscriptionDescriptor,
        payload: &'a [u8],
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            let p256dh = subscription
                .p256dh_key
                .clone()
                .ok_or(DeliveryError::MissingCredential("p256dh key"))?;
            let auth = subscription
                .auth_key
                .clone()
                .ok_or(DeliveryError::MissingCredential("auth key"))?;
            let subscription_info =
                web_push::SubscriptionInfo::new(subscription.endpoint.clone(), p256dh, auth);
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload);
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}
