/// Registration errors surfaced to the client.
///
/// Durable store failures never show up here; they are absorbed by the
/// fallback store.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid subscription: {0}")]
    InvalidSubscription(&'static str),
}

/// Failure of a single read or write against the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("durable store is not configured")]
    NotConfigured,

    #[error("durable store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("durable store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("durable store response could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    /// Stable short code reported back to clients as the fallback reason.
    pub fn code(&self) -> String {
        match self {
            StoreError::NotConfigured => "supabase-not-configured".to_string(),
            StoreError::Transport(_) => "supabase-unreachable".to_string(),
            StoreError::Rejected { status, .. } => format!("supabase-rejected-{status}"),
            StoreError::Decode(_) => "supabase-decode".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("push notifications are not configured: {0}")]
    Configuration(&'static str),

    #[error("failed to initialize push sender: {0}")]
    SenderInit(String),

    #[error("failed to encode notification payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Failure to deliver to one recipient.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscription is missing {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    WebPush(#[from] web_push::WebPushError),
}
