use std::net::SocketAddr;

pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";
pub const DEFAULT_SUBSCRIPTIONS_TABLE: &str = "push_subscriptions";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: String,
    pub supabase: Option<SupabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub table: String,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: DEFAULT_VAPID_SUBJECT.to_string(),
            supabase: None,
        }
    }
}
