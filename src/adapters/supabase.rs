use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::config::SupabaseConfig;
use crate::error::StoreError;
use crate::ports::{SubscriptionStore, WriteShape};
use crate::types::subscription::{RawSubscription, SubscriptionDescriptor};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_ENDPOINT_COLUMN: &str = "subscription->>endpoint";

/// Subscription table behind a Supabase (PostgREST) endpoint.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pushfan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            api_key: config.service_key.clone(),
        })
    }

    async fn write_shape(
        &self,
        shape: WriteShape,
        descriptor: &SubscriptionDescriptor,
    ) -> Result<(), StoreError> {
        match shape {
            WriteShape::Document => self.write_document(descriptor).await,
            WriteShape::Structured => self.upsert_structured(descriptor).await,
        }
    }

    /// Replaces the document row for the endpoint, inserting one only when
    /// no row matched.
    async fn write_document(&self, descriptor: &SubscriptionDescriptor) -> Result<(), StoreError> {
        let row = DocumentRow::from(descriptor);
        let filter = format!("eq.{}", descriptor.endpoint);
        let response = self
            .client
            .patch(&self.table_url)
            .query(&[(DOCUMENT_ENDPOINT_COLUMN, filter.as_str())])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let updated: Vec<Value> = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        if !updated.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn upsert_structured(&self, descriptor: &SubscriptionDescriptor) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.table_url)
            .query(&[("on_conflict", "endpoint")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&StructuredRow::from(descriptor))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_active(&self) -> Result<Vec<SubscriptionDescriptor>, StoreError> {
        let response = self
            .client
            .get(&self.table_url)
            .query(&[
                ("select", "*"),
                ("is_active", "eq.true"),
                ("order", "updated_at.asc"),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match decode_row(row) {
                Ok(descriptor) => Some(descriptor),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable subscription row");
                    None
                }
            })
            .collect())
    }
}

/// Durable backend as wired at startup.
///
/// `Unconfigured` fails every call with [`StoreError::NotConfigured`], which
/// routes all registrations to the fallback store.
#[derive(Debug, Clone)]
pub enum DurableStore {
    Supabase(SupabaseStore),
    Unconfigured,
}

impl DurableStore {
    pub fn from_config(config: Option<&SupabaseConfig>) -> Self {
        let Some(config) = config else {
            return DurableStore::Unconfigured;
        };
        match SupabaseStore::new(config) {
            Ok(store) => DurableStore::Supabase(store),
            Err(err) => {
                warn!(error = %err, "durable store disabled: failed to init http client");
                DurableStore::Unconfigured
            }
        }
    }
}

impl SubscriptionStore for DurableStore {
    type WriteFut<'a>
        = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>
    where
        Self: 'a;
    type ListFut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<SubscriptionDescriptor>, StoreError>> + Send + 'a>>
    where
        Self: 'a;

    fn write<'a>(
        &'a self,
        shape: WriteShape,
        descriptor: &'a SubscriptionDescriptor,
    ) -> Self::WriteFut<'a> {
        Box::pin(async move {
            match self {
                DurableStore::Supabase(store) => store.write_shape(shape, descriptor).await,
                DurableStore::Unconfigured => Err(StoreError::NotConfigured),
            }
        })
    }

    fn list_active<'a>(&'a self) -> Self::ListFut<'a> {
        Box::pin(async move {
            match self {
                DurableStore::Supabase(store) => store.fetch_active().await,
                DurableStore::Unconfigured => Err(StoreError::NotConfigured),
            }
        })
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct DocumentRow<'a> {
    subscription: Value,
    is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl<'a> From<&'a SubscriptionDescriptor> for DocumentRow<'a> {
    fn from(descriptor: &'a SubscriptionDescriptor) -> Self {
        Self {
            subscription: descriptor.to_document(),
            is_active: descriptor.is_active,
            updated_at: descriptor.updated_at,
            user_id: descriptor.owner_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct StructuredRow<'a> {
    endpoint: &'a str,
    p256dh_key: Option<&'a str>,
    auth_key: Option<&'a str>,
    user_id: Option<&'a str>,
    is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl<'a> From<&'a SubscriptionDescriptor> for StructuredRow<'a> {
    fn from(descriptor: &'a SubscriptionDescriptor) -> Self {
        Self {
            endpoint: &descriptor.endpoint,
            p256dh_key: descriptor.p256dh_key.as_deref(),
            auth_key: descriptor.auth_key.as_deref(),
            user_id: descriptor.owner_id.as_deref(),
            is_active: descriptor.is_active,
            updated_at: descriptor.updated_at,
        }
    }
}

/// Union of both table layouts; unknown columns are ignored.
#[derive(Debug, Default, Deserialize)]
struct StoredRow {
    #[serde(default)]
    subscription: Option<Value>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    auth_key: Option<String>,
    #[serde(default)]
    p256dh_key: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    updated_at: Option<String>,
}

fn decode_row(row: Value) -> Result<SubscriptionDescriptor, String> {
    let row: StoredRow = serde_json::from_value(row).map_err(|err| err.to_string())?;
    let raw = match row.subscription {
        Some(Value::String(text)) => {
            serde_json::from_str::<RawSubscription>(&text).map_err(|err| err.to_string())?
        }
        Some(document @ Value::Object(_)) => {
            serde_json::from_value::<RawSubscription>(document).map_err(|err| err.to_string())?
        }
        _ => RawSubscription {
            endpoint: row.endpoint,
            auth_key: row.auth_key,
            p256dh_key: row.p256dh_key,
            ..Default::default()
        },
    };
    let updated_at = row
        .updated_at
        .as_deref()
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    let mut descriptor = raw.normalize(updated_at).map_err(|err| err.to_string())?;
    if let Some(user_id) = row.user_id.filter(|id| !id.trim().is_empty()) {
        descriptor.owner_id = Some(user_id);
    }
    descriptor.is_active = row.is_active.unwrap_or(true);
    Ok(descriptor)
}
