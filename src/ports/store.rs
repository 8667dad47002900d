use crate::error::StoreError;
use crate::types::subscription::SubscriptionDescriptor;

/// Row layout used for one durable write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteShape {
    /// Whole subscription in a single JSON `subscription` column.
    Document,
    /// Discrete `endpoint`, `auth_key`, `p256dh_key`, ... columns.
    Structured,
}

impl WriteShape {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteShape::Document => "document",
            WriteShape::Structured => "structured",
        }
    }
}

/// Durable subscription backend.
///
/// `write` must upsert by endpoint where the shape allows it. `list_active`
/// may return several rows for one endpoint; callers deduplicate.
pub trait SubscriptionStore: Send + Sync + 'static {
    type WriteFut<'a>: Future<Output = Result<(), StoreError>> + Send + 'a
    where
        Self: 'a;
    type ListFut<'a>: Future<Output = Result<Vec<SubscriptionDescriptor>, StoreError>> + Send + 'a
    where
        Self: 'a;

    fn write<'a>(
        &'a self,
        shape: WriteShape,
        descriptor: &'a SubscriptionDescriptor,
    ) -> Self::WriteFut<'a>;

    fn list_active<'a>(&'a self) -> Self::ListFut<'a>;
}
