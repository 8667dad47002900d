use time::OffsetDateTime;

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}
