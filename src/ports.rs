pub mod push;
pub mod store;
pub mod time;

pub use self::push::PushSender;
pub use self::store::{SubscriptionStore, WriteShape};
pub use self::time::Clock;
