// File: streamwatch-common/src/models/mod.rs
pub mod account;
pub mod platform;
pub mod presence;
pub mod subscription;

pub use account::TrackedAccount;
pub use platform::Platform;
pub use presence::{AccountIdentity, PresenceEvent, PresenceEventKind, StatusSnapshot};
pub use subscription::Subscription;
