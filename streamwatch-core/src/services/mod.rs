// File: src/services/mod.rs

pub mod notification_service;
pub mod presence_monitor;
pub mod status_provider;

pub use notification_service::NotificationService;
pub use presence_monitor::PresenceMonitor;
pub use status_provider::StatusProviderService;
