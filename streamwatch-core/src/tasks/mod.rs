// File: src/tasks/mod.rs

pub mod presence_poll;

pub use presence_poll::{spawn_presence_poll_task, MonitorRuntime};
