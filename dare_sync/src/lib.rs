//! Automatic synchronization for recorded Vulkan commands.
//!
//! Every buffer and image registered with a [`SyncContext`] carries its last known pipeline
//! stage, access and (for images) layout. A [`CommandRecorder`] derives the usage scope of each
//! command it records, synthesizes the barriers the transition requires, inserts them ahead of
//! the command and updates the tracked state.

pub mod command;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod prelude;
pub mod resource;
pub mod scope;
pub mod sync;
pub mod traits;
pub mod util;

pub use command::CommandRecorder;
pub use config::SyncConfig;
pub use context::SyncContext;
pub use error::SyncError;

// Re-exports
pub use ash;
pub use dare_containers;
