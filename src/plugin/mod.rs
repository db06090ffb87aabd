//! Plugin resolution.
//!
//! Maps declared plugin names to registry loaders, resolves entries
//! concurrently with per-entry failure absorption, and audits the secret
//! keys each resolved plugin requires.

pub mod registry;
pub mod resolver;
pub mod secrets;

pub use registry::{LoaderError, PluginCapabilities, PluginLoader, PluginRegistry, StaticPluginLoader};
pub use resolver::{resolve, ResolvedPlugin};
pub use secrets::{MissingSecretWarning, SecretRequirements};
