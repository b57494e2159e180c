//! # Shopfloor Server
//!
//! Process host for the Shopfloor inventory engine.
//!
//! - [`config`]: environment configuration
//! - [`resources`]: pool, migrations, seeding and encryption bootstrap
//! - [`app`]: the [`Shopfloor`] facade consumed by an HTTP layer
//! - [`lifecycle`]: startup and signal-driven graceful shutdown

#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod lifecycle;
pub mod resources;

pub use app::Shopfloor;
pub use config::{Config, ConfigError};
pub use lifecycle::Application;
pub use resources::ResourceManager;
