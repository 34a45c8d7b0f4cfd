//! Persisted project configuration

pub mod store;

pub use store::{ConfigDocument, ConfigStore};
