pub mod config;

pub use config::{ConnectionConfig, Scheme};
