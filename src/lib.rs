pub mod batch;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod http;
pub mod inventory;
pub mod logging;
pub mod profile_store;
pub mod prune;
pub mod sigv4;
pub mod template;
pub mod words;
