pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fernet;
pub mod logging;
pub mod notifier;
pub mod orchestrator;
pub mod owner;
pub mod table;
