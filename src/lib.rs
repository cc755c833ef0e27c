pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stream;
pub mod telemetry;

pub use client::ReccoClient;
pub use config::Config;
pub use error::{ClientError, ClientResult};
