pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod request;
pub mod response;
pub mod webservice;

// Layered boundaries: usecases and ports in app, adapters in infra
pub mod app;
pub mod infra;

pub mod observability;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use response::{ResponseMode, Validated};
pub use webservice::Operation;
