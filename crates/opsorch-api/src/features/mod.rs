pub mod audit;
pub mod dispatch;
pub mod observability;
pub mod provider_config;
pub mod provider_resolution;
