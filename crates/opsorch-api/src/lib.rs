pub mod features;
pub mod server;
pub mod shared;

#[cfg(test)]
pub(crate) mod test_support;

pub use server::{app_router, AppState, ServerConfig};
pub use shared::error::{ApiError, ApiResult};
