pub mod auth;
pub mod response;

pub use auth::resolve_principal;
pub use response::{ApiResponse, ApiResult};
