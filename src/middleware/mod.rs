pub mod auth;
pub mod json;
pub mod response;
pub mod user_scope;

pub use auth::{session_middleware, AuthUser};
pub use json::JsonBody;
pub use response::{ApiResponse, ApiResult};
pub use user_scope::{user_scope_guard, Owner};
