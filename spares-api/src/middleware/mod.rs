pub mod auth;

pub use auth::{ensure_admin, ensure_self_or_admin, require_caller, Caller, USER_ID_HEADER};
