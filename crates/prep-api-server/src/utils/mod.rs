pub mod cache;
pub mod error;
pub mod json;
pub mod rate_limit;
