pub mod middleware;
pub mod store;
pub mod types;

pub use middleware::CurrentSession;
pub use store::SessionStore;
pub use types::{Session, SessionPatch, SessionState};
