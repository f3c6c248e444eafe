pub mod manager;

pub use manager::{SessionData, SessionManager};
