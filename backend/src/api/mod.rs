//! API module
//!
//! Contains HTTP request handlers and router construction

pub mod health;
pub mod routes;
pub mod state;
pub mod users;

pub use routes::create_router;
pub use state::AppState;
