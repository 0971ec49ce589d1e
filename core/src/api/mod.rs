//! API Module
//!
//! HTTP API endpoints for the Cloak privacy router.

pub mod handlers;
pub mod routes;
pub mod types;


pub use handlers::{ApiState, CALLER_HEADER};
pub use routes::create_router;
