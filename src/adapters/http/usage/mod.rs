//! Usage endpoints: read and bump the current identity's daily counter.

pub mod handlers;
pub mod routes;

pub use routes::usage_routes;
