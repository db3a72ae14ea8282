//! HTTP API handlers

pub mod buildinfo;
pub mod frame;
pub mod health;

pub use buildinfo::get_build_info;
pub use frame::{frame_routes, serve_frame};
pub use health::health_routes;
