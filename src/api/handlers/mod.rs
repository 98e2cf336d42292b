//! API handlers for brickwall.

pub mod auth;
pub mod health;
pub mod root;
