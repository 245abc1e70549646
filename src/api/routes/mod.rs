//! API Routes
//!
//! Route handlers organized by functionality.

pub mod database;
pub mod health;
pub mod territory;
