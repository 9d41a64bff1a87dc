//! itemstore - a small JSON CRUD service for items
//!
//! Each HTTP request maps onto exactly one repository call, and each
//! repository call onto exactly one storage operation:
//! - S3/object storage in production, local filesystem or memory otherwise
//! - Per-call deadlines, no retries, no caching
//! - Simple HTTP API under `/item` and `/items`

pub mod api;
pub mod config;
pub mod error;
pub mod repository;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
