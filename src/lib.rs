//! Bulletin: a small server-rendered blog with paginated listings and
//! weighted full-text search.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
