//! Application services: pagination, post workflows and repository seams.

pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
