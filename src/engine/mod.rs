//! Resolver construction and the batch orchestrator

mod builder;
mod resolver;

pub use builder::{Muninn, MuninnBuilder};
pub use resolver::BulkResolver;
