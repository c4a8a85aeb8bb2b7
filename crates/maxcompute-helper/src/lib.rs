//! MaxCompute / DataWorks connector.
//!
//! Three interchangeable transports fetch table metadata, run SQL and page
//! through results: a SQL session ([`adapters::jdbc`]), a native job client
//! ([`adapters::sdk`]) and the DataWorks OpenAPI ([`adapters::dataworks`]).
//! The pagination and normalization rules they share live in [`core`].

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;

pub use crate::core::types::{PageResult, Row, TableColumnMetaInfo, TableMetaInfo};
pub use crate::error::{AppError, AppResult};
