pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod query;
pub mod report;
pub mod track;
