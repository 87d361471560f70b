pub mod api;
pub mod config;
pub mod fetcher;
pub mod media;
pub mod observability;
pub mod queue;
pub mod store;
pub mod worker;
