// Library for tests to access modules

pub mod analysis;
pub mod analysis_repo;
pub mod analytics;
pub mod config;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;
pub mod stream;
pub mod version;
