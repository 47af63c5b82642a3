// Library exports for DevConnect
// This allows integration tests and external code to use DevConnect modules

pub mod auth;
pub mod backend;
pub mod cache;
pub mod communities;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod graphql;
pub mod posts;
pub mod routes;
pub mod state;
