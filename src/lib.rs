pub mod api;
pub mod browser;
pub mod config;
pub mod credentials;
pub mod report;
