pub mod cli;
pub mod client;
pub mod config;
pub mod data_paths;
pub use data_paths as data;
pub mod logging;
pub mod scan;
pub mod sources;
pub mod store;
pub mod types;
