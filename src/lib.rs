pub mod allocation;
pub mod config;
pub mod output;
pub mod roi;
pub mod scenario;
pub mod server;
pub mod wizard;
