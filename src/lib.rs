pub mod client;
pub mod config;
pub mod exchange_rate;
pub mod fetcher;
pub mod quote;
pub mod server;
pub mod store;
