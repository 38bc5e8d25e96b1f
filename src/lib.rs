pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod rpc;
pub mod services;
pub mod version;

#[cfg(test)]
mod test_support;
