//! Scanner module: service-table probing of live hosts

pub mod engine;

pub use engine::PortScanner;
