pub mod config;
pub mod rpc;
pub mod telemetry;
