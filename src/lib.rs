pub mod config;
pub mod engine;
pub mod obs;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{Amount, EngineError, EngineErrorCode};
