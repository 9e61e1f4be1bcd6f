pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod results;

pub use config::{LoadSettings, StressSettings, TestConfiguration, TestMode};
pub use engine::{spawn_test, EngineEvent, EngineHandle, EngineStatus, RoundResult, StopHandle};
pub use error::LoadprobeError;
pub use results::{Termination, TestRun};
