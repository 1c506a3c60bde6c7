pub mod assistant;
pub mod audio;
pub mod config;
mod lock;
pub mod logging;
pub mod stt;
pub mod telemetry;
pub mod trigger;
pub mod voice;

pub(crate) use lock::lock_or_recover;
pub use voice::{CycleOutcome, InteractionLoop};
