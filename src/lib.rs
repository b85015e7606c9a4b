use env_logger::{Builder, Env};

pub mod audio_engine;
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod messages;
pub mod view;
pub mod watcher;

pub use controller::SoundboardController;
pub use errors::SoundboardError;
pub use messages::ControllerEvent;

/// Setup and configure the logger
pub fn setup_logger() {
    // Default to `info`; override via `RUST_LOG`, e.g. `RUST_LOG=soundpad=debug`.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}
