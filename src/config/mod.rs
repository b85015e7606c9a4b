//! Configuration model, persistence and the self-write suppression protocol.

pub mod hotkey;
pub mod model;
pub mod store;
pub mod suppression;

pub use hotkey::Hotkey;
pub use model::{Configuration, GridSettings, Pad, Policy, DEFAULT_PAD_COLOR};
pub use store::{ConfigStore, Loaded, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
pub use suppression::{SUPPRESSION_GRACE, SuppressionGuard, WriteSuppression};
