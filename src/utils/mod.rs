pub mod settings;

pub use settings::{CullSettings, load_settings, save_settings};
