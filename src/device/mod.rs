pub mod config;
pub mod io;

pub use config::DeviceConfig;
pub use io::{load_config, save_config};
