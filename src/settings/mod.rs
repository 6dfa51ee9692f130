pub mod credentials;
pub mod paths;
pub mod preferences;

pub use paths::AppPaths;
pub use preferences::Preferences;
