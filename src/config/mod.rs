pub mod credentials;
pub mod env;
pub mod loader;
pub mod settings;
