use std::collections::HashMap;
use std::env;

pub const API_JWT_USER_VARS: &[&str] = &["AMPLIFY_API_JWT_USER", "API_JWT_USER", "NEXT_PUBLIC_API_JWT_USER"];
pub const API_JWT_PASS_VARS: &[&str] = &["AMPLIFY_API_JWT_PASS", "API_JWT_PASS", "NEXT_PUBLIC_API_JWT_PASS"];
pub const API_BASE_URL_VARS: &[&str] = &["API_BASE_URL"];

/// Where configuration variables are read from.
pub trait VarSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Ordered list of variable names, first non-empty value wins.
#[derive(Debug, Clone, Copy)]
pub struct EnvChain {
    pub setting: &'static str,
    pub keys: &'static [&'static str],
}

impl EnvChain {
    pub const fn new(setting: &'static str, keys: &'static [&'static str]) -> Self {
        Self { setting, keys }
    }

    pub fn resolve(&self, vars: &dyn VarSource) -> Option<String> {
        self.keys
            .iter()
            .filter_map(|key| vars.var(key))
            .find(|value| !value.trim().is_empty())
    }

    /// Human readable description used in configuration errors.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.setting, self.keys.join(" | "))
    }
}

pub const API_JWT_USER: EnvChain = EnvChain::new("API username", API_JWT_USER_VARS);
pub const API_JWT_PASS: EnvChain = EnvChain::new("API password", API_JWT_PASS_VARS);
pub const API_BASE_URL: EnvChain = EnvChain::new("API base URL", API_BASE_URL_VARS);
