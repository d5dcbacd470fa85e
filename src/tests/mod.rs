mod common;
mod provider_cache;
