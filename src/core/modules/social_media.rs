//! social_media: one lookup per platform.
//!
//! Platforms are looked up concurrently. A platform whose provider fails
//! becomes an `{"error": ...}` entry; the module itself still succeeds.

use futures_util::future::join_all;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::models::errors::AppResult;
use crate::models::types::PhoneNumber;
use crate::providers::{DataProvider, UnavailableProvider};

pub const SOCIAL_PLATFORMS: [(&str, &str); 4] = [
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("twitter", "Twitter"),
    ("linkedin", "LinkedIn"),
];

pub struct SocialMediaModule {
    platforms: Vec<(&'static str, Arc<dyn DataProvider>)>,
}

impl SocialMediaModule {
    pub fn new(platforms: Vec<(&'static str, Arc<dyn DataProvider>)>) -> Self {
        Self { platforms }
    }

    pub fn platforms(&self) -> Vec<&'static str> {
        self.platforms.iter().map(|(name, _)| *name).collect()
    }

    pub async fn run(&self, phone: &PhoneNumber) -> AppResult<Value> {
        let lookups = self
            .platforms
            .iter()
            .map(|(name, provider)| async move { (*name, provider.lookup(phone).await) });

        let mut results = Map::new();
        for (name, outcome) in join_all(lookups).await {
            let entry = match outcome {
                Ok(value) => value,
                Err(e) => {
                    debug!(platform = name, "social lookup failed: {}", e);
                    json!({ "error": e.message })
                }
            };
            results.insert(name.to_string(), entry);
        }
        Ok(Value::Object(results))
    }
}

impl Default for SocialMediaModule {
    /// Every platform backed by an API-access placeholder
    fn default() -> Self {
        Self::new(
            SOCIAL_PLATFORMS
                .iter()
                .map(|(name, label)| {
                    let provider: Arc<dyn DataProvider> =
                        Arc::new(UnavailableProvider::social(*name, label));
                    (*name, provider)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;
    use futures_util::future::BoxFuture;

    struct Broken;

    impl DataProvider for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn lookup<'a>(&'a self, _phone: &'a PhoneNumber) -> BoxFuture<'a, AppResult<Value>> {
            Box::pin(async { Err(AppError::provider("HTTP 503")) })
        }
    }

    #[tokio::test]
    async fn test_default_reports_every_platform() {
        let phone = PhoneNumber::new("+14158586273").unwrap();
        let value = SocialMediaModule::default().run(&phone).await.unwrap();
        for (name, label) in SOCIAL_PLATFORMS {
            assert_eq!(value[name]["found"], json!(false));
            assert!(value[name]["message"].as_str().unwrap().starts_with(label));
        }
    }

    #[tokio::test]
    async fn test_failing_platform_is_isolated() {
        let facebook: Arc<dyn DataProvider> =
            Arc::new(UnavailableProvider::social("facebook", "Facebook"));
        let twitter: Arc<dyn DataProvider> = Arc::new(Broken);
        let module = SocialMediaModule::new(vec![("facebook", facebook), ("twitter", twitter)]);
        let phone = PhoneNumber::new("+14158586273").unwrap();
        let value = module.run(&phone).await.unwrap();
        assert_eq!(value["twitter"], json!({"error": "HTTP 503"}));
        assert_eq!(value["facebook"]["found"], json!(false));
        assert_eq!(module.platforms(), vec!["facebook", "twitter"]);
    }
}
