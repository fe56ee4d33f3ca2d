//! Providers Module - External Data Sources
//!
//! Modules never talk to the outside world directly. They go through a
//! [`DataProvider`], so a deployment without API access still produces
//! structured "not available" results and tests can inject their own.

pub mod numverify;
pub mod store;

pub use numverify::*;
pub use store::*;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::models::errors::AppResult;
use crate::models::types::PhoneNumber;

/// Lookup capability behind the provider-backed modules
pub trait DataProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Look the number up; the payload shape is provider specific
    fn lookup<'a>(&'a self, phone: &'a PhoneNumber) -> BoxFuture<'a, AppResult<Value>>;
}

/// Stand-in for a provider this deployment has no access to.
///
/// Always answers with the same structured payload and never fails.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: &'static str,
    payload: Value,
}

impl UnavailableProvider {
    pub fn new(name: &'static str, payload: Value) -> Self {
        Self { name, payload }
    }

    /// Social platform lookup placeholder (`label` is the display name)
    pub fn social(name: &'static str, label: &str) -> Self {
        Self::new(
            name,
            json!({
                "found": false,
                "profiles": [],
                "message": format!("{} API access required for real implementation", label),
            }),
        )
    }

    pub fn web_search() -> Self {
        Self::new(
            "web_search",
            json!({
                "results": [],
                "message": "Web search requires proper implementation with search APIs",
            }),
        )
    }
}

impl DataProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn lookup<'a>(&'a self, _phone: &'a PhoneNumber) -> BoxFuture<'a, AppResult<Value>> {
        let payload = self.payload.clone();
        Box::pin(async move { Ok(payload) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_social_payload() {
        let provider = UnavailableProvider::social("facebook", "Facebook");
        let phone = PhoneNumber::new("+14155550123").unwrap();
        let value = provider.lookup(&phone).await.unwrap();
        assert_eq!(value["found"], json!(false));
        assert_eq!(value["profiles"], json!([]));
        assert_eq!(
            value["message"],
            json!("Facebook API access required for real implementation")
        );
        assert_eq!(provider.name(), "facebook");
    }

    #[tokio::test]
    async fn test_unavailable_web_search_payload() {
        let phone = PhoneNumber::new("+14155550123").unwrap();
        let value = UnavailableProvider::web_search().lookup(&phone).await.unwrap();
        assert_eq!(value["results"], json!([]));
        assert!(value["message"].as_str().unwrap().contains("Web search"));
    }
}
