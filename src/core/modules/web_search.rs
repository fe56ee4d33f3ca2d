//! web_search: delegates to a single search provider.

use serde_json::Value;
use std::sync::Arc;

use crate::models::errors::AppResult;
use crate::models::types::PhoneNumber;
use crate::providers::{DataProvider, UnavailableProvider};

pub struct WebSearchModule {
    provider: Arc<dyn DataProvider>,
}

impl WebSearchModule {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self { provider }
    }

    pub async fn run(&self, phone: &PhoneNumber) -> AppResult<Value> {
        self.provider.lookup(phone).await
    }
}

impl Default for WebSearchModule {
    fn default() -> Self {
        Self::new(Arc::new(UnavailableProvider::web_search()))
    }
}
