//! phone_info: validity, country, operator, timezones and line type.
//!
//! Works fully offline from libphonenumber metadata. When an enrichment
//! provider (NumVerify) is configured, its carrier and line type replace
//! the offline guesses; if the provider fails the offline answer stands.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::phone::{self, ParsedNumber};
use crate::models::errors::AppResult;
use crate::models::types::PhoneNumber;
use crate::providers::DataProvider;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhoneInfo {
    pub is_valid: bool,
    pub international_format: String,
    pub country: String,
    pub country_code: String,
    pub calling_code: String,
    pub operator: String,
    pub timezones: Vec<String>,
    pub current_time: String,
    pub number_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// "offline" or the enrichment provider's name
    pub source: String,
}

impl PhoneInfo {
    fn offline(parsed: &ParsedNumber) -> Self {
        Self {
            is_valid: true,
            international_format: parsed.international_format(),
            country: parsed.country_name(),
            country_code: parsed.region().unwrap_or_else(|| UNKNOWN.to_string()),
            calling_code: format!("+{}", parsed.calling_code()),
            operator: UNKNOWN.to_string(),
            timezones: parsed.timezones(),
            current_time: parsed.local_time().unwrap_or_else(|| UNKNOWN.to_string()),
            number_type: parsed.line_type().as_str().to_string(),
            location: None,
            source: "offline".to_string(),
        }
    }

    /// Overlay non-empty fields from a valid provider answer
    fn enrich(&mut self, provider: &str, payload: &Value) {
        if payload.get("valid").and_then(Value::as_bool) != Some(true) {
            debug!("provider {} did not confirm the number, keeping offline data", provider);
            return;
        }
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(carrier) = field("carrier") {
            self.operator = carrier;
        }
        if let Some(line_type) = field("line_type") {
            self.number_type = line_type;
        }
        self.location = field("location");
        self.source = provider.to_string();
    }
}

/// Result for numbers that are unparsable or outside their numbering plan
fn invalid(phone: &PhoneNumber, reason: String) -> Value {
    json!({
        "is_valid": false,
        "invalid": true,
        "phone_number": phone.as_str(),
        "error": "Invalid phone number",
        "reason": reason,
    })
}

pub struct PhoneInfoModule {
    enrichment: Option<Arc<dyn DataProvider>>,
}

impl PhoneInfoModule {
    pub fn new() -> Self {
        Self { enrichment: None }
    }

    pub fn with_enrichment(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            enrichment: Some(provider),
        }
    }

    pub async fn run(&self, phone: &PhoneNumber) -> AppResult<Value> {
        let parsed = match phone::parse(phone) {
            Ok(parsed) => parsed,
            Err(failure) => return Ok(invalid(phone, failure.to_string())),
        };
        if !parsed.is_valid() {
            return Ok(invalid(
                phone,
                format!("not a valid {} number", parsed.country_name()),
            ));
        }

        let mut info = PhoneInfo::offline(&parsed);

        if let Some(provider) = &self.enrichment {
            match provider.lookup(phone).await {
                Ok(payload) => info.enrich(provider.name(), &payload),
                Err(e) => warn!(
                    provider = provider.name(),
                    code = e.code_str(),
                    "⚠️ Enrichment failed, using offline data: {}",
                    e.message
                ),
            }
        }

        Ok(serde_json::to_value(info)?)
    }
}

impl Default for PhoneInfoModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;
    use crate::providers::UnavailableProvider;
    use futures_util::future::BoxFuture;

    struct FailingProvider;

    impl DataProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn lookup<'a>(&'a self, _phone: &'a PhoneNumber) -> BoxFuture<'a, AppResult<Value>> {
            Box::pin(async { Err(AppError::provider("connection refused")) })
        }
    }

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_valid_us_number() {
        let value = PhoneInfoModule::new().run(&phone("+1 415 858 6273")).await.unwrap();
        assert_eq!(value["is_valid"], json!(true));
        assert_eq!(value["country"], json!("United States"));
        assert_eq!(value["operator"], json!("Unknown"));
        assert_eq!(value["timezones"], json!(["America/Los_Angeles"]));
        assert_eq!(value["number_type"], json!("Landline or mobile"));
        assert_eq!(value["source"], json!("offline"));
        assert_ne!(value["current_time"], json!("Unknown"));
    }

    #[tokio::test]
    async fn test_invalid_number_is_marked_not_failed() {
        let value = PhoneInfoModule::new().run(&phone("+10005551234")).await.unwrap();
        assert_eq!(value["invalid"], json!(true));
        assert_eq!(value["is_valid"], json!(false));

        let value = PhoneInfoModule::new().run(&phone("5551234")).await.unwrap();
        assert_eq!(value["invalid"], json!(true));
        assert!(value["reason"].as_str().unwrap().contains("country calling code"));
    }

    #[tokio::test]
    async fn test_enrichment_overrides_operator() {
        let provider = UnavailableProvider::new(
            "numverify",
            json!({"valid": true, "carrier": "AT&T Mobility LLC", "line_type": "mobile", "location": "Novato"}),
        );
        let module = PhoneInfoModule::with_enrichment(Arc::new(provider));
        let value = module.run(&phone("+14158586273")).await.unwrap();
        assert_eq!(value["operator"], json!("AT&T Mobility LLC"));
        assert_eq!(value["number_type"], json!("mobile"));
        assert_eq!(value["location"], json!("Novato"));
        assert_eq!(value["source"], json!("numverify"));
    }

    #[tokio::test]
    async fn test_enrichment_failure_falls_back() {
        let module = PhoneInfoModule::with_enrichment(Arc::new(FailingProvider));
        let value = module.run(&phone("+14158586273")).await.unwrap();
        assert_eq!(value["is_valid"], json!(true));
        assert_eq!(value["source"], json!("offline"));
        assert_eq!(value["number_type"], json!("Landline or mobile"));
    }
}
