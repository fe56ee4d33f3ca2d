//! Offline phone number parsing
//!
//! Validity and line type come from libphonenumber metadata (the
//! `phonenumber` crate). Country names and timezones come from the tables
//! in `utils::constants`; NANP numbers resolve their zone by area code.
//! Local time is computed with `chrono-tz`, so DST is applied.
//!
//! "Unparsable" and "invalid" are different outcomes: an unparsable input
//! has no recognizable structure (no `+`, letters, unknown calling code);
//! an invalid one parses but does not fit its country's numbering plan.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use phonenumber::metadata::DATABASE;
use phonenumber::{Mode, Type};
use serde::Serialize;
use std::fmt;

use crate::models::types::PhoneNumber;
use crate::utils::constants::{find_country, nanp_area_zone, UNKNOWN_TIMEZONE};

/// Longest E.164 number (digits, calling code included)
const MAX_E164_DIGITS: usize = 15;

const NANP_CALLING_CODE: u16 = 1;

/// Why a number could not be parsed at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No leading `+`, so no calling code to anchor on
    MissingCountryCode,
    /// Characters other than digits after the `+`
    NotANumber,
    TooShort,
    TooLong,
    /// Rejected by the numbering-plan parser (unknown calling code, ...)
    Rejected(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::MissingCountryCode => {
                f.write_str("missing or invalid country calling code")
            }
            ParseFailure::NotANumber => {
                f.write_str("the string supplied did not seem to be a phone number")
            }
            ParseFailure::TooShort => {
                f.write_str("the string supplied is too short to be a phone number")
            }
            ParseFailure::TooLong => {
                f.write_str("the string supplied is too long to be a phone number")
            }
            ParseFailure::Rejected(reason) => write!(f, "{}", reason),
        }
    }
}

/// Coarse line classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineType {
    Mobile,
    Landline,
    /// Plan does not distinguish mobile ranges (e.g. NANP)
    LandlineOrMobile,
    TollFree,
    PremiumRate,
    Other,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Mobile => "Mobile",
            LineType::Landline => "Landline",
            LineType::LandlineOrMobile => "Landline or mobile",
            LineType::TollFree => "Toll-free",
            LineType::PremiumRate => "Premium rate",
            LineType::Other => "Other",
        }
    }
}

impl From<Type> for LineType {
    fn from(kind: Type) -> Self {
        match kind {
            Type::Mobile => LineType::Mobile,
            Type::FixedLine => LineType::Landline,
            Type::FixedLineOrMobile => LineType::LandlineOrMobile,
            Type::TollFree => LineType::TollFree,
            Type::PremiumRate => LineType::PremiumRate,
            _ => LineType::Other,
        }
    }
}

/// A number accepted by the numbering-plan parser
#[derive(Debug, Clone)]
pub struct ParsedNumber {
    number: phonenumber::PhoneNumber,
}

impl ParsedNumber {
    pub fn calling_code(&self) -> u16 {
        self.number.country().code()
    }

    /// National significant number, leading zeros kept
    pub fn national_number(&self) -> String {
        let national = self.number.national();
        format!(
            "{}{}",
            "0".repeat(usize::from(national.zeros())),
            national.value()
        )
    }

    pub fn e164(&self) -> String {
        format!("+{}{}", self.calling_code(), self.national_number())
    }

    pub fn international_format(&self) -> String {
        self.number.format().mode(Mode::International).to_string()
    }

    /// ISO region (e.g. "US", "CA"), when the plan resolves one
    pub fn region(&self) -> Option<String> {
        self.number.country().id().map(|id| format!("{:?}", id))
    }

    pub fn country_name(&self) -> String {
        match self.region() {
            Some(iso) => find_country(&iso)
                .map(|c| c.name.to_string())
                .unwrap_or(iso),
            None => "Unknown".to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        phonenumber::is_valid(&self.number)
    }

    pub fn line_type(&self) -> LineType {
        self.number.number_type(&DATABASE).into()
    }

    /// IANA zones for the number, most specific first.
    ///
    /// Geographic NANP numbers resolve to one zone through their area code;
    /// everything else gets its country's zones, or `Etc/Unknown`.
    pub fn timezones(&self) -> Vec<String> {
        if self.calling_code() == NANP_CALLING_CODE {
            let national = self.national_number();
            if let Some(zone) = national.get(..3).and_then(nanp_area_zone) {
                return vec![zone.to_string()];
            }
        }
        match self.region().as_deref().and_then(find_country) {
            Some(country) => country.timezones.iter().map(|tz| tz.to_string()).collect(),
            None => vec![UNKNOWN_TIMEZONE.to_string()],
        }
    }

    /// Wall-clock time at the first zone, now
    pub fn local_time(&self) -> Option<String> {
        self.local_time_at(Utc::now())
    }

    /// Wall-clock time at the first zone for a given instant (DST aware)
    pub fn local_time_at(&self, at: DateTime<Utc>) -> Option<String> {
        let zone = self.timezones().into_iter().next()?;
        if zone == UNKNOWN_TIMEZONE {
            return None;
        }
        let tz: Tz = zone.parse().ok()?;
        Some(
            at.with_timezone(&tz)
                .format("%Y-%m-%d %H:%M:%S %:z")
                .to_string(),
        )
    }
}

/// Parse a normalized phone number in international form
pub fn parse(phone: &PhoneNumber) -> Result<ParsedNumber, ParseFailure> {
    let rest = phone
        .as_str()
        .strip_prefix('+')
        .ok_or(ParseFailure::MissingCountryCode)?;

    if !rest.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseFailure::NotANumber);
    }
    if rest.len() < 3 {
        return Err(ParseFailure::TooShort);
    }
    if rest.len() > MAX_E164_DIGITS {
        return Err(ParseFailure::TooLong);
    }

    phonenumber::parse(None, phone.as_str())
        .map(|number| ParsedNumber { number })
        .map_err(|e| ParseFailure::Rejected(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse_str(raw: &str) -> Result<ParsedNumber, ParseFailure> {
        parse(&PhoneNumber::new(raw).unwrap())
    }

    #[test]
    fn test_parse_us_toll_free() {
        let parsed = parse_str("+1 800 555 1234").unwrap();
        assert_eq!(parsed.calling_code(), 1);
        assert_eq!(parsed.national_number(), "8005551234");
        assert!(parsed.is_valid());
        assert_eq!(parsed.line_type(), LineType::TollFree);
        assert_eq!(parsed.e164(), "+18005551234");
        // Non-geographic: every US zone
        assert!(parsed.timezones().len() > 1);
    }

    #[test]
    fn test_parse_uk_mobile() {
        let parsed = parse_str("+44 7911 123456").unwrap();
        assert_eq!(parsed.region().as_deref(), Some("GB"));
        assert_eq!(parsed.country_name(), "United Kingdom");
        assert!(parsed.is_valid());
        assert_eq!(parsed.line_type(), LineType::Mobile);
        assert_eq!(parsed.timezones(), vec!["Europe/London".to_string()]);
    }

    #[test]
    fn test_nanp_zone_follows_area_code() {
        let california = parse_str("+14158586273").unwrap();
        assert_eq!(california.timezones(), vec!["America/Los_Angeles".to_string()]);

        let toronto = parse_str("+14169792000").unwrap();
        assert_eq!(toronto.timezones(), vec!["America/Toronto".to_string()]);
    }

    #[test]
    fn test_local_time_applies_dst() {
        let parsed = parse_str("+14158586273").unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            parsed.local_time_at(summer).as_deref(),
            Some("2026-07-01 05:00:00 -07:00")
        );
        assert_eq!(
            parsed.local_time_at(winter).as_deref(),
            Some("2026-01-15 04:00:00 -08:00")
        );

        let new_york = parse_str("+12125551234").unwrap();
        let october = Utc.with_ymd_and_hms(2026, 10, 18, 17, 0, 0).unwrap();
        assert_eq!(
            new_york.local_time_at(october).as_deref(),
            Some("2026-10-18 13:00:00 -04:00")
        );
    }

    #[test]
    fn test_invalid_but_parsable() {
        // NANP area codes cannot start with 0
        let parsed = parse_str("+10005551234").unwrap();
        assert!(!parsed.is_valid());
    }

    #[test]
    fn test_unparsable_inputs() {
        assert_eq!(parse_str("8005551234").unwrap_err(), ParseFailure::MissingCountryCode);
        assert!(matches!(
            parse_str("+999123456").unwrap_err(),
            ParseFailure::Rejected(_)
        ));
        assert_eq!(parse_str("+1800FLOWERS").unwrap_err(), ParseFailure::NotANumber);
        assert_eq!(parse_str("+1").unwrap_err(), ParseFailure::TooShort);
        assert_eq!(parse_str("+1234567890123456").unwrap_err(), ParseFailure::TooLong);
    }

    #[test]
    fn test_local_time_without_dst() {
        let parsed = parse_str("+919876543210").unwrap();
        let time = parsed.local_time().unwrap();
        assert!(time.ends_with("+05:30"), "{}", time);
    }
}
