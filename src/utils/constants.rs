//! Reference data shared across the crate.
//!
//! Country names, timezone hints, spam prefixes and module names live here
//! so no other module hardcodes them. Numbering-plan metadata (validity,
//! line types) comes from the `phonenumber` crate instead.

// ============================================
// MODULE NAMES
// ============================================

pub const MODULE_PHONE_INFO: &str = "phone_info";
pub const MODULE_SOCIAL_MEDIA: &str = "social_media";
pub const MODULE_SPAM_RISK: &str = "spam_risk";
pub const MODULE_WEB_SEARCH: &str = "web_search";

/// Registration order of the built-in modules
pub const ALL_MODULES: [&str; 4] = [
    MODULE_PHONE_INFO,
    MODULE_SOCIAL_MEDIA,
    MODULE_SPAM_RISK,
    MODULE_WEB_SEARCH,
];

// ============================================
// DEFAULT LIMITS
// ============================================

/// Default cache TTL (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// Default per-module admissions per period
pub const DEFAULT_MODULE_RATE_LIMIT: u32 = 10;
pub const DEFAULT_MODULE_RATE_PERIOD_SECS: u64 = 60;
/// Default per-caller admissions per period
pub const DEFAULT_CALLER_RATE_LIMIT: u32 = 30;
pub const DEFAULT_CALLER_RATE_PERIOD_SECS: u64 = 60;
/// Default per-module call timeout
pub const DEFAULT_MODULE_TIMEOUT_SECS: u64 = 30;

/// Telemetry ring buffer capacities
pub const TELEMETRY_REQUEST_CAPACITY: usize = 1000;
pub const TELEMETRY_ERROR_CAPACITY: usize = 100;
pub const TELEMETRY_RECENT_ERRORS: usize = 10;

// ============================================
// NUMVERIFY
// ============================================

pub const NUMVERIFY_BASE_URL: &str = "http://apilayer.net/api/validate";
/// NumVerify free tier: 100 lookups per hour
pub const NUMVERIFY_RATE_LIMIT: u32 = 100;
pub const NUMVERIFY_RATE_PERIOD_SECS: u64 = 3600;
pub const NUMVERIFY_TIMEOUT_SECS: u64 = 30;

// ============================================
// SPAM HEURISTICS
// ============================================

/// Prefixes frequently used by robocallers and premium-rate services
pub const KNOWN_SPAM_PREFIXES: [&str; 7] = ["800", "900", "976", "855", "866", "877", "888"];

/// Four-digit runs typical for virtual / vanity numbers
pub const VIRTUAL_NUMBER_PATTERNS_4: [&str; 11] = [
    "1234", "1111", "2222", "3333", "4444", "5555", "6666", "7777", "8888", "9999", "0000",
];

/// Three-digit runs used by the pattern analyzer
pub const VIRTUAL_NUMBER_PATTERNS_3: [&str; 11] = [
    "123", "000", "111", "222", "333", "444", "555", "666", "777", "888", "999",
];

// ============================================
// COUNTRIES & TIMEZONES
// ============================================

/// Display name and IANA zones for one region
#[derive(Debug, Clone, Copy)]
pub struct CountryInfo {
    /// ISO 3166-1 alpha-2, as reported by `phonenumber`
    pub iso: &'static str,
    pub name: &'static str,
    /// Most populous zone first
    pub timezones: &'static [&'static str],
}

const fn country(
    iso: &'static str,
    name: &'static str,
    timezones: &'static [&'static str],
) -> CountryInfo {
    CountryInfo {
        iso,
        name,
        timezones,
    }
}

pub const COUNTRIES: &[CountryInfo] = &[
    country(
        "US",
        "United States",
        &[
            "America/New_York",
            "America/Chicago",
            "America/Denver",
            "America/Phoenix",
            "America/Los_Angeles",
            "America/Anchorage",
            "Pacific/Honolulu",
        ],
    ),
    country(
        "CA",
        "Canada",
        &[
            "America/Toronto",
            "America/Vancouver",
            "America/Edmonton",
            "America/Winnipeg",
            "America/Regina",
            "America/Halifax",
            "America/St_Johns",
        ],
    ),
    country("PR", "Puerto Rico", &["America/Puerto_Rico"]),
    country("JM", "Jamaica", &["America/Jamaica"]),
    country("MX", "Mexico", &["America/Mexico_City", "America/Tijuana", "America/Cancun"]),
    country("BR", "Brazil", &["America/Sao_Paulo", "America/Manaus"]),
    country("AR", "Argentina", &["America/Argentina/Buenos_Aires"]),
    country("CO", "Colombia", &["America/Bogota"]),
    country("GB", "United Kingdom", &["Europe/London"]),
    country("IE", "Ireland", &["Europe/Dublin"]),
    country("FR", "France", &["Europe/Paris"]),
    country("DE", "Germany", &["Europe/Berlin"]),
    country("ES", "Spain", &["Europe/Madrid", "Atlantic/Canary"]),
    country("IT", "Italy", &["Europe/Rome"]),
    country("NL", "Netherlands", &["Europe/Amsterdam"]),
    country("BE", "Belgium", &["Europe/Brussels"]),
    country("CH", "Switzerland", &["Europe/Zurich"]),
    country("SE", "Sweden", &["Europe/Stockholm"]),
    country("PL", "Poland", &["Europe/Warsaw"]),
    country("PT", "Portugal", &["Europe/Lisbon", "Atlantic/Azores"]),
    country("RU", "Russia", &["Europe/Moscow", "Asia/Yekaterinburg", "Asia/Vladivostok"]),
    country("UA", "Ukraine", &["Europe/Kyiv"]),
    country("TR", "Turkey", &["Europe/Istanbul"]),
    country("ZA", "South Africa", &["Africa/Johannesburg"]),
    country("NG", "Nigeria", &["Africa/Lagos"]),
    country("EG", "Egypt", &["Africa/Cairo"]),
    country("KE", "Kenya", &["Africa/Nairobi"]),
    country("AE", "United Arab Emirates", &["Asia/Dubai"]),
    country("IN", "India", &["Asia/Kolkata"]),
    country("PK", "Pakistan", &["Asia/Karachi"]),
    country("CN", "China", &["Asia/Shanghai"]),
    country("JP", "Japan", &["Asia/Tokyo"]),
    country("KR", "South Korea", &["Asia/Seoul"]),
    country("SG", "Singapore", &["Asia/Singapore"]),
    country("PH", "Philippines", &["Asia/Manila"]),
    country("ID", "Indonesia", &["Asia/Jakarta", "Asia/Makassar", "Asia/Jayapura"]),
    country(
        "AU",
        "Australia",
        &[
            "Australia/Sydney",
            "Australia/Melbourne",
            "Australia/Brisbane",
            "Australia/Adelaide",
            "Australia/Perth",
        ],
    ),
    country("NZ", "New Zealand", &["Pacific/Auckland"]),
];

pub fn find_country(iso: &str) -> Option<&'static CountryInfo> {
    COUNTRIES.iter().find(|c| c.iso == iso)
}

/// Geographic NANP area codes and the zone their population lives in.
///
/// Non-geographic codes (toll-free, premium) are absent on purpose: they
/// resolve to every zone of their country.
pub const NANP_AREA_ZONES: &[(&str, &str)] = &[
    // Eastern
    ("201", "America/New_York"),
    ("202", "America/New_York"),
    ("203", "America/New_York"),
    ("207", "America/New_York"),
    ("212", "America/New_York"),
    ("215", "America/New_York"),
    ("216", "America/New_York"),
    ("267", "America/New_York"),
    ("301", "America/New_York"),
    ("305", "America/New_York"),
    ("313", "America/Detroit"),
    ("317", "America/Indiana/Indianapolis"),
    ("347", "America/New_York"),
    ("404", "America/New_York"),
    ("407", "America/New_York"),
    ("412", "America/New_York"),
    ("470", "America/New_York"),
    ("516", "America/New_York"),
    ("561", "America/New_York"),
    ("571", "America/New_York"),
    ("585", "America/New_York"),
    ("617", "America/New_York"),
    ("646", "America/New_York"),
    ("678", "America/New_York"),
    ("703", "America/New_York"),
    ("704", "America/New_York"),
    ("718", "America/New_York"),
    ("754", "America/New_York"),
    ("786", "America/New_York"),
    ("857", "America/New_York"),
    ("904", "America/New_York"),
    ("908", "America/New_York"),
    ("914", "America/New_York"),
    ("917", "America/New_York"),
    ("919", "America/New_York"),
    ("929", "America/New_York"),
    ("954", "America/New_York"),
    ("973", "America/New_York"),
    // Central
    ("205", "America/Chicago"),
    ("210", "America/Chicago"),
    ("214", "America/Chicago"),
    ("224", "America/Chicago"),
    ("281", "America/Chicago"),
    ("312", "America/Chicago"),
    ("314", "America/Chicago"),
    ("316", "America/Chicago"),
    ("402", "America/Chicago"),
    ("414", "America/Chicago"),
    ("469", "America/Chicago"),
    ("504", "America/Chicago"),
    ("512", "America/Chicago"),
    ("612", "America/Chicago"),
    ("615", "America/Chicago"),
    ("630", "America/Chicago"),
    ("651", "America/Chicago"),
    ("713", "America/Chicago"),
    ("773", "America/Chicago"),
    ("816", "America/Chicago"),
    ("817", "America/Chicago"),
    ("832", "America/Chicago"),
    ("847", "America/Chicago"),
    ("901", "America/Chicago"),
    ("918", "America/Chicago"),
    ("972", "America/Chicago"),
    // Mountain
    ("303", "America/Denver"),
    ("385", "America/Denver"),
    ("406", "America/Denver"),
    ("505", "America/Denver"),
    ("720", "America/Denver"),
    ("801", "America/Denver"),
    ("208", "America/Boise"),
    ("480", "America/Phoenix"),
    ("520", "America/Phoenix"),
    ("602", "America/Phoenix"),
    ("623", "America/Phoenix"),
    // Pacific
    ("206", "America/Los_Angeles"),
    ("213", "America/Los_Angeles"),
    ("253", "America/Los_Angeles"),
    ("310", "America/Los_Angeles"),
    ("323", "America/Los_Angeles"),
    ("408", "America/Los_Angeles"),
    ("415", "America/Los_Angeles"),
    ("424", "America/Los_Angeles"),
    ("425", "America/Los_Angeles"),
    ("503", "America/Los_Angeles"),
    ("510", "America/Los_Angeles"),
    ("530", "America/Los_Angeles"),
    ("559", "America/Los_Angeles"),
    ("562", "America/Los_Angeles"),
    ("619", "America/Los_Angeles"),
    ("626", "America/Los_Angeles"),
    ("628", "America/Los_Angeles"),
    ("650", "America/Los_Angeles"),
    ("661", "America/Los_Angeles"),
    ("702", "America/Los_Angeles"),
    ("707", "America/Los_Angeles"),
    ("714", "America/Los_Angeles"),
    ("747", "America/Los_Angeles"),
    ("818", "America/Los_Angeles"),
    ("858", "America/Los_Angeles"),
    ("909", "America/Los_Angeles"),
    ("916", "America/Los_Angeles"),
    ("925", "America/Los_Angeles"),
    ("949", "America/Los_Angeles"),
    ("971", "America/Los_Angeles"),
    // Alaska / Hawaii
    ("907", "America/Anchorage"),
    ("808", "Pacific/Honolulu"),
    // Canada
    ("416", "America/Toronto"),
    ("437", "America/Toronto"),
    ("613", "America/Toronto"),
    ("647", "America/Toronto"),
    ("905", "America/Toronto"),
    ("514", "America/Toronto"),
    ("438", "America/Toronto"),
    ("418", "America/Toronto"),
    ("204", "America/Winnipeg"),
    ("306", "America/Regina"),
    ("403", "America/Edmonton"),
    ("587", "America/Edmonton"),
    ("780", "America/Edmonton"),
    ("236", "America/Vancouver"),
    ("250", "America/Vancouver"),
    ("604", "America/Vancouver"),
    ("778", "America/Vancouver"),
    ("902", "America/Halifax"),
    ("709", "America/St_Johns"),
    // Caribbean
    ("787", "America/Puerto_Rico"),
    ("939", "America/Puerto_Rico"),
    ("876", "America/Jamaica"),
];

pub fn nanp_area_zone(area_code: &str) -> Option<&'static str> {
    NANP_AREA_ZONES
        .iter()
        .find(|(code, _)| *code == area_code)
        .map(|(_, zone)| *zone)
}

/// Timezone sentinel used when no zone resolves
pub const UNKNOWN_TIMEZONE: &str = "Etc/Unknown";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_country_has_timezone() {
        assert!(COUNTRIES.iter().all(|c| !c.timezones.is_empty()));
    }

    #[test]
    fn test_every_zone_is_a_real_tz_name() {
        let zones = COUNTRIES
            .iter()
            .flat_map(|c| c.timezones.iter().copied())
            .chain(NANP_AREA_ZONES.iter().map(|(_, zone)| *zone));
        for zone in zones {
            assert!(zone.parse::<chrono_tz::Tz>().is_ok(), "{}", zone);
        }
    }

    #[test]
    fn test_area_codes_are_unique() {
        let mut seen = HashSet::new();
        for (code, _) in NANP_AREA_ZONES {
            assert!(seen.insert(*code), "duplicate area code {}", code);
        }
    }

    #[test]
    fn test_lookups() {
        assert_eq!(find_country("GB").map(|c| c.name), Some("United Kingdom"));
        assert!(find_country("XX").is_none());
        assert_eq!(nanp_area_zone("415"), Some("America/Los_Angeles"));
        assert_eq!(nanp_area_zone("416"), Some("America/Toronto"));
        assert_eq!(nanp_area_zone("800"), None);
    }
}
