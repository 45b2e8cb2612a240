//! Phone-number normalization and bulk-import validation.
//!
//! The digit-only form is the join key between `webhook_messages` and
//! `conversations`: two phone strings denote the same counterparty iff
//! their normalized forms are equal.

/// Strip every non-digit character from a phone string.
///
/// Pure and total: never fails, and `normalize(normalize(p)) == normalize(p)`.
pub fn normalize(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A country's numbering-plan rule used by the bulk-import path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRule {
    /// International dialling prefix, digits only (e.g. `"91"`).
    pub dial_code: &'static str,
    /// Allowed length of the national (subscriber) part.
    pub min_national_len: usize,
    pub max_national_len: usize,
}

impl CountryRule {
    pub const INDIA: CountryRule = CountryRule {
        dial_code: "91",
        min_national_len: 10,
        max_national_len: 10,
    };
    pub const USA: CountryRule = CountryRule {
        dial_code: "1",
        min_national_len: 10,
        max_national_len: 10,
    };
    pub const UK: CountryRule = CountryRule {
        dial_code: "44",
        min_national_len: 10,
        max_national_len: 10,
    };
    pub const BRAZIL: CountryRule = CountryRule {
        dial_code: "55",
        min_national_len: 10,
        max_national_len: 11,
    };

    /// Look up a rule by ISO 3166-1 alpha-2 code (case-insensitive).
    pub fn for_country(code: &str) -> Option<CountryRule> {
        match code.to_ascii_uppercase().as_str() {
            "IN" => Some(Self::INDIA),
            "US" => Some(Self::USA),
            "GB" => Some(Self::UK),
            "BR" => Some(Self::BRAZIL),
            _ => None,
        }
    }
}

/// Format a candidate number against a country rule.
///
/// Returns the full international digit string (dial code + national part),
/// or `None` when the input is not a plausible messaging-capable number.
/// Only the bulk-import ingestion path uses this; the dispatch path relies
/// on [`normalize`] alone.
pub fn format_and_validate(phone: &str, rule: &CountryRule) -> Option<String> {
    let digits = normalize(phone);
    // Trunk prefix zeros are dropped before length checks.
    let digits = digits.trim_start_matches('0');

    let national_ok = |s: &str| s.len() >= rule.min_national_len && s.len() <= rule.max_national_len;

    if let Some(rest) = digits.strip_prefix(rule.dial_code) {
        if national_ok(rest) {
            return Some(digits.to_string());
        }
    }
    if national_ok(digits) {
        return Some(format!("{}{}", rule.dial_code, digits));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_non_digits() {
        assert_eq!(normalize("+91 98765-43210"), "919876543210");
        assert_eq!(normalize("(555) 010-0200"), "5550100200");
        assert_eq!(normalize("no digits"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for p in ["+1 (202) 555-0147", "0091-98765 43210", "abc123"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once);
            assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn validate_accepts_national_form() {
        let got = format_and_validate("98765 43210", &CountryRule::INDIA);
        assert_eq!(got.as_deref(), Some("919876543210"));
    }

    #[test]
    fn validate_accepts_international_form() {
        let got = format_and_validate("+91 9876543210", &CountryRule::INDIA);
        assert_eq!(got.as_deref(), Some("919876543210"));
    }

    #[test]
    fn validate_drops_trunk_zero() {
        let got = format_and_validate("09876543210", &CountryRule::INDIA);
        assert_eq!(got.as_deref(), Some("919876543210"));
    }

    #[test]
    fn validate_rejects_short_numbers() {
        assert_eq!(format_and_validate("12345", &CountryRule::INDIA), None);
        assert_eq!(format_and_validate("", &CountryRule::USA), None);
    }

    #[test]
    fn country_lookup() {
        assert_eq!(CountryRule::for_country("in"), Some(CountryRule::INDIA));
        assert_eq!(CountryRule::for_country("ZZ"), None);
    }
}
