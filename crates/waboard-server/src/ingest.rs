//! Bulk contact import validation.
//!
//! The spreadsheet itself is parsed by the caller; this module receives the
//! extracted first-column candidates and keeps the ones that are plausible
//! messaging-capable numbers for the requested country.

use serde::{Deserialize, Serialize};

use waboard_store::phone::{format_and_validate, CountryRule};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub numbers: Vec<String>,
    /// ISO 3166-1 alpha-2 country code; defaults to `IN`.
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub accepted: Vec<String>,
    pub accepted_count: usize,
    pub rejected_count: usize,
}

pub fn validate_import(request: &ImportRequest) -> Result<ImportResponse, ApiError> {
    let country = request.country.as_deref().unwrap_or("IN");
    let rule = CountryRule::for_country(country)
        .ok_or_else(|| ApiError::Validation(format!("unsupported country code: {country}")))?;

    let mut accepted = Vec::new();
    let mut rejected = 0usize;

    for candidate in &request.numbers {
        match format_and_validate(candidate, &rule) {
            // Duplicates collapse to one entry, first occurrence wins.
            Some(formatted) if !accepted.contains(&formatted) => accepted.push(formatted),
            Some(_) => {}
            None => rejected += 1,
        }
    }

    Ok(ImportResponse {
        accepted_count: accepted.len(),
        rejected_count: rejected,
        accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_and_dedupes() {
        let request = ImportRequest {
            numbers: vec![
                "98765 43210".into(),
                "+91 9876543210".into(), // duplicate of the first once formatted
                "12345".into(),          // too short
                "9123456789".into(),
            ],
            country: Some("IN".into()),
        };

        let resp = validate_import(&request).unwrap();
        assert_eq!(resp.accepted, vec!["919876543210", "919123456789"]);
        assert_eq!(resp.accepted_count, 2);
        assert_eq!(resp.rejected_count, 1);
    }

    #[test]
    fn unknown_country_is_a_validation_error() {
        let request = ImportRequest {
            numbers: vec!["98765 43210".into()],
            country: Some("XX".into()),
        };
        let err = validate_import(&request).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
