//! De-identified demographic profile
//!
//! Derives a coarse summary from a structured vault document. Only birth
//! year, sex and a ten-year age band leave this module; ages of 90 and over
//! collapse into a single `90+` band.

use super::models::{DeidentifiedProfile, StructuredVaultDocument};
use chrono::{DateTime, Datelike, NaiveDate};

/// Lower bound of the open-ended top age band
pub const TOP_AGE_BAND: i32 = 90;

/// Builds the profile of `doc` as of `as_of`
pub fn derive_profile(doc: &StructuredVaultDocument, as_of: NaiveDate) -> DeidentifiedProfile {
    let birth_date = doc.phi.date_of_birth.as_deref().and_then(parse_birth_date);
    let birth_year = doc
        .phi
        .birth_year
        .or_else(|| birth_date.map(|d| d.year()))
        .or_else(|| doc.phi.date_of_birth.as_deref().and_then(leading_year));

    let age = match birth_date {
        Some(date) if doc.phi.birth_year.map_or(true, |y| y == date.year()) => {
            age_on(date, as_of)
        }
        _ => birth_year.map(|year| as_of.year() - year),
    };

    DeidentifiedProfile {
        birth_year,
        sex: doc.phi.sex.clone(),
        age_band: age.filter(|a| *a >= 0).map(age_band),
    }
}

/// Ten-year band label for an age, e.g. `30-39`
pub fn age_band(age: i32) -> String {
    if age >= TOP_AGE_BAND {
        return format!("{TOP_AGE_BAND}+");
    }
    let low = age / 10 * 10;
    format!("{}-{}", low, low + 9)
}

fn age_on(birth: NaiveDate, as_of: NaiveDate) -> Option<i32> {
    let mut age = as_of.year() - birth.year();
    if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    (age >= 0).then_some(age)
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn leading_year(raw: &str) -> Option<i32> {
    let head = raw.trim().get(..4)?;
    if head.bytes().all(|b| b.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependentId;
    use crate::vault::models::StructuredPhiPayload;
    use chrono::Utc;
    use test_case::test_case;

    fn doc(phi: StructuredPhiPayload) -> StructuredVaultDocument {
        StructuredVaultDocument::create(DependentId::new("dep-1").unwrap(), phi, Utc::now())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_birth_year_from_date_of_birth() {
        let profile = derive_profile(
            &doc(StructuredPhiPayload {
                legal_name: Some("Jane Roe".to_string()),
                date_of_birth: Some("1990-05-01".to_string()),
                sex: Some("female".to_string()),
                ..Default::default()
            }),
            date(2025, 4, 30),
        );

        assert_eq!(profile.birth_year, Some(1990));
        assert_eq!(profile.sex.as_deref(), Some("female"));
        assert_eq!(profile.age_band.as_deref(), Some("30-39"));

        let json = serde_json::to_value(&profile).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("dateOfBirth"));
        assert!(!obj.contains_key("legalName"));
        assert!(!json.to_string().contains("1990-05-01"));
    }

    #[test]
    fn test_stored_birth_year_wins() {
        let profile = derive_profile(
            &doc(StructuredPhiPayload {
                birth_year: Some(1985),
                date_of_birth: Some("1990-05-01".to_string()),
                ..Default::default()
            }),
            date(2025, 6, 1),
        );
        assert_eq!(profile.birth_year, Some(1985));
        assert_eq!(profile.age_band.as_deref(), Some("40-49"));
    }

    #[test]
    fn test_rfc3339_and_partial_dates() {
        let rfc = derive_profile(
            &doc(StructuredPhiPayload {
                date_of_birth: Some("2001-12-24T00:00:00Z".to_string()),
                ..Default::default()
            }),
            date(2025, 1, 1),
        );
        assert_eq!(rfc.birth_year, Some(2001));
        assert_eq!(rfc.age_band.as_deref(), Some("20-29"));

        let partial = derive_profile(
            &doc(StructuredPhiPayload {
                date_of_birth: Some("1970-xx".to_string()),
                ..Default::default()
            }),
            date(2025, 1, 1),
        );
        assert_eq!(partial.birth_year, Some(1970));
    }

    #[test]
    fn test_empty_document() {
        let profile = derive_profile(&doc(StructuredPhiPayload::default()), date(2025, 1, 1));
        assert_eq!(profile, DeidentifiedProfile::default());
    }

    #[test_case(0, "0-9")]
    #[test_case(9, "0-9")]
    #[test_case(35, "30-39")]
    #[test_case(89, "80-89")]
    #[test_case(90, "90+")]
    #[test_case(104, "90+")]
    fn test_age_band(age: i32, expected: &str) {
        assert_eq!(age_band(age), expected);
    }

    #[test]
    fn test_birthday_boundary() {
        assert_eq!(age_on(date(1990, 5, 1), date(2020, 4, 30)), Some(29));
        assert_eq!(age_on(date(1990, 5, 1), date(2020, 5, 1)), Some(30));
        assert_eq!(age_on(date(2030, 1, 1), date(2020, 1, 1)), None);
    }
}
