//! Additive lead scoring rubric and score tiers.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Candidate;

pub const MAX_SCORE: u8 = 10;
pub const HOT_THRESHOLD: u8 = 8;
pub const WARM_THRESHOLD: u8 = 5;

const PHONE_POINTS: u8 = 2;
const EMAIL_POINTS: u8 = 2;
const WEBSITE_POINTS: u8 = 1;
const OWNER_POINTS: u8 = 2;
const PROFILE_POINTS: u8 = 2;
const RECENT_REGISTRATION_POINTS: u8 = 1;

/// A registration no older than this many years counts as recent.
const RECENT_REGISTRATION_YEARS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    /// Score >= 8.
    Hot,
    /// Score in [5, 8).
    Warm,
    /// Score < 5, never admitted.
    Cold,
}

impl ScoreTier {
    pub fn from_score(score: u8) -> Self {
        if score >= HOT_THRESHOLD {
            ScoreTier::Hot
        } else if score >= WARM_THRESHOLD {
            ScoreTier::Warm
        } else {
            ScoreTier::Cold
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreTier::Hot => "Hot",
            ScoreTier::Warm => "Warm",
            ScoreTier::Cold => "Cold",
        }
    }
}

/// Scores a candidate against today's date.
pub fn score(candidate: &Candidate) -> u8 {
    score_at(candidate, Utc::now().date_naive())
}

/// Scores a candidate as of `today`. Always in `[0, 10]`.
pub fn score_at(candidate: &Candidate, today: NaiveDate) -> u8 {
    let mut total: u8 = 0;

    if has_value(&candidate.phone) {
        total += PHONE_POINTS;
    }
    if has_value(&candidate.email) {
        total += EMAIL_POINTS;
    }
    if has_value(&candidate.website) {
        total += WEBSITE_POINTS;
    }
    if has_value(&candidate.owner_name) {
        total += OWNER_POINTS;
    }
    if has_value(&candidate.linkedin_url) {
        total += PROFILE_POINTS;
    }
    if candidate
        .registration_date
        .as_deref()
        .is_some_and(|date| is_recent_registration(date, today))
    {
        total += RECENT_REGISTRATION_POINTS;
    }

    total.min(MAX_SCORE)
}

fn has_value(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// `(today - date) / 365 days <= 5`. Unparseable dates are never recent.
pub fn is_recent_registration(date: &str, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(registered) => {
            let days = (today - registered).num_days() as f64;
            days / 365.0 <= RECENT_REGISTRATION_YEARS
        }
        Err(_) => {
            tracing::debug!("Unparseable registration date: {}", date);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn full_candidate() -> Candidate {
        Candidate {
            source_url: "https://maps.example/place/1".to_string(),
            name: "Hill Roofing".to_string(),
            phone: Some("+441614960000".to_string()),
            website: Some("https://hillroofing.co.uk".to_string()),
            email: Some("info@hillroofing.co.uk".to_string()),
            owner_name: Some("Dan Hill".to_string()),
            linkedin_url: Some("https://www.linkedin.com/in/dan-hill".to_string()),
            registration_date: Some("2023-04-01".to_string()),
            company_number: Some("12345678".to_string()),
        }
    }

    #[test]
    fn test_full_record_scores_ten() {
        assert_eq!(score_at(&full_candidate(), today()), 10);
    }

    #[test]
    fn test_empty_record_scores_zero() {
        assert_eq!(score_at(&Candidate::default(), today()), 0);
    }

    #[test]
    fn test_individual_weights() {
        let mut c = Candidate {
            phone: Some("0161".to_string()),
            ..Default::default()
        };
        assert_eq!(score_at(&c, today()), 2);

        c.website = Some("https://a.co.uk".to_string());
        assert_eq!(score_at(&c, today()), 3);

        c.email = Some("a@a.co.uk".to_string());
        c.owner_name = Some("Ann Lee".to_string());
        assert_eq!(score_at(&c, today()), 7);
    }

    #[test]
    fn test_blank_strings_earn_nothing() {
        let c = Candidate {
            email: Some("   ".to_string()),
            phone: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(score_at(&c, today()), 0);
    }

    #[test]
    fn test_registration_recency() {
        assert!(is_recent_registration("2022-01-01", today()));
        assert!(!is_recent_registration("2015-06-30", today()));
        assert!(!is_recent_registration("not a date", today()));
        // Future dates count as recent
        assert!(is_recent_registration("2027-01-01", today()));
    }

    #[test]
    fn test_old_registration_earns_no_point() {
        let mut c = full_candidate();
        c.registration_date = Some("2001-01-01".to_string());
        assert_eq!(score_at(&c, today()), 9);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(ScoreTier::from_score(10), ScoreTier::Hot);
        assert_eq!(ScoreTier::from_score(8), ScoreTier::Hot);
        assert_eq!(ScoreTier::from_score(7), ScoreTier::Warm);
        assert_eq!(ScoreTier::from_score(5), ScoreTier::Warm);
        assert_eq!(ScoreTier::from_score(4), ScoreTier::Cold);
        assert_eq!(ScoreTier::from_score(0).label(), "Cold");
    }
}
