use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{self, ScoreTier};

// ============ Search Models ============

/// Structured form of a free-text search request.
///
/// Either field may be empty; the caller is expected to prompt for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub business_type: String,
    pub location: String,
}

impl SearchQuery {
    pub fn new(business_type: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            business_type: business_type.into(),
            location: location.into(),
        }
    }

    /// Both slots are filled and the query can be run.
    pub fn is_complete(&self) -> bool {
        !self.business_type.trim().is_empty() && !self.location.trim().is_empty()
    }

    /// Directory search phrase, e.g. `"plumbers in Chester"`.
    pub fn directory_phrase(&self) -> String {
        format!("{} in {}", self.business_type, self.location)
    }
}

// ============ Candidate Models ============

/// Fields read from a candidate's own directory listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetail {
    pub name: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Registry record selected for a business name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    /// `YYYY-MM-DD` as published by the registry.
    pub registration_date: Option<String>,
    pub company_number: Option<String>,
    pub status: Option<String>,
}

/// A business record being enriched. Fields are filled in extractor order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Raw directory URL this candidate came from.
    pub source_url: String,
    pub name: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub owner_name: Option<String>,
    pub linkedin_url: Option<String>,
    pub registration_date: Option<String>,
    pub company_number: Option<String>,
}

impl Candidate {
    pub fn from_listing(source_url: impl Into<String>, listing: ListingDetail) -> Self {
        Self {
            source_url: source_url.into(),
            name: listing.name.trim().to_string(),
            phone: listing.phone,
            website: listing.website,
            ..Default::default()
        }
    }

    pub fn apply_registry(&mut self, record: RegistryRecord) {
        self.registration_date = record.registration_date.filter(|d| !d.is_empty());
        self.company_number = record.company_number.filter(|n| !n.is_empty());
    }
}

/// An admitted lead. Immutable once built; the score is derived from its fields
/// at admission and cannot be supplied from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    name: String,
    phone: Option<String>,
    website: Option<String>,
    email: Option<String>,
    owner_name: Option<String>,
    linkedin_url: Option<String>,
    registration_date: Option<String>,
    company_number: Option<String>,
    score: u8,
    tier: ScoreTier,
}

impl Lead {
    /// Freezes a candidate, scoring it as of `today`. Only the quota accumulator builds leads.
    pub(crate) fn admit(candidate: Candidate, today: NaiveDate) -> Self {
        let score = scoring::score_at(&candidate, today);
        Self {
            name: candidate.name,
            phone: candidate.phone,
            website: candidate.website,
            email: candidate.email,
            owner_name: candidate.owner_name,
            linkedin_url: candidate.linkedin_url,
            registration_date: candidate.registration_date,
            company_number: candidate.company_number,
            score,
            tier: ScoreTier::from_score(score),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    pub fn linkedin_url(&self) -> Option<&str> {
        self.linkedin_url.as_deref()
    }

    pub fn registration_date(&self) -> Option<&str> {
        self.registration_date.as_deref()
    }

    pub fn company_number(&self) -> Option<&str> {
        self.company_number.as_deref()
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn tier(&self) -> ScoreTier {
        self.tier
    }
}

// ============ Run Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Both quota buckets filled before candidates ran out.
    TargetMet,
    /// Every candidate was processed; the result may hold fewer than `N` leads.
    Exhausted,
    /// The directory returned no candidates at all.
    NoCandidates,
    /// The caller cancelled the run at a candidate boundary.
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub candidates_seen: usize,
    pub skipped_no_name: usize,
    pub skipped_big_brand: usize,
    pub skipped_fetch_failed: usize,
    pub rejected_low_score: usize,
    pub rejected_bucket_full: usize,
    pub rejected_duplicate: usize,
}

/// Outcome of one pipeline run. Leads keep discovery order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub query: SearchQuery,
    pub target_count: usize,
    pub status: RunStatus,
    pub leads: Vec<Lead>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn hot_count(&self) -> usize {
        self.leads
            .iter()
            .filter(|l| l.tier() == ScoreTier::Hot)
            .count()
    }

    pub fn warm_count(&self) -> usize {
        self.leads
            .iter()
            .filter(|l| l.tier() == ScoreTier::Warm)
            .count()
    }

    pub fn average_score(&self) -> f64 {
        if self.leads.is_empty() {
            return 0.0;
        }
        let total: u32 = self.leads.iter().map(|l| u32::from(l.score())).sum();
        f64::from(total) / self.leads.len() as f64
    }
}

// ============ Signup Models ============

/// Landing-page signup form relayed to the notification sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_serializes_camel_case() {
        let candidate = Candidate {
            source_url: "https://maps.test/place/0".to_string(),
            name: "Dee Plumbing".to_string(),
            owner_name: Some("Tom Baker".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&candidate).unwrap();

        assert_eq!(json["sourceUrl"], "https://maps.test/place/0");
        assert_eq!(json["ownerName"], "Tom Baker");
        assert!(json.get("owner_name").is_none());
    }

    #[test]
    fn test_lead_score_comes_from_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let lead = Lead::admit(
            Candidate {
                name: "Dee Plumbing".to_string(),
                phone: Some("+442072193000".to_string()),
                email: Some("info@dee.co.uk".to_string()),
                website: Some("https://dee.co.uk/".to_string()),
                ..Default::default()
            },
            today,
        );

        assert_eq!(lead.score(), 5);
        assert_eq!(lead.tier(), ScoreTier::Warm);

        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["score"], 5);
        assert!(json.get("linkedinUrl").is_some());
    }

    #[test]
    fn test_run_stats_serialize_camel_case() {
        let json = serde_json::to_value(RunStats::default()).unwrap();
        assert!(json.get("candidatesSeen").is_some());
        assert!(json.get("rejectedBucketFull").is_some());
    }
}
