//! Lead discovery run: candidate intake, enrichment and tiered quota admission.
//!
//! Candidates are processed strictly one at a time in directory order. Each one is
//! brand-filtered, enriched in a fixed stage order and then offered to the
//! [`QuotaAccumulator`], which scores it from its fields and alone decides whether it
//! becomes a [`Lead`].

use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::accessors::{CandidateSource, PageFetcher, RegistryClient, SearchEngine};
use crate::brand_filter::matched_brand_keyword;
use crate::config::Config;
use crate::enrichment::{find_email, find_owner_name, find_profile_url, lookup_registry};
use crate::errors::AppError;
use crate::models::{Candidate, Lead, RunReport, RunStats, RunStatus, SearchQuery};
use crate::page_cache::CachedPageFetcher;
use crate::scoring::{self, ScoreTier};
use crate::services::{CompaniesHouseService, HttpPageFetcher, MapsDirectoryService, WebSearchService};

/// Extra candidates requested beyond the target, since many get skipped or rejected.
pub const CANDIDATE_HEADROOM: usize = 10;

const PACING_JITTER_MS: std::ops::RangeInclusive<u64> = 200..=800;

// ============ Settings ============

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// `N`: the most leads a run may return.
    pub target_count: usize,
    /// Registry credential. Without it the registry stage is skipped.
    pub registry_api_key: Option<String>,
    /// Base delay between candidates; jitter is added on top.
    pub pacing_delay: Option<Duration>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_count: config.target_lead_count,
            registry_api_key: config.companies_house_api_key.clone(),
            pacing_delay: (config.pacing_delay_ms > 0)
                .then(|| Duration::from_millis(config.pacing_delay_ms)),
        }
    }

    pub fn with_target(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }
}

// ============ Quota ============

/// Result of offering an enriched candidate to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(ScoreTier),
    /// Cold score; never admitted.
    BelowThreshold,
    /// Qualified, but its tier's bucket has no room left.
    BucketFull(ScoreTier),
    /// Same name and website as an already admitted lead.
    Duplicate,
}

/// Running hot/warm bucket counts for one run.
///
/// One hot slot, `N - 1` warm slots. Buckets never overflow into each other.
#[derive(Debug)]
pub struct QuotaAccumulator {
    hot_target: usize,
    warm_target: usize,
    hot: usize,
    warm: usize,
    seen: HashSet<(String, String)>,
    leads: Vec<Lead>,
}

impl QuotaAccumulator {
    pub fn new(target_count: usize) -> Self {
        let hot_target = target_count.min(1);
        Self {
            hot_target,
            warm_target: target_count - hot_target,
            hot: 0,
            warm: 0,
            seen: HashSet::new(),
            leads: Vec::new(),
        }
    }

    /// Scores the candidate from its own fields and admits it if its bucket has room.
    pub fn admit(&mut self, candidate: Candidate) -> Admission {
        self.admit_at(candidate, Utc::now().date_naive())
    }

    /// [`admit`](Self::admit) with the registration-recency point judged as of `today`.
    pub fn admit_at(&mut self, candidate: Candidate, today: NaiveDate) -> Admission {
        let key = dedup_key(&candidate);
        let lead = Lead::admit(candidate, today);
        let tier = lead.tier();
        let (filled, capacity) = match tier {
            ScoreTier::Hot => (self.hot, self.hot_target),
            ScoreTier::Warm => (self.warm, self.warm_target),
            ScoreTier::Cold => return Admission::BelowThreshold,
        };

        if self.seen.contains(&key) {
            return Admission::Duplicate;
        }
        if filled >= capacity {
            return Admission::BucketFull(tier);
        }

        match tier {
            ScoreTier::Hot => self.hot += 1,
            _ => self.warm += 1,
        }
        self.seen.insert(key);
        self.leads.push(lead);
        Admission::Admitted(tier)
    }

    /// Both buckets are at capacity; the run can stop.
    pub fn is_full(&self) -> bool {
        self.hot >= self.hot_target && self.warm >= self.warm_target
    }

    pub fn hot_count(&self) -> usize {
        self.hot
    }

    pub fn warm_count(&self) -> usize {
        self.warm
    }

    pub fn hot_target(&self) -> usize {
        self.hot_target
    }

    pub fn warm_target(&self) -> usize {
        self.warm_target
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn into_leads(self) -> Vec<Lead> {
        self.leads
    }
}

fn dedup_key(candidate: &Candidate) -> (String, String) {
    (
        candidate.name.trim().to_lowercase(),
        candidate
            .website
            .as_deref()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_lowercase(),
    )
}

// ============ Progress ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WebsiteCheck,
    Email,
    OwnerName,
    Profile,
    Registry,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::WebsiteCheck => "website",
            Stage::Email => "email",
            Stage::OwnerName => "owner",
            Stage::Profile => "linkedin",
            Stage::Registry => "registry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Found,
    NotFound,
    /// Stage not attempted (no website, or no registry credential).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ListingUnavailable,
    NoName,
    BigBrand(&'static str),
}

/// Progress notifications. Purely observational; nothing in the run depends on them.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStarted {
        run_id: Uuid,
        query: SearchQuery,
        target_count: usize,
    },
    CandidatesCollected {
        count: usize,
    },
    CandidateSkipped {
        index: usize,
        name: String,
        reason: SkipReason,
    },
    CandidateStarted {
        index: usize,
        name: String,
    },
    StageFinished {
        index: usize,
        stage: Stage,
        outcome: StageOutcome,
    },
    CandidateScored {
        index: usize,
        name: String,
        score: u8,
        admission: Admission,
    },
    RunFinished {
        status: RunStatus,
        lead_count: usize,
    },
}

pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Default observer: every event becomes a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                run_id,
                query,
                target_count,
            } => tracing::info!(
                "🚀 Run {} started: {} (target {})",
                run_id,
                query.directory_phrase(),
                target_count
            ),
            ProgressEvent::CandidatesCollected { count } => {
                tracing::info!("Collected {} candidate(s)", count)
            }
            ProgressEvent::CandidateSkipped {
                index,
                name,
                reason,
            } => tracing::info!("[{}] Skipped {:?}: {:?}", index + 1, name, reason),
            ProgressEvent::CandidateStarted { index, name } => {
                tracing::info!("[{}] Enriching {}", index + 1, name)
            }
            ProgressEvent::StageFinished {
                index,
                stage,
                outcome,
            } => tracing::debug!("[{}] {}: {:?}", index + 1, stage.label(), outcome),
            ProgressEvent::CandidateScored {
                index,
                name,
                score,
                admission,
            } => match admission {
                Admission::Admitted(tier) => tracing::info!(
                    "[{}] ✅ {} admitted as {} ({}/10)",
                    index + 1,
                    name,
                    tier.label(),
                    score
                ),
                other => tracing::info!(
                    "[{}] {} not admitted ({}/10): {:?}",
                    index + 1,
                    name,
                    score,
                    other
                ),
            },
            ProgressEvent::RunFinished { status, lead_count } => {
                tracing::info!("Run finished: {:?} with {} lead(s)", status, lead_count)
            }
        }
    }
}

// ============ Orchestrator ============

enum CandidateOutcome {
    Skipped(SkipReason),
    Enriched(Candidate),
}

pub struct LeadPipeline {
    source: Arc<dyn CandidateSource>,
    fetcher: Arc<dyn PageFetcher>,
    search: Arc<dyn SearchEngine>,
    registry: Arc<dyn RegistryClient>,
    settings: PipelineSettings,
}

impl LeadPipeline {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        fetcher: Arc<dyn PageFetcher>,
        search: Arc<dyn SearchEngine>,
        registry: Arc<dyn RegistryClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            fetcher,
            search,
            registry,
            settings,
        }
    }

    /// Wires the HTTP-backed accessors from configuration.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::new(
            Arc::new(MapsDirectoryService::from_config(config)?),
            Arc::new(HttpPageFetcher::from_config(config)?),
            Arc::new(WebSearchService::from_config(config)?),
            Arc::new(CompaniesHouseService::from_config(config)?),
            PipelineSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Same accessors, different settings. Lets one server serve per-request targets.
    pub fn with_settings(&self, settings: PipelineSettings) -> Self {
        Self {
            source: self.source.clone(),
            fetcher: self.fetcher.clone(),
            search: self.search.clone(),
            registry: self.registry.clone(),
            settings,
        }
    }

    /// Runs one discovery. Never fails: accessor errors degrade to skipped candidates
    /// or missing fields, and an unusable directory yields `NoCandidates`.
    pub async fn run(
        &self,
        query: &SearchQuery,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(run_id, query, observer, cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        query: &SearchQuery,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> RunReport {
        let target_count = self.settings.target_count;
        observer.on_event(&ProgressEvent::RunStarted {
            run_id,
            query: query.clone(),
            target_count,
        });

        let mut quota = QuotaAccumulator::new(target_count);
        let mut stats = RunStats::default();

        let status = if quota.is_full() {
            RunStatus::TargetMet
        } else {
            self.process_candidates(query, &mut quota, &mut stats, observer, cancel)
                .await
        };

        let leads = quota.into_leads();
        observer.on_event(&ProgressEvent::RunFinished {
            status,
            lead_count: leads.len(),
        });

        RunReport {
            run_id,
            query: query.clone(),
            target_count,
            status,
            leads,
            stats,
        }
    }

    async fn process_candidates(
        &self,
        query: &SearchQuery,
        quota: &mut QuotaAccumulator,
        stats: &mut RunStats,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> RunStatus {
        let wanted = self.settings.target_count + CANDIDATE_HEADROOM;
        let collected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RunStatus::Cancelled,
            collected = self.source.candidate_urls(query, wanted) => collected,
        };

        let urls = match collected {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("❌ Candidate collection failed: {}", e);
                Vec::new()
            }
        };
        observer.on_event(&ProgressEvent::CandidatesCollected { count: urls.len() });
        if urls.is_empty() {
            return RunStatus::NoCandidates;
        }

        let fetcher = CachedPageFetcher::for_run(self.fetcher.clone());
        let today = Utc::now().date_naive();

        for (index, url) in urls.iter().enumerate() {
            if cancel.is_cancelled() {
                return RunStatus::Cancelled;
            }
            if index > 0 {
                self.pace(cancel).await;
            }

            stats.candidates_seen += 1;
            // In-flight enrichment is dropped on cancel; admitted leads stay
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return RunStatus::Cancelled,
                outcome = self.enrich_candidate(index, url, query, &fetcher, observer) => outcome,
            };

            match outcome {
                CandidateOutcome::Skipped(reason) => {
                    match reason {
                        SkipReason::ListingUnavailable => stats.skipped_fetch_failed += 1,
                        SkipReason::NoName => stats.skipped_no_name += 1,
                        SkipReason::BigBrand(_) => stats.skipped_big_brand += 1,
                    }
                }
                CandidateOutcome::Enriched(candidate) => {
                    let name = candidate.name.clone();
                    let score = scoring::score_at(&candidate, today);
                    let admission = quota.admit_at(candidate, today);
                    match admission {
                        Admission::Admitted(_) => {}
                        Admission::BelowThreshold => stats.rejected_low_score += 1,
                        Admission::BucketFull(_) => stats.rejected_bucket_full += 1,
                        Admission::Duplicate => stats.rejected_duplicate += 1,
                    }
                    observer.on_event(&ProgressEvent::CandidateScored {
                        index,
                        name,
                        score,
                        admission,
                    });
                }
            }

            if quota.is_full() {
                return RunStatus::TargetMet;
            }
        }

        RunStatus::Exhausted
    }

    /// Listing detail, brand filter, then the extractors in their fixed order.
    async fn enrich_candidate(
        &self,
        index: usize,
        url: &str,
        query: &SearchQuery,
        fetcher: &dyn PageFetcher,
        observer: &dyn ProgressObserver,
    ) -> CandidateOutcome {
        let skip = |name: &str, reason: SkipReason| {
            observer.on_event(&ProgressEvent::CandidateSkipped {
                index,
                name: name.to_string(),
                reason: reason.clone(),
            });
            CandidateOutcome::Skipped(reason)
        };

        let listing = match self.source.listing_detail(url).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("Listing {} unavailable: {}", url, e);
                return skip("", SkipReason::ListingUnavailable);
            }
        };

        let mut candidate = Candidate::from_listing(url, listing);
        if candidate.name.is_empty() {
            return skip("", SkipReason::NoName);
        }
        if let Some(keyword) = matched_brand_keyword(&candidate.name) {
            return skip(&candidate.name, SkipReason::BigBrand(keyword));
        }

        observer.on_event(&ProgressEvent::CandidateStarted {
            index,
            name: candidate.name.clone(),
        });
        let report = |stage: Stage, outcome: StageOutcome| {
            observer.on_event(&ProgressEvent::StageFinished {
                index,
                stage,
                outcome,
            });
        };
        let found = |value: &Option<String>| {
            if value.is_some() {
                StageOutcome::Found
            } else {
                StageOutcome::NotFound
            }
        };

        candidate.website = candidate.website.take().filter(|w| !w.trim().is_empty());
        report(Stage::WebsiteCheck, found(&candidate.website));

        match candidate.website.clone() {
            Some(website) => {
                candidate.email = find_email(fetcher, &website).await;
                report(Stage::Email, found(&candidate.email));

                candidate.owner_name = find_owner_name(fetcher, &website, &candidate.name).await;
                report(Stage::OwnerName, found(&candidate.owner_name));
            }
            None => {
                report(Stage::Email, StageOutcome::Skipped);
                report(Stage::OwnerName, StageOutcome::Skipped);
            }
        }

        candidate.linkedin_url = find_profile_url(
            self.search.as_ref(),
            &candidate.name,
            candidate.owner_name.as_deref(),
            &query.location,
        )
        .await;
        report(Stage::Profile, found(&candidate.linkedin_url));

        match self.settings.registry_api_key.as_deref() {
            Some(api_key) => {
                let record =
                    lookup_registry(self.registry.as_ref(), &candidate.name, Some(api_key)).await;
                if let Some(record) = record {
                    candidate.apply_registry(record);
                }
                report(Stage::Registry, found(&candidate.registration_date));
            }
            None => report(Stage::Registry, StageOutcome::Skipped),
        }

        CandidateOutcome::Enriched(candidate)
    }

    /// Courtesy delay between candidates. Cut short by cancellation.
    async fn pace(&self, cancel: &CancellationToken) {
        let Some(base) = self.settings.pacing_delay else {
            return;
        };
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(PACING_JITTER_MS));
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(base + jitter) => {}
        }
    }
}
