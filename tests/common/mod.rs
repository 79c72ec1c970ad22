//! In-memory accessors shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use leadseeds::accessors::{
    CandidateSource, PageContent, PageFetcher, RegistryClient, RegistryItem, SearchEngine,
};
use leadseeds::errors::AppError;
use leadseeds::models::{ListingDetail, SearchQuery};
use leadseeds::pipeline::{ProgressEvent, ProgressObserver};
use std::collections::HashMap;
use std::sync::Mutex;

/// Websites keyed by exact URL. Anything else is unreachable.
#[derive(Default)]
pub struct FakeWeb {
    pages: HashMap<String, PageContent>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeWeb {
    pub fn with_html(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), PageContent::from_html(url, html));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> Result<PageContent, AppError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Unreachable(format!("timed out: {}", url)))
    }
}

/// Search engine with canned links per query, or one that fails every call.
#[derive(Default)]
pub struct FakeSearch {
    results: HashMap<String, Vec<String>>,
    fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_results(mut self, query: &str, links: &[&str]) -> Self {
        self.results.insert(
            query.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchEngine for FakeSearch {
    async fn result_links(&self, query: &str) -> Result<Vec<String>, AppError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(AppError::Unreachable("search engine blocked".to_string()));
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    items: Vec<RegistryItem>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeRegistry {
    pub fn with_item(mut self, title: &str, date_of_creation: &str, number: &str) -> Self {
        self.items.push(RegistryItem {
            title: Some(title.to_string()),
            date_of_creation: Some(date_of_creation.to_string()),
            company_number: Some(number.to_string()),
            company_status: Some("active".to_string()),
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn search(
        &self,
        business_name: &str,
        api_key: &str,
    ) -> Result<Vec<RegistryItem>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((business_name.to_string(), api_key.to_string()));
        Ok(self.items.clone())
    }
}

/// Directory with listings in insertion order. Listings without detail fail to load.
#[derive(Default)]
pub struct FakeDirectory {
    urls: Vec<String>,
    listings: HashMap<String, ListingDetail>,
    fail: bool,
}

impl FakeDirectory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_listing(
        mut self,
        name: &str,
        phone: Option<&str>,
        website: Option<&str>,
    ) -> Self {
        let url = format!("https://maps.test/place/{}", self.urls.len());
        self.listings.insert(
            url.clone(),
            ListingDetail {
                name: name.to_string(),
                phone: phone.map(str::to_string),
                website: website.map(str::to_string),
            },
        );
        self.urls.push(url);
        self
    }

    pub fn with_broken_listing(mut self) -> Self {
        let url = format!("https://maps.test/place/{}", self.urls.len());
        self.urls.push(url);
        self
    }
}

#[async_trait]
impl CandidateSource for FakeDirectory {
    async fn candidate_urls(
        &self,
        _query: &SearchQuery,
        _minimum: usize,
    ) -> Result<Vec<String>, AppError> {
        if self.fail {
            return Err(AppError::Unreachable("directory blocked".to_string()));
        }
        Ok(self.urls.clone())
    }

    async fn listing_detail(&self, url: &str) -> Result<ListingDetail, AppError> {
        self.listings
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Unreachable(format!("listing timed out: {}", url)))
    }
}

/// Records every progress event.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
