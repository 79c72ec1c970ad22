use crate::accessors::{
    CandidateSource, PageContent, PageFetcher, RegistryClient, RegistryItem, SearchEngine,
};
use crate::circuit_breaker::{create_search_circuit_breaker, SearchCircuitBreaker};
use crate::config::Config;
use crate::enrichment::{normalize_uk_phone, normalize_website, REGISTRY_MAX_ITEMS};
use crate::errors::{AppError, ResultExt};
use crate::models::{ListingDetail, SearchQuery};
use async_trait::async_trait;
use failsafe::CircuitBreaker;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Desktop browser identity; several directories serve an empty shell to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

fn build_client(timeout: Duration, purpose: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to create {} client: {}", purpose, e)))
}

/// Turns a non-success status into the matching error, keeping the body for logs.
async fn ensure_success(response: Response, source: &str) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::debug!("{} returned error {}: {}", source, status, error_text);

    Err(match status {
        StatusCode::NOT_FOUND => AppError::NotFound(format!("{} returned 404", source)),
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            AppError::Unreachable(format!("{} returned status {}", source, s))
        }
        s => AppError::ExternalApiError(format!("{} returned status {}", source, s)),
    })
}

// ============ Page Fetcher ============

/// Fetches business websites over HTTP.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, "page")?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.page_timeout())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let response = ensure_success(response, url).await?;

        // Resolve links against wherever redirects landed
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .with_context(|| format!("reading body of {}", url))?;

        Ok(PageContent::from_html(&final_url, &html))
    }
}

// ============ Web Search ============

/// General web search via the engine's HTML results page.
pub struct WebSearchService {
    client: Client,
    base_url: String,
    breaker: SearchCircuitBreaker,
}

impl WebSearchService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, "search")?,
            base_url: base_url.into(),
            breaker: create_search_circuit_breaker(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.search_engine_base_url.clone(), config.search_timeout())
    }

    async fn fetch_results(&self, query: &str) -> Result<Vec<String>, AppError> {
        let url = Url::parse_with_params(&format!("{}/search", self.base_url), &[("q", query)])?;

        tracing::debug!("Searching: {}", query);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("search engine request")?;
        let response = ensure_success(response, "search engine").await?;
        let html = response
            .text()
            .await
            .context("reading search results")?;

        Ok(PageContent::from_html(url.as_str(), &html).links)
    }
}

#[async_trait]
impl SearchEngine for WebSearchService {
    async fn result_links(&self, query: &str) -> Result<Vec<String>, AppError> {
        if !self.breaker.is_call_permitted() {
            tracing::warn!("⚡ Search circuit open, skipping query: {}", query);
            return Err(AppError::Unreachable("search engine circuit open".to_string()));
        }

        let outcome = self.fetch_results(query).await;
        match self.breaker.call(|| outcome) {
            Ok(links) => Ok(links),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                Err(AppError::Unreachable("search engine circuit open".to_string()))
            }
        }
    }
}

// ============ Company Registry ============

#[derive(Debug, Deserialize)]
struct RegistrySearchResponse {
    #[serde(default)]
    items: Vec<RegistryItem>,
}

/// Companies House company search.
#[derive(Clone)]
pub struct CompaniesHouseService {
    client: Client,
    base_url: String,
}

impl CompaniesHouseService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, "registry")?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.registry_base_url.clone(), config.registry_timeout())
    }
}

#[async_trait]
impl RegistryClient for CompaniesHouseService {
    async fn search(
        &self,
        business_name: &str,
        api_key: &str,
    ) -> Result<Vec<RegistryItem>, AppError> {
        let items_per_page = REGISTRY_MAX_ITEMS.to_string();
        let url = Url::parse_with_params(
            &format!("{}/search/companies", self.base_url),
            &[("q", business_name), ("items_per_page", items_per_page.as_str())],
        )?;

        tracing::debug!("Registry search for: {}", business_name);

        // The key is the basic-auth username with an empty password
        let response = self
            .client
            .get(url)
            .basic_auth(api_key, None::<&str>)
            .send()
            .await
            .context("registry request")?;
        let response = ensure_success(response, "registry").await?;

        let result: RegistrySearchResponse = response
            .json()
            .await
            .context("parsing registry response")?;

        tracing::debug!(
            "Registry returned {} item(s) for {}",
            result.items.len(),
            business_name
        );
        Ok(result.items)
    }
}

// ============ Map Directory ============

static PLACE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:https?://[A-Za-z0-9.:-]+)?/maps/place/[^"'\s\\<>?#]+"#)
        .expect("Failed to compile place link pattern - this is a bug")
});

static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1").expect("Failed to parse heading selector - this is a bug")
});

/// Phone elements, most specific first. The number is read from `data-item-id` or
/// `aria-label`, never from tooltip text.
static PHONE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[data-item-id*="phone:tel:"]"#,
        r#"[aria-label*="Phone:"]"#,
        r#"button[data-tooltip*="phone" i]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("Failed to parse phone selector - this is a bug"))
    .collect()
});

static WEBSITE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"a[data-item-id="authority"]"#,
        r#"a[aria-label*="website" i]"#,
        r#"a[href*="http"][data-item-id]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("Failed to parse website selector - this is a bug"))
    .collect()
});

/// Map-style business directory: a search results page plus one page per listing.
#[derive(Clone)]
pub struct MapsDirectoryService {
    client: Client,
    base_url: String,
}

impl MapsDirectoryService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, "directory")?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.directory_base_url.clone(), config.page_timeout())
    }

    fn search_url(&self, query: &SearchQuery) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)?;
        let phrase = query.directory_phrase();
        url.path_segments_mut()
            .map_err(|_| AppError::BadRequest(format!("Cannot search under {}", self.base_url)))?
            .pop_if_empty()
            .extend(["maps", "search", phrase.as_str()]);
        Ok(url)
    }

    async fn get_html(&self, url: &str, source: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-GB,en;q=0.9")
            .send()
            .await
            .with_context(|| format!("{} request", source))?;
        let response = ensure_success(response, source).await?;
        response
            .text()
            .await
            .with_context(|| format!("reading {} body", source))
    }
}

#[async_trait]
impl CandidateSource for MapsDirectoryService {
    async fn candidate_urls(
        &self,
        query: &SearchQuery,
        minimum: usize,
    ) -> Result<Vec<String>, AppError> {
        let url = self.search_url(query)?;
        tracing::info!("🔍 Directory search: {}", query.directory_phrase());

        let html = self.get_html(url.as_str(), "directory search").await?;
        let urls = extract_place_urls(&url, &html);

        if urls.len() < minimum {
            tracing::info!(
                "Directory returned {} candidate(s), fewer than the {} wanted",
                urls.len(),
                minimum
            );
        }
        Ok(urls)
    }

    async fn listing_detail(&self, url: &str) -> Result<ListingDetail, AppError> {
        let html = self.get_html(url, "listing").await?;
        Ok(parse_listing_page(&html))
    }
}

/// Unique listing URLs in page order, query strings stripped.
pub fn extract_place_urls(page_url: &Url, html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in PLACE_LINK.find_iter(html) {
        let Ok(resolved) = page_url.join(m.as_str()) else {
            continue;
        };
        let mut resolved = resolved;
        resolved.set_query(None);
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            urls.push(resolved);
        }
    }

    urls
}

/// Reads name, phone and website from a listing page.
pub fn parse_listing_page(html: &str) -> ListingDetail {
    let document = Html::parse_document(html);

    let name = document
        .select(&HEADING_SELECTOR)
        .next()
        .map(|h| h.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let phone = PHONE_SELECTORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .filter_map(|el| {
            let value = el.value();
            value
                .attr("data-item-id")
                .filter(|id| id.contains("phone"))
                .or_else(|| value.attr("aria-label"))
                .map(str::to_string)
        })
        .find_map(|raw| normalize_uk_phone(&raw));

    let website = WEBSITE_SELECTORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .filter_map(|el| el.value().attr("href"))
        .find_map(normalize_website);

    ListingDetail {
        name,
        phone,
        website,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <h1>  Hill &amp; Sons   Roofing </h1>
          <button data-item-id="phone:tel:020 7219 3000" aria-label="Phone: 020 7219 3000">Call</button>
          <a data-item-id="authority" href="https://hillroofing.co.uk/">Website</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_page_reads_all_fields() {
        let detail = parse_listing_page(LISTING);

        assert_eq!(detail.name, "Hill & Sons Roofing");
        assert_eq!(detail.phone.as_deref(), Some("+442072193000"));
        assert_eq!(detail.website.as_deref(), Some("https://hillroofing.co.uk/"));
    }

    #[test]
    fn test_parse_listing_page_without_fields() {
        let detail = parse_listing_page("<html><body><p>Nothing here</p></body></html>");

        assert_eq!(detail, ListingDetail::default());
    }

    #[test]
    fn test_tooltip_text_is_not_a_phone_number() {
        let html = r#"<h1>Dee Plumbing</h1>
            <button data-tooltip="Copy phone number">Copy</button>"#;

        assert_eq!(parse_listing_page(html).phone, None);
    }

    #[test]
    fn test_tooltip_button_number_read_from_item_id() {
        let html = r#"<h1>Dee Plumbing</h1>
            <button data-tooltip="Copy phone number" data-item-id="phone:020 7219 3000">Copy</button>"#;

        assert_eq!(
            parse_listing_page(html).phone.as_deref(),
            Some("+442072193000")
        );
    }

    #[test]
    fn test_website_falls_back_to_labelled_link() {
        let html = r#"<h1>Dee Plumbing</h1>
            <a aria-label="Website: deeplumbing.co.uk" href="https://deeplumbing.co.uk/home">Visit</a>"#;

        let detail = parse_listing_page(html);
        assert_eq!(detail.website.as_deref(), Some("https://deeplumbing.co.uk/home"));
        assert_eq!(detail.phone, None);
    }

    #[test]
    fn test_extract_place_urls_dedupes_and_strips_query() {
        let page = Url::parse("https://www.google.com/maps/search/plumbers").unwrap();
        let html = r#"
            <a href="/maps/place/Dee+Plumbing/@53.19,-2.89?entry=ttu">Dee</a>
            <a href="https://www.google.com/maps/place/Dee+Plumbing/@53.19,-2.89?hl=en">Dee again</a>
            <script>"/maps/place/Hill+Roofing/@53.2,-2.9"</script>
        "#;

        let urls = extract_place_urls(&page, html);
        assert_eq!(
            urls,
            vec![
                "https://www.google.com/maps/place/Dee+Plumbing/@53.19,-2.89".to_string(),
                "https://www.google.com/maps/place/Hill+Roofing/@53.2,-2.9".to_string(),
            ]
        );
    }

    #[test]
    fn test_search_url_encodes_phrase() {
        let service =
            MapsDirectoryService::new("https://www.google.com", Duration::from_secs(8)).unwrap();
        let url = service
            .search_url(&SearchQuery::new("plumbers", "Chester"))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://www.google.com/maps/search/plumbers%20in%20Chester"
        );
    }
}
