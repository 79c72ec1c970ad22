//! Seams to the outside world.
//!
//! The pipeline only talks to these traits. `services` holds the reqwest-backed
//! implementations; tests substitute in-memory fakes.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};
use serde_json::Value;
use url::Url;

use crate::errors::AppError;
use crate::models::{ListingDetail, SearchQuery};

/// Supplies candidate listings from the map-style directory.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Unique candidate URLs for the query. May return fewer than `minimum`.
    async fn candidate_urls(
        &self,
        query: &SearchQuery,
        minimum: usize,
    ) -> Result<Vec<String>, AppError>;

    /// Name, phone and website from the candidate's own listing page.
    async fn listing_detail(&self, url: &str) -> Result<ListingDetail, AppError>;
}

/// Fetches a page and exposes its rendered content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageContent, AppError>;
}

/// General web search engine.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Outbound links on the first results page.
    async fn result_links(&self, query: &str) -> Result<Vec<String>, AppError>;
}

/// One registry search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct RegistryItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date_of_creation: Option<String>,
    #[serde(default)]
    pub company_number: Option<String>,
    #[serde(default)]
    pub company_status: Option<String>,
}

/// Company registry search API.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Up to five records matching the business name.
    async fn search(&self, business_name: &str, api_key: &str)
        -> Result<Vec<RegistryItem>, AppError>;
}

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector - this is a bug")
});

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to parse anchor selector - this is a bug")
});

static MICRODATA_PERSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[itemtype*="Person"] [itemprop="name"]"#)
        .expect("Failed to parse person selector - this is a bug")
});

static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("Failed to parse JSON-LD selector - this is a bug")
});

/// Elements whose text never shows on screen.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Rendered content of one page.
///
/// Built from HTML eagerly so the value is `Send` and can cross await points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    /// Visible text, one line per text node.
    pub text: String,
    /// Hyperlink targets, resolved against the page URL.
    pub links: Vec<String>,
    /// Addresses from `mailto:` links, query stripped.
    pub mailto_addresses: Vec<String>,
    /// Names found in `Person` microdata.
    pub microdata_person_names: Vec<String>,
    /// Names found in JSON-LD `Person` objects.
    pub json_ld_person_names: Vec<String>,
}

impl PageContent {
    pub fn from_html(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let base = Url::parse(url).ok();

        let mut links = Vec::new();
        let mut mailto_addresses = Vec::new();
        for anchor in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if let Some(address) = mailto_address(href) {
                mailto_addresses.push(address);
                continue;
            }
            if let Some(resolved) = resolve_link(base.as_ref(), href) {
                links.push(resolved);
            }
        }

        let microdata_person_names = document
            .select(&MICRODATA_PERSON_SELECTOR)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|name| !name.is_empty())
            .collect();

        let json_ld_person_names = document
            .select(&JSON_LD_SELECTOR)
            .filter_map(|el| serde_json::from_str::<Value>(&el.inner_html()).ok())
            .flat_map(|value| {
                let mut names = Vec::new();
                collect_json_ld_people(&value, &mut names);
                names
            })
            .collect();

        Self {
            url: url.to_string(),
            text: visible_text(&document),
            links,
            mailto_addresses,
            microdata_person_names,
            json_ld_person_names,
        }
    }

    /// Page with plain text only, for accessors that have no markup.
    pub fn from_text(url: &str, text: &str) -> Self {
        Self {
            url: url.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }
}

fn mailto_address(href: &str) -> Option<String> {
    let rest = href
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
        .map(|_| &href[7..])?;
    let address = rest.split('?').next().unwrap_or_default().trim();
    if address.is_empty() {
        None
    } else {
        Some(address.to_string())
    }
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    Some(resolved.to_string())
}

fn visible_text(document: &Html) -> String {
    let root = match document.select(&BODY_SELECTOR).next() {
        Some(body) => body,
        None => document.root_element(),
    };

    let mut lines = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join("\n")
}

fn collect_json_ld_people(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_json_ld_people(item, names)),
        Value::Object(map) => {
            let is_person = match map.get("@type") {
                Some(Value::String(t)) => t == "Person",
                Some(Value::Array(types)) => types.iter().any(|t| t == "Person"),
                _ => false,
            };
            if is_person {
                if let Some(Value::String(name)) = map.get("name") {
                    let name = collapse_whitespace(name);
                    if !name.is_empty() {
                        names.push(name);
                    }
                }
            }
            map.values()
                .for_each(|nested| collect_json_ld_people(nested, names));
        }
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
