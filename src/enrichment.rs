/// Heuristic field extractors.
///
/// Each extractor turns one external source into one optional field:
/// 1. Email from the business website (mailto links, then page text, then contact pages)
/// 2. Owner name from the website (structured Person markup, then role-keyword patterns)
/// 3. Professional profile link via a site-restricted web search
/// 4. Registration details via the company registry
///
/// Extractors never fail. Every accessor error is logged and treated as "not found".
/// Fallback chains are kept as data (ordered strategy tables) so each attempt can be
/// inspected and tested on its own.
use crate::accessors::{PageContent, PageFetcher, RegistryClient, RegistryItem, SearchEngine};
use crate::models::RegistryRecord;
use once_cell::sync::Lazy;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use url::Url;

/// Sub-paths tried for an email after the homepage.
pub const EMAIL_FALLBACK_PATHS: &[&str] = &["/contact", "/contact-us", "/get-in-touch", "/about"];

/// Sub-paths tried for an owner name after the homepage.
pub const OWNER_PAGE_PATHS: &[&str] = &[
    "/about",
    "/about-us",
    "/team",
    "/our-team",
    "/meet-the-team",
];

/// Fragments that mark an address as a template placeholder or vendor noise.
const PLACEHOLDER_EMAIL_MARKERS: &[&str] =
    &["example", "yourdomain", "domain.com", "sentry", "wixpress"];

/// Registry results considered per lookup.
pub const REGISTRY_MAX_ITEMS: usize = 5;

pub const PROFILE_PERSON_PATH: &str = "linkedin.com/in/";
pub const PROFILE_COMPANY_PATH: &str = "linkedin.com/company/";

type PageStrategy = fn(&PageContent) -> Option<String>;
type OwnerStrategy = fn(&PageContent, &str) -> Option<String>;

/// Email attempts per page, in priority order.
pub const EMAIL_STRATEGIES: &[(&str, PageStrategy)] = &[
    ("mailto_link", email_from_mailto_links),
    ("text_scan", email_from_text),
];

/// Owner-name attempts per page, in priority order.
pub const OWNER_STRATEGIES: &[(&str, OwnerStrategy)] = &[
    ("microdata_person", owner_from_microdata),
    ("json_ld_person", owner_from_json_ld),
    ("role_patterns", owner_from_text_patterns),
];

/// Role-keyword patterns over visible text. Group 1 is the name.
/// Keywords match in any case, the name itself must be capitalized.
const OWNER_TEXT_PATTERNS: &[&str] = &[
    r"\b(?i:managing director|owner|director|founder|proprietor|principal|md)[:\s–-]+([A-Z][a-z]+ [A-Z][a-z]+)",
    r"([A-Z][a-z]+ [A-Z][a-z]+)\s*[,–-]\s*(?i:owner|director|founder|proprietor|principal)\b",
    r"\b(?i:hi,?\s+i'?m|hello,?\s+i'?m|my name is)\s+([A-Z][a-z]+ [A-Z][a-z]+)",
    r"©\s*(?:\d{4}[\s–-]*\d{0,4}\s+)?([A-Z][a-z]+ [A-Z][a-z]+)\b",
];

static OWNER_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    OWNER_TEXT_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("Failed to compile owner pattern - this is a bug"))
        .collect()
});

static EMAIL_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("Failed to compile email pattern - this is a bug")
});

// RFC 5322 simplified email regex
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("Failed to compile email shape pattern - this is a bug")
});

// ============ Email ============

/// Finds a contact email on the website, homepage first then the fallback paths.
pub async fn find_email(fetcher: &dyn PageFetcher, website: &str) -> Option<String> {
    for url in site_pages(website, EMAIL_FALLBACK_PATHS) {
        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Email lookup skipped {}: {}", url, e);
                continue;
            }
        };

        for (strategy, attempt) in EMAIL_STRATEGIES {
            if let Some(email) = attempt(&page) {
                tracing::debug!("Email found via {} on {}", strategy, url);
                return Some(email);
            }
        }
    }
    None
}

/// First `mailto:` address with an `@` that is not a placeholder.
pub fn email_from_mailto_links(page: &PageContent) -> Option<String> {
    page.mailto_addresses
        .iter()
        .find(|address| address.contains('@') && !is_placeholder_email(address))
        .cloned()
}

/// First email-shaped substring in the visible text.
pub fn email_from_text(page: &PageContent) -> Option<String> {
    EMAIL_IN_TEXT
        .find_iter(&page.text)
        .map(|m| m.as_str())
        .find(|candidate| !is_placeholder_email(candidate))
        .map(str::to_string)
}

pub fn is_placeholder_email(email: &str) -> bool {
    let lower = email.to_lowercase();
    PLACEHOLDER_EMAIL_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Validate an email address submitted by a person (signup form).
///
/// Checks basic shape, minimum length and placeholder domains.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    if is_placeholder_email(email) {
        tracing::warn!("❌ Placeholder email rejected: {}", email);
        return false;
    }

    if !EMAIL_SHAPE.is_match(email) {
        tracing::warn!("❌ Invalid email format: {}", email);
        return false;
    }

    true
}

// ============ Owner name ============

/// Finds the owner's name on the homepage or the about/team pages.
pub async fn find_owner_name(
    fetcher: &dyn PageFetcher,
    website: &str,
    business_name: &str,
) -> Option<String> {
    for url in site_pages(website, OWNER_PAGE_PATHS) {
        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Owner lookup skipped {}: {}", url, e);
                continue;
            }
        };

        for (strategy, attempt) in OWNER_STRATEGIES {
            if let Some(name) = attempt(&page, business_name) {
                tracing::debug!("Owner found via {} on {}", strategy, url);
                return Some(name);
            }
        }
    }
    None
}

pub fn owner_from_microdata(page: &PageContent, business_name: &str) -> Option<String> {
    page.microdata_person_names
        .iter()
        .find(|name| is_acceptable_owner(name, business_name))
        .cloned()
}

pub fn owner_from_json_ld(page: &PageContent, business_name: &str) -> Option<String> {
    page.json_ld_person_names
        .iter()
        .find(|name| is_acceptable_owner(name, business_name))
        .cloned()
}

pub fn owner_from_text_patterns(page: &PageContent, business_name: &str) -> Option<String> {
    OWNER_REGEXES.iter().find_map(|re| {
        re.captures_iter(&page.text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|name| is_acceptable_owner(name, business_name))
            .map(str::to_string)
    })
}

/// Two or more words, capitalized at both ends, and not the business's own name.
pub fn is_acceptable_owner(name: &str, business_name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() < 2 {
        return false;
    }
    let capitalized = |word: &str| word.chars().next().is_some_and(char::is_uppercase);
    if !capitalized(words[0]) || !capitalized(words[words.len() - 1]) {
        return false;
    }

    match business_first_word(business_name) {
        Some(first) => !name.to_lowercase().contains(&first),
        None => true,
    }
}

/// Lower-cased first token of the business name.
pub fn business_first_word(business_name: &str) -> Option<String> {
    business_name
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
}

// ============ Professional profile ============

/// Site-restricted query: person path by owner and location, else company path by name.
pub fn build_profile_query(business_name: &str, owner_name: Option<&str>, location: &str) -> String {
    match owner_name.filter(|o| !o.trim().is_empty()) {
        Some(owner) => format!(r#"site:linkedin.com/in "{}" "{}""#, owner.trim(), location.trim()),
        None => format!(r#"site:linkedin.com/company "{}""#, business_name.trim()),
    }
}

/// Searches for a professional-network profile and returns the first normalized hit.
pub async fn find_profile_url(
    search: &dyn SearchEngine,
    business_name: &str,
    owner_name: Option<&str>,
    location: &str,
) -> Option<String> {
    let query = build_profile_query(business_name, owner_name, location);

    let links = match search.result_links(&query).await {
        Ok(links) => links,
        Err(e) => {
            tracing::debug!("Profile search failed for {}: {}", business_name, e);
            return None;
        }
    };

    links
        .iter()
        .find(|link| is_profile_link(link))
        .map(|link| normalize_profile_url(link))
}

pub fn is_profile_link(link: &str) -> bool {
    link.contains(PROFILE_PERSON_PATH) || link.contains(PROFILE_COMPANY_PATH)
}

/// Strips the query string and one trailing slash.
pub fn normalize_profile_url(link: &str) -> String {
    let without_query = link.split('?').next().unwrap_or(link);
    without_query
        .strip_suffix('/')
        .unwrap_or(without_query)
        .to_string()
}

// ============ Registry ============

/// Registry lookup. A missing credential makes this a silent no-op.
pub async fn lookup_registry(
    client: &dyn RegistryClient,
    business_name: &str,
    api_key: Option<&str>,
) -> Option<RegistryRecord> {
    let api_key = api_key.map(str::trim).filter(|k| !k.is_empty())?;

    let mut items = match client.search(business_name, api_key).await {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!("Registry lookup failed for {}: {}", business_name, e);
            return None;
        }
    };
    items.truncate(REGISTRY_MAX_ITEMS);

    let item = select_registry_item(&items, business_name)?;
    Some(RegistryRecord {
        registration_date: non_empty(item.date_of_creation.as_deref()),
        company_number: non_empty(item.company_number.as_deref()),
        status: non_empty(item.company_status.as_deref()),
    })
}

/// First item whose title contains the business's first word, else the first item.
pub fn select_registry_item<'a>(
    items: &'a [RegistryItem],
    business_name: &str,
) -> Option<&'a RegistryItem> {
    let first_word = business_first_word(business_name);
    first_word
        .and_then(|word| {
            items.iter().find(|item| {
                item.title
                    .as_deref()
                    .is_some_and(|title| title.to_lowercase().contains(&word))
            })
        })
        .or_else(|| items.first())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============ Phone & website ============

/// Normalize a UK phone number read from a listing.
///
/// Strips listing prefixes (`phone:tel:`, `tel:`, `Phone:`). Valid GB numbers are
/// returned in E.164 (+442072193000); anything else is kept as trimmed text.
pub fn normalize_uk_phone(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim();
    for prefix in ["phone:tel:", "tel:", "phone:"] {
        if cleaned
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            cleaned = cleaned[prefix.len()..].trim();
            break;
        }
    }
    if cleaned.is_empty() {
        return None;
    }

    match phonenumber::parse(Some(CountryId::GB), cleaned) {
        Ok(number) if phonenumber::is_valid(&number) => {
            let formatted = number.format().mode(Mode::E164).to_string();
            tracing::debug!("✓ Valid UK phone: {} → {}", cleaned, formatted);
            Some(formatted)
        }
        Ok(_) => {
            tracing::debug!("Keeping unvalidated phone as listed: {}", cleaned);
            Some(cleaned.to_string())
        }
        Err(e) => {
            tracing::debug!("Failed to parse phone '{}': {:?}", cleaned, e);
            Some(cleaned.to_string())
        }
    }
}

/// Keeps only absolute http(s) URLs.
pub fn normalize_website(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

/// Homepage followed by `origin + path` for each path, without repeats.
pub fn site_pages(website: &str, paths: &[&str]) -> Vec<String> {
    let Ok(url) = Url::parse(website) else {
        tracing::debug!("Not an absolute website URL: {}", website);
        return Vec::new();
    };
    let origin = url.origin().ascii_serialization();

    let mut pages = vec![website.to_string()];
    for path in paths {
        let page = format!("{}{}", origin, path);
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_text(text: &str) -> PageContent {
        PageContent::from_text("https://a.co.uk/", text)
    }

    #[test]
    fn test_mailto_skips_placeholders() {
        let page = PageContent {
            mailto_addresses: vec![
                "you@example.com".to_string(),
                "no-at-sign".to_string(),
                "Jo@HillRoofing.co.uk".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(
            email_from_mailto_links(&page),
            Some("Jo@HillRoofing.co.uk".to_string())
        );
    }

    #[test]
    fn test_text_scan_finds_first_plausible() {
        let page = page_with_text("Write to name@example.com or office@smithplumbing.co.uk today");
        assert_eq!(
            email_from_text(&page),
            Some("office@smithplumbing.co.uk".to_string())
        );
        assert_eq!(email_from_text(&page_with_text("no address here")), None);
    }

    #[test]
    fn test_plausible_email() {
        assert!(is_plausible_email("jane@smithplumbing.co.uk"));
        assert!(!is_plausible_email("jane@example.com"));
        assert!(!is_plausible_email("jane"));
        assert!(!is_plausible_email("jane @smith.co.uk"));
        assert!(!is_plausible_email("jane@localhost"));
    }

    #[test]
    fn test_owner_patterns() {
        let cases = [
            ("Owner: Jane Smith", "Jane Smith"),
            ("Managing Director - Tom Baker", "Tom Baker"),
            ("Priya Patel, Founder of the firm", "Priya Patel"),
            ("Hi, I'm Dave Jones and I fix boilers", "Dave Jones"),
            ("My name is Alan Wright", "Alan Wright"),
            ("© 2019-2024 Karen Doyle", "Karen Doyle"),
        ];
        for (text, expected) in cases {
            assert_eq!(
                owner_from_text_patterns(&page_with_text(text), "Acme Heating"),
                Some(expected.to_string()),
                "text: {}",
                text
            );
        }
    }

    #[test]
    fn test_owner_rejects_business_name() {
        let page = page_with_text("© 2024 Smith Plumbing. All rights reserved.");
        assert_eq!(owner_from_text_patterns(&page, "Smith Plumbing"), None);
        assert!(!is_acceptable_owner("Smith Plumbing", "Smith Plumbing"));
    }

    #[test]
    fn test_owner_requires_two_capitalized_words() {
        assert!(is_acceptable_owner("Jane Smith", "Acme"));
        assert!(!is_acceptable_owner("Jane", "Acme"));
        assert!(!is_acceptable_owner("jane smith", "Acme"));
    }

    #[test]
    fn test_owner_skips_rejected_match_and_keeps_scanning() {
        let page = page_with_text("© 2024 Smith Plumbing\nOwner: Jane Doyle");
        assert_eq!(
            owner_from_text_patterns(&page, "Smith Plumbing"),
            Some("Jane Doyle".to_string())
        );
    }

    #[test]
    fn test_profile_query() {
        assert_eq!(
            build_profile_query("Hill Roofing", Some("Dan Hill"), "Chester"),
            r#"site:linkedin.com/in "Dan Hill" "Chester""#
        );
        assert_eq!(
            build_profile_query("Hill Roofing", None, "Chester"),
            r#"site:linkedin.com/company "Hill Roofing""#
        );
        assert_eq!(
            build_profile_query("Hill Roofing", Some("  "), "Chester"),
            r#"site:linkedin.com/company "Hill Roofing""#
        );
    }

    #[test]
    fn test_profile_url_normalization() {
        assert_eq!(
            normalize_profile_url("https://uk.linkedin.com/in/dan-hill/?trk=abc"),
            "https://uk.linkedin.com/in/dan-hill"
        );
        assert_eq!(
            normalize_profile_url("https://www.linkedin.com/company/hill-roofing"),
            "https://www.linkedin.com/company/hill-roofing"
        );
        assert!(is_profile_link("https://www.linkedin.com/company/x"));
        assert!(!is_profile_link("https://www.linkedin.com/jobs/x"));
    }

    #[test]
    fn test_registry_selection_prefers_first_word_match() {
        let items = vec![
            RegistryItem {
                title: Some("ACME HOLDINGS LTD".to_string()),
                ..Default::default()
            },
            RegistryItem {
                title: Some("HILL ROOFING LIMITED".to_string()),
                ..Default::default()
            },
        ];
        let selected = select_registry_item(&items, "Hill Roofing").unwrap();
        assert_eq!(selected.title.as_deref(), Some("HILL ROOFING LIMITED"));

        let fallback = select_registry_item(&items, "Zenith Builders").unwrap();
        assert_eq!(fallback.title.as_deref(), Some("ACME HOLDINGS LTD"));

        assert!(select_registry_item(&[], "Hill Roofing").is_none());
    }

    #[test]
    fn test_site_pages() {
        let pages = site_pages("https://hill.co.uk/home?ref=maps", EMAIL_FALLBACK_PATHS);
        assert_eq!(
            pages,
            vec![
                "https://hill.co.uk/home?ref=maps",
                "https://hill.co.uk/contact",
                "https://hill.co.uk/contact-us",
                "https://hill.co.uk/get-in-touch",
                "https://hill.co.uk/about",
            ]
        );
        assert!(site_pages("hill.co.uk", EMAIL_FALLBACK_PATHS).is_empty());
    }

    #[test]
    fn test_normalize_website() {
        assert_eq!(
            normalize_website("https://hill.co.uk"),
            Some("https://hill.co.uk/".to_string())
        );
        assert_eq!(normalize_website("/url?q=hill"), None);
        assert_eq!(normalize_website("mailto:a@b.co"), None);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_uk_phone(""), None);
        assert_eq!(normalize_uk_phone("tel:"), None);
        assert_eq!(
            normalize_uk_phone("phone:tel:020 7219 3000"),
            Some("+442072193000".to_string())
        );
        assert_eq!(normalize_uk_phone("Phone: call us"), Some("call us".to_string()));
    }
}
