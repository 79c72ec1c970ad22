/// Integration tests with mocked external services
/// Exercises the HTTP accessors and a full run without hitting real websites
use leadseeds::accessors::{CandidateSource, PageFetcher, RegistryClient, SearchEngine};
use leadseeds::config::Config;
use leadseeds::errors::AppError;
use leadseeds::models::{RunStatus, SearchQuery};
use leadseeds::pipeline::{LeadPipeline, TracingObserver};
use leadseeds::scoring::ScoreTier;
use leadseeds::integrations::services::{
    CompaniesHouseService, HttpPageFetcher, MapsDirectoryService, WebSearchService,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(8);

/// Helper function to create test config with every service on the mock server
fn create_test_config(base_url: String) -> Config {
    Config {
        target_lead_count: 1,
        companies_house_api_key: Some("test-key".to_string()),
        registry_base_url: base_url.clone(),
        search_engine_base_url: base_url.clone(),
        directory_base_url: base_url,
        ..Config::default()
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn test_page_fetcher_parses_html() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>Call Dee Plumbing</p>
               <a href="/contact">Contact</a>
               <a href="mailto:info@dee.co.uk">Email</a></body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let fetcher = HttpPageFetcher::new(TIMEOUT).unwrap();
    let page = fetcher
        .fetch(&format!("{}/", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(page.mailto_addresses, vec!["info@dee.co.uk".to_string()]);
    assert_eq!(page.links, vec![format!("{}/contact", mock_server.uri())]);
    assert!(page.text.contains("Call Dee Plumbing"));
}

#[tokio::test]
async fn test_page_fetcher_maps_missing_page_to_not_found() {
    let mock_server = MockServer::start().await;

    let fetcher = HttpPageFetcher::new(TIMEOUT).unwrap();
    let err = fetcher
        .fetch(&format!("{}/contact", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_companies_house_search_uses_basic_auth() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "total_results": 2,
        "items": [
            {
                "title": "DEE PLUMBING LTD",
                "date_of_creation": "2021-03-04",
                "company_number": "12345678",
                "company_status": "active",
                "address_snippet": "1 Watergate Street, Chester"
            },
            {
                "title": "DEE PLUMBING SUPPLIES LTD",
                "company_number": "87654321"
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/search/companies"))
        .and(query_param("q", "Dee Plumbing"))
        .and(query_param("items_per_page", "5"))
        .and(basic_auth("test-key", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = CompaniesHouseService::new(mock_server.uri(), TIMEOUT).unwrap();
    let items = service.search("Dee Plumbing", "test-key").await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].date_of_creation.as_deref(), Some("2021-03-04"));
    assert_eq!(items[0].company_status.as_deref(), Some("active"));
    assert_eq!(items[1].date_of_creation, None);
}

#[tokio::test]
async fn test_companies_house_rejected_key_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/companies"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Authorization"))
        .mount(&mock_server)
        .await;

    let service = CompaniesHouseService::new(mock_server.uri(), TIMEOUT).unwrap();
    let result = service.search("Dee Plumbing", "wrong-key").await;

    assert!(matches!(result, Err(AppError::ExternalApiError(_))));
}

#[tokio::test]
async fn test_web_search_returns_result_links() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", r#"site:linkedin.com/company "Dee Plumbing""#))
        .respond_with(html(
            r#"<ol id="b_results">
                 <li><a href="https://www.linkedin.com/company/dee-plumbing/">Dee Plumbing | LinkedIn</a></li>
                 <li><a href="/images/search?q=dee">Images</a></li>
               </ol>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let service = WebSearchService::new(mock_server.uri(), TIMEOUT).unwrap();
    let links = service
        .result_links(r#"site:linkedin.com/company "Dee Plumbing""#)
        .await
        .unwrap();

    assert_eq!(links[0], "https://www.linkedin.com/company/dee-plumbing/");
    assert_eq!(links.len(), 2);
}

#[tokio::test]
async fn test_web_search_circuit_opens_after_repeated_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&mock_server)
        .await;

    let service = WebSearchService::new(mock_server.uri(), TIMEOUT).unwrap();
    for _ in 0..5 {
        let err = service.result_links("plumbers").await.unwrap_err();
        assert!(err.is_unreachable());
    }

    // Sixth call fails fast without reaching the engine
    let err = service.result_links("plumbers").await.unwrap_err();
    assert!(err.to_string().contains("circuit open"));
}

#[tokio::test]
async fn test_directory_collects_unique_place_urls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/maps/search/plumbers%20in%20Chester"))
        .respond_with(html(
            r#"<div role="feed">
                 <a href="/maps/place/Dee+Plumbing/@53.19,-2.89?authuser=0">Dee Plumbing</a>
                 <a href="/maps/place/Dee+Plumbing/@53.19,-2.89?hl=en">Dee Plumbing</a>
                 <a href="/maps/place/Hill+Roofing/@53.2,-2.9">Hill Roofing</a>
               </div>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let service = MapsDirectoryService::new(mock_server.uri(), TIMEOUT).unwrap();
    let urls = service
        .candidate_urls(&SearchQuery::new("plumbers", "Chester"), 30)
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            format!("{}/maps/place/Dee+Plumbing/@53.19,-2.89", mock_server.uri()),
            format!("{}/maps/place/Hill+Roofing/@53.2,-2.9", mock_server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_full_run_against_mocked_web() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/maps/search/plumbers%20in%20Chester"))
        .respond_with(html(
            r#"<a href="/maps/place/Dee+Plumbing/@53.19,-2.89">Dee Plumbing</a>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/maps/place/Dee+Plumbing/@53.19,-2.89"))
        .respond_with(html(format!(
            r#"<h1>Dee Plumbing</h1>
               <button data-item-id="phone:tel:020 7219 3000">Call</button>
               <a data-item-id="authority" href="{}/dee/">deeplumbing.co.uk</a>"#,
            uri
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dee/"))
        .respond_with(html(
            r#"<body><a href="mailto:info@deeplumbing.co.uk">Email us</a>
               <p>Owner: Tom Baker</p></body>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", r#"site:linkedin.com/in "Tom Baker" "Chester""#))
        .respond_with(html(
            r#"<a href="https://uk.linkedin.com/in/tom-baker-plumber?trk=x">Tom Baker</a>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/companies"))
        .and(basic_auth("test-key", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{
                "title": "DEE PLUMBING LTD",
                "date_of_creation": "2022-06-01",
                "company_number": "12345678",
                "company_status": "active"
            }]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(uri);
    let pipeline = LeadPipeline::from_config(&config).unwrap();
    let report = pipeline
        .run(
            &SearchQuery::new("plumbers", "Chester"),
            &TracingObserver,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.status, RunStatus::TargetMet);
    assert_eq!(report.leads.len(), 1);

    let lead = &report.leads[0];
    assert_eq!(lead.name(), "Dee Plumbing");
    assert_eq!(lead.phone(), Some("+442072193000"));
    assert_eq!(lead.email(), Some("info@deeplumbing.co.uk"));
    assert_eq!(lead.owner_name(), Some("Tom Baker"));
    assert_eq!(
        lead.linkedin_url(),
        Some("https://uk.linkedin.com/in/tom-baker-plumber")
    );
    assert_eq!(lead.registration_date(), Some("2022-06-01"));
    assert_eq!(lead.score(), 10);
    assert_eq!(lead.tier(), ScoreTier::Hot);
}
