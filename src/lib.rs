//! LeadSeeds Lead Discovery Library
//!
//! This library finds independent local businesses in a map-style directory, enriches
//! each one with contact and ownership signals (email, owner name, LinkedIn profile,
//! company registration), scores them and keeps a bounded, tiered set of leads.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `accessors`: Traits for the directory, page fetcher, search engine and registry.
//! - `brand_filter`: Excludes national chains and corporate groups.
//! - `circuit_breaker`: Circuit breaker for the search engine.
//! - `config`: Configuration management.
//! - `enrichment`: Field extractors (email, owner, profile, registry).
//! - `errors`: Error handling types.
//! - `export`: CSV writer and run summary.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `notifier`: Signup notification relay.
//! - `page_cache`: Per-run page cache.
//! - `pipeline`: Orchestrator and tiered quota admission.
//! - `query_parser`: Free-text search parser.
//! - `scoring`: Lead scoring rubric.
//! - `services`: HTTP clients (directory, website, search engine, Companies House).

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod accessors;
pub mod brand_filter;
pub mod circuit_breaker;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod page_cache;
pub mod pipeline;
pub mod query_parser;
pub mod scoring;
pub mod services;
