//! Excludes national chains, franchises and large corporate structures.
//!
//! Matching is a lower-cased substring test. Some keywords carry a deliberate
//! leading or trailing space (`"iss "`, `" plc"`) so they only hit as whole words.

/// National trade chains, franchises and lead marketplaces.
const TRADE_CHAINS: &[&str] = &[
    "british gas",
    "homeserve",
    "dyno",
    "pimlico",
    "checkatrade",
    "rated people",
    "bark.com",
    "trustatrader",
    "myjobquote",
    "travis perkins",
    "jewson",
    "wickes",
    "b&q",
    "screwfix",
    "toolstation",
    "corgi",
    "gas safe",
    "national grid",
];

/// Property and facilities majors.
const PROPERTY_MAJORS: &[&str] = &[
    "savills",
    "knight frank",
    "jll",
    "cbre",
    "cushman",
    "colliers",
    "countrywide",
    "purplebricks",
    "rightmove",
    "zoopla",
];

/// Cleaning and facilities-management majors.
const CLEANING_FM_MAJORS: &[&str] = &[
    "iss ",
    "sodexo",
    "mitie",
    "ocs group",
    "initial ",
    "rentokil",
    "servest",
];

/// National construction majors.
const CONSTRUCTION_MAJORS: &[&str] = &[
    "barratt",
    "persimmon",
    "bellway",
    "taylor wimpey",
    "redrow",
    "bovis",
    "kier ",
    "amey ",
    "carillion",
    "galliford",
];

/// National retail and food majors.
const RETAIL_FOOD_MAJORS: &[&str] = &[
    "tesco",
    "asda",
    "sainsbury",
    "morrison",
    "lidl",
    "aldi",
    "costa ",
    "mcdonald",
    "subway",
    "greggs",
    "domino",
    "pizza hut",
    "kfc",
    "specsaver",
    "vision express",
];

/// Suffixes that indicate a large corporate structure.
const CORPORATE_SUFFIXES: &[&str] = &[" plc", " holdings", " group ltd", " group plc"];

const SECTORS: &[&[&str]] = &[
    TRADE_CHAINS,
    PROPERTY_MAJORS,
    CLEANING_FM_MAJORS,
    CONSTRUCTION_MAJORS,
    RETAIL_FOOD_MAJORS,
    CORPORATE_SUFFIXES,
];

/// Returns the first keyword the name matches, if any.
pub fn matched_brand_keyword(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    SECTORS
        .iter()
        .flat_map(|sector| sector.iter())
        .find(|keyword| lower.contains(*keyword))
        .copied()
}

/// True when the business name belongs to an excluded chain or corporate group.
pub fn is_big_brand(name: &str) -> bool {
    matched_brand_keyword(name).is_some()
}

/// Every keyword across all sectors.
pub fn brand_keywords() -> impl Iterator<Item = &'static str> {
    SECTORS.iter().flat_map(|sector| sector.iter().copied())
}
