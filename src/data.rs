//! Test data: search terms, categories, brands and expected JSON schemas.
//!
//! Fixture files live under `fixtures/` at the crate root.

use crate::error::Result;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Multi-word on purpose: single words redirect to category pages.
pub const DEFAULT_SEARCH_TERMS: [&str; 10] = [
    "maybelline foundation",
    "vitamin c serum for oily skin",
    "l'oreal hair color",
    "neutrogena sunscreen spf 50",
    "lakme eyeshadow palette",
    "nykaa matte lipstick",
    "cetaphil gentle cleanser",
    "garnier micellar water",
    "dove body wash moisturizing",
    "himalaya face wash neem",
];

pub const CATEGORIES: [&str; 5] = ["Makeup", "Skin", "Hair", "Bath & Body", "Fragrance"];

pub const BRANDS: [&str; 5] = ["Maybelline", "Lakme", "L'Oreal", "Nykaa Cosmetics", "Neutrogena"];

#[derive(Debug, Deserialize)]
struct SearchTermsFile {
    #[serde(default)]
    terms: Vec<String>,
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Terms from `fixtures/search_terms.json`, or [`DEFAULT_SEARCH_TERMS`].
pub fn load_search_terms() -> Vec<String> {
    load_search_terms_from(&fixtures_dir().join("search_terms.json"))
}

/// `{"terms": [...]}` at `path`; a missing, unreadable or empty list falls
/// back to [`DEFAULT_SEARCH_TERMS`].
pub fn load_search_terms_from(path: &Path) -> Vec<String> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_json::from_str::<SearchTermsFile>(&content).map_err(|e| e.to_string())
        });

    match parsed {
        Ok(file) if !file.terms.is_empty() => file.terms,
        Ok(_) => {
            tracing::debug!("{} lists no terms; using defaults", path.display());
            default_terms()
        }
        Err(e) => {
            tracing::debug!("Using default search terms ({}: {})", path.display(), e);
            default_terms()
        }
    }
}

fn default_terms() -> Vec<String> {
    DEFAULT_SEARCH_TERMS.iter().map(|t| t.to_string()).collect()
}

pub fn random_search_term() -> String {
    let terms = load_search_terms();
    terms
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| DEFAULT_SEARCH_TERMS[0].to_string())
}

pub fn random_category() -> &'static str {
    CATEGORIES.choose(&mut rand::thread_rng()).copied().unwrap_or(CATEGORIES[0])
}

pub fn random_brand() -> &'static str {
    BRANDS.choose(&mut rand::thread_rng()).copied().unwrap_or(BRANDS[0])
}

/// Schema `fixtures/expected_schemas/<name>.json`.
pub fn load_schema(name: &str) -> Result<Value> {
    load_schema_from(&fixtures_dir().join("expected_schemas"), name)
}

pub fn load_schema_from(dir: &Path, name: &str) -> Result<Value> {
    let path = dir.join(format!("{}.json", name));
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}
