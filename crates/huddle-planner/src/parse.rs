// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fallible parsing of model responses into typed step payloads.
//!
//! Models are asked for JSON but do not always comply. Every parser here
//! returns `Result<T, ParseError>`; callers pick the documented fallback on
//! failure instead of letting a malformed response escape the step.

use serde::Deserialize;
use thiserror::Error;

use crate::state::{Preferences, VenueOption};

/// A model response that could not be interpreted as the expected payload.
#[derive(Debug, Error)]
#[error("unparseable model response: {reason}")]
pub struct ParseError {
    pub reason: String,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError {
            reason: e.to_string(),
        }
    }
}

/// Goal classification produced by the INIT step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Classification {
    pub event_type: String,
    pub needs_venue: bool,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
}

impl Default for Classification {
    /// Documented fallback: an unclassifiable goal is a generic gathering
    /// that needs a venue.
    fn default() -> Self {
        Self {
            event_type: "gathering".to_string(),
            needs_venue: true,
            event_date: None,
            event_time: None,
        }
    }
}

/// Strip Markdown code fences some models wrap JSON in.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parse the INIT classification payload.
pub fn parse_classification(text: &str) -> Result<Classification, ParseError> {
    Ok(serde_json::from_str(strip_fences(text))?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityPayload {
    summary: String,
}

/// Parse the AVAILABILITY summary payload.
pub fn parse_availability(text: &str) -> Result<String, ParseError> {
    let payload: AvailabilityPayload = serde_json::from_str(strip_fences(text))?;
    Ok(payload.summary)
}

/// Parse the PREFERENCES payload.
pub fn parse_preferences(text: &str) -> Result<Preferences, ParseError> {
    Ok(serde_json::from_str(strip_fences(text))?)
}

/// Parse the VENUES payload: a JSON array of candidates, returned ranked by
/// match score descending (ties broken by name) and capped at `limit`.
pub fn parse_venues(text: &str, limit: usize) -> Result<Vec<VenueOption>, ParseError> {
    let mut venues: Vec<VenueOption> = serde_json::from_str(strip_fences(text))?;
    venues.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    venues.truncate(limit);
    Ok(venues)
}
