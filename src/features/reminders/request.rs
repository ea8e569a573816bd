//! "Remind me" payload attached to a candidate stop.
//!
//! Encoded as `route=<id>&stop=<name>&eta=<unix seconds>` so it fits in a
//! chat button's callback data. Values are taken verbatim up to the next `&`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::features::collection::Candidate;

/// Lead time used when the user does not choose one
pub const DEFAULT_ADVANCE_MINUTES: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Reminder payload is missing `{0}`")]
    MissingField(&'static str),

    #[error("Reminder payload has an invalid eta: {0}")]
    InvalidEta(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub route_id: String,
    pub stop_name: String,
    pub eta: DateTime<Utc>,
    pub advance_minutes: i64,
}

impl ReminderRequest {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            route_id: candidate.route_id.clone(),
            stop_name: candidate.stop_name.clone(),
            eta: candidate.eta,
            advance_minutes: DEFAULT_ADVANCE_MINUTES,
        }
    }

    pub fn to_payload(&self) -> String {
        format!(
            "route={}&stop={}&eta={}",
            self.route_id,
            self.stop_name,
            self.eta.timestamp()
        )
    }

    pub fn parse(payload: &str) -> Result<Self, RequestError> {
        let params: HashMap<&str, &str> = payload
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();

        let route_id = params
            .get("route")
            .filter(|v| !v.is_empty())
            .ok_or(RequestError::MissingField("route"))?;
        let stop_name = params.get("stop").copied().unwrap_or_default();
        let eta_text = params.get("eta").ok_or(RequestError::MissingField("eta"))?;
        let eta = eta_text
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| RequestError::InvalidEta(eta_text.to_string()))?;

        Ok(Self {
            route_id: route_id.to_string(),
            stop_name: stop_name.to_string(),
            eta,
            advance_minutes: DEFAULT_ADVANCE_MINUTES,
        })
    }
}
