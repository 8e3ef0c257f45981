//! In-memory decision history.
//!
//! Keeps the most recent decisions per composition, capped at a configurable
//! maximum (default 500) with FIFO eviction. The eligibility service never
//! writes here; the HTTP layer records each decision it returns.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::Decision;

/// Summary of one decision, as kept in history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub composition_id: String,
    pub customer_id: String,
    pub eligible: bool,
    pub final_score: f64,
    pub execution_ms: f64,
}

impl From<&Decision> for DecisionRecord {
    fn from(decision: &Decision) -> Self {
        Self {
            decision_id: decision.metadata.decision_id,
            timestamp: decision.metadata.timestamp,
            composition_id: decision.metadata.composition_id.clone(),
            customer_id: decision.metadata.customer_id.clone(),
            eligible: decision.eligible,
            final_score: decision.reasoning.final_score,
            execution_ms: decision.reasoning.execution_time,
        }
    }
}

/// Query parameters for filtering history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub composition_id: Option<String>,
    pub eligible: Option<bool>,
    /// Only return records at or after this RFC 3339 timestamp.
    pub since: Option<String>,
    /// Maximum number of records to return (default 100).
    pub limit: Option<u32>,
}

impl HistoryQuery {
    /// `since` as a timestamp. A value that is not RFC 3339 is an error,
    /// never an absent filter.
    pub fn since_time(&self) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
        self.since.as_deref().map(str::parse::<DateTime<Utc>>).transpose()
    }
}

pub struct DecisionHistory {
    entries: RwLock<HashMap<String, VecDeque<DecisionRecord>>>,
    max_entries_per_composition: usize,
}

impl DecisionHistory {
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_composition: max,
        }
    }

    pub fn record(&self, decision: &Decision) {
        let record = DecisionRecord::from(decision);
        let mut guard = self.entries.write().expect("history lock poisoned");
        let deque = guard.entry(record.composition_id.clone()).or_default();
        deque.push_back(record);
        while deque.len() > self.max_entries_per_composition {
            deque.pop_front();
        }
    }

    /// Matching records, newest first.
    pub fn query(&self, params: &HistoryQuery) -> Result<Vec<DecisionRecord>, chrono::ParseError> {
        let since = params.since_time()?;
        let limit = params.limit.unwrap_or(100) as usize;

        let guard = self.entries.read().expect("history lock poisoned");
        let mut matched: Vec<DecisionRecord> = guard
            .iter()
            .filter(|(id, _)| params.composition_id.as_ref().map_or(true, |want| *id == want))
            .flat_map(|(_, deque)| deque.iter())
            .filter(|r| params.eligible.map_or(true, |e| r.eligible == e))
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .cloned()
            .collect();
        drop(guard);

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(limit);
        Ok(matched)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("history lock poisoned")
            .values()
            .map(VecDeque::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records for one composition.
    pub fn clear(&self, composition_id: &str) {
        self.entries.write().expect("history lock poisoned").remove(composition_id);
    }
}

impl Default for DecisionHistory {
    fn default() -> Self {
        Self::new()
    }
}
