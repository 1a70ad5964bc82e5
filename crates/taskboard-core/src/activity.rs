//! Activity feed queries: filtering, ordering, paging and export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{EntityType, Error, Event, EventKind, Result};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "oldest" => Ok(SortOrder::Asc),
            "desc" | "newest" => Ok(SortOrder::Desc),
            other => Err(Error::Validation(format!("unknown sort order: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub kinds: Vec<EventKind>,
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    /// Inclusive lower bound.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub until: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub order: SortOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ActivityQuery {
    pub fn matches(&self, event: &Event) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if self.actor_id.is_some_and(|actor| actor != event.actor_id) {
            return false;
        }
        if self.entity_type.is_some_and(|t| t != event.entity_type) {
            return false;
        }
        if self.entity_id.is_some_and(|id| id != event.entity_id) {
            return false;
        }
        if self.since.is_some_and(|since| event.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.created_at >= until) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                event.summary.to_lowercase().contains(&needle)
                    || event.kind.as_str().contains(&needle)
            }
            _ => true,
        }
    }

    /// Rejects parameters that cannot produce a page.
    pub fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(Error::Validation("limit must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<Event>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

pub fn filter(events: Vec<Event>, query: &ActivityQuery) -> Vec<Event> {
    events.into_iter().filter(|e| query.matches(e)).collect()
}

/// Orders by `created_at`, breaking ties by id so the order is stable.
pub fn sort(events: &mut [Event], order: SortOrder) {
    events.sort_by(|a, b| {
        let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

pub fn page(events: Vec<Event>, offset: usize, limit: usize) -> ActivityPage {
    let total = events.len();
    let items = events.into_iter().skip(offset).take(limit).collect();
    ActivityPage {
        items,
        total,
        offset,
        limit,
    }
}

/// Filter, sort and page in one pass.
pub fn run(events: Vec<Event>, query: &ActivityQuery) -> ActivityPage {
    let mut matching = filter(events, query);
    sort(&mut matching, query.order);
    page(matching, query.offset, query.effective_limit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::Validation(format!("unsupported export format: {}", other))),
        }
    }
}

const CSV_HEADER: &str = "id,created_at,actor_id,kind,entity_type,entity_id,summary";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn export(events: &[Event], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => {
            let mut out = String::from(CSV_HEADER);
            out.push('\n');
            for event in events {
                let row = [
                    event.id.to_string(),
                    event.created_at.to_rfc3339(),
                    event.actor_id.to_string(),
                    event.kind.to_string(),
                    event.entity_type.to_string(),
                    event.entity_id.to_string(),
                    event.summary.clone(),
                ];
                let line: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
                out.push_str(&line.join(","));
                out.push('\n');
            }
            Ok(out)
        }
        ExportFormat::Json => {
            serde_json::to_string_pretty(events).map_err(|e| Error::Other(e.into()))
        }
    }
}

pub fn export_file_name(workspace_id: Uuid, format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "activity-{}-{}.{}",
        workspace_id,
        at.format("%Y%m%d"),
        format.extension()
    )
}
