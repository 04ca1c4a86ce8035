//! Ticket types for the dispatch workflow.
//!
//! A ticket is one customer service request. Status moves one way:
//! new -> assigned -> closed, with assigned -> assigned allowed for
//! reassignment and nothing leaving closed. Rows are never deleted.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ticket status in the dispatch workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Created by a customer, not yet triaged
    #[default]
    New,
    /// Assigned to a technician
    Assigned,
    /// Work finished (or administratively closed)
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::Closed => "closed",
        }
    }

    /// Parse the stored column value. Unknown values fall back to `New`
    /// rather than failing a whole listing.
    pub fn parse(s: &str) -> Self {
        match s {
            "assigned" => Self::Assigned,
            "closed" => Self::Closed,
            _ => Self::New,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted service request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    /// Channel identity of the requester
    pub chat_id: i64,
    pub appliance: Option<String>,
    /// Chosen complaint label (the issue summary shown everywhere)
    pub issue_summary: Option<String>,
    /// "City, State" when both are known, otherwise the raw city text
    pub location: Option<String>,
    /// Carried in the schema; current flows never populate it
    pub preferred_time: Option<String>,
    pub raw_problem_text: Option<String>,
    pub status: TicketStatus,
    pub technician_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl Ticket {
    /// City component of the stored location: text before the first comma,
    /// or the whole string when there is no comma. Display/filtering only.
    pub fn city(&self) -> String {
        let (city, _) = split_location(self.location.as_deref().unwrap_or(""));
        city
    }

    /// State component, empty when the location has no comma.
    pub fn state(&self) -> String {
        let (_, state) = split_location(self.location.as_deref().unwrap_or(""));
        state
    }
}

/// Split a stored location string once on the first comma into
/// (city, state). A location without a comma is all city.
pub fn split_location(location: &str) -> (String, String) {
    match location.split_once(',') {
        Some((city, state)) => (city.trim().to_string(), state.trim().to_string()),
        None => (location.trim().to_string(), String::new()),
    }
}

/// Case-insensitive "city component contains needle" filter used by the
/// bulk operations and /ticketsbycity.
pub fn city_matches(location: Option<&str>, needle: &str) -> bool {
    let (city, _) = split_location(location.unwrap_or(""));
    city.to_lowercase().contains(&needle.to_lowercase())
}
