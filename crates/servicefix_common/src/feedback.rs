//! Feedback attached to a closed ticket.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    /// Must reference an existing ticket; at most one per ticket in the
    /// flows we drive.
    pub ticket_id: i64,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}
