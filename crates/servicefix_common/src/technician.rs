//! Technician types.
//!
//! Registration inserts a `pending` row; an administrator approves it.
//! `admin` is a privileged status granted out-of-band (see the
//! grant-admin maintenance binary), never through the approval flow.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TechStatus {
    #[default]
    Pending,
    Approved,
    Admin,
}

impl TechStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "admin" => Self::Admin,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for TechStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted service provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: i64,
    /// Channel identity; UNIQUE in the store
    pub chat_id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Comma-described skill set, e.g. "AC, Fridge"
    pub skills: Option<String>,
    pub status: TechStatus,
    pub created_at: NaiveDateTime,
}

impl Technician {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}
