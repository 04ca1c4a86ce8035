//! Reference lists: districts and complaint categories.
//!
//! The matcher treats these as injected lookup tables. A deployment can
//! point the daemon at a TOML file to replace the built-in tables; the
//! built-ins cover the service area the bot started out in.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matcher::{self, Candidate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    pub state: String,
    /// Informal names users actually type ("Vizag" for Visakhapatnam)
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl District {
    /// Label shown on suggestion buttons: "Name (State)"
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.state)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub appliance: String,
    pub complaint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefData {
    #[serde(default)]
    pub districts: Vec<District>,
    #[serde(default)]
    pub complaints: Vec<Complaint>,
}

impl RefData {
    /// Load reference data from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// District suggestion labels for free-text input.
    pub fn city_suggestions(&self, input: &str) -> Vec<String> {
        let labels: Vec<String> = self.districts.iter().map(|d| d.label()).collect();
        let candidates: Vec<Candidate<'_>> = self
            .districts
            .iter()
            .zip(labels.iter())
            .map(|(d, label)| {
                let mut targets = vec![label.as_str(), d.name.as_str()];
                targets.extend(d.aliases.iter().map(|a| a.as_str()));
                Candidate {
                    label: label.as_str(),
                    targets,
                }
            })
            .collect();
        matcher::suggest(input, &candidates)
    }

    /// Resolve a suggestion label back to (district, state). Labels are
    /// compared case-insensitively, the way they came off a button.
    pub fn resolve_district(&self, label: &str) -> Option<(&str, &str)> {
        self.districts
            .iter()
            .find(|d| d.label().eq_ignore_ascii_case(label))
            .map(|d| (d.name.as_str(), d.state.as_str()))
    }

    /// Complaint suggestions for the chosen appliance (filtered
    /// case-insensitively) and free-text input.
    pub fn complaint_suggestions(&self, appliance: &str, input: &str) -> Vec<String> {
        let candidates: Vec<Candidate<'_>> = self
            .complaints
            .iter()
            .filter(|c| c.appliance.eq_ignore_ascii_case(appliance))
            .map(|c| Candidate::plain(c.complaint.as_str()))
            .collect();
        matcher::suggest(input, &candidates)
    }

    /// Built-in tables for the default service area.
    pub fn builtin() -> Self {
        fn d(name: &str, state: &str, aliases: &[&str]) -> District {
            District {
                name: name.to_string(),
                state: state.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            }
        }
        fn c(appliance: &str, complaint: &str) -> Complaint {
            Complaint {
                appliance: appliance.to_string(),
                complaint: complaint.to_string(),
            }
        }

        Self {
            districts: vec![
                d("Visakhapatnam", "Andhra Pradesh", &["Vizag", "Visakha"]),
                d("Vizianagaram", "Andhra Pradesh", &[]),
                d("Srikakulam", "Andhra Pradesh", &[]),
                d("Vijayawada", "Andhra Pradesh", &["Bezawada"]),
                d("Guntur", "Andhra Pradesh", &[]),
                d("Kakinada", "Andhra Pradesh", &[]),
                d("Rajahmundry", "Andhra Pradesh", &["Rajamahendravaram"]),
                d("Nellore", "Andhra Pradesh", &[]),
                d("Tirupati", "Andhra Pradesh", &[]),
                d("Anantapur", "Andhra Pradesh", &[]),
                d("Kurnool", "Andhra Pradesh", &[]),
                d("Hyderabad", "Telangana", &[]),
                d("Warangal", "Telangana", &[]),
                d("Karimnagar", "Telangana", &[]),
            ],
            complaints: vec![
                c("AC", "No Cooling"),
                c("AC", "Water Leakage"),
                c("AC", "Gas Refill Needed"),
                c("AC", "Strange Noise"),
                c("AC", "Not Turning On"),
                c("AC", "Remote Not Working"),
                c("Fridge", "Not Cooling"),
                c("Fridge", "Excess Frost"),
                c("Fridge", "Water Leakage"),
                c("Fridge", "Compressor Noise"),
                c("Fridge", "Door Seal Damaged"),
                c("Fridge", "Light Not Working"),
                c("Washing Machine", "Not Spinning"),
                c("Washing Machine", "Water Not Draining"),
                c("Washing Machine", "Drum Noise"),
                c("Washing Machine", "Door Lock Error"),
                c("Washing Machine", "Not Turning On"),
                c("Washing Machine", "Water Inlet Blocked"),
                c("Other", "Not Turning On"),
                c("Other", "Power Fluctuation Damage"),
                c("Other", "General Service Request"),
            ],
        }
    }
}

impl Default for RefData {
    fn default() -> Self {
        Self::builtin()
    }
}
