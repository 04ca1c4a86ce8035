//! Transport event model.
//!
//! Inbound transport updates are decoded exactly once, at the transport
//! boundary, into a closed set of typed events. Button payloads travel as
//! compact tokens on the wire (callback data) and are parsed back into
//! [`ButtonAction`] before any handler sees them; handlers never split
//! strings.

use serde::{Deserialize, Serialize};

/// Opaque channel identity of one conversation partner.
pub type ChatId = i64;

/// One decoded inbound transport event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub chat: ChatId,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    /// Plain text message
    Text(String),
    /// Slash command with whitespace-split arguments
    Command { name: String, args: Vec<String> },
    /// Button selection, already decoded
    Button(ButtonAction),
}

/// Every button the bot ever renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    /// Appliance picked at the start of a booking
    Appliance(String),
    /// A city suggestion label was picked
    City(String),
    /// "My city is not listed" - commit the raw input
    CityNotListed,
    /// A complaint suggestion label was picked
    Complaint(String),
    /// "My complaint is not listed" - commit the raw input
    ComplaintNotListed,
    /// Admin panel: list new tickets
    AdminListTickets,
    /// Admin panel: list pending technicians
    AdminListTechs,
    /// Approve this pending technician
    ApproveTech(i64),
    /// Open the technician picker for this ticket
    AssignStart(i64),
    /// Final assignment choice
    Assign { ticket_id: i64, tech_id: i64 },
}

impl ButtonAction {
    /// Wire token for callback data. `decode` inverts this.
    pub fn encode(&self) -> String {
        match self {
            Self::Appliance(a) => format!("appl:{a}"),
            Self::City(label) => format!("city:{label}"),
            Self::CityNotListed => "city_other".to_string(),
            Self::Complaint(label) => format!("compl:{label}"),
            Self::ComplaintNotListed => "compl_other".to_string(),
            Self::AdminListTickets => "admin:tickets".to_string(),
            Self::AdminListTechs => "admin:techs".to_string(),
            Self::ApproveTech(id) => format!("approve:{id}"),
            Self::AssignStart(id) => format!("assign:{id}"),
            Self::Assign { ticket_id, tech_id } => format!("assign:{ticket_id}:{tech_id}"),
        }
    }

    /// Parse a wire token. Unknown or malformed tokens yield `None` and
    /// are dropped at the boundary.
    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "city_other" => return Some(Self::CityNotListed),
            "compl_other" => return Some(Self::ComplaintNotListed),
            "admin:tickets" => return Some(Self::AdminListTickets),
            "admin:techs" => return Some(Self::AdminListTechs),
            _ => {}
        }

        let (kind, rest) = data.split_once(':')?;
        match kind {
            "appl" => Some(Self::Appliance(rest.to_string())),
            "city" => Some(Self::City(rest.to_string())),
            "compl" => Some(Self::Complaint(rest.to_string())),
            "approve" => rest.parse().ok().map(Self::ApproveTech),
            "assign" => match rest.split_once(':') {
                Some((ticket, tech)) => Some(Self::Assign {
                    ticket_id: ticket.parse().ok()?,
                    tech_id: tech.parse().ok()?,
                }),
                None => rest.parse().ok().map(Self::AssignStart),
            },
            _ => None,
        }
    }
}

/// One button in an outgoing menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuButton {
    pub label: String,
    pub action: ButtonAction,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let actions = [
            ButtonAction::Appliance("Washing Machine".into()),
            ButtonAction::City("Visakhapatnam (Andhra Pradesh)".into()),
            ButtonAction::CityNotListed,
            ButtonAction::Complaint("No Cooling".into()),
            ButtonAction::ComplaintNotListed,
            ButtonAction::AdminListTickets,
            ButtonAction::AdminListTechs,
            ButtonAction::ApproveTech(17),
            ButtonAction::AssignStart(3),
            ButtonAction::Assign {
                ticket_id: 3,
                tech_id: 17,
            },
        ];
        for action in actions {
            let token = action.encode();
            assert_eq!(ButtonAction::decode(&token), Some(action), "{token}");
        }
    }

    #[test]
    fn malformed_tokens_are_dropped() {
        for bad in ["", "nope", "approve:", "approve:abc", "assign:x:y", "assign:"] {
            assert_eq!(ButtonAction::decode(bad), None, "{bad}");
        }
    }
}
