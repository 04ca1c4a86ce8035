//! Plain-text rendering of tickets, technicians, and feedback.
//!
//! Display glue only; nothing here touches stored data. Locations are
//! split city/state for display at this layer.

use servicefix_common::ticket::split_location;
use servicefix_common::{Feedback, Technician, Ticket};

fn fmt_time(ts: &chrono::NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn location_parts(ticket: &Ticket) -> (String, String) {
    let loc = match ticket.location.as_deref() {
        Some(l) if !l.is_empty() => l,
        _ => "Not Specified",
    };
    split_location(loc)
}

fn header(ticket: &Ticket) -> String {
    let (city, state) = location_parts(ticket);
    format!(
        "Ticket #{}\nAppliance: {}\nComplaint: {}\nCity: {}\nState: {}",
        ticket.id,
        ticket.appliance.as_deref().unwrap_or("-"),
        ticket.issue_summary.as_deref().unwrap_or("-"),
        city,
        state,
    )
}

fn footer(ticket: &Ticket) -> String {
    format!(
        "Description: {}\nCreated At: {}",
        ticket.raw_problem_text.as_deref().unwrap_or("-"),
        fmt_time(&ticket.created_at),
    )
}

/// Listing entry with status but no assignment line (/listnew, /ticketsbydate).
pub fn ticket_block(ticket: &Ticket) -> String {
    format!("{}\nStatus: {}\n{}", header(ticket), ticket.status, footer(ticket))
}

/// Listing entry with status and assignment line (/listall, /listassigned,
/// search and filter results).
pub fn ticket_block_assigned(ticket: &Ticket, tech_name: Option<&str>) -> String {
    let assigned = match tech_name {
        Some(name) => format!("Assigned to: {name}"),
        None => "Not assigned".to_string(),
    };
    format!(
        "{}\nStatus: {}\n{}\n{}",
        header(ticket),
        ticket.status,
        assigned,
        footer(ticket),
    )
}

/// Admin-panel card for a new ticket (no status line; an assign button
/// rides along).
pub fn ticket_card(ticket: &Ticket) -> String {
    format!("{}\n{}", header(ticket), footer(ticket))
}

/// Detail view with the assigned technician's contact.
pub fn ticket_details(ticket: &Ticket, tech: Option<&Technician>) -> String {
    let mut text = format!(
        "{}\nStatus: {}\n{}",
        header(ticket),
        ticket.status,
        footer(ticket)
    );
    if let Some(tech) = tech {
        text.push_str(&format!(
            "\nAssigned Technician: {} ({})",
            tech.display_name(),
            tech.phone.as_deref().unwrap_or("-")
        ));
    }
    text
}

/// Technician-facing job entry for /myjobs. An empty location shows the
/// historical "Vizag" fallback; the admin listings say "Not Specified"
/// instead, and the two are deliberately not unified.
pub fn job_block(ticket: &Ticket) -> String {
    let location = match ticket.location.as_deref() {
        Some(l) if !l.is_empty() => l,
        _ => "Vizag",
    };
    format!(
        "Ticket #{} - {}\nAppliance: {}\nIssue: {}\nCustomer Time: {}",
        ticket.id,
        location,
        ticket.appliance.as_deref().unwrap_or("-"),
        ticket.issue_summary.as_deref().unwrap_or("-"),
        ticket.preferred_time.as_deref().unwrap_or("Not specified"),
    )
}

pub fn tech_block(tech: &Technician) -> String {
    format!(
        "Technician ID: {}\nName: {}\nPhone: {}\nSkills: {}\nStatus: {}\nCreated At: {}",
        tech.id,
        tech.display_name(),
        tech.phone.as_deref().unwrap_or("-"),
        tech.skills.as_deref().unwrap_or("-"),
        tech.status,
        fmt_time(&tech.created_at),
    )
}

/// Feedback entry with the owning ticket's requester and summary.
pub fn feedback_block(fb: &Feedback, user_id: Option<i64>, summary: Option<&str>) -> String {
    let rating = fb
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user = user_id
        .map(|u| u.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Ticket #{}\nUser ID: {}\nComplaint: {}\nRating: {} / 5\nComment: {}\nCreated At: {}",
        fb.ticket_id,
        user,
        summary.unwrap_or("-"),
        rating,
        fb.comment.as_deref().unwrap_or("-"),
        fmt_time(&fb.created_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use servicefix_common::TicketStatus;

    fn ticket(location: Option<&str>) -> Ticket {
        Ticket {
            id: 3,
            chat_id: 42,
            appliance: Some("AC".into()),
            issue_summary: Some("No Cooling".into()),
            location: location.map(String::from),
            preferred_time: None,
            raw_problem_text: Some("warm air".into()),
            status: TicketStatus::New,
            technician_id: None,
            created_at: chrono::NaiveDateTime::parse_from_str(
                "2026-08-01 10:00:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap(),
        }
    }

    #[test]
    fn admin_listing_says_not_specified() {
        let block = ticket_block(&ticket(None));
        assert!(block.contains("City: Not Specified"));
        assert!(block.contains("State: \nStatus:"));
    }

    #[test]
    fn job_listing_falls_back_to_vizag() {
        let block = job_block(&ticket(None));
        assert!(block.contains("Ticket #3 - Vizag"));

        let block = job_block(&ticket(Some("Guntur, Andhra Pradesh")));
        assert!(block.contains("Ticket #3 - Guntur, Andhra Pradesh"));
    }

    #[test]
    fn city_and_state_come_from_the_first_comma() {
        let block = ticket_block(&ticket(Some("Visakhapatnam, Andhra Pradesh")));
        assert!(block.contains("City: Visakhapatnam"));
        assert!(block.contains("State: Andhra Pradesh"));
    }
}
