//! Administrator listings, search, reports, and exports.
//!
//! Everything here is read-only over the store; the engine gates all of
//! it on the administrator identity before calling in.

use std::collections::HashMap;

use servicefix_common::ticket::{city_matches, split_location};
use servicefix_common::{store, ServiceFixError, TechStatus, Ticket, TicketStatus};

use crate::engine::HandlerCtx;
use crate::export;
use crate::format;

async fn tech_name(ctx: &HandlerCtx<'_>, tech_id: Option<i64>) -> Result<Option<String>, ServiceFixError> {
    match tech_id {
        Some(id) => Ok(store::technician_by_id(ctx.db, id)
            .await?
            .map(|t| t.display_name().to_string())),
        None => Ok(None),
    }
}

async fn send_assigned_blocks(
    ctx: &HandlerCtx<'_>,
    tickets: &[Ticket],
) -> Result<(), ServiceFixError> {
    for ticket in tickets {
        let name = tech_name(ctx, ticket.technician_id).await?;
        ctx.reply(&format::ticket_block_assigned(ticket, name.as_deref()))
            .await?;
    }
    Ok(())
}

pub async fn list_all(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_all(ctx.db).await?;
    if tickets.is_empty() {
        return ctx.reply("No tickets found.").await;
    }
    send_assigned_blocks(ctx, &tickets).await
}

pub async fn list_new(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_with_status(ctx.db, TicketStatus::New, false).await?;
    if tickets.is_empty() {
        return ctx.reply("No new/unassigned tickets found.").await;
    }
    for ticket in &tickets {
        ctx.reply(&format::ticket_block(ticket)).await?;
    }
    Ok(())
}

pub async fn list_assigned(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_with_status(ctx.db, TicketStatus::Assigned, false).await?;
    if tickets.is_empty() {
        return ctx.reply("No assigned tickets found.").await;
    }
    send_assigned_blocks(ctx, &tickets).await
}

pub async fn list_techs(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let techs = store::technicians_all(ctx.db).await?;
    if techs.is_empty() {
        return ctx.reply("No technicians found.").await;
    }
    for tech in &techs {
        ctx.reply(&format::tech_block(tech)).await?;
    }
    Ok(())
}

/// /searchtickets <keyword> - substring search over the text fields.
pub async fn search_tickets(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    if args.is_empty() {
        return ctx.reply("Usage: /searchtickets <keyword>").await;
    }
    let keyword = args.join(" ").to_lowercase();

    let tickets = store::tickets_all(ctx.db).await?;
    let found: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| {
            [
                t.appliance.as_deref(),
                t.issue_summary.as_deref(),
                t.location.as_deref(),
                t.raw_problem_text.as_deref(),
            ]
            .iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(&keyword))
        })
        .collect();

    if found.is_empty() {
        return ctx.reply("No tickets found matching that keyword.").await;
    }
    send_assigned_blocks(ctx, &found).await
}

pub async fn tickets_by_city(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    if args.is_empty() {
        return ctx.reply("Usage: /ticketsbycity <city>").await;
    }
    let city = args.join(" ").trim().to_lowercase();

    let tickets = store::tickets_all(ctx.db).await?;
    let found: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| city_matches(t.location.as_deref(), &city))
        .collect();

    if found.is_empty() {
        return ctx.reply(&format!("No tickets found for city: {city}")).await;
    }
    send_assigned_blocks(ctx, &found).await
}

pub async fn tickets_by_state(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    if args.is_empty() {
        return ctx.reply("Usage: /ticketsbystate <state>").await;
    }
    let state = args.join(" ").trim().to_lowercase();

    let tickets = store::tickets_all(ctx.db).await?;
    let found: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| {
            // only locations with a comma carry a state component
            let location = t.location.as_deref().unwrap_or("");
            if !location.contains(',') {
                return false;
            }
            let (_, state_part) = split_location(location);
            !state.is_empty() && state_part.to_lowercase().contains(&state)
        })
        .collect();

    if found.is_empty() {
        return ctx
            .reply(&format!("No tickets found for state: {state}"))
            .await;
    }
    send_assigned_blocks(ctx, &found).await
}

pub async fn tickets_by_date(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    let Some(date) = args.first() else {
        return ctx.reply("Usage: /ticketsbydate <YYYY-MM-DD>").await;
    };

    let tickets = store::tickets_on_date(ctx.db, date).await?;
    if tickets.is_empty() {
        return ctx.reply(&format!("No tickets found for date: {date}")).await;
    }
    send_assigned_blocks(ctx, &tickets).await
}

pub async fn ticket_details(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    let Some(arg) = args.first() else {
        return ctx.reply("Usage: /ticketdetails <ticket_id>").await;
    };
    let Ok(ticket_id) = arg.parse::<i64>() else {
        return ctx.reply("Invalid ticket ID.").await;
    };

    let Some(ticket) = store::ticket_by_id(ctx.db, ticket_id).await? else {
        return ctx.reply("Ticket not found.").await;
    };
    let tech = match ticket.technician_id {
        Some(id) => store::technician_by_id(ctx.db, id).await?,
        None => None,
    };

    ctx.reply(&format::ticket_details(&ticket, tech.as_ref()))
        .await
}

/// /userhistory <chat_id> - every ticket for one requester, with feedback.
pub async fn user_history(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    let Some(arg) = args.first() else {
        return ctx.reply("Usage: /userhistory <user_id>").await;
    };
    let Ok(user_id) = arg.parse::<i64>() else {
        return ctx.reply("Invalid user ID.").await;
    };

    let tickets = store::tickets_for_chat(ctx.db, user_id).await?;
    if tickets.is_empty() {
        return ctx.reply("No tickets found for this user.").await;
    }

    for ticket in &tickets {
        let name = tech_name(ctx, ticket.technician_id).await?;
        let mut text = format::ticket_block_assigned(ticket, name.as_deref());
        if let Some(fb) = store::feedback_for_ticket(ctx.db, ticket.id).await? {
            let rating = fb
                .rating
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            text.push_str(&format!(
                "\nFeedback: {rating} / 5\nComment: {}",
                fb.comment.as_deref().unwrap_or("-")
            ));
        }
        ctx.reply(&text).await?;
    }
    Ok(())
}

pub async fn feedback_all(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let feedbacks = store::feedback_all(ctx.db).await?;
    if feedbacks.is_empty() {
        return ctx.reply("No feedback found.").await;
    }
    for fb in &feedbacks {
        let ticket = store::ticket_by_id(ctx.db, fb.ticket_id).await?;
        let (user, summary) = match &ticket {
            Some(t) => (Some(t.chat_id), t.issue_summary.clone()),
            None => (None, None),
        };
        ctx.reply(&format::feedback_block(fb, user, summary.as_deref()))
            .await?;
    }
    Ok(())
}

pub async fn feedback_by_ticket(
    ctx: &HandlerCtx<'_>,
    args: &[String],
) -> Result<(), ServiceFixError> {
    let Some(arg) = args.first() else {
        return ctx.reply("Usage: /feedbackbyticket <ticket_id>").await;
    };
    let Ok(ticket_id) = arg.parse::<i64>() else {
        return ctx.reply("Invalid ticket ID.").await;
    };

    let Some(fb) = store::feedback_for_ticket(ctx.db, ticket_id).await? else {
        return ctx.reply("No feedback found for this ticket.").await;
    };
    let ticket = store::ticket_by_id(ctx.db, ticket_id).await?;
    let (user, summary) = match &ticket {
        Some(t) => (Some(t.chat_id), t.issue_summary.clone()),
        None => (None, None),
    };
    ctx.reply(&format::feedback_block(&fb, user, summary.as_deref()))
        .await
}

/// /stats - totals plus top cities/states.
pub async fn stats(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_all(ctx.db).await?;
    let techs = store::technicians_all(ctx.db).await?;

    let total = tickets.len();
    let closed = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Closed)
        .count();
    let open = total - closed;
    let assigned = tickets.iter().filter(|t| t.technician_id.is_some()).count();
    let pending = techs
        .iter()
        .filter(|t| t.status == TechStatus::Pending)
        .count();
    let approved = techs
        .iter()
        .filter(|t| t.status == TechStatus::Approved)
        .count();

    let mut text = format!(
        "ServiceFix Stats\n\
         Total Tickets: {total}\n\
         Open Tickets: {open}\n\
         Closed Tickets: {closed}\n\
         Assigned Tickets: {assigned}\n\
         Approved Technicians: {approved}\n\
         Pending Technicians: {pending}\n"
    );

    let mut cities: HashMap<String, usize> = HashMap::new();
    let mut states: HashMap<String, usize> = HashMap::new();
    for ticket in &tickets {
        let Some(location) = ticket.location.as_deref().filter(|l| !l.is_empty()) else {
            continue;
        };
        let (city, state) = split_location(location);
        *cities.entry(city).or_default() += 1;
        if !state.is_empty() {
            *states.entry(state).or_default() += 1;
        }
    }

    if !cities.is_empty() {
        text.push_str("\nTop Cities:\n");
        text.push_str(&top_lines(cities));
    }
    if !states.is_empty() {
        text.push_str("\nTop States:\n");
        text.push_str(&top_lines(states));
    }

    ctx.reply(&text).await
}

fn top_lines(counts: HashMap<String, usize>) -> String {
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
        .iter()
        .take(3)
        .map(|(name, n)| format!("{name}: {n}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// /toptechs - top five technicians by closed tickets.
pub async fn top_techs(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let closed = store::tickets_with_status(ctx.db, TicketStatus::Closed, true).await?;

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for ticket in &closed {
        if let Some(tech_id) = ticket.technician_id {
            *counts.entry(tech_id).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return ctx
            .reply("No closed tickets or assigned technicians found.")
            .await;
    }

    let mut sorted: Vec<(i64, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut text = "Top Technicians (by closed tickets):\n".to_string();
    for (tech_id, count) in sorted.iter().take(5) {
        let name = tech_name(ctx, Some(*tech_id))
            .await?
            .unwrap_or_else(|| format!("ID {tech_id}"));
        text.push_str(&format!("{name}: {count} closed tickets\n"));
    }
    ctx.reply(&text).await
}

/// /pendingapproval - digest of pending technicians and new tickets.
pub async fn pending_approval(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let techs = store::technicians_with_status(ctx.db, TechStatus::Pending, true).await?;
    let tickets = store::tickets_with_status(ctx.db, TicketStatus::New, true).await?;

    let mut text = "Pending Approvals\n".to_string();
    if techs.is_empty() {
        text.push_str("\nNo pending technicians.\n");
    } else {
        text.push_str("\nPending Technicians:\n");
        for t in &techs {
            text.push_str(&format!(
                "ID: {} | Name: {} | Phone: {}\n",
                t.id,
                t.display_name(),
                t.phone.as_deref().unwrap_or("-")
            ));
        }
    }
    if tickets.is_empty() {
        text.push_str("\nNo new tickets.");
    } else {
        text.push_str("\nNew Tickets:\n");
        for t in &tickets {
            text.push_str(&format!(
                "Ticket #{} | {} | {} | {}\n",
                t.id,
                t.appliance.as_deref().unwrap_or("-"),
                t.issue_summary.as_deref().unwrap_or("-"),
                t.location.as_deref().unwrap_or("-")
            ));
        }
    }
    ctx.reply(&text).await
}

pub async fn export_tickets(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_all(ctx.db).await?;
    if tickets.is_empty() {
        return ctx.reply("No tickets found.").await;
    }
    let bytes = export::tickets_csv(&tickets)?;
    ctx.reply("Tickets exported to tickets_export.csv.").await?;
    ctx.transport
        .send_document(ctx.chat, "tickets_export.csv", bytes, "Tickets export")
        .await
}

pub async fn export_techs(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let techs = store::technicians_all(ctx.db).await?;
    if techs.is_empty() {
        return ctx.reply("No technicians found.").await;
    }
    let bytes = export::technicians_csv(&techs)?;
    ctx.reply("Technicians exported to technicians_export.csv.")
        .await?;
    ctx.transport
        .send_document(
            ctx.chat,
            "technicians_export.csv",
            bytes,
            "Technicians export",
        )
        .await
}
