//! Dispatch policy: approval, assignment, reassignment, closing, and the
//! bulk city-scoped operations, plus the technician job listing.
//!
//! The engine has already gated these on the administrator identity
//! (except /myjobs, which gates itself on approved-technician status).

use tracing::info;

use servicefix_common::ticket::city_matches;
use servicefix_common::{store, ButtonAction, MenuButton, ServiceFixError, TechStatus, TicketStatus};

use crate::engine::HandlerCtx;
use crate::format;

/// /myjobs - approved technicians list their open assignments.
pub async fn my_jobs(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tech = store::technician_by_chat(ctx.db, ctx.chat).await?;
    let tech = match tech {
        Some(t) if t.status == TechStatus::Approved => t,
        _ => {
            return ctx
                .reply("This command is only for approved technicians.")
                .await;
        }
    };

    let jobs = store::tickets_assigned_to(ctx.db, tech.id).await?;
    if jobs.is_empty() {
        return ctx.reply("You have no new jobs assigned.").await;
    }

    ctx.reply("Here are your assigned jobs:").await?;
    for job in &jobs {
        ctx.reply(&format::job_block(job)).await?;
    }
    Ok(())
}

/// /admin - the two-button triage panel.
pub async fn admin_panel(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let rows = vec![
        vec![MenuButton::new(
            "List New Tickets",
            ButtonAction::AdminListTickets,
        )],
        vec![MenuButton::new(
            "Approve Technicians",
            ButtonAction::AdminListTechs,
        )],
    ];
    ctx.transport.send_menu(ctx.chat, "Admin Panel:", rows).await
}

/// Admin panel button presses.
pub async fn admin_button(
    ctx: &HandlerCtx<'_>,
    action: ButtonAction,
) -> Result<(), ServiceFixError> {
    match action {
        ButtonAction::AdminListTickets => list_new_tickets(ctx).await,
        ButtonAction::AdminListTechs => list_pending_techs(ctx).await,
        ButtonAction::ApproveTech(tech_id) => approve(ctx, tech_id).await,
        ButtonAction::AssignStart(ticket_id) => choose_technician(ctx, ticket_id).await,
        ButtonAction::Assign { ticket_id, tech_id } => finalize_assign(ctx, ticket_id, tech_id).await,
        // conversation buttons never reach this module
        _ => Ok(()),
    }
}

async fn list_new_tickets(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let tickets = store::tickets_with_status(ctx.db, TicketStatus::New, true).await?;
    if tickets.is_empty() {
        return ctx.reply("No new tickets.").await;
    }
    ctx.reply("New Tickets:").await?;
    for ticket in &tickets {
        let rows = vec![vec![MenuButton::new(
            "Assign Technician",
            ButtonAction::AssignStart(ticket.id),
        )]];
        ctx.transport
            .send_menu(ctx.chat, &format::ticket_card(ticket), rows)
            .await?;
    }
    Ok(())
}

async fn list_pending_techs(ctx: &HandlerCtx<'_>) -> Result<(), ServiceFixError> {
    let techs = store::technicians_with_status(ctx.db, TechStatus::Pending, true).await?;
    if techs.is_empty() {
        return ctx.reply("No pending technicians for approval.").await;
    }
    ctx.reply("Pending Technicians:").await?;
    for tech in &techs {
        let text = format!(
            "Name: {}\nPhone: {}\nSkills: {}",
            tech.display_name(),
            tech.phone.as_deref().unwrap_or("-"),
            tech.skills.as_deref().unwrap_or("-"),
        );
        let rows = vec![vec![MenuButton::new(
            "Approve",
            ButtonAction::ApproveTech(tech.id),
        )]];
        ctx.transport.send_menu(ctx.chat, &text, rows).await?;
    }
    Ok(())
}

/// Approval: pending -> approved, with a notification to the technician.
async fn approve(ctx: &HandlerCtx<'_>, tech_id: i64) -> Result<(), ServiceFixError> {
    let Some(tech) = store::technician_by_id(ctx.db, tech_id).await? else {
        return ctx.reply("Technician not found.").await;
    };

    store::approve_technician(ctx.db, tech_id).await?;
    info!("technician #{tech_id} approved");

    ctx.notify(
        tech.chat_id,
        "Congratulations! Your registration has been approved. You can now use /myjobs.",
    )
    .await?;
    ctx.reply(&format!("Technician {} approved.", tech.display_name()))
        .await
}

/// Assignment step 1: show every approved technician, registration order.
async fn choose_technician(ctx: &HandlerCtx<'_>, ticket_id: i64) -> Result<(), ServiceFixError> {
    let techs = store::technicians_with_status(ctx.db, TechStatus::Approved, true).await?;
    if techs.is_empty() {
        return ctx
            .reply("No approved technicians available right now.")
            .await;
    }

    let rows: Vec<Vec<MenuButton>> = techs
        .iter()
        .map(|tech| {
            vec![MenuButton::new(
                tech.display_name(),
                ButtonAction::Assign {
                    ticket_id,
                    tech_id: tech.id,
                },
            )]
        })
        .collect();
    ctx.transport
        .send_menu(ctx.chat, "Choose a technician to assign:", rows)
        .await
}

/// Assignment step 2: set the reference, force `assigned`, notify.
async fn finalize_assign(
    ctx: &HandlerCtx<'_>,
    ticket_id: i64,
    tech_id: i64,
) -> Result<(), ServiceFixError> {
    let affected = store::assign_ticket(ctx.db, ticket_id, tech_id).await?;
    if affected == 0 {
        return ctx.reply("Ticket not found.").await;
    }
    info!("ticket #{ticket_id} assigned to technician #{tech_id}");

    let tech = store::technician_by_id(ctx.db, tech_id).await?;
    let ticket = store::ticket_by_id(ctx.db, ticket_id).await?;

    if let (Some(tech), Some(ticket)) = (tech, ticket) {
        let location = match ticket.location.as_deref() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => "Vizag".to_string(),
        };
        ctx.notify(
            tech.chat_id,
            &format!(
                "You have been assigned Ticket #{ticket_id}.\n\
                 Appliance: {}\nIssue: {}\n\
                 Location: {location}\nPreferred Time: {}\n\
                 Please contact the customer from the app as soon as possible.",
                ticket.appliance.as_deref().unwrap_or("-"),
                ticket.issue_summary.as_deref().unwrap_or("-"),
                ticket.preferred_time.as_deref().unwrap_or("Not specified"),
            ),
        )
        .await?;
    }

    ctx.reply("Ticket assigned successfully!").await
}

/// /closeticket <ticket_id> - unconditional, idempotent close.
pub async fn close_ticket(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    let Some(arg) = args.first() else {
        return ctx.reply("Usage: /closeticket <ticket_id>").await;
    };
    let Ok(ticket_id) = arg.parse::<i64>() else {
        return ctx.reply("Invalid ticket ID.").await;
    };

    if store::ticket_by_id(ctx.db, ticket_id).await?.is_none() {
        return ctx.reply("Ticket not found.").await;
    }

    store::close_ticket(ctx.db, ticket_id).await?;
    info!("ticket #{ticket_id} closed");
    ctx.reply(&format!("Ticket #{ticket_id} marked as closed."))
        .await
}

/// /reassign <ticket_id> <tech_id> - explicit override; forces `assigned`
/// whatever the prior status, and does not require an approved target.
pub async fn reassign(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    if args.len() < 2 {
        return ctx.reply("Usage: /reassign <ticket_id> <tech_id>").await;
    }
    let (Ok(ticket_id), Ok(tech_id)) = (args[0].parse::<i64>(), args[1].parse::<i64>()) else {
        return ctx.reply("Invalid ticket or technician ID.").await;
    };

    if store::ticket_by_id(ctx.db, ticket_id).await?.is_none() {
        return ctx.reply("Ticket not found.").await;
    }
    let Some(tech) = store::technician_by_id(ctx.db, tech_id).await? else {
        return ctx.reply("Technician not found.").await;
    };

    store::assign_ticket(ctx.db, ticket_id, tech_id).await?;
    info!("ticket #{ticket_id} reassigned to technician #{tech_id}");
    ctx.reply(&format!(
        "Ticket #{ticket_id} reassigned to technician {} (ID: {tech_id}).",
        tech.display_name()
    ))
    .await
}

/// /bulkassign <city> <tech_id> - assign every `new` ticket whose city
/// component contains the substring.
pub async fn bulk_assign(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    if args.len() < 2 {
        return ctx.reply("Usage: /bulkassign <city> <tech_id>").await;
    }
    let city = args[0].trim().to_lowercase();
    let Ok(tech_id) = args[1].parse::<i64>() else {
        return ctx.reply("Invalid technician ID.").await;
    };
    let Some(tech) = store::technician_by_id(ctx.db, tech_id).await? else {
        return ctx.reply("Technician not found.").await;
    };

    let tickets = store::tickets_with_status(ctx.db, TicketStatus::New, true).await?;
    let mut count = 0usize;
    for ticket in &tickets {
        if city_matches(ticket.location.as_deref(), &city) {
            store::assign_ticket(ctx.db, ticket.id, tech_id).await?;
            count += 1;
        }
    }

    info!("bulk-assigned {count} tickets in '{city}' to technician #{tech_id}");
    ctx.reply(&format!(
        "Assigned {count} tickets in city '{city}' to technician {} (ID: {tech_id}).",
        tech.display_name()
    ))
    .await
}

/// /bulkclose <city> - close every not-yet-closed ticket whose city
/// component contains the substring.
pub async fn bulk_close(ctx: &HandlerCtx<'_>, args: &[String]) -> Result<(), ServiceFixError> {
    let Some(arg) = args.first() else {
        return ctx.reply("Usage: /bulkclose <city>").await;
    };
    let city = arg.trim().to_lowercase();

    let tickets = store::tickets_open(ctx.db).await?;
    let mut count = 0usize;
    for ticket in &tickets {
        if city_matches(ticket.location.as_deref(), &city) {
            store::close_ticket(ctx.db, ticket.id).await?;
            count += 1;
        }
    }

    info!("bulk-closed {count} tickets in '{city}'");
    ctx.reply(&format!("Closed {count} tickets in city '{city}'."))
        .await
}
