//! Customer status-check conversation.
//!
//! Single state: waits for a ticket id, re-prompting on non-integer
//! input. The lookup is scoped to the requester's own chat id, so a
//! correct numeric id belonging to someone else reads as not found.

use servicefix_common::{store, InboundKind, ServiceFixError, TicketStatus};

use crate::engine::HandlerCtx;

#[derive(Debug)]
pub struct StatusFlow;

impl StatusFlow {
    pub async fn start(ctx: &HandlerCtx<'_>) -> Result<Self, ServiceFixError> {
        ctx.reply("Please enter your Ticket ID to check its status.")
            .await?;
        Ok(Self)
    }

    pub async fn advance(
        self,
        kind: InboundKind,
        ctx: &HandlerCtx<'_>,
    ) -> Result<Option<Self>, ServiceFixError> {
        let text = match kind {
            InboundKind::Text(t) => t,
            _ => return Ok(Some(self)),
        };

        let Ok(ticket_id) = text.trim().parse::<i64>() else {
            ctx.reply("That doesn't look like a valid Ticket ID. Please enter a number.")
                .await?;
            return Ok(Some(self));
        };

        let Some(ticket) = store::ticket_for_requester(ctx.db, ticket_id, ctx.chat).await? else {
            ctx.reply("Sorry, I couldn't find a ticket with that ID for your account.")
                .await?;
            return Ok(None);
        };

        let mut message = format!(
            "Status for Ticket #{ticket_id}: {}",
            ticket.status.as_str().to_uppercase()
        );
        if ticket.status == TicketStatus::Assigned {
            if let Some(tech_id) = ticket.technician_id {
                if let Some(tech) = store::technician_by_id(ctx.db, tech_id).await? {
                    message.push_str(&format!(
                        "\n\nAssigned to: {}\nContact: {}",
                        tech.display_name(),
                        tech.phone.as_deref().unwrap_or("-")
                    ));
                }
            }
        }
        ctx.reply(&message).await?;
        Ok(None)
    }
}
