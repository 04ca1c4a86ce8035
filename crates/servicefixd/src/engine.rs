//! Conversation engine.
//!
//! Routes decoded transport events to the right handler: an in-flight
//! conversation for the chat, a command handler, or an admin button
//! handler. Conversation contexts are created at entry and dropped at
//! terminal/cancel transitions; the session map is the only in-process
//! shared structure and its lock is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use servicefix_common::db::Db;
use servicefix_common::refdata::RefData;
use servicefix_common::{ButtonAction, ChatId, InboundEvent, InboundKind, ServiceFixError};

use crate::booking::BookingFlow;
use crate::commands::Command;
use crate::registration::RegistrationFlow;
use crate::status_check::StatusFlow;
use crate::transport::Transport;
use crate::{admin, dispatch};

/// Uniform denial for non-administrators; leaks nothing about who the
/// administrator is.
pub const DENIED: &str = "You are not authorized to use this command.";

const START_TEXT: &str = "Hi! I'm the service bot for HVAC/R & WM Repairs.\n\n\
Customers: Type /book to create a new service ticket.\n\n\
Technicians: Type /register to sign up or /myjobs to see your assigned work.";

const HELP_TEXT: &str = "ServiceFix Bot Help\n\n\
Customers:\n\
- /book to create a new service ticket\n\
- /status to check your ticket status\n\
- /cancel to cancel an ongoing booking\n\n\
Technicians:\n\
- /register to sign up as a technician\n\
- /myjobs to see your assigned jobs\n\n\
Admin Panel:\n\
- Only the administrator can access the admin panel via /admin.";

/// One in-flight conversation, keyed by chat id in the session map.
#[derive(Debug)]
pub enum Conversation {
    Booking(BookingFlow),
    Registration(RegistrationFlow),
    StatusCheck(StatusFlow),
}

impl Conversation {
    fn cancel_message(&self) -> &'static str {
        match self {
            Self::Booking(_) => "Booking cancelled.",
            Self::Registration(_) => "Registration cancelled.",
            Self::StatusCheck(_) => "Cancelled.",
        }
    }

    async fn advance(
        self,
        kind: InboundKind,
        ctx: &HandlerCtx<'_>,
    ) -> Result<Option<Conversation>, ServiceFixError> {
        match self {
            Self::Booking(flow) => Ok(flow.advance(kind, ctx).await?.map(Conversation::Booking)),
            Self::Registration(flow) => Ok(flow
                .advance(kind, ctx)
                .await?
                .map(Conversation::Registration)),
            Self::StatusCheck(flow) => Ok(flow
                .advance(kind, ctx)
                .await?
                .map(Conversation::StatusCheck)),
        }
    }
}

/// Borrowed view of the engine handed to every handler.
pub struct HandlerCtx<'a> {
    pub db: &'a Db,
    pub transport: &'a dyn Transport,
    pub refdata: &'a RefData,
    pub admin_chat: ChatId,
    /// Chat the current event came from
    pub chat: ChatId,
}

impl HandlerCtx<'_> {
    /// Reply to the initiating chat.
    pub async fn reply(&self, text: &str) -> Result<(), ServiceFixError> {
        self.transport.send_text(self.chat, text).await
    }

    /// Notify some other chat (technician or administrator).
    pub async fn notify(&self, chat: ChatId, text: &str) -> Result<(), ServiceFixError> {
        self.transport.send_text(chat, text).await
    }
}

pub struct Engine {
    db: Db,
    transport: Arc<dyn Transport>,
    refdata: Arc<RefData>,
    admin_chat: ChatId,
    sessions: Mutex<HashMap<ChatId, Conversation>>,
}

impl Engine {
    pub fn new(
        db: Db,
        transport: Arc<dyn Transport>,
        refdata: Arc<RefData>,
        admin_chat: ChatId,
    ) -> Self {
        Self {
            db,
            transport,
            refdata,
            admin_chat,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn ctx(&self, chat: ChatId) -> HandlerCtx<'_> {
        HandlerCtx {
            db: &self.db,
            transport: self.transport.as_ref(),
            refdata: &self.refdata,
            admin_chat: self.admin_chat,
            chat,
        }
    }

    /// Handle one inbound event. All failures are converted to a
    /// user-facing message here; nothing propagates past this boundary.
    pub async fn handle(&self, event: InboundEvent) {
        let chat = event.chat;
        if let Err(err) = self.dispatch_event(event).await {
            error!("handler failed for chat {chat}: {err}");
            let _ = self
                .transport
                .send_text(chat, "Sorry, something went wrong.")
                .await;
        }
    }

    async fn dispatch_event(&self, event: InboundEvent) -> Result<(), ServiceFixError> {
        let chat = event.chat;
        match event.kind {
            InboundKind::Command { name, args } => match Command::parse(&name, &args) {
                Some(cmd) => self.run_command(chat, cmd).await,
                None => {
                    debug!("ignoring unknown command /{name} from chat {chat}");
                    Ok(())
                }
            },
            kind @ InboundKind::Text(_) => self.feed_conversation(chat, kind).await,
            InboundKind::Button(action) => self.route_button(chat, action).await,
        }
    }

    async fn run_command(&self, chat: ChatId, cmd: Command) -> Result<(), ServiceFixError> {
        let ctx = self.ctx(chat);

        if cmd.is_admin_only() && chat != self.admin_chat {
            return ctx.reply(DENIED).await;
        }

        match cmd {
            Command::Start => ctx.reply(START_TEXT).await,
            Command::Help => ctx.reply(HELP_TEXT).await,

            Command::Book => {
                let flow = BookingFlow::start(&ctx).await?;
                self.enter(chat, Conversation::Booking(flow)).await;
                Ok(())
            }
            Command::Register => {
                let flow = RegistrationFlow::start(&ctx).await?;
                self.enter(chat, Conversation::Registration(flow)).await;
                Ok(())
            }
            Command::Status => {
                let flow = StatusFlow::start(&ctx).await?;
                self.enter(chat, Conversation::StatusCheck(flow)).await;
                Ok(())
            }
            Command::Cancel => {
                let removed = self.sessions.lock().await.remove(&chat);
                match removed {
                    Some(conv) => ctx.reply(conv.cancel_message()).await,
                    None => ctx.reply("Nothing to cancel.").await,
                }
            }
            Command::Skip => {
                // only meaningful while a booking waits for the problem text
                self.feed_conversation(chat, InboundKind::Text(String::new()))
                    .await
            }

            Command::MyJobs => dispatch::my_jobs(&ctx).await,

            Command::Admin => dispatch::admin_panel(&ctx).await,
            Command::CloseTicket(args) => dispatch::close_ticket(&ctx, &args).await,
            Command::Reassign(args) => dispatch::reassign(&ctx, &args).await,
            Command::BulkAssign(args) => dispatch::bulk_assign(&ctx, &args).await,
            Command::BulkClose(args) => dispatch::bulk_close(&ctx, &args).await,

            Command::ListAll => admin::list_all(&ctx).await,
            Command::ListNew => admin::list_new(&ctx).await,
            Command::ListAssigned => admin::list_assigned(&ctx).await,
            Command::ListTechs => admin::list_techs(&ctx).await,
            Command::SearchTickets(args) => admin::search_tickets(&ctx, &args).await,
            Command::TicketsByCity(args) => admin::tickets_by_city(&ctx, &args).await,
            Command::TicketsByState(args) => admin::tickets_by_state(&ctx, &args).await,
            Command::TicketsByDate(args) => admin::tickets_by_date(&ctx, &args).await,
            Command::TicketDetails(args) => admin::ticket_details(&ctx, &args).await,
            Command::UserHistory(args) => admin::user_history(&ctx, &args).await,
            Command::Feedback => admin::feedback_all(&ctx).await,
            Command::FeedbackByTicket(args) => admin::feedback_by_ticket(&ctx, &args).await,
            Command::Stats => admin::stats(&ctx).await,
            Command::TopTechs => admin::top_techs(&ctx).await,
            Command::PendingApproval => admin::pending_approval(&ctx).await,
            Command::ExportTickets => admin::export_tickets(&ctx).await,
            Command::ExportTechs => admin::export_techs(&ctx).await,
        }
    }

    async fn route_button(
        &self,
        chat: ChatId,
        action: ButtonAction,
    ) -> Result<(), ServiceFixError> {
        match action {
            ButtonAction::Appliance(_)
            | ButtonAction::City(_)
            | ButtonAction::CityNotListed
            | ButtonAction::Complaint(_)
            | ButtonAction::ComplaintNotListed => {
                self.feed_conversation(chat, InboundKind::Button(action)).await
            }
            ButtonAction::AdminListTickets
            | ButtonAction::AdminListTechs
            | ButtonAction::ApproveTech(_)
            | ButtonAction::AssignStart(_)
            | ButtonAction::Assign { .. } => {
                let ctx = self.ctx(chat);
                if chat != self.admin_chat {
                    return ctx.reply(DENIED).await;
                }
                dispatch::admin_button(&ctx, action).await
            }
        }
    }

    /// Feed an event into the chat's conversation, if any. The context is
    /// taken out of the map for the duration of the handler so the lock
    /// never spans an await.
    async fn feed_conversation(
        &self,
        chat: ChatId,
        kind: InboundKind,
    ) -> Result<(), ServiceFixError> {
        let conv = self.sessions.lock().await.remove(&chat);
        let Some(conv) = conv else {
            debug!("no conversation for chat {chat}, dropping event");
            return Ok(());
        };

        let ctx = self.ctx(chat);
        match conv.advance(kind, &ctx).await? {
            Some(next) => {
                self.sessions.lock().await.insert(chat, next);
            }
            None => {
                debug!("conversation for chat {chat} reached terminal state");
            }
        }
        Ok(())
    }

    /// Install a fresh conversation context, replacing any stale one.
    async fn enter(&self, chat: ChatId, conv: Conversation) {
        if self
            .sessions
            .lock()
            .await
            .insert(chat, conv)
            .is_some()
        {
            info!("chat {chat} restarted a conversation, old context dropped");
        }
    }

    /// Number of live conversations (test observability).
    pub async fn active_conversations(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
