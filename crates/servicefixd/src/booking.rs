//! Customer booking conversation.
//!
//! AwaitingAppliance -> AwaitingCity -> AwaitingComplaint ->
//! AwaitingProblem -> terminal. The city and complaint states self-loop
//! through the reference matcher: free text produces suggestion buttons
//! plus a "not listed" escape, and the state only advances once the user
//! picks one or takes the escape (committing the raw text).

use tracing::{debug, info};

use servicefix_common::store::{self, NewTicket};
use servicefix_common::{ButtonAction, InboundKind, MenuButton, ServiceFixError};

use crate::engine::HandlerCtx;

const APPLIANCES: [&str; 4] = ["AC", "Fridge", "Washing Machine", "Other"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookingState {
    AwaitingAppliance,
    AwaitingCity,
    AwaitingComplaint,
    AwaitingProblem,
}

/// Conversation-local memory for one booking.
#[derive(Debug)]
pub struct BookingFlow {
    state: BookingState,
    appliance: Option<String>,
    city: Option<String>,
    city_state: Option<String>,
    /// Raw input remembered while suggestions are on screen
    pending_city: Option<String>,
    complaint: Option<String>,
    pending_complaint: Option<String>,
}

impl BookingFlow {
    /// Entry point: show the appliance menu.
    pub async fn start(ctx: &HandlerCtx<'_>) -> Result<Self, ServiceFixError> {
        let rows = vec![
            vec![
                MenuButton::new(APPLIANCES[0], ButtonAction::Appliance(APPLIANCES[0].into())),
                MenuButton::new(APPLIANCES[1], ButtonAction::Appliance(APPLIANCES[1].into())),
            ],
            vec![
                MenuButton::new(APPLIANCES[2], ButtonAction::Appliance(APPLIANCES[2].into())),
                MenuButton::new(APPLIANCES[3], ButtonAction::Appliance(APPLIANCES[3].into())),
            ],
        ];
        ctx.transport
            .send_menu(ctx.chat, "Great! Which appliance needs service?", rows)
            .await?;

        Ok(Self {
            state: BookingState::AwaitingAppliance,
            appliance: None,
            city: None,
            city_state: None,
            pending_city: None,
            complaint: None,
            pending_complaint: None,
        })
    }

    /// Advance the state machine. `None` means the conversation ended.
    pub async fn advance(
        mut self,
        kind: InboundKind,
        ctx: &HandlerCtx<'_>,
    ) -> Result<Option<Self>, ServiceFixError> {
        match (self.state, kind) {
            (BookingState::AwaitingAppliance, InboundKind::Button(ButtonAction::Appliance(a))) => {
                self.appliance = Some(a);
                ctx.reply("Please enter your city (district) name:").await?;
                self.state = BookingState::AwaitingCity;
                Ok(Some(self))
            }

            (BookingState::AwaitingCity, InboundKind::Text(input)) => {
                let input = input.trim().to_string();
                if input.is_empty() {
                    return Ok(Some(self));
                }
                let suggestions = ctx.refdata.city_suggestions(&input);
                if suggestions.is_empty() {
                    // no plausible near-match, commit as free text
                    self.commit_city(input, None, ctx).await?;
                    return Ok(Some(self));
                }
                let mut rows: Vec<Vec<MenuButton>> = suggestions
                    .iter()
                    .map(|s| vec![MenuButton::new(s.clone(), ButtonAction::City(s.clone()))])
                    .collect();
                rows.push(vec![MenuButton::new(
                    "My city is not listed",
                    ButtonAction::CityNotListed,
                )]);
                ctx.transport
                    .send_menu(
                        ctx.chat,
                        "Did you mean one of these? Please select or choose \
                         'My city is not listed' to enter manually:",
                        rows,
                    )
                    .await?;
                self.pending_city = Some(input);
                Ok(Some(self))
            }

            (BookingState::AwaitingCity, InboundKind::Button(ButtonAction::City(label))) => {
                match ctx.refdata.resolve_district(&label) {
                    Some((district, state)) => {
                        let district = district.to_string();
                        let state = state.to_string();
                        self.commit_city(district, Some(state), ctx).await?;
                    }
                    None => {
                        // stale or foreign label; keep it as typed
                        self.commit_city(label, None, ctx).await?;
                    }
                }
                Ok(Some(self))
            }

            (BookingState::AwaitingCity, InboundKind::Button(ButtonAction::CityNotListed)) => {
                let raw = self.pending_city.take().unwrap_or_default();
                self.commit_city(raw, None, ctx).await?;
                Ok(Some(self))
            }

            (BookingState::AwaitingComplaint, InboundKind::Text(input)) => {
                let input = input.trim().to_string();
                if input.is_empty() {
                    return Ok(Some(self));
                }
                let appliance = self.appliance.clone().unwrap_or_default();
                let suggestions = ctx.refdata.complaint_suggestions(&appliance, &input);
                if suggestions.is_empty() {
                    self.commit_complaint(input, ctx).await?;
                    return Ok(Some(self));
                }
                let mut rows: Vec<Vec<MenuButton>> = suggestions
                    .iter()
                    .map(|s| vec![MenuButton::new(s.clone(), ButtonAction::Complaint(s.clone()))])
                    .collect();
                rows.push(vec![MenuButton::new(
                    "My complaint is not listed",
                    ButtonAction::ComplaintNotListed,
                )]);
                ctx.transport
                    .send_menu(
                        ctx.chat,
                        "Did you mean one of these? Please select or choose \
                         'My complaint is not listed' to enter manually:",
                        rows,
                    )
                    .await?;
                self.pending_complaint = Some(input);
                Ok(Some(self))
            }

            (
                BookingState::AwaitingComplaint,
                InboundKind::Button(ButtonAction::Complaint(label)),
            ) => {
                self.commit_complaint(label, ctx).await?;
                Ok(Some(self))
            }

            (
                BookingState::AwaitingComplaint,
                InboundKind::Button(ButtonAction::ComplaintNotListed),
            ) => {
                let raw = self.pending_complaint.take().unwrap_or_default();
                self.commit_complaint(raw, ctx).await?;
                Ok(Some(self))
            }

            (BookingState::AwaitingProblem, InboundKind::Text(problem)) => {
                let ticket = NewTicket {
                    chat_id: ctx.chat,
                    appliance: self.appliance.clone(),
                    issue_summary: self.complaint.clone(),
                    location: Some(self.location()),
                    raw_problem_text: Some(problem),
                };
                let id = store::insert_ticket(ctx.db, &ticket).await?;
                info!("chat {} created ticket #{id}", ctx.chat);
                ctx.reply(&format!(
                    "Thanks! Your request has been logged. Your ticket ID is #{id}.\n\
                     A technician will contact you shortly. You can use /status to \
                     check your ticket status."
                ))
                .await?;
                Ok(None)
            }

            (state, kind) => {
                debug!("booking: ignoring {kind:?} in state {state:?}");
                Ok(Some(self))
            }
        }
    }

    /// Stored location string: "City, State" when the state is known.
    fn location(&self) -> String {
        match (&self.city, &self.city_state) {
            (Some(city), Some(state)) if !state.is_empty() => format!("{city}, {state}"),
            (Some(city), _) => city.clone(),
            (None, _) => String::new(),
        }
    }

    async fn commit_city(
        &mut self,
        city: String,
        state: Option<String>,
        ctx: &HandlerCtx<'_>,
    ) -> Result<(), ServiceFixError> {
        let shown = match &state {
            Some(s) if !s.is_empty() => format!("{city} ({s})"),
            _ => city.clone(),
        };
        self.city = Some(city);
        self.city_state = state;
        self.pending_city = None;
        self.state = BookingState::AwaitingComplaint;
        ctx.reply(&format!(
            "City set as: {shown}\nNow, please describe your problem or select a \
             complaint category:"
        ))
        .await
    }

    async fn commit_complaint(
        &mut self,
        complaint: String,
        ctx: &HandlerCtx<'_>,
    ) -> Result<(), ServiceFixError> {
        let shown = complaint.clone();
        self.complaint = Some(complaint);
        self.pending_complaint = None;
        self.state = BookingState::AwaitingProblem;
        ctx.reply(&format!(
            "Complaint set as: {shown}\nPlease describe your problem in detail \
             (optional, or type /skip):"
        ))
        .await
    }
}
