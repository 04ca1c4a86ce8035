//! Technician registration conversation.
//!
//! AwaitingName -> AwaitingPhone -> AwaitingSkills -> terminal. Every
//! state wants non-empty text; anything else re-prompts without losing
//! collected fields. The terminal insert reports a duplicate chat id as
//! "already registered" instead of failing the conversation.

use tracing::info;

use servicefix_common::{store, InboundKind, ServiceFixError};

use crate::engine::HandlerCtx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegState {
    AwaitingName,
    AwaitingPhone,
    AwaitingSkills,
}

#[derive(Debug)]
pub struct RegistrationFlow {
    state: RegState,
    name: Option<String>,
    phone: Option<String>,
}

impl RegistrationFlow {
    pub async fn start(ctx: &HandlerCtx<'_>) -> Result<Self, ServiceFixError> {
        ctx.reply(
            "Welcome! Let's get you registered as a technician.\n\
             First, what is your full name?",
        )
        .await?;
        Ok(Self {
            state: RegState::AwaitingName,
            name: None,
            phone: None,
        })
    }

    pub async fn advance(
        mut self,
        kind: InboundKind,
        ctx: &HandlerCtx<'_>,
    ) -> Result<Option<Self>, ServiceFixError> {
        let text = match kind {
            InboundKind::Text(t) => t.trim().to_string(),
            _ => String::new(),
        };

        match self.state {
            RegState::AwaitingName => {
                if text.is_empty() {
                    ctx.reply("Sorry, I didn't catch your name - please type your full name.")
                        .await?;
                    return Ok(Some(self));
                }
                self.name = Some(text);
                ctx.reply("Got it. What is your 10-digit contact number?")
                    .await?;
                self.state = RegState::AwaitingPhone;
                Ok(Some(self))
            }

            RegState::AwaitingPhone => {
                if text.is_empty() {
                    ctx.reply(
                        "Sorry, I didn't catch your phone number - please type your \
                         10-digit contact number.",
                    )
                    .await?;
                    return Ok(Some(self));
                }
                self.phone = Some(text);
                ctx.reply("Great. What are your main skills? (e.g., AC, Fridge, Washing Machine)")
                    .await?;
                self.state = RegState::AwaitingSkills;
                Ok(Some(self))
            }

            RegState::AwaitingSkills => {
                if text.is_empty() {
                    ctx.reply("Sorry, I didn't catch your skills - please type your main skills.")
                        .await?;
                    return Ok(Some(self));
                }
                let name = self.name.as_deref().unwrap_or_default();
                let phone = self.phone.as_deref().unwrap_or_default();

                match store::insert_technician(ctx.db, ctx.chat, name, phone, &text).await {
                    Ok(id) => {
                        info!("chat {} registered as technician #{id}", ctx.chat);
                        ctx.reply(
                            "Thank you! Your registration is complete and has been sent \
                             for approval.",
                        )
                        .await?;
                        ctx.notify(
                            ctx.admin_chat,
                            &format!(
                                "New technician for approval:\nName: {name}\nPhone: {phone}\n\
                                 Skills: {text}"
                            ),
                        )
                        .await?;
                    }
                    Err(ServiceFixError::Duplicate(_)) => {
                        ctx.reply("You have already registered. Please wait for approval.")
                            .await?;
                    }
                    Err(err) => return Err(err),
                }
                Ok(None)
            }
        }
    }
}
