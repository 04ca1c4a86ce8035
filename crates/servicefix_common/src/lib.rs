//! ServiceFix Common - shared types, storage, and matching for the
//! ServiceFix dispatch bot.
//!
//! The daemon crate (`servicefixd`) drives the conversations; everything
//! that outlives a single conversation lives here: entity types, the
//! SQLite data access layer, the reference matcher, and the transport
//! event model.

pub mod db;
pub mod error;
pub mod event;
pub mod feedback;
pub mod matcher;
pub mod refdata;
pub mod store;
pub mod technician;
pub mod ticket;

pub use error::ServiceFixError;
pub use event::{ButtonAction, ChatId, InboundEvent, InboundKind, MenuButton};
pub use feedback::Feedback;
pub use technician::{TechStatus, Technician};
pub use ticket::{Ticket, TicketStatus};

/// Crate version, reported at daemon startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
