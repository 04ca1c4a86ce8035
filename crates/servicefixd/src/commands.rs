//! Command routing table.
//!
//! The transport hands us a lowercased command name plus raw arguments;
//! this maps the known surface to a closed enum. Argument validation
//! (integer ids, date shapes) happens in the handlers so they can answer
//! with usage hints.

/// Every command the bot reacts to. Unknown commands are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // everyone
    Start,
    Help,
    Book,
    Register,
    Status,
    Cancel,
    Skip,
    // technicians
    MyJobs,
    // administrator
    Admin,
    ListAll,
    ListNew,
    ListAssigned,
    ListTechs,
    SearchTickets(Vec<String>),
    TicketsByCity(Vec<String>),
    TicketsByState(Vec<String>),
    TicketsByDate(Vec<String>),
    CloseTicket(Vec<String>),
    Reassign(Vec<String>),
    TicketDetails(Vec<String>),
    UserHistory(Vec<String>),
    Feedback,
    FeedbackByTicket(Vec<String>),
    Stats,
    TopTechs,
    PendingApproval,
    BulkAssign(Vec<String>),
    BulkClose(Vec<String>),
    ExportTickets,
    ExportTechs,
}

impl Command {
    pub fn parse(name: &str, args: &[String]) -> Option<Self> {
        let args = args.to_vec();
        let cmd = match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "book" => Self::Book,
            "register" => Self::Register,
            "status" => Self::Status,
            "cancel" => Self::Cancel,
            "skip" => Self::Skip,
            "myjobs" => Self::MyJobs,
            "admin" => Self::Admin,
            "listall" => Self::ListAll,
            "listnew" => Self::ListNew,
            "listassigned" => Self::ListAssigned,
            "listtechs" => Self::ListTechs,
            "searchtickets" => Self::SearchTickets(args),
            "ticketsbycity" => Self::TicketsByCity(args),
            "ticketsbystate" => Self::TicketsByState(args),
            "ticketsbydate" => Self::TicketsByDate(args),
            "closeticket" => Self::CloseTicket(args),
            "reassign" => Self::Reassign(args),
            "ticketdetails" => Self::TicketDetails(args),
            "userhistory" => Self::UserHistory(args),
            "feedback" => Self::Feedback,
            "feedbackbyticket" => Self::FeedbackByTicket(args),
            "stats" => Self::Stats,
            "toptechs" => Self::TopTechs,
            "pendingapproval" => Self::PendingApproval,
            "bulkassign" => Self::BulkAssign(args),
            "bulkclose" => Self::BulkClose(args),
            "exporttickets" => Self::ExportTickets,
            "exporttechs" => Self::ExportTechs,
            _ => return None,
        };
        Some(cmd)
    }

    /// True for commands gated on the administrator identity.
    pub fn is_admin_only(&self) -> bool {
        !matches!(
            self,
            Self::Start
                | Self::Help
                | Self::Book
                | Self::Register
                | Self::Status
                | Self::Cancel
                | Self::Skip
                | Self::MyJobs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_parse() {
        assert_eq!(Command::parse("book", &[]), Some(Command::Book));
        assert_eq!(
            Command::parse("reassign", &["3".into(), "7".into()]),
            Some(Command::Reassign(vec!["3".into(), "7".into()]))
        );
        assert_eq!(Command::parse("frobnicate", &[]), None);
    }

    #[test]
    fn gating_covers_the_admin_surface() {
        assert!(!Command::Book.is_admin_only());
        assert!(!Command::MyJobs.is_admin_only());
        assert!(Command::Admin.is_admin_only());
        assert!(Command::BulkClose(vec![]).is_admin_only());
        assert!(Command::ExportTickets.is_admin_only());
    }
}
