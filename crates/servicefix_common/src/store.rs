//! Typed queries for tickets, technicians, and feedback.
//!
//! All SQL lives here, built on the three data-access primitives. The
//! statements are simple keyed INSERT/UPDATEs, so a retried write is safe
//! to repeat.

use rusqlite::types::Value;
use rusqlite::Row;

use crate::db::Db;
use crate::error::ServiceFixError;
use crate::feedback::Feedback;
use crate::technician::{TechStatus, Technician};
use crate::ticket::{Ticket, TicketStatus};

const TICKET_COLS: &str =
    "id, chat_id, appliance, issue_summary, location, preferred_time, raw_problem_text, \
     status, technician_id, created_at";

const TECH_COLS: &str = "id, chat_id, name, phone, skills, status, created_at";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        appliance: row.get(2)?,
        issue_summary: row.get(3)?,
        location: row.get(4)?,
        preferred_time: row.get(5)?,
        raw_problem_text: row.get(6)?,
        status: TicketStatus::parse(&row.get::<_, String>(7)?),
        technician_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn tech_from_row(row: &Row<'_>) -> rusqlite::Result<Technician> {
    Ok(Technician {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        skills: row.get(4)?,
        status: TechStatus::parse(&row.get::<_, String>(5)?),
        created_at: row.get(6)?,
    })
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        rating: row.get(2)?,
        comment: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn text(value: Option<&str>) -> Value {
    match value {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

// ---------- tickets ----------

/// Fields collected by a completed booking conversation.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub chat_id: i64,
    pub appliance: Option<String>,
    pub issue_summary: Option<String>,
    pub location: Option<String>,
    pub raw_problem_text: Option<String>,
}

/// Insert a new ticket (status `new`, no technician) and return its id.
pub async fn insert_ticket(db: &Db, ticket: &NewTicket) -> Result<i64, ServiceFixError> {
    db.insert(
        "INSERT INTO tickets (chat_id, appliance, issue_summary, location, preferred_time, raw_problem_text) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            Value::from(ticket.chat_id),
            text(ticket.appliance.as_deref()),
            text(ticket.issue_summary.as_deref()),
            text(ticket.location.as_deref()),
            Value::Null,
            text(ticket.raw_problem_text.as_deref()),
        ],
    )
    .await
}

pub async fn ticket_by_id(db: &Db, id: i64) -> Result<Option<Ticket>, ServiceFixError> {
    db.read_one(
        format!("SELECT {TICKET_COLS} FROM tickets WHERE id = ?"),
        vec![Value::from(id)],
        ticket_from_row,
    )
    .await
}

/// Scoped status-check lookup: a requester only ever sees their own
/// tickets, even with a correct numeric id.
pub async fn ticket_for_requester(
    db: &Db,
    id: i64,
    chat_id: i64,
) -> Result<Option<Ticket>, ServiceFixError> {
    db.read_one(
        format!("SELECT {TICKET_COLS} FROM tickets WHERE id = ? AND chat_id = ?"),
        vec![Value::from(id), Value::from(chat_id)],
        ticket_from_row,
    )
    .await
}

pub async fn tickets_all(db: &Db) -> Result<Vec<Ticket>, ServiceFixError> {
    db.read_all(
        format!("SELECT {TICKET_COLS} FROM tickets ORDER BY created_at DESC, id DESC"),
        vec![],
        ticket_from_row,
    )
    .await
}

/// Tickets with one status. The admin panel walks new tickets oldest
/// first; the list commands show newest first.
pub async fn tickets_with_status(
    db: &Db,
    status: TicketStatus,
    oldest_first: bool,
) -> Result<Vec<Ticket>, ServiceFixError> {
    let order = if oldest_first {
        "ASC, id ASC"
    } else {
        "DESC, id DESC"
    };
    db.read_all(
        format!("SELECT {TICKET_COLS} FROM tickets WHERE status = ? ORDER BY created_at {order}"),
        vec![Value::from(status.as_str().to_string())],
        ticket_from_row,
    )
    .await
}

/// Everything not yet closed (bulk-close candidates).
pub async fn tickets_open(db: &Db) -> Result<Vec<Ticket>, ServiceFixError> {
    db.read_all(
        format!("SELECT {TICKET_COLS} FROM tickets WHERE status != 'closed' ORDER BY id ASC"),
        vec![],
        ticket_from_row,
    )
    .await
}

pub async fn tickets_for_chat(db: &Db, chat_id: i64) -> Result<Vec<Ticket>, ServiceFixError> {
    db.read_all(
        format!(
            "SELECT {TICKET_COLS} FROM tickets WHERE chat_id = ? ORDER BY created_at DESC, id DESC"
        ),
        vec![Value::from(chat_id)],
        ticket_from_row,
    )
    .await
}

/// Tickets created on a calendar date ("YYYY-MM-DD").
pub async fn tickets_on_date(db: &Db, date: &str) -> Result<Vec<Ticket>, ServiceFixError> {
    db.read_all(
        format!(
            "SELECT {TICKET_COLS} FROM tickets WHERE date(created_at) = ? \
             ORDER BY created_at DESC, id DESC"
        ),
        vec![Value::from(date.to_string())],
        ticket_from_row,
    )
    .await
}

/// Open jobs for one technician.
pub async fn tickets_assigned_to(db: &Db, tech_id: i64) -> Result<Vec<Ticket>, ServiceFixError> {
    db.read_all(
        format!("SELECT {TICKET_COLS} FROM tickets WHERE technician_id = ? AND status = 'assigned'"),
        vec![Value::from(tech_id)],
        ticket_from_row,
    )
    .await
}

/// Point a ticket at a technician and force status `assigned`. Used by
/// both assignment and the reassignment override.
pub async fn assign_ticket(db: &Db, ticket_id: i64, tech_id: i64) -> Result<usize, ServiceFixError> {
    db.write(
        "UPDATE tickets SET technician_id = ?, status = 'assigned' WHERE id = ?",
        vec![Value::from(tech_id), Value::from(ticket_id)],
    )
    .await
}

/// Close a ticket. Idempotent: closing a closed ticket is a no-op update.
pub async fn close_ticket(db: &Db, ticket_id: i64) -> Result<usize, ServiceFixError> {
    db.write(
        "UPDATE tickets SET status = 'closed' WHERE id = ?",
        vec![Value::from(ticket_id)],
    )
    .await
}

// ---------- technicians ----------

/// Insert a pending technician. A second registration for the same chat
/// surfaces as [`ServiceFixError::Duplicate`] and leaves the first row
/// untouched.
pub async fn insert_technician(
    db: &Db,
    chat_id: i64,
    name: &str,
    phone: &str,
    skills: &str,
) -> Result<i64, ServiceFixError> {
    db.insert(
        "INSERT INTO technicians (chat_id, name, phone, skills) VALUES (?, ?, ?, ?)",
        vec![
            Value::from(chat_id),
            Value::from(name.to_string()),
            Value::from(phone.to_string()),
            Value::from(skills.to_string()),
        ],
    )
    .await
}

pub async fn technician_by_id(db: &Db, id: i64) -> Result<Option<Technician>, ServiceFixError> {
    db.read_one(
        format!("SELECT {TECH_COLS} FROM technicians WHERE id = ?"),
        vec![Value::from(id)],
        tech_from_row,
    )
    .await
}

pub async fn technician_by_chat(
    db: &Db,
    chat_id: i64,
) -> Result<Option<Technician>, ServiceFixError> {
    db.read_one(
        format!("SELECT {TECH_COLS} FROM technicians WHERE chat_id = ?"),
        vec![Value::from(chat_id)],
        tech_from_row,
    )
    .await
}

pub async fn technicians_all(db: &Db) -> Result<Vec<Technician>, ServiceFixError> {
    db.read_all(
        format!("SELECT {TECH_COLS} FROM technicians ORDER BY created_at DESC, id DESC"),
        vec![],
        tech_from_row,
    )
    .await
}

/// Technicians with one status. Assignment pickers walk approved
/// technicians in registration order.
pub async fn technicians_with_status(
    db: &Db,
    status: TechStatus,
    oldest_first: bool,
) -> Result<Vec<Technician>, ServiceFixError> {
    let order = if oldest_first {
        "ASC, id ASC"
    } else {
        "DESC, id DESC"
    };
    db.read_all(
        format!(
            "SELECT {TECH_COLS} FROM technicians WHERE status = ? ORDER BY created_at {order}"
        ),
        vec![Value::from(status.as_str().to_string())],
        tech_from_row,
    )
    .await
}

pub async fn approve_technician(db: &Db, id: i64) -> Result<usize, ServiceFixError> {
    db.write(
        "UPDATE technicians SET status = 'approved' WHERE id = ?",
        vec![Value::from(id)],
    )
    .await
}

/// Out-of-band admin grant: ensure a row exists for the chat id, then
/// force its status to `admin`. Never part of the approval flow.
pub async fn grant_admin(db: &Db, chat_id: i64) -> Result<(), ServiceFixError> {
    db.write(
        "INSERT OR IGNORE INTO technicians (chat_id, name, phone, skills, status) \
         VALUES (?, 'AdminUser', '0000000000', 'n/a', 'admin')",
        vec![Value::from(chat_id)],
    )
    .await?;
    db.write(
        "UPDATE technicians SET status = 'admin' WHERE chat_id = ?",
        vec![Value::from(chat_id)],
    )
    .await?;
    Ok(())
}

// ---------- feedback ----------

/// Attach feedback to a ticket. The owning ticket must exist.
pub async fn insert_feedback(
    db: &Db,
    ticket_id: i64,
    rating: Option<i64>,
    comment: Option<&str>,
) -> Result<i64, ServiceFixError> {
    if ticket_by_id(db, ticket_id).await?.is_none() {
        return Err(ServiceFixError::TicketNotFound);
    }
    db.insert(
        "INSERT INTO feedback (ticket_id, rating, comment) VALUES (?, ?, ?)",
        vec![
            Value::from(ticket_id),
            rating.map(Value::from).unwrap_or(Value::Null),
            text(comment),
        ],
    )
    .await
}

pub async fn feedback_all(db: &Db) -> Result<Vec<Feedback>, ServiceFixError> {
    db.read_all(
        "SELECT id, ticket_id, rating, comment, created_at FROM feedback \
         ORDER BY created_at DESC, id DESC",
        vec![],
        feedback_from_row,
    )
    .await
}

pub async fn feedback_for_ticket(
    db: &Db,
    ticket_id: i64,
) -> Result<Option<Feedback>, ServiceFixError> {
    db.read_one(
        "SELECT id, ticket_id, rating, comment, created_at FROM feedback WHERE ticket_id = ?",
        vec![Value::from(ticket_id)],
        feedback_from_row,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn fresh_db() -> (tempfile::TempDir, Db) {
        let dir = tempdir().unwrap();
        let db = Db::open(dir.path().join("store.db")).await.unwrap();
        (dir, db)
    }

    fn booking(chat_id: i64, location: &str) -> NewTicket {
        NewTicket {
            chat_id,
            appliance: Some("AC".into()),
            issue_summary: Some("No Cooling".into()),
            location: Some(location.into()),
            raw_problem_text: Some("unit blows warm air".into()),
        }
    }

    #[tokio::test]
    async fn booked_ticket_is_new_and_unassigned() {
        let (_dir, db) = fresh_db().await;
        let id = insert_ticket(&db, &booking(42, "Visakhapatnam, Andhra Pradesh"))
            .await
            .unwrap();

        let ticket = ticket_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::New);
        assert_eq!(ticket.technician_id, None);
        assert_eq!(ticket.appliance.as_deref(), Some("AC"));
        assert_eq!(ticket.issue_summary.as_deref(), Some("No Cooling"));
        assert_eq!(
            ticket.location.as_deref(),
            Some("Visakhapatnam, Andhra Pradesh")
        );
        assert_eq!(ticket.preferred_time, None);
    }

    #[tokio::test]
    async fn requester_scoping_hides_foreign_tickets() {
        let (_dir, db) = fresh_db().await;
        let id = insert_ticket(&db, &booking(42, "Vizag")).await.unwrap();

        assert!(ticket_for_requester(&db, id, 42).await.unwrap().is_some());
        assert!(ticket_for_requester(&db, id, 43).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reassignment_leaves_one_reference() {
        let (_dir, db) = fresh_db().await;
        let t = insert_ticket(&db, &booking(42, "Vizag")).await.unwrap();
        let x = insert_technician(&db, 100, "X", "1", "AC").await.unwrap();
        let y = insert_technician(&db, 101, "Y", "2", "AC").await.unwrap();

        assign_ticket(&db, t, x).await.unwrap();
        assign_ticket(&db, t, y).await.unwrap();

        let ticket = ticket_by_id(&db, t).await.unwrap().unwrap();
        assert_eq!(ticket.technician_id, Some(y));
        assert_eq!(ticket.status, TicketStatus::Assigned);
    }

    #[tokio::test]
    async fn closing_is_idempotent_and_terminal() {
        let (_dir, db) = fresh_db().await;
        let t = insert_ticket(&db, &booking(42, "Vizag")).await.unwrap();

        assert_eq!(close_ticket(&db, t).await.unwrap(), 1);
        assert_eq!(close_ticket(&db, t).await.unwrap(), 1);

        let ticket = ticket_by_id(&db, t).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
    }

    #[tokio::test]
    async fn duplicate_registration_is_duplicate_error() {
        let (_dir, db) = fresh_db().await;
        insert_technician(&db, 7, "Raju", "9876543210", "AC, Fridge")
            .await
            .unwrap();

        let err = insert_technician(&db, 7, "Raju", "9876543210", "AC, Fridge")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceFixError::Duplicate(_)));

        let techs = technicians_all(&db).await.unwrap();
        assert_eq!(techs.len(), 1);
    }

    #[tokio::test]
    async fn approval_flow_and_status_order() {
        let (_dir, db) = fresh_db().await;
        let a = insert_technician(&db, 1, "First", "1", "AC").await.unwrap();
        let b = insert_technician(&db, 2, "Second", "2", "AC").await.unwrap();
        approve_technician(&db, a).await.unwrap();
        approve_technician(&db, b).await.unwrap();

        let approved = technicians_with_status(&db, TechStatus::Approved, true)
            .await
            .unwrap();
        let names: Vec<_> = approved.iter().map(|t| t.display_name()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn grant_admin_is_out_of_band() {
        let (_dir, db) = fresh_db().await;

        grant_admin(&db, 999).await.unwrap();
        let tech = technician_by_chat(&db, 999).await.unwrap().unwrap();
        assert_eq!(tech.status, TechStatus::Admin);

        // repeat grant does not duplicate the row
        grant_admin(&db, 999).await.unwrap();
        assert_eq!(technicians_all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn feedback_requires_an_existing_ticket() {
        let (_dir, db) = fresh_db().await;
        let t = insert_ticket(&db, &booking(42, "Vizag")).await.unwrap();

        insert_feedback(&db, t, Some(5), Some("quick fix"))
            .await
            .unwrap();
        let fb = feedback_for_ticket(&db, t).await.unwrap().unwrap();
        assert_eq!(fb.rating, Some(5));
        assert_eq!(fb.comment.as_deref(), Some("quick fix"));

        let err = insert_feedback(&db, t + 1, Some(3), None).await.unwrap_err();
        assert!(matches!(err, ServiceFixError::TicketNotFound));
        assert!(feedback_for_ticket(&db, t + 1).await.unwrap().is_none());
    }
}
