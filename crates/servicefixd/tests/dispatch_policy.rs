//! Registration, approval, assignment, bulk operations, and the admin
//! gate, driven through the engine.

use std::sync::Arc;

use servicefix_common::db::Db;
use servicefix_common::refdata::RefData;
use servicefix_common::{store, ButtonAction, InboundEvent, InboundKind, TechStatus, TicketStatus};
use servicefixd::engine::Engine;
use servicefixd::transport::{MemoryTransport, Transport};

const ADMIN: i64 = 1000;

async fn harness() -> (tempfile::TempDir, Db, Arc<MemoryTransport>, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path().join("t.db")).await.unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let engine = Engine::new(
        db.clone(),
        transport.clone() as Arc<dyn Transport>,
        Arc::new(RefData::builtin()),
        ADMIN,
    );
    (dir, db, transport, engine)
}

fn cmd(chat: i64, name: &str) -> InboundEvent {
    InboundEvent {
        chat,
        kind: InboundKind::Command {
            name: name.to_string(),
            args: vec![],
        },
    }
}

fn cmd_args(chat: i64, name: &str, args: &[&str]) -> InboundEvent {
    InboundEvent {
        chat,
        kind: InboundKind::Command {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        },
    }
}

fn text(chat: i64, body: &str) -> InboundEvent {
    InboundEvent {
        chat,
        kind: InboundKind::Text(body.to_string()),
    }
}

fn button(chat: i64, action: ButtonAction) -> InboundEvent {
    InboundEvent {
        chat,
        kind: InboundKind::Button(action),
    }
}

async fn seed_ticket(db: &Db, chat_id: i64, location: &str) -> i64 {
    store::insert_ticket(
        db,
        &store::NewTicket {
            chat_id,
            appliance: Some("AC".into()),
            issue_summary: Some("No Cooling".into()),
            location: Some(location.into()),
            raw_problem_text: Some("warm air".into()),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn registration_approval_assignment_scenario() {
    let (_dir, db, transport, engine) = harness().await;
    let raju = 7i64;

    // register: name -> phone -> skills
    engine.handle(cmd(raju, "register")).await;
    engine.handle(text(raju, "Raju")).await;
    engine.handle(text(raju, "9876543210")).await;
    engine.handle(text(raju, "AC, Fridge")).await;

    let tech = store::technician_by_chat(&db, raju).await.unwrap().unwrap();
    assert_eq!(tech.status, TechStatus::Pending);
    assert_eq!(tech.name.as_deref(), Some("Raju"));

    // the administrator hears about every new pending technician
    let admin_texts = transport.texts_for(ADMIN).await;
    assert!(admin_texts
        .iter()
        .any(|t| t.contains("New technician for approval") && t.contains("Raju")));

    // second registration with the same chat id: benign, no second row
    engine.handle(cmd(raju, "register")).await;
    engine.handle(text(raju, "Raju Again")).await;
    engine.handle(text(raju, "111")).await;
    engine.handle(text(raju, "AC")).await;
    let texts = transport.texts_for(raju).await;
    assert!(texts.iter().any(|t| t.contains("You have already registered")));
    assert_eq!(store::technicians_all(&db).await.unwrap().len(), 1);

    // approval notifies the technician
    engine.handle(button(ADMIN, ButtonAction::ApproveTech(tech.id))).await;
    let tech = store::technician_by_id(&db, tech.id).await.unwrap().unwrap();
    assert_eq!(tech.status, TechStatus::Approved);
    let texts = transport.texts_for(raju).await;
    assert!(texts
        .iter()
        .any(|t| t.contains("Your registration has been approved")));

    // assignment through the panel buttons
    let ticket = seed_ticket(&db, 42, "Visakhapatnam, Andhra Pradesh").await;
    engine.handle(button(ADMIN, ButtonAction::AssignStart(ticket))).await;
    let (prompt, rows) = transport.last_menu(ADMIN).await.unwrap();
    assert!(prompt.contains("Choose a technician"));
    assert_eq!(rows[0][0].label, "Raju");

    engine
        .handle(button(
            ADMIN,
            ButtonAction::Assign {
                ticket_id: ticket,
                tech_id: tech.id,
            },
        ))
        .await;

    let assigned = store::ticket_by_id(&db, ticket).await.unwrap().unwrap();
    assert_eq!(assigned.status, TicketStatus::Assigned);
    assert_eq!(assigned.technician_id, Some(tech.id));

    let texts = transport.texts_for(raju).await;
    assert!(texts
        .iter()
        .any(|t| t.contains(&format!("You have been assigned Ticket #{ticket}"))
            && t.contains("Location: Visakhapatnam, Andhra Pradesh")));
}

#[tokio::test]
async fn non_admin_is_uniformly_denied() {
    let (_dir, db, transport, engine) = harness().await;
    let stranger = 50i64;
    seed_ticket(&db, 42, "Vizag").await;

    engine.handle(cmd(stranger, "admin")).await;
    engine.handle(cmd(stranger, "listall")).await;
    engine.handle(cmd_args(stranger, "closeticket", &["1"])).await;
    engine.handle(button(stranger, ButtonAction::AdminListTickets)).await;
    engine
        .handle(button(
            stranger,
            ButtonAction::Assign {
                ticket_id: 1,
                tech_id: 1,
            },
        ))
        .await;

    let texts = transport.texts_for(stranger).await;
    assert_eq!(texts.len(), 5);
    assert!(texts
        .iter()
        .all(|t| t == "You are not authorized to use this command."));

    // nothing was mutated
    let ticket = store::ticket_by_id(&db, 1).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::New);
}

#[tokio::test]
async fn admin_panel_lists_and_assign_flow_from_menu() {
    let (_dir, db, transport, engine) = harness().await;

    engine.handle(cmd(ADMIN, "admin")).await;
    let (prompt, rows) = transport.last_menu(ADMIN).await.unwrap();
    assert_eq!(prompt, "Admin Panel:");
    assert_eq!(rows[0][0].action, ButtonAction::AdminListTickets);
    assert_eq!(rows[1][0].action, ButtonAction::AdminListTechs);

    engine.handle(button(ADMIN, ButtonAction::AdminListTickets)).await;
    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t == "No new tickets."));

    seed_ticket(&db, 42, "Vizag").await;
    engine.handle(button(ADMIN, ButtonAction::AdminListTickets)).await;
    let (card, rows) = transport.last_menu(ADMIN).await.unwrap();
    assert!(card.contains("Ticket #1"));
    assert_eq!(rows[0][0].action, ButtonAction::AssignStart(1));
}

#[tokio::test]
async fn reassignment_is_an_override_and_leaves_one_reference() {
    let (_dir, db, transport, engine) = harness().await;

    let ticket = seed_ticket(&db, 42, "Vizag").await;
    let x = store::insert_technician(&db, 100, "X", "1", "AC").await.unwrap();
    let y = store::insert_technician(&db, 101, "Y", "2", "AC").await.unwrap();
    store::approve_technician(&db, x).await.unwrap();
    // Y stays pending: /reassign does not require approval

    store::assign_ticket(&db, ticket, x).await.unwrap();
    engine
        .handle(cmd_args(ADMIN, "reassign", &[&ticket.to_string(), &y.to_string()]))
        .await;

    let after = store::ticket_by_id(&db, ticket).await.unwrap().unwrap();
    assert_eq!(after.technician_id, Some(y));
    assert_eq!(after.status, TicketStatus::Assigned);

    // closed tickets can be force-reassigned too
    store::close_ticket(&db, ticket).await.unwrap();
    engine
        .handle(cmd_args(ADMIN, "reassign", &[&ticket.to_string(), &x.to_string()]))
        .await;
    let after = store::ticket_by_id(&db, ticket).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Assigned);
    assert_eq!(after.technician_id, Some(x));

    // argument validation answers with usage hints, no mutation
    engine.handle(cmd_args(ADMIN, "reassign", &["1"])).await;
    engine.handle(cmd_args(ADMIN, "reassign", &["a", "b"])).await;
    engine.handle(cmd_args(ADMIN, "reassign", &["999", "1"])).await;
    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t.contains("Usage: /reassign")));
    assert!(texts.iter().any(|t| t.contains("Invalid ticket or technician ID")));
    assert!(texts.iter().any(|t| t.contains("Ticket not found")));
}

#[tokio::test]
async fn closing_is_unconditional_and_idempotent() {
    let (_dir, db, transport, engine) = harness().await;
    let ticket = seed_ticket(&db, 42, "Vizag").await;

    engine
        .handle(cmd_args(ADMIN, "closeticket", &[&ticket.to_string()]))
        .await;
    engine
        .handle(cmd_args(ADMIN, "closeticket", &[&ticket.to_string()]))
        .await;

    let texts = transport.texts_for(ADMIN).await;
    assert_eq!(
        texts
            .iter()
            .filter(|t| t.contains("marked as closed"))
            .count(),
        2
    );
    let after = store::ticket_by_id(&db, ticket).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Closed);

    engine.handle(cmd_args(ADMIN, "closeticket", &["999"])).await;
    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t == "Ticket not found."));
}

#[tokio::test]
async fn bulk_close_touches_only_matching_open_tickets() {
    let (_dir, db, transport, engine) = harness().await;

    let t1 = seed_ticket(&db, 1, "Vizag").await;
    let t2 = seed_ticket(&db, 2, "Vizag, Andhra Pradesh").await;
    let t3 = seed_ticket(&db, 3, "Hyderabad, Telangana").await;
    let t4 = seed_ticket(&db, 4, "Vizag").await;
    store::close_ticket(&db, t4).await.unwrap();

    engine.handle(cmd_args(ADMIN, "bulkclose", &["vizag"])).await;

    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t == "Closed 2 tickets in city 'vizag'."));

    for id in [t1, t2, t4] {
        let t = store::ticket_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(t.status, TicketStatus::Closed);
    }
    let untouched = store::ticket_by_id(&db, t3).await.unwrap().unwrap();
    assert_eq!(untouched.status, TicketStatus::New);
}

#[tokio::test]
async fn bulk_assign_covers_only_new_tickets() {
    let (_dir, db, transport, engine) = harness().await;

    let tech = store::insert_technician(&db, 100, "X", "1", "AC").await.unwrap();
    store::approve_technician(&db, tech).await.unwrap();

    let fresh = seed_ticket(&db, 1, "Vizag").await;
    let taken = seed_ticket(&db, 2, "Vizag").await;
    store::assign_ticket(&db, taken, tech).await.unwrap();
    let elsewhere = seed_ticket(&db, 3, "Guntur").await;

    engine
        .handle(cmd_args(ADMIN, "bulkassign", &["vizag", &tech.to_string()]))
        .await;

    let texts = transport.texts_for(ADMIN).await;
    assert!(texts
        .iter()
        .any(|t| t.contains("Assigned 1 tickets in city 'vizag'")));

    let t = store::ticket_by_id(&db, fresh).await.unwrap().unwrap();
    assert_eq!(t.status, TicketStatus::Assigned);
    assert_eq!(t.technician_id, Some(tech));
    let t = store::ticket_by_id(&db, elsewhere).await.unwrap().unwrap();
    assert_eq!(t.status, TicketStatus::New);

    // unknown technician: reported, nothing assigned
    engine.handle(cmd_args(ADMIN, "bulkassign", &["guntur", "999"])).await;
    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t == "Technician not found."));
    let t = store::ticket_by_id(&db, elsewhere).await.unwrap().unwrap();
    assert_eq!(t.status, TicketStatus::New);
}

#[tokio::test]
async fn my_jobs_gates_on_approval_and_lists_assignments() {
    let (_dir, db, transport, engine) = harness().await;
    let worker = 77i64;

    engine.handle(cmd(worker, "myjobs")).await;
    let texts = transport.texts_for(worker).await;
    assert!(texts
        .iter()
        .any(|t| t == "This command is only for approved technicians."));

    let tech = store::insert_technician(&db, worker, "Raju", "9876543210", "AC")
        .await
        .unwrap();
    store::approve_technician(&db, tech).await.unwrap();

    engine.handle(cmd(worker, "myjobs")).await;
    let texts = transport.texts_for(worker).await;
    assert!(texts.iter().any(|t| t == "You have no new jobs assigned."));

    // a job with an empty location shows the historical fallback label
    let bare = store::insert_ticket(
        &db,
        &store::NewTicket {
            chat_id: 1,
            appliance: Some("AC".into()),
            issue_summary: Some("No Cooling".into()),
            location: Some("".into()),
            raw_problem_text: None,
        },
    )
    .await
    .unwrap();
    store::assign_ticket(&db, bare, tech).await.unwrap();

    engine.handle(cmd(worker, "myjobs")).await;
    let texts = transport.texts_for(worker).await;
    assert!(texts.iter().any(|t| t.contains(&format!("Ticket #{bare} - Vizag"))));
}

#[tokio::test]
async fn exports_deliver_csv_documents() {
    let (_dir, db, transport, engine) = harness().await;
    seed_ticket(&db, 42, "Vizag").await;
    store::insert_technician(&db, 7, "Raju", "9876543210", "AC")
        .await
        .unwrap();

    engine.handle(cmd(ADMIN, "exporttickets")).await;
    engine.handle(cmd(ADMIN, "exporttechs")).await;

    let docs = transport.documents_for(ADMIN).await;
    assert_eq!(docs.len(), 2);

    let (name, bytes) = &docs[0];
    assert_eq!(name, "tickets_export.csv");
    let body = String::from_utf8(bytes.clone()).unwrap();
    assert!(body.starts_with(
        "id,chat_id,appliance,issue_summary,location,preferred_time,raw_problem_text,status,technician_id,created_at"
    ));
    assert!(body.contains("No Cooling"));

    let (name, bytes) = &docs[1];
    assert_eq!(name, "technicians_export.csv");
    let body = String::from_utf8(bytes.clone()).unwrap();
    assert!(body.starts_with("id,chat_id,name,phone,skills,status,created_at"));
    assert!(body.contains("Raju"));
}

#[tokio::test]
async fn registration_reprompts_on_empty_input() {
    let (_dir, db, transport, engine) = harness().await;
    let worker = 88i64;

    engine.handle(cmd(worker, "register")).await;
    engine.handle(text(worker, "   ")).await;
    let texts = transport.texts_for(worker).await;
    assert!(texts
        .iter()
        .any(|t| t.contains("didn't catch your name")));
    // still awaiting the name, nothing stored
    assert_eq!(engine.active_conversations().await, 1);
    assert!(store::technician_by_chat(&db, worker).await.unwrap().is_none());

    engine.handle(text(worker, "Raju")).await;
    engine.handle(text(worker, "9876543210")).await;
    engine.handle(text(worker, "AC")).await;
    assert!(store::technician_by_chat(&db, worker).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_commands_and_stray_events_are_ignored() {
    let (_dir, _db, transport, engine) = harness().await;

    engine.handle(cmd(42, "frobnicate")).await;
    engine.handle(text(42, "hello")).await;
    engine
        .handle(button(42, ButtonAction::Appliance("AC".into())))
        .await;

    assert!(transport.take().await.is_empty());
}

#[tokio::test]
async fn admin_reports_cover_search_stats_and_history() {
    let (_dir, db, transport, engine) = harness().await;

    let t1 = seed_ticket(&db, 42, "Visakhapatnam, Andhra Pradesh").await;
    let _t2 = seed_ticket(&db, 42, "Guntur, Andhra Pradesh").await;
    let tech = store::insert_technician(&db, 7, "Raju", "9876543210", "AC")
        .await
        .unwrap();
    store::approve_technician(&db, tech).await.unwrap();
    store::assign_ticket(&db, t1, tech).await.unwrap();
    store::close_ticket(&db, t1).await.unwrap();
    store::insert_feedback(&db, t1, Some(5), Some("quick fix"))
        .await
        .unwrap();

    engine.handle(cmd_args(ADMIN, "searchtickets", &["guntur"])).await;
    engine.handle(cmd_args(ADMIN, "ticketsbycity", &["guntur"])).await;
    engine
        .handle(cmd_args(ADMIN, "ticketsbystate", &["andhra", "pradesh"]))
        .await;
    engine.handle(cmd(ADMIN, "stats")).await;
    engine.handle(cmd(ADMIN, "toptechs")).await;
    engine.handle(cmd_args(ADMIN, "userhistory", &["42"])).await;
    engine.handle(cmd_args(ADMIN, "feedbackbyticket", &[&t1.to_string()])).await;

    let texts = transport.texts_for(ADMIN).await;
    assert!(texts.iter().any(|t| t.contains("City: Guntur")));
    assert!(texts.iter().any(|t| t.contains("Total Tickets: 2")));
    assert!(texts.iter().any(|t| t.contains("Closed Tickets: 1")));
    assert!(texts.iter().any(|t| t.contains("Raju: 1 closed tickets")));
    assert!(texts.iter().any(|t| t.contains("Feedback: 5 / 5")));
    assert!(texts.iter().any(|t| t.contains("Comment: quick fix")));
}
