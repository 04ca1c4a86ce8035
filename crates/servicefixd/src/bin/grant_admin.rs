//! Out-of-band administrator grant.
//!
//! Ensures a technician row exists for the chat id and forces its status
//! to `admin`. Run this once against the live database; the approval flow
//! never produces admins.
//!
//! Usage: servicefix-grant-admin <chat_id> [db_path]

use anyhow::{bail, Context, Result};

use servicefix_common::db::Db;
use servicefix_common::store;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(chat_arg) = args.first() else {
        bail!("usage: servicefix-grant-admin <chat_id> [db_path]");
    };
    let chat_id: i64 = chat_arg
        .parse()
        .with_context(|| format!("chat id '{chat_arg}' is not an integer"))?;
    let db_path = args.get(1).map(String::as_str).unwrap_or("tickets.db");

    let db = Db::open(db_path)
        .await
        .with_context(|| format!("failed to open {db_path}"))?;
    store::grant_admin(&db, chat_id).await?;

    println!("chat_id={chat_id} is now an admin in {db_path}");
    Ok(())
}
