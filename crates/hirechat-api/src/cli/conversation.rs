//! Conversation commands: open, send, history, read, inbox and watch.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use hirechat_core::event::{ConversationSession, SessionUpdate};
use hirechat_core::messaging::{Caller, ParticipantBackend};
use hirechat_types::conversation::{Conversation, ConversationId};
use hirechat_types::identity::ApplicationId;
use hirechat_types::message::{Message, MessageQuery};

use crate::state::AppState;

const PREVIEW_CHARS: usize = 48;

/// Open (or reopen) the conversation for an application.
pub async fn open(
    state: &AppState,
    caller: &Caller,
    application_id: &ApplicationId,
    json: bool,
) -> Result<()> {
    let conversation = state
        .messaging
        .open_conversation(caller, application_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Conversation {}",
        style("✓").green().bold(),
        style(conversation.id).cyan()
    );
    println!("  Employer:  {}", conversation.employer_id);
    println!("  Candidate: {}", conversation.candidate_id);
    println!("  Opened:    {}", format_relative_time(&conversation.created_at));
    println!();
    Ok(())
}

pub async fn send(
    state: &AppState,
    caller: &Caller,
    conversation_id: &ConversationId,
    body: &str,
    json: bool,
) -> Result<()> {
    let message = state
        .messaging
        .send_message(caller, conversation_id, body)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        println!(
            "  {} Sent {} at {}",
            style("✓").green().bold(),
            style(message.id).dim(),
            message.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Print history as a table, labelling senders by their role.
pub async fn history(
    state: &AppState,
    caller: &Caller,
    conversation_id: &ConversationId,
    query: &MessageQuery,
    json: bool,
) -> Result<()> {
    let authorized = state
        .messaging
        .get_conversation(caller, conversation_id)
        .await?;
    let messages = state
        .messaging
        .list_messages(caller, conversation_id, query)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!("  No messages yet.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Time").fg(Color::White),
            Cell::new("From").fg(Color::White),
            Cell::new("Message").fg(Color::White),
        ]);

    for message in &messages {
        let from = sender_label(&authorized.conversation, caller, message);
        let from_cell = if message.sender_id == caller.user_id {
            Cell::new(from).fg(Color::Cyan)
        } else {
            Cell::new(from).fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M:%S")),
            from_cell,
            Cell::new(&message.body),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} message{} as {}",
        messages.len(),
        if messages.len() == 1 { "" } else { "s" },
        style(authorized.role).bold()
    );
    println!();
    Ok(())
}

pub async fn read(
    state: &AppState,
    caller: &Caller,
    conversation_id: &ConversationId,
    json: bool,
) -> Result<()> {
    let last_read_at = state.messaging.mark_read(caller, conversation_id).await?;

    if json {
        let receipt = serde_json::json!({
            "conversation_id": conversation_id,
            "last_read_at": last_read_at,
        });
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!(
            "  {} Read up to {}",
            style("✓").green().bold(),
            last_read_at.format("%Y-%m-%d %H:%M:%S%.6f")
        );
    }
    Ok(())
}

/// List the caller's conversations, newest activity first.
pub async fn inbox(state: &AppState, caller: &Caller, json: bool) -> Result<()> {
    let entries = state.messaging.list_conversations(&caller.user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  No conversations yet.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Conversation").fg(Color::White),
            Cell::new("Role").fg(Color::White),
            Cell::new("Unread").fg(Color::White),
            Cell::new("Latest").fg(Color::White),
            Cell::new("Activity").fg(Color::White),
        ]);

    let mut total_unread = 0u64;
    for entry in &entries {
        total_unread += u64::from(entry.unread_count);
        let unread_cell = if entry.unread_count > 0 {
            Cell::new(entry.unread_count).fg(Color::Yellow)
        } else {
            Cell::new(0).fg(Color::DarkGrey)
        };
        let latest = entry
            .preview
            .as_ref()
            .map(|m| preview(&m.body, PREVIEW_CHARS))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(entry.conversation.id).fg(Color::Cyan),
            Cell::new(entry.role),
            unread_cell,
            Cell::new(latest),
            Cell::new(format_relative_time(&entry.activity_at())),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}, {} unread",
        entries.len(),
        if entries.len() == 1 { "" } else { "s" },
        style(total_unread).bold()
    );
    println!();
    Ok(())
}

/// Follow a conversation live, printing each message once.
///
/// The session stays focused, so peer messages are marked read as they are
/// shown. Stops on Ctrl+C.
pub async fn watch(
    state: &AppState,
    caller: &Caller,
    conversation_id: &ConversationId,
    json: bool,
) -> Result<()> {
    let authorized = state
        .messaging
        .get_conversation(caller, conversation_id)
        .await?;

    let backend = ParticipantBackend::new(state.messaging.clone(), *caller);
    let (handle, mut updates) =
        ConversationSession::spawn(*conversation_id, caller.user_id, backend, &state.config);
    handle.set_active(true);

    if !json {
        println!();
        println!(
            "  {} Watching {} as {}",
            style("●").green(),
            style(conversation_id).cyan(),
            style(authorized.role).bold()
        );
        println!("  {}", style("Press Ctrl+C to stop").dim());
        println!();
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => {
                let Some(update) = update else {
                    break;
                };
                match update {
                    SessionUpdate::Message(message) if json => {
                        println!("{}", serde_json::to_string(&message)?);
                    }
                    SessionUpdate::Message(message) => {
                        let from = sender_label(&authorized.conversation, caller, &message);
                        println!(
                            "  {} {} {}",
                            style(message.created_at.format("%H:%M:%S")).dim(),
                            style(format!("{from}:")).bold(),
                            message.body
                        );
                    }
                    SessionUpdate::State(connection) if !json => {
                        println!("  {}", style(format!("[{connection}]")).dim());
                    }
                    SessionUpdate::State(_) => {}
                }
            }
        }
    }

    drop(updates);
    handle.close().await;
    Ok(())
}

fn sender_label(conversation: &Conversation, caller: &Caller, message: &Message) -> String {
    if message.sender_id == caller.user_id {
        return "you".to_string();
    }
    conversation
        .role_of(&message.sender_id)
        .map(|role| role.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// First `max` characters of a body on one line.
fn preview(body: &str, max: usize) -> String {
    let line = body.lines().next().unwrap_or_default();
    if line.chars().count() > max || line.len() < body.len() {
        let cut: String = line.chars().take(max).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
