//! System status dashboard command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display conversation and message counts, live topics and configuration.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stats = state.messaging.stats().await?;
    let config = &state.config;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "conversations": stats.conversations,
            "messages": stats.messages,
            "live_topics": stats.live_topics,
            "config": &**config,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} hirechat v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Messaging ──").dim());
    println!("  Conversations: {}", style(stats.conversations).bold());
    println!("  Messages:      {}", style(stats.messages).bold());
    println!("  Live topics:   {}", stats.live_topics);
    println!();

    println!("  {}", style("── Config ──").dim());
    println!("  Listen:        {}:{}", config.server.host, config.server.port);
    println!("  Bus capacity:  {}", config.bus_capacity);
    println!(
        "  Reconnect:     {}ms .. {}ms (x{})",
        config.reconnect.initial_delay_ms,
        config.reconnect.max_delay_ms,
        config.reconnect.multiplier
    );
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir:      {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}
