mod ask;
mod config;

use crate::state::Context;

/// Research - slot-aware web research assistant
#[poise::command(slash_command, subcommands("ask::ask", "config::config"))]
pub async fn research(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}
