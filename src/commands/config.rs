use crate::state::Context;

/// Show or change research settings (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "max_rounds"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().config.read().await;
            ctx.say(format!(
                "**Research Configuration:**\n\
                 `max_rounds`: {}\n\
                 `max_initial_queries`: {} (startup only)\n\
                 `max_fallback_queries`: {} (startup only)\n\
                 `search_timeout_secs`: {} (startup only)\n\
                 `results_per_query`: {} (startup only)",
                config.max_rounds,
                config.max_initial_queries,
                config.max_fallback_queries,
                config.search_timeout_secs,
                config.results_per_query
            ))
            .await?;
        }
        (Some("max_rounds"), Some(val)) => {
            ctx.data().config.write().await.max_rounds = val;
            ctx.say(format!("`max_rounds` set to {}", val)).await?;
        }
        (Some(key), Some(_)) => {
            ctx.say(format!(
                "Unknown or read-only param `{}`. Runtime-settable: `max_rounds`",
                key
            ))
            .await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/research config max_rounds 3`")
                .await?;
        }
    }

    Ok(())
}
