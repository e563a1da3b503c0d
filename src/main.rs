mod agent;
mod commands;
mod llm;
mod search;
mod state;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tokio::sync::RwLock;
use tracing::{error, info, Level};

use agent::generator::LlmGenerator;
use agent::{ResearchEngine, SessionResult};
use llm::LlmClient;
use state::{AppState, ResearchConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    // Load env
    let _ = dotenv::dotenv();

    // `research-agent "your question"` answers once and prints JSON;
    // without arguments the Discord bot starts.
    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !question.trim().is_empty() {
        return ask_once(&question).await;
    }

    run_bot().await
}

fn build_engine(config: &ResearchConfig) -> anyhow::Result<ResearchEngine> {
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!(model = llm_client.model(), "LLM client initialized");

    let backend = search::backend_from_env(config.results_per_query)?;
    let generator = Arc::new(LlmGenerator::new(llm_client));

    Ok(ResearchEngine::new(generator, backend, config))
}

async fn ask_once(question: &str) -> anyhow::Result<()> {
    info!(question, "Researching");
    let config = ResearchConfig::from_env();

    let result = match build_engine(&config) {
        Ok(engine) => engine.run(question, None).await,
        Err(e) => {
            error!("Setup failed: {:#}", e);
            let failed = SessionResult {
                answer: format!("Error: {:#}", e),
                citations: Vec::new(),
                slots: Vec::new(),
                filled_slots: Vec::new(),
                rounds: 0,
            };
            println!("{}", serde_json::to_string_pretty(&failed)?);
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_bot() -> anyhow::Result<()> {
    let token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    let config = ResearchConfig::from_env();
    info!(?config, "Research config loaded");
    let engine = Arc::new(build_engine(&config)?);

    // Parse admin user IDs from env
    let admin_ids: HashSet<u64> = dotenv::var("ADMIN_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if !admin_ids.is_empty() {
        info!(count = admin_ids.len(), "Admin users configured");
    }

    let app_state = AppState {
        engine,
        admin_ids,
        config: Arc::new(RwLock::new(config)),
    };

    let intents =
        serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGES;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::research()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                info!("Registering {} top-level command(s):", commands.len());
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                    for sub in &cmd.subcommands {
                        info!("    /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        gid,
                    )
                    .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    )
                    .await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting research Discord bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
