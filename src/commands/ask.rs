use tracing::info;

use crate::agent::SessionResult;
use crate::state::Context;

/// Discord caps messages at 2000 chars; leave a little headroom.
const CHUNK_LIMIT: usize = 1990;

/// Research a question on the web and answer with sources
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Extra search rounds allowed (admin only)"] max_rounds: Option<u32>,
) -> Result<(), anyhow::Error> {
    // Acknowledge immediately so the user isn't staring at a loading spinner
    let user_mention = format!("<@{}>", ctx.author().id);
    ctx.say(format!(
        "Got it, researching that for you. I'll ping you when the answer is ready, {}",
        user_mention
    ))
    .await?;

    let is_admin = ctx.data().is_admin(ctx.author().id.get());
    let configured_rounds = ctx.data().config.read().await.max_rounds;
    let rounds = match max_rounds {
        Some(r) if is_admin => r,
        _ => configured_rounds,
    };

    info!(
        user = %ctx.author().name,
        question, rounds, is_admin, "Research query started"
    );

    let result = ctx.data().engine.run(&question, Some(rounds)).await;

    info!(
        rounds = result.rounds,
        answer_len = result.answer.len(),
        citations = result.citations.len(),
        "Research query complete"
    );

    let full = render_reply(&user_mention, &question, &result);
    for chunk in split_chunks(&full, CHUNK_LIMIT) {
        // ctx.say() routes follow-ups through the interaction webhook, which
        // doesn't require Send Messages channel permission.
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Format a session result as a Discord message.
fn render_reply(user_mention: &str, question: &str, result: &SessionResult) -> String {
    let mut full = format!(
        "{} here's what I found:\n\n**Q:** {}\n**Search rounds:** {}",
        user_mention,
        question,
        result.rounds + 1
    );

    if !result.slots.is_empty() {
        let coverage: Vec<String> = result
            .slots
            .iter()
            .map(|s| {
                let mark = if result.filled_slots.contains(s) { "✓" } else { "✗" };
                format!("{} {}", mark, s)
            })
            .collect();
        full.push_str(&format!(" | **Coverage:** {}", coverage.join(", ")));
    }

    full.push_str(&format!("\n\n**A:** {}", result.answer));

    if !result.citations.is_empty() {
        full.push_str("\n\n**Sources:**\n");
        for c in &result.citations {
            if c.url.is_empty() {
                full.push_str(&format!("[{}] {}\n", c.id, c.title));
            } else {
                // <> suppresses Discord's link preview embeds
                full.push_str(&format!("[{}] [{}](<{}>)\n", c.id, c.title, c.url));
            }
        }
    }

    full
}

/// Split text into chunks of at most `limit` bytes, preferring line then
/// word boundaries and never cutting through a UTF-8 character.
fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= limit {
            chunks.push(remaining);
            break;
        }

        let mut hard = limit;
        while !remaining.is_char_boundary(hard) {
            hard -= 1;
        }
        if hard == 0 {
            hard = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let window = &remaining[..hard];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(hard);

        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::citations::Citation;

    fn result() -> SessionResult {
        SessionResult {
            answer: "Argentina won.[1][2]".to_string(),
            citations: vec![
                Citation {
                    id: 1,
                    title: "FIFA".to_string(),
                    url: "https://fifa.com".to_string(),
                },
                Citation {
                    id: 2,
                    title: "Some blog".to_string(),
                    url: String::new(),
                },
            ],
            slots: vec!["winner".to_string(), "score".to_string()],
            filled_slots: vec!["winner".to_string()],
            rounds: 1,
        }
    }

    #[test]
    fn test_render_reply() {
        let text = render_reply("<@1>", "Who won?", &result());
        assert!(text.starts_with("<@1> here's what I found:"));
        assert!(text.contains("**Search rounds:** 2 | **Coverage:** ✓ winner, ✗ score"));
        assert!(text.contains("**A:** Argentina won.[1][2]"));
        assert!(text.contains("[1] [FIFA](<https://fifa.com>)\n"));
        assert!(text.contains("[2] Some blog\n"));
    }

    #[test]
    fn test_render_reply_without_slots_or_sources() {
        let mut r = result();
        r.slots.clear();
        r.citations.clear();
        let text = render_reply("<@1>", "Q", &r);
        assert!(!text.contains("Coverage"));
        assert!(!text.contains("Sources"));
    }

    #[test]
    fn test_split_prefers_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_chunks(text, 10), vec!["aaaa\nbbbb\n", "cccc"]);
    }

    #[test]
    fn test_split_hard_cut_respects_char_boundary() {
        let text = "ééééé"; // 10 bytes
        let chunks = split_chunks(text, 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_short_text() {
        assert_eq!(split_chunks("hi", 10), vec!["hi"]);
        assert!(split_chunks("", 10).is_empty());
    }
}
