//! `selah chat`: one buffered turn from the terminal.

use selah_config::AppConfig;
use selah_core::ChatMode;
use selah_engine::{ChatReply, ChatRequest};
use tokio_util::sync::CancellationToken;

pub async fn run(
    message: String,
    mode: Option<String>,
    user: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    SELAH_API_KEY, OPENAI_API_KEY or OPENROUTER_API_KEY");
        eprintln!();
        eprintln!("  Or add `api_key` to {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let engine = selah_gateway::build_engine(&config).await?;

    let mut request = ChatRequest::new(message.trim())
        .with_mode(ChatMode::resolve(mode.as_deref()));
    if let Some(user) = user {
        request = request.with_user(user);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    eprint!("  Thinking...");
    let result = engine.respond(request, cancel).await;
    eprint!("\r              \r");

    let reply = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        print!("{}", render(&reply));
    }
    Ok(())
}

/// Human-readable reply: the text, then sources and tool activity if any.
fn render(reply: &ChatReply) -> String {
    let mut out = format!("{}\n", reply.response);

    if !reply.sources.is_empty() {
        out.push_str("\nSources:\n");
        for s in &reply.sources {
            out.push_str(&format!(
                "  {} {}:{} ({})\n",
                s.book, s.chapter, s.verse, s.translation
            ));
        }
    }
    if !reply.tools_used.is_empty() {
        out.push_str(&format!("\nSaved: {}\n", reply.tools_used.join(", ")));
    }
    if let Some(c) = &reply.celebration {
        out.push_str(&format!("\n* {}\n", c.message));
    }
    out
}
