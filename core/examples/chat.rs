use std::io::{self, BufRead, Write};

use qanun::config::DEFAULT_CONFIG_PATH;
use qanun::prelude::*;
use tracing_subscriber::EnvFilter;

/// Terminal chat over the knowledge base. `exit` or `quit` ends the session.
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config_path = std::env::args().nth(1).unwrap_or(DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    let assistant = Assistant::open(&config).await;

    match assistant.model() {
        Some(model) => {
            println!("Model: {model}");
            for available in assistant.available_models().iter().take(3) {
                println!("  • {available}");
            }
        }
        None => println!("{}", assistant.not_ready_reason().unwrap_or_default()),
    }

    let mut transcript: Vec<ConversationTurn> = Vec::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("سوال: ");
        io::stdout().flush().ok();
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        transcript.push(ConversationTurn::user(question));
        let turn = assistant.ask(question).await;
        println!("پاسخ: {}", turn.content);
        if !turn.sources.is_empty() {
            println!("منابع: {}", turn.sources.join(", "));
        }
        transcript.push(turn);
    }

    let asked = transcript.iter().filter(|t| t.role == Role::User).count();
    println!("تعداد سوالات این جلسه: {asked}");
    Ok(())
}
