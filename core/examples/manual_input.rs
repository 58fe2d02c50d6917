use qanun::config::DEFAULT_CONFIG_PATH;
use qanun::prelude::*;

const PREVIEW_CHARS: usize = 500;

/// Reads law text pasted on the terminal and saves it as the corpus.
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().init();

    let config = Config::load_or_default(DEFAULT_CONFIG_PATH)?;

    println!("Paste the Persian law text below.");
    println!("Press Enter twice when you're finished.");
    println!("{}", "-".repeat(50));

    let stdin = std::io::stdin();
    let Some(text) = ManualInput::new(stdin.lock()).read_text()? else {
        println!("No text received");
        return Ok(());
    };

    save_corpus(&config.corpus_path, &text).await?;
    println!(
        "Saved {} characters to {}",
        text.chars().count(),
        config.corpus_path.display()
    );

    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    println!("{}", "=".repeat(40));
    if text.chars().count() > PREVIEW_CHARS {
        println!("{preview}...");
    } else {
        println!("{preview}");
    }
    println!("{}", "=".repeat(40));
    Ok(())
}
