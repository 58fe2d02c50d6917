use qanun::config::{Config, DEFAULT_CONFIG_PATH};
use qanun::loader::{save_corpus, LoaderError};
use qanun_webscraper::WebScraper;

const DEFAULT_URL: &str = "https://rc.majlis.ir/fa/law/show/1791612";
const PREVIEW_CHARS: usize = 1000;

/// Scrapes a law page and saves its text as the corpus.
///
/// Usage: `cargo run --example scrape_law [url]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let url = std::env::args().nth(1).unwrap_or(DEFAULT_URL.to_string());
    let config = Config::load_or_default(DEFAULT_CONFIG_PATH)?;
    let scraper = WebScraper::new(&serde_json::json!({ "url": url }).to_string())?;

    let text = match scraper.scrape().await {
        Ok(text) => text,
        Err(e @ (LoaderError::Http { .. } | LoaderError::NoSubstantialText(_))) => {
            eprintln!("Failed to extract law text: {e}");
            eprintln!("The site may be blocking requests or its layout may have changed.");
            eprintln!("Use the `manual_input` example to paste the text instead.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    save_corpus(&config.corpus_path, &text).await?;
    println!(
        "Saved {} characters to {}",
        text.chars().count(),
        config.corpus_path.display()
    );

    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    println!("{}", "=".repeat(50));
    println!("{preview}");
    println!("{}", "=".repeat(50));
    Ok(())
}
