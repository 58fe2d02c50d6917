use qanun::config::DEFAULT_CONFIG_PATH;
use qanun::prelude::*;
use tracing_subscriber::EnvFilter;

/// Chunks the corpus, embeds every passage and writes the passage store.
///
/// Usage: `cargo run --example build_knowledge_base [config.json]`
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("qanun=info".parse().unwrap()))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or(DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    if !config.corpus_path.exists() {
        eprintln!(
            "Corpus {} not found. Run the `manual_input` example or the web scraper first.",
            config.corpus_path.display()
        );
        return Ok(());
    }

    let documents = FileLoader::new(vec![config.corpus_path.display().to_string()])?
        .load()
        .await?;
    let passages = Chunker::new(config.chunk_size, config.chunk_overlap)?.chunk_documents(&documents)?;
    println!("Split corpus into {} passages", passages.len());

    let embedder = OpenAIEmbedding::from_config(&config.embedding)?;
    let store = index::build_and_persist(passages, &embedder, &config.store_dir).await?;

    let manifest = store.manifest();
    println!(
        "Knowledge base written to {} ({} passages, {} dimensions, model {})",
        config.store_dir.display(),
        manifest.passage_count,
        manifest.dimensions,
        manifest.embedding_model
    );
    Ok(())
}
