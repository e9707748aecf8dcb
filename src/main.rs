//! # cinescope CLI
//!
//! Command-line front-end for the movie catalog. Each subcommand plays the part
//! of one page of the discovery site:
//!
//! - `movie`: movie details with recommendations
//! - `search`: semantic search over the collection
//! - `browse`: list the collection
//! - `embed`: generate one embedding
//! - `embed-batch`: generate embeddings for a file of prompts
//!
//! Catalog commands read `ASTRA_DB_API_ENDPOINT` and `ASTRA_DB_APPLICATION_TOKEN`,
//! embedding commands read `OPENAI_API_KEY`.

mod telemetry;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::instrument;

use cinescope::catalog::{DataApiCollection, Movie, MovieStore};
use cinescope::config::Settings;
use cinescope::embedding::{
    BatchOptions, DEFAULT_DIMENSIONS, DEFAULT_MODEL, EmbedOptions, EmbeddingClient, read_prompts,
};
use cinescope::recommend::{RetrievalOutcome, find_similar_or_fallback, similarity_percent};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Movie discovery over a hosted vector catalog",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a movie with recommendations
    Movie(MovieArgs),

    /// Search the collection
    Search(SearchArgs),

    /// List movies in the collection
    Browse(BrowseArgs),

    /// Generate an embedding for a prompt
    Embed(EmbedArgs),

    /// Generate embeddings for every line of a file
    EmbedBatch(EmbedBatchArgs),
}

#[derive(Args, Debug)]
struct MovieArgs {
    /// Movie identifier
    #[arg(required = true)]
    id: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search term
    #[arg(required = true)]
    term: String,

    /// Limit results
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Embed the term locally instead of letting the database vectorize it
    #[arg(long)]
    client_embed: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    /// Maximum number of movies to list
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct EmbeddingArgs {
    /// Embedding model
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Embedding dimensions
    #[arg(short, long, default_value_t = DEFAULT_DIMENSIONS)]
    dimensions: usize,

    /// Bypass the embedding cache
    #[arg(long)]
    no_cache: bool,

    /// Retries after a failed attempt (attempts = retries + 1)
    #[arg(long, default_value = "3")]
    max_retries: u32,
}

impl EmbeddingArgs {
    fn options(&self) -> EmbedOptions {
        EmbedOptions::default()
            .with_model(self.model.clone())
            .with_dimensions(self.dimensions)
            .with_cache(!self.no_cache)
            .with_max_retries(self.max_retries)
    }
}

#[derive(Args, Debug)]
struct EmbedArgs {
    /// Text to embed
    #[arg(required = true)]
    prompt: String,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

#[derive(Args, Debug)]
struct EmbedBatchArgs {
    /// File with one prompt per line
    #[arg(required = true)]
    file: PathBuf,

    /// Number of prompts embedded concurrently
    #[arg(short, long, default_value = "5")]
    batch_size: usize,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber()?;
    let settings = Settings::from_env();

    match cli.command {
        Some(Commands::Movie(args)) => {
            movie_command(args, &settings).await?;
        }
        Some(Commands::Search(args)) => {
            search_command(args, &settings).await?;
        }
        Some(Commands::Browse(args)) => {
            browse_command(args, &settings).await?;
        }
        Some(Commands::Embed(args)) => {
            embed_command(args, &settings).await?;
        }
        Some(Commands::EmbedBatch(args)) => {
            embed_batch_command(args, &settings).await?;
        }
        None => {
            let _ = Cli::parse_from(["cinescope", "--help"]);
        }
    }

    Ok(())
}

fn print_movie(movie: &Movie) {
    println!("{}", movie.title);
    println!("Genre: {}", movie.genre);
    if let Some(description) = movie.description() {
        println!("\n{}\n", description);
    }

    let details = [
        ("Director", &movie.director),
        ("Actors", &movie.actors),
        ("Box Office", &movie.box_office),
        ("Released", &movie.released),
        ("Runtime", &movie.runtime),
        ("Rated", &movie.rated),
        ("IMDB Rating", &movie.imdb_rating),
        ("Language", &movie.language),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
}

fn print_recommendations(outcome: &RetrievalOutcome) {
    println!("\n{}", outcome.heading());
    if let Some(notice) = outcome.notice() {
        println!("{}", notice);
    }

    if outcome.is_empty() {
        println!("No similar movies found");
        return;
    }

    for card in outcome.cards() {
        match outcome {
            RetrievalOutcome::Vector(_) => println!(
                "{}. {} ({}) - {}% match",
                card.rank, card.movie.title, card.movie.genre, card.similarity_percent
            ),
            _ => println!("{}. {} ({})", card.rank, card.movie.title, card.movie.genre),
        }
    }
}

#[instrument(skip(settings))]
async fn movie_command(args: MovieArgs, settings: &Settings) -> anyhow::Result<()> {
    let store = DataApiCollection::new(&settings.catalog)?;

    let movie = store
        .find_by_id(&args.id)
        .await?
        .ok_or_else(|| anyhow!("Movie not found: {}", args.id))?;

    let outcome = find_similar_or_fallback(&store, &movie).await;

    match args.format.as_str() {
        "json" => {
            let json_response = serde_json::json!({
                "movie": movie.without_vector(),
                "recommendations": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&json_response)?);
        }
        _ => {
            print_movie(&movie);
            print_recommendations(&outcome);
        }
    }

    Ok(())
}

#[instrument(skip(settings))]
async fn search_command(args: SearchArgs, settings: &Settings) -> anyhow::Result<()> {
    let term = args.term.trim();
    if term.is_empty() {
        return Err(anyhow!("Search term must not be empty"));
    }

    let store = DataApiCollection::new(&settings.catalog)?;

    let results: Vec<(Movie, Option<f64>)> = if args.client_embed {
        let client = EmbeddingClient::new(settings.embedding.clone())?;
        let vector = client.embed(term, &EmbedOptions::default()).await?;
        store
            .find_similar(&vector, args.limit)
            .await?
            .into_iter()
            .map(|result| (result.movie.without_vector(), result.similarity))
            .collect()
    } else {
        store
            .search_text(term, args.limit)
            .await?
            .into_iter()
            .map(|movie| (movie, None))
            .collect()
    };

    match args.format.as_str() {
        "json" => {
            let json_response = serde_json::json!({
                "term": term,
                "results": results.iter().map(|(movie, similarity)| {
                    serde_json::json!({
                        "movie": movie,
                        "similarity": similarity,
                    })
                }).collect::<Vec<_>>()
            });
            println!("{}", serde_json::to_string_pretty(&json_response)?);
        }
        _ => {
            if results.is_empty() {
                println!("No movies found. Try a different search term.");
                return Ok(());
            }

            println!("Search results for \"{}\"", term);
            for (i, (movie, similarity)) in results.iter().enumerate() {
                match similarity {
                    Some(_) => println!(
                        "{}. {} ({}) - {}% match",
                        i + 1,
                        movie.title,
                        movie.genre,
                        similarity_percent(*similarity)
                    ),
                    None => println!("{}. {} ({})", i + 1, movie.title, movie.genre),
                }
            }
        }
    }

    Ok(())
}

#[instrument(skip(settings))]
async fn browse_command(args: BrowseArgs, settings: &Settings) -> anyhow::Result<()> {
    let store = DataApiCollection::new(&settings.catalog)?;

    let movies = store.list(args.limit).await?;

    println!("Movies: {}", movies.len());
    for movie in movies {
        println!("{} - {} ({})", movie.id, movie.title, movie.genre);
    }

    Ok(())
}

#[instrument(skip(settings))]
async fn embed_command(args: EmbedArgs, settings: &Settings) -> anyhow::Result<()> {
    let client = EmbeddingClient::new(settings.embedding.clone())?;

    let vector = client.embed(&args.prompt, &args.embedding.options()).await?;

    println!("{}", serde_json::to_string(&vector)?);
    Ok(())
}

#[instrument(skip(settings))]
async fn embed_batch_command(args: EmbedBatchArgs, settings: &Settings) -> anyhow::Result<()> {
    let prompts = read_prompts(&args.file).await?;
    let client = EmbeddingClient::new(settings.embedding.clone())?;

    let options = BatchOptions::default()
        .with_batch_size(args.batch_size)
        .with_embed_options(args.embedding.options());

    let (progress_sender, mut progress_receiver) = mpsc::channel(100);

    let progress_bar = ProgressBar::new(prompts.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Embedding prompts...");

    let start_time = std::time::Instant::now();

    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(completed) = progress_receiver.recv().await {
                progress_bar.inc(completed as u64);
            }
        }
    });

    let result = client
        .embed_batch_with_progress(&prompts, &options, Some(progress_sender))
        .await;

    // The sender was moved into the batch call, so the task ends once it returns
    let _ = progress_handle.await;

    let vectors = match result {
        Ok(vectors) => {
            progress_bar.finish_with_message("Embedding completed");
            vectors
        }
        Err(e) => {
            progress_bar.abandon_with_message("Embedding failed");
            return Err(e.into());
        }
    };

    eprintln!(
        "Embedded {} prompts in {:.2?}",
        vectors.len(),
        start_time.elapsed()
    );
    println!("{}", serde_json::to_string(&vectors)?);

    Ok(())
}
