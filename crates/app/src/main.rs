use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_study_core::{
    answer_from_context, digest_file, discover_pdf_files, extract_document_text,
    generate_flashcards, generate_mind_map, generate_qa_pairs, generate_questions,
    generate_summary, render_dot, source_file_name, CharacterNgramEmbedder, ChunkingConfig,
    DocumentPipeline, DocumentRegistry, Embedder, HttpEmbedder, LlmClient, PipelineError,
    UnicodeSentenceSplitter, VectorStore, DEFAULT_MAX_WORDS, DEFAULT_STORE_DIR, DEFAULT_TOP_K,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-study", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the vector index and chunk record artifacts.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Upper bound on words per indexed chunk.
    #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, clean, chunk, and index a PDF file or a folder of PDFs.
    Ingest {
        /// PDF file, or folder searched recursively.
        #[arg(long)]
        path: PathBuf,
        /// Also summarize each document while it indexes.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// Print the indexed chunks most similar to a query.
    Query {
        /// Query text.
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Answer a question from the most similar indexed chunks.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,
        /// Number of chunks to ground the answer in.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Summarize a PDF without indexing it.
    Summarize {
        /// PDF to summarize.
        #[arg(long)]
        file: PathBuf,
    },
    /// Generate concept flashcards from a PDF.
    Flashcards {
        /// PDF to draw flashcards from.
        #[arg(long)]
        file: PathBuf,
    },
    /// Generate question and answer pairs from a PDF.
    Qna {
        /// PDF to draw pairs from.
        #[arg(long)]
        file: PathBuf,
        /// Number of pairs to request.
        #[arg(long, default_value_t = 3)]
        pairs: usize,
    },
    /// Render a PDF's key concepts as a Graphviz mind map.
    Mindmap {
        /// PDF to map.
        #[arg(long)]
        file: PathBuf,
        /// Write the DOT graph here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate free-form practice questions from a PDF.
    Questions {
        /// PDF to draw questions from.
        #[arg(long)]
        file: PathBuf,
        /// Question style, e.g. "short answer" or "multiple choice".
        #[arg(long, default_value = "short answer")]
        question_type: String,
        /// Difficulty to aim for.
        #[arg(long, default_value = "medium")]
        difficulty: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let Cli {
        command,
        store_dir,
        max_words,
    } = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-study boot"
    );

    match command {
        Command::Ingest { path, summary } => {
            run_ingest(&store_dir, max_words, &path, summary).await?;
        }
        Command::Query { query, top_k } => {
            run_query(&store_dir, max_words, &query, top_k).await?;
        }
        Command::Ask { question, top_k } => {
            run_ask(&store_dir, max_words, &question, top_k).await?;
        }
        Command::Summarize { file } => {
            let text = extract_document_text(&file)?;
            let client = LlmClient::from_env()?;
            let summary = generate_summary(&client, &text).await?;
            println!("{summary}");
        }
        Command::Flashcards { file } => {
            let text = extract_document_text(&file)?;
            let client = LlmClient::from_env()?;
            let cards = generate_flashcards(&client, &text).await?;

            if cards.is_empty() {
                println!("model produced no usable flashcards");
            }
            for (position, card) in cards.iter().enumerate() {
                println!("{}. {}\n   {}", position + 1, card.concept, card.details);
            }
        }
        Command::Qna { file, pairs } => {
            let text = extract_document_text(&file)?;
            let client = LlmClient::from_env()?;
            let qa_pairs = generate_qa_pairs(&client, &text, pairs).await?;

            for pair in &qa_pairs {
                println!("Q: {}\nA: {}\n", pair.question, pair.answer);
            }
        }
        Command::Mindmap { file, out } => {
            let text = extract_document_text(&file)?;
            let client = LlmClient::from_env()?;
            let map = generate_mind_map(&client, &text).await?;
            let dot = render_dot(&map);

            match out {
                Some(out_path) => {
                    tokio::fs::write(&out_path, &dot).await?;
                    println!(
                        "mind map with {} nodes and {} links written to {}",
                        map.nodes.len(),
                        map.links.len(),
                        out_path.display()
                    );
                }
                None => print!("{dot}"),
            }
        }
        Command::Questions {
            file,
            question_type,
            difficulty,
        } => {
            let text = extract_document_text(&file)?;
            let client = LlmClient::from_env()?;
            let questions = generate_questions(&client, &text, &question_type, &difficulty).await?;
            println!("{questions}");
        }
    }

    Ok(())
}

fn select_embedder() -> anyhow::Result<Arc<dyn Embedder>> {
    match HttpEmbedder::from_env()? {
        Some(remote) => {
            info!(model = remote.model(), "using remote embedding endpoint");
            Ok(Arc::new(remote))
        }
        None => {
            info!("no embedding endpoint configured, using local character n-gram embedder");
            Ok(Arc::new(CharacterNgramEmbedder::default()))
        }
    }
}

async fn open_pipeline(
    store_dir: &Path,
    max_words: usize,
) -> anyhow::Result<Arc<DocumentPipeline>> {
    let embedder = select_embedder()?;
    let store = Arc::new(VectorStore::open(store_dir, embedder).await?);
    let pipeline = DocumentPipeline::new(
        Arc::new(UnicodeSentenceSplitter),
        ChunkingConfig { max_words },
        store,
    )?;

    Ok(Arc::new(pipeline))
}

async fn run_ingest(
    store_dir: &Path,
    max_words: usize,
    path: &Path,
    with_summary: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }

    let files = if path.is_dir() {
        discover_pdf_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("no pdf files found in {}", path.display());
    }

    let pipeline = open_pipeline(store_dir, max_words).await?;
    let registry = Arc::new(DocumentRegistry::default());

    let summarizer = if with_summary {
        match LlmClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(error) => {
                warn!(%error, "summaries requested but the study llm is unavailable");
                None
            }
        }
    } else {
        None
    };

    let mut tasks = Vec::new();
    let mut skipped = 0usize;

    for file in files {
        let prepared = (|| {
            let source_filename = source_file_name(&file)?;
            let checksum = digest_file(&file)?;
            let text = extract_document_text(&file)?;
            Ok::<_, PipelineError>((source_filename, checksum, text))
        })();

        let (source_filename, checksum, text) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(path = %file.display(), %error, "skipping pdf");
                skipped += 1;
                continue;
            }
        };

        let document_id = registry.register(&source_filename, &checksum, &text).await;
        println!("{source_filename}: registered as {document_id}");

        let index_pipeline = pipeline.clone();
        let index_text = text.clone();
        let index_doc = document_id.to_string();
        let index_name = source_filename.clone();
        tasks.push(tokio::spawn(async move {
            match index_pipeline
                .process_document(&index_text, &index_doc, &index_name)
                .await
            {
                Ok(outcome) => {
                    if let Some(persist_error) = outcome.report.persist_error {
                        warn!(
                            source = %index_name,
                            persist_error = %persist_error,
                            "indexed but store was not persisted"
                        );
                    }
                    println!(
                        "{}: indexed {} chunks ({} vectors total)",
                        index_name, outcome.report.added, outcome.report.total_vectors
                    );
                }
                Err(error) => warn!(source = %index_name, %error, "indexing failed"),
            }
        }));

        if let Some(client) = &summarizer {
            let summary_client = client.clone();
            let summary_registry = registry.clone();
            let summary_name = source_filename.clone();
            tasks.push(tokio::spawn(async move {
                match generate_summary(summary_client.as_ref(), &text).await {
                    Ok(summary) => {
                        summary_registry
                            .attach_summary(document_id, summary.clone())
                            .await;
                        println!("{summary_name} summary:\n{summary}\n");
                    }
                    Err(error) => warn!(source = %summary_name, %error, "summary failed"),
                }
            }));
        }
    }

    for task in tasks {
        if let Err(error) = task.await {
            warn!(%error, "background task panicked");
        }
    }

    info!(documents = registry.len().await, skipped, "ingest finished");
    Ok(())
}

async fn run_query(
    store_dir: &Path,
    max_words: usize,
    query: &str,
    top_k: usize,
) -> anyhow::Result<()> {
    let pipeline = open_pipeline(store_dir, max_words).await?;
    let results = pipeline.query(query, top_k).await?;

    if results.is_empty() {
        println!("no matching chunks (is anything indexed yet?)");
        return Ok(());
    }

    println!("query: {query}");
    for (position, chunk_text) in results.iter().enumerate() {
        println!("[{}]\n{}\n", position + 1, chunk_text);
    }

    Ok(())
}

async fn run_ask(
    store_dir: &Path,
    max_words: usize,
    question: &str,
    top_k: usize,
) -> anyhow::Result<()> {
    let pipeline = open_pipeline(store_dir, max_words).await?;
    let results = pipeline.query(question, top_k).await?;

    if results.is_empty() {
        println!("no indexed material matches the question");
        return Ok(());
    }

    let client = LlmClient::from_env()?;
    let context = results.join("\n\n");
    let answer = answer_from_context(&client, question, &context).await?;

    println!("answer:\n{answer}\n");
    println!("drawn from {} chunk(s):", results.len());
    for (position, chunk_text) in results.iter().enumerate() {
        println!("[{}] {}", position + 1, chunk_text);
    }

    Ok(())
}
