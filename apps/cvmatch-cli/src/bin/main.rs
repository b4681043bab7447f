use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use cvmatch_core::config::{expand_path, Config, Settings};
use cvmatch_core::data_processor::DataProcessor;
use cvmatch_core::types::FewShotExample;
use cvmatch_extract::{CompletionParams, PromptRefiner};
use cvmatch_hybrid::{fetch_by_id, load_corpus_stats, IngestOutcome, Ingestor, QuestionAnswerer, Ranker, Services};

const USAGE: &str = "Usage: cvmatch <command> [args...]

Commands:
  ingest [dir] [--limit N]       index .txt/.md résumés from a directory
  seed-examples <file.json>      store few-shot examples and instructions
  rank \"<job description>\" [--json]
  fetch <candidate-id>
  ask <candidate-id> \"<question>\"";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&settings, &args),
        "seed-examples" => seed_examples(&settings, &args),
        "rank" => rank(&settings, &args),
        "fetch" => {
            let id = required(&args, 0, "cvmatch fetch <candidate-id>");
            let services = Services::from_settings(&settings)?;
            let text = fetch_by_id(services.index.as_ref(), &settings.index.cv_namespace, &id)?;
            println!("{text}");
            Ok(())
        }
        "ask" => {
            let id = required(&args, 0, "cvmatch ask <candidate-id> \"<question>\"");
            let question = required(&args, 1, "cvmatch ask <candidate-id> \"<question>\"");
            let services = Services::from_settings(&settings)?;
            let answer = QuestionAnswerer::new(&services, &settings).answer_question(&id, &question)?;
            println!("{answer}");
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {cmd}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
}

fn required(args: &[String], pos: usize, usage: &str) -> String {
    args.get(pos).cloned().unwrap_or_else(|| {
        eprintln!("Usage: {usage}");
        std::process::exit(1)
    })
}

fn ingest(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let mut data_dir = None;
    let mut limit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                let value = args.get(i + 1).and_then(|v| v.parse::<usize>().ok());
                let Some(value) = value else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                };
                limit = Some(value);
                i += 1;
            }
            arg if !arg.starts_with('-') => data_dir = Some(PathBuf::from(arg)),
            _ => {}
        }
        i += 1;
    }
    let data_dir = data_dir.unwrap_or_else(|| expand_path(&settings.data.cv_text_dir));
    println!("Ingesting résumés from {}", data_dir.display());

    let processor = DataProcessor::new();
    let documents = match limit {
        Some(limit) => processor.load_directory_limited(&data_dir, limit)?,
        None => processor.load_directory(&data_dir)?,
    };
    if documents.is_empty() {
        println!("Nothing to ingest.");
        return Ok(());
    }

    let services = Services::from_settings(settings)?;
    let ingestor = Ingestor::new(&services, settings, load_corpus_stats(&settings.sparse)?);
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let outcomes = ingestor.ingest_all(documents, |outcome| {
        match outcome {
            IngestOutcome::Ingested(id) => pb.set_message(format!("indexed {id}")),
            IngestOutcome::Skipped(id) => pb.set_message(format!("skipped {id}")),
            IngestOutcome::Blank(id) => pb.set_message(format!("empty {id}")),
            IngestOutcome::Failed { id, .. } => pb.set_message(format!("failed {id}")),
        }
        pb.inc(1);
    });
    pb.finish_with_message("done");
    ingestor.save_stats()?;

    let count = |pred: fn(&IngestOutcome) -> bool| outcomes.iter().filter(|o| pred(o)).count();
    let ingested = count(|o| matches!(o, IngestOutcome::Ingested(_)));
    let skipped = count(|o| matches!(o, IngestOutcome::Skipped(_) | IngestOutcome::Blank(_)));
    println!("✅ Ingested {ingested} résumés, skipped {skipped} (already indexed or empty)");
    for outcome in &outcomes {
        if let IngestOutcome::Failed { id, reason } = outcome {
            println!("❌ {id}: {reason}");
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct FewShotFile {
    examples: Vec<FewShotExample>,
    #[serde(default)]
    instructions: String,
}

fn seed_examples(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let path = expand_path(required(args, 0, "cvmatch seed-examples <file.json>"));
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let file: FewShotFile = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let services = Services::from_settings(settings)?;
    let refiner = PromptRefiner::new(
        services.embedder.clone(),
        services.index.clone(),
        services.completion.clone(),
        settings.index.examples_namespace.clone(),
        settings.ranking.examples_top_k,
        settings.cache.capacity,
        CompletionParams::from_settings(&settings.completion),
    );
    let count = refiner.seed_examples(&file.examples, &file.instructions)?;
    println!("✅ Stored {count} records in '{}'", settings.index.examples_namespace);
    Ok(())
}

fn rank(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let as_json = args.iter().any(|a| a == "--json");
    let job = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| required(&[], 0, "cvmatch rank \"<job description>\" [--json]"));

    let services = Services::from_settings(settings)?;
    let ranker = Ranker::new(&services, settings, load_corpus_stats(&settings.sparse)?)?;
    let results = ranker.rank(&job)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No candidates satisfy the mandatory conditions.");
        return Ok(());
    }
    println!("Found {} matching candidates:", results.len());
    for (rank, result) in results.iter().enumerate() {
        let info = &result.extracted_info;
        let skills: Vec<&str> = info.skills.iter().map(String::as_str).collect();
        println!(
            "{:>2}. {} (score {:.4}) - {}, {} years, skills: {}{}",
            rank + 1,
            result.candidate_id,
            result.similarity_score,
            if info.job_title.is_empty() { "unknown title" } else { info.job_title.as_str() },
            info.years_of_experience,
            skills.join(", "),
            if result.extraction_degraded { " [extraction degraded]" } else { "" }
        );
    }
    Ok(())
}
