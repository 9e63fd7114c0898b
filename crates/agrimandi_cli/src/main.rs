mod repl;
mod settings;

use agrimandi_core::{
    evaluate_cases, ChatConfig, DisabledIntentClassifier, DistilBertQaModel, EvalCase, FaqLookup,
    FaqStore, IntentClassifier, KeywordIntentClassifier, LexicalQaModel, QaFallback, QaModel,
    ResponseResolver, ResponseTemplates, TextNormalizer, FALLBACK_CONTEXT,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.85;
/// Bundled FAQ data, located next to this crate rather than the working directory.
const DEFAULT_FAQ_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/faq_data.json");

#[derive(Debug, Parser)]
#[command(name = "agrimandi", version)]
#[command(about = "Farming assistant: greetings, intents, fuzzy FAQ and a QA fallback")]
struct Cli {
    /// JSON object mapping FAQ questions to answers.
    #[arg(
        long,
        global = true,
        env = "AGRIMANDI_FAQ_PATH",
        default_value = DEFAULT_FAQ_PATH
    )]
    faq_path: PathBuf,

    /// Intent keyword rules (JSON). Intent templates are skipped without it.
    #[arg(long, global = true, env = "AGRIMANDI_INTENTS")]
    intents: Option<PathBuf>,

    /// Text file replacing the built-in QA context passage.
    #[arg(long, global = true, env = "AGRIMANDI_CONTEXT_PATH")]
    context_path: Option<PathBuf>,

    /// TOML file with pipeline settings.
    #[arg(long, global = true, env = "AGRIMANDI_CONFIG")]
    config: Option<PathBuf>,

    /// DistilBERT QA weights (.safetensors). Needs --tokenizer-path as well.
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Path to the tokenizer.json file. Required when --model-path is set.
    #[arg(long, global = true)]
    tokenizer_path: Option<PathBuf>,

    /// FAQ acceptance threshold (0-100); overrides the config file.
    #[arg(long, global = true)]
    threshold: Option<u8>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer a single question and exit.
    Ask { question: String },
    /// Run labelled cases through the pipeline and report the pass rate.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn make_config(cli: &Cli) -> Result<ChatConfig> {
    let mut config = settings::load_config(cli.config.as_deref())?;
    if let Some(threshold) = cli.threshold {
        config.faq_threshold = threshold;
    }
    config.validate().map_err(|msg| anyhow::anyhow!(msg))?;
    Ok(config)
}

fn make_qa_model(cli: &Cli) -> Result<Arc<dyn QaModel>> {
    match (&cli.model_path, &cli.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            let ext = model.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext != "safetensors" {
                anyhow::bail!("unsupported model format '.{ext}' (expected .safetensors)");
            }
            eprintln!("Loading model from {} ...", model.display());
            let provider = DistilBertQaModel::load(model, tokenizer)
                .with_context(|| format!("load QA model {}", model.display()))?;
            eprintln!("Model loaded.");
            Ok(Arc::new(provider))
        }
        (None, None) => Ok(Arc::new(LexicalQaModel::default())),
        _ => anyhow::bail!("--model-path and --tokenizer-path must both be provided"),
    }
}

fn make_classifier(cli: &Cli, normalizer: &TextNormalizer) -> Result<Box<dyn IntentClassifier>> {
    match &cli.intents {
        Some(path) => {
            let classifier = KeywordIntentClassifier::load_json(path, normalizer)
                .with_context(|| format!("load intents from {}", path.display()))?;
            info!(rules = classifier.rules().len(), "intent classifier loaded");
            Ok(Box::new(classifier))
        }
        None => Ok(Box::new(DisabledIntentClassifier)),
    }
}

fn read_context(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read context {}", path.display()))
        }
        None => Ok(FALLBACK_CONTEXT.to_string()),
    }
}

fn build_resolver(cli: &Cli, config: &ChatConfig) -> Result<ResponseResolver> {
    let normalizer = TextNormalizer::default();

    let store = FaqStore::load_json(&cli.faq_path)
        .with_context(|| format!("load FAQ data from {}", cli.faq_path.display()))?;
    info!(entries = store.len(), path = %cli.faq_path.display(), "FAQ data loaded");

    let classifier = make_classifier(cli, &normalizer)?;
    let context = read_context(cli.context_path.as_deref())?;
    let model = make_qa_model(cli)?;

    Ok(ResponseResolver::new(
        config,
        normalizer,
        classifier,
        ResponseTemplates::default(),
        FaqLookup::new(store, normalizer, config),
        QaFallback::new(model, context, config),
    ))
}

fn read_eval_cases_json(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_reader(file).context("parse eval cases json")?;
    Ok(cases)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = make_config(&cli)?;
    let resolver = build_resolver(&cli, &config)?;

    match &cli.command {
        None => {
            let mut source = repl::EditorSource::new()?;
            let mut out = std::io::stdout();
            let end = repl::run_session(&mut source, &mut out, &resolver)?;
            info!(?end, "session finished");
        }
        Some(Commands::Ask { question }) => {
            println!("{}", resolver.get_response(question));
        }
        Some(Commands::Eval {
            cases,
            min_pass_rate,
        }) => {
            let run_id = format!("eval-{}", chrono::Utc::now().timestamp_millis());
            let cases = read_eval_cases_json(cases)?;
            let summary = evaluate_cases(&resolver, &cases);

            println!(
                "run_id={} total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_threshold={}",
                run_id,
                summary.total,
                summary.passed,
                summary.failed,
                summary.pass_rate,
                min_pass_rate,
                summary.meets(*min_pass_rate)
            );

            for o in &summary.outcomes {
                println!(
                    "case={} passed={} stage={:?} latency={:.1}ms answer={:?}",
                    o.case_id, o.passed, o.actual_stage, o.latency_ms, o.actual_answer
                );
            }

            let total_ms: f64 = summary.outcomes.iter().map(|o| o.latency_ms).sum();
            let avg_ms = total_ms / summary.outcomes.len().max(1) as f64;
            println!("total_latency={:.1}ms avg_latency={:.1}ms", total_ms, avg_ms);

            if !summary.meets(*min_pass_rate) {
                anyhow::bail!(
                    "pass rate {:.4} is below the required {:.4}",
                    summary.pass_rate,
                    min_pass_rate
                );
            }
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
