use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quizgen::clients::GeminiFactory;
use quizgen::config::{CredentialPool, GeneratorConfig, KeyCheck, ParseFailure};
use quizgen::core::QuestionGenerator;
use quizgen::remote::RemoteGenerator;
use quizgen::server::{self, SharedSource};
use quizgen::tui::QuizTui;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::warn;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 3030;

#[derive(Parser)]
#[command(author, version, about = "Generate multiple-choice quizzes from a prompt", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GENAI_KEYS               Comma separated API keys, tried in order
    GENAI_KEY                Single API key, used when GENAI_KEYS is unset
    GENAI_MODEL              Model id [default: gemini-2.0-flash]
    GENAI_MAX_OUTPUT_TOKENS  Output token ceiling [default: 8192]
    GENAI_KEY_CHECK          direct|probe [default: direct]
    GENAI_PARSE_FAILURE      empty|error [default: empty]
    RUST_LOG                 Log filter, e.g. quizgen=debug

EXAMPLES:
    quizgen serve --port 3030
    quizgen play capitals of Europe
    quizgen play --server http://127.0.0.1:3030
    quizgen ask 5 questions about the Rust borrow checker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the generator over HTTP (POST /api/generate)
    Serve(ServeArgs),
    /// Take a quiz in the terminal
    Play(PlayArgs),
    /// Generate once and print the questions as JSON
    Ask(AskArgs),
}

#[derive(Args, Debug)]
struct GeneratorArgs {
    /// Comma separated API keys (overrides GENAI_KEYS / GENAI_KEY)
    #[arg(long)]
    keys: Option<String>,

    /// Model id
    #[arg(long)]
    model: Option<String>,

    /// Output token ceiling; too small truncates larger quizzes
    #[arg(long)]
    max_output_tokens: Option<u32>,

    /// How keys are checked before use: direct or probe
    #[arg(long)]
    key_check: Option<KeyCheck>,

    /// What an unparseable response becomes: empty or error
    #[arg(long)]
    parse_failure: Option<ParseFailure>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    generator: GeneratorArgs,

    #[arg(long, default_value_t = DEFAULT_HOST)]
    host: IpAddr,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    generator: GeneratorArgs,

    /// Use a running `quizgen serve` instead of calling the model directly
    #[arg(long)]
    server: Option<String>,

    /// Start right away with this prompt
    prompt: Vec<String>,
}

#[derive(Args, Debug)]
struct AskArgs {
    #[command(flatten)]
    generator: GeneratorArgs,

    /// Quiz topic, optionally with question/answer counts
    #[arg(required = true)]
    prompt: Vec<String>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_generator(args: &GeneratorArgs) -> Result<QuestionGenerator<GeminiFactory>> {
    let mut config = GeneratorConfig::from_env().context("invalid generator configuration")?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    if let Some(max) = args.max_output_tokens {
        config = config.with_max_output_tokens(max);
    }
    if let Some(key_check) = args.key_check {
        config = config.with_key_check(key_check);
    }
    if let Some(parse_failure) = args.parse_failure {
        config = config.with_parse_failure(parse_failure);
    }

    let pool = match &args.keys {
        Some(raw) => CredentialPool::parse(raw),
        None => CredentialPool::from_env(),
    };
    if pool.is_empty() {
        warn!("No GENAI_KEYS configured; every generation request will fail");
    }

    let factory = GeminiFactory::new(config.base_url.clone());
    Ok(QuestionGenerator::new(factory, pool, config))
}

fn joined(prompt: &[String]) -> Option<String> {
    let prompt = prompt.join(" ");
    (!prompt.trim().is_empty()).then_some(prompt)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG and GENAI_KEYS in .env are seen
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing();
            let source: SharedSource = Arc::new(build_generator(&args.generator)?);
            let listener = server::bind(args.host, args.port)
                .await
                .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
            server::serve(listener, source).await?;
        }
        Command::Ask(args) => {
            init_tracing();
            let generator = build_generator(&args.generator)?;
            let prompt = joined(&args.prompt).context("prompt is empty")?;
            let items = generator.generate(&prompt).await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Play(args) => {
            // Log lines would tear the screen, so only log on request
            if env::var("RUST_LOG").is_ok() {
                init_tracing();
            }
            let prompt = joined(&args.prompt);
            let session = match &args.server {
                Some(url) => QuizTui::new(RemoteGenerator::new(url.as_str())).run(prompt).await?,
                None => QuizTui::new(build_generator(&args.generator)?).run(prompt).await?,
            };
            if let Some(score) = quizgen::view::render(&session).score_line() {
                println!("{}", score);
            }
        }
    }

    Ok(())
}
