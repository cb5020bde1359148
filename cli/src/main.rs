use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod util;

use commands::analyze::AnalyzeArgs;
use commands::consult::{ConsultArgs, ScoreArgs};
use commands::cors::CorsCheckArgs;

#[derive(Parser)]
#[command(
    name = "tcm",
    version,
    about = "TCM consultation CLI: offline pattern analysis, CORS checks, and API access"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "TCM_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Score an intake against the pattern catalog locally (no server needed)
    Analyze(AnalyzeArgs),
    /// Show which Access-Control-Allow-Origin an origin would receive
    CorsCheck(CorsCheckArgs),
    /// Run the consultation workflow on the API
    Consult(ConsultArgs),
    /// Score a consultation reply with the API's quality scorers
    Score(ScoreArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Diagnostics go to stderr; stdout stays pure JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("TCM_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::CorsCheck(args) => commands::cors::run(args),
        Commands::Consult(args) => commands::consult::consult(&cli.api_url, args).await,
        Commands::Score(args) => commands::consult::score(&cli.api_url, args).await,
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn score_rejects_both_output_sources() {
        let result = Cli::try_parse_from([
            "tcm",
            "score",
            "--symptoms",
            "乏力",
            "--output",
            "text",
            "--output-file",
            "reply.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cors_check_parses_flags() {
        let cli = Cli::try_parse_from([
            "tcm",
            "cors-check",
            "--origin",
            "https://a.com",
            "--allow",
            "https://a.com",
        ])
        .expect("valid arguments");
        match cli.command {
            Commands::CorsCheck(args) => {
                assert_eq!(args.origin.as_deref(), Some("https://a.com"));
                assert_eq!(args.allow_list, "https://a.com");
            }
            _ => panic!("expected cors-check"),
        }
    }
}
