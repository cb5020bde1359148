use std::path::PathBuf;

use clap::Args;
use tcm_core::{PatternCatalog, RawIntake, analyze, normalize_intake};

use crate::util::{exit_error, print_json};

/// Intake fields shared by `analyze`, `consult` and `score`.
#[derive(Args, Clone, Debug, Default)]
pub struct IntakeArgs {
    /// Main complaint, e.g. "恶寒 头痛 无汗" (required)
    #[arg(long = "symptoms")]
    pub key_symptoms: Option<String>,
    /// Tongue observation
    #[arg(long)]
    pub tongue: Option<String>,
    /// Pulse observation
    #[arg(long)]
    pub pulse: Option<String>,
    /// Constitution notes
    #[arg(long)]
    pub constitution: Option<String>,
    /// Diet, sleep, exercise habits
    #[arg(long)]
    pub lifestyle: Option<String>,
    /// Course of illness, e.g. "3天"
    #[arg(long)]
    pub duration: Option<String>,
}

impl From<IntakeArgs> for RawIntake {
    fn from(args: IntakeArgs) -> Self {
        Self {
            key_symptoms: args.key_symptoms,
            tongue: args.tongue,
            pulse: args.pulse,
            constitution: args.constitution,
            lifestyle: args.lifestyle,
            duration: args.duration,
        }
    }
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub intake: IntakeArgs,

    /// JSON catalog replacing the built-in patterns
    #[arg(long, env = "TCM_CATALOG_PATH")]
    pub catalog: Option<PathBuf>,
}

/// Run the pattern scorer locally; no API server involved.
pub fn run(args: AnalyzeArgs) -> i32 {
    let catalog = match args.catalog {
        Some(path) => PatternCatalog::from_json_file(&path).unwrap_or_else(|e| {
            exit_error(
                &e.to_string(),
                Some("Check the catalog file or unset TCM_CATALOG_PATH to use the built-in catalog."),
            )
        }),
        None => PatternCatalog::builtin(),
    };

    let intake = match normalize_intake(args.intake.into()) {
        Ok(intake) => intake,
        Err(e) => exit_error(&e.to_string(), Some("Pass the main complaint with --symptoms.")),
    };

    let analysis = analyze(&catalog, &intake);
    tracing::debug!(primary = %analysis.primary_pattern.id, "analysis complete");
    print_json(&analysis);
    0
}
