use clap::Args;
use serde_json::json;
use tcm_core::RawIntake;

use super::analyze::IntakeArgs;
use crate::util::{api_request, exit_error, read_text};

#[derive(Args)]
pub struct ConsultArgs {
    #[command(flatten)]
    pub intake: IntakeArgs,

    /// Print compact JSON instead of pretty output
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub intake: IntakeArgs,

    /// Reply text to score
    #[arg(long, conflicts_with = "output_file")]
    pub output: Option<String>,

    /// Read the reply from a file, or "-" for stdin
    #[arg(long)]
    pub output_file: Option<String>,
}

/// POST /v1/workflows/consultation
pub async fn consult(api_url: &str, args: ConsultArgs) -> i32 {
    let body = intake_body(args.intake);
    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/workflows/consultation",
        Some(body),
        args.raw,
    )
    .await
}

/// POST /v1/scorers/evaluate
pub async fn score(api_url: &str, args: ScoreArgs) -> i32 {
    let output = match (args.output, args.output_file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_text(&path).unwrap_or_else(|e| exit_error(&e, None)),
        (None, None) => exit_error(
            "Nothing to score",
            Some("Pass the reply with --output or --output-file (use - for stdin)."),
        ),
    };

    let body = json!({
        "intake": intake_body(args.intake),
        "output": output,
    });
    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/scorers/evaluate",
        Some(body),
        false,
    )
    .await
}

fn intake_body(args: IntakeArgs) -> serde_json::Value {
    // RawIntake only holds strings; serialization cannot fail.
    serde_json::to_value(RawIntake::from(args)).unwrap_or_else(|_| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_body_uses_wire_field_names() {
        let body = intake_body(IntakeArgs {
            key_symptoms: Some("乏力".to_string()),
            tongue: Some("舌淡".to_string()),
            ..IntakeArgs::default()
        });

        assert_eq!(body["keySymptoms"], "乏力");
        assert_eq!(body["tongue"], "舌淡");
        assert!(body["pulse"].is_null());
    }
}
