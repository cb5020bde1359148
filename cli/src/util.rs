use serde::Serialize;
use serde_json::json;

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Print a structured CLI error on stderr and exit with code 4 (usage error).
pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", to_pretty(&err));
    std::process::exit(4);
}

/// Pretty-print a JSON value on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", to_pretty(value));
}

/// Map an HTTP status to the CLI exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub fn exit_code_for(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}

/// Join `path` onto the API base URL, keeping any path prefix on the base.
pub fn endpoint(api_url: &str, path: &str) -> Result<url::Url, url::ParseError> {
    let base = if api_url.ends_with('/') {
        url::Url::parse(api_url)?
    } else {
        url::Url::parse(&format!("{api_url}/"))?
    };
    base.join(path.trim_start_matches('/'))
}

/// Execute an API request, print the JSON response, and return the exit code.
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    raw: bool,
) -> i32 {
    let url = match endpoint(api_url, path) {
        Ok(u) => u,
        Err(e) => {
            let err = json!({
                "error": "cli_error",
                "message": format!("Invalid URL: {api_url}{path}: {e}")
            });
            eprintln!("{}", to_pretty(&err));
            return 4;
        }
    };

    tracing::debug!(%url, %method, "sending request");
    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check TCM_API_URL."
            });
            eprintln!("{}", to_pretty(&err));
            return 3;
        }
    };

    let status = resp.status().as_u16();
    let exit_code = exit_code_for(status);

    let resp_body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = if raw {
        resp_body.to_string()
    } else {
        to_pretty(&resp_body)
    };

    if exit_code == 0 {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    exit_code
}

/// Read text from a file path or stdin (when path is "-").
pub fn read_text(path: &str) -> Result<String, String> {
    if path == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("Failed to read stdin: {e}"))
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}
