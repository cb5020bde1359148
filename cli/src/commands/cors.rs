use clap::Args;
use serde_json::json;
use tcm_core::OriginAllowList;

use crate::util::print_json;

#[derive(Args)]
pub struct CorsCheckArgs {
    /// Request origin to test; omit to see the value sent for origin-less requests
    #[arg(long)]
    pub origin: Option<String>,

    /// Comma-separated allow-list (same format as the server)
    #[arg(long = "allow", env = "TCM_CORS_ORIGINS", default_value = "")]
    pub allow_list: String,
}

/// Resolve an origin the way the API's CORS middleware does.
///
/// Exits 0 when an `Access-Control-Allow-Origin` value would be sent, 1 otherwise.
pub fn run(args: CorsCheckArgs) -> i32 {
    let report = check(&args);
    let allowed = report["allowed"].as_bool().unwrap_or(false);
    print_json(&report);
    if allowed { 0 } else { 1 }
}

fn check(args: &CorsCheckArgs) -> serde_json::Value {
    let allow_list = OriginAllowList::parse(&args.allow_list);
    let origin = args.origin.as_deref().filter(|o| !o.is_empty());
    let resolved = allow_list.resolve(origin);
    let entries: Vec<&str> = allow_list.entries().iter().map(|e| e.as_str()).collect();

    json!({
        "origin": origin,
        "allowList": entries,
        "allowed": resolved.is_some(),
        "accessControlAllowOrigin": resolved,
    })
}
