use regex::Regex;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, x-mastra-client-type, x-request-id";
pub const EXPOSE_HEADERS: &str = "Content-Length, X-Requested-With, x-request-id";
/// Preflight cache lifetime: 24 hours.
pub const PREFLIGHT_MAX_AGE_SECS: u32 = 86_400;

const ANY_ORIGIN: &str = "*";

/// One allow-list entry, compiled once at startup.
#[derive(Debug, Clone)]
pub enum OriginPattern {
    /// `*`: matches every origin.
    Any,
    /// Literal origin compared by exact string equality.
    Exact(String),
    /// Origin containing `*`, e.g. `https://*.pages.dev`.
    Wildcard { raw: String, regex: Regex },
}

impl OriginPattern {
    /// Build a pattern from a raw config entry. Returns `None` for blank entries.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize_origin(raw.trim());
        if normalized.is_empty() {
            return None;
        }
        if normalized == ANY_ORIGIN {
            return Some(Self::Any);
        }
        if !normalized.contains('*') {
            return Some(Self::Exact(normalized.to_string()));
        }

        // Escape first so every character except `*` keeps its literal meaning.
        let source = format!("^{}$", regex::escape(normalized).replace(r"\*", ".*"));
        match Regex::new(&source) {
            Ok(regex) => Some(Self::Wildcard {
                raw: normalized.to_string(),
                regex,
            }),
            Err(err) => {
                // Only reachable when the compiled size limit is exceeded.
                tracing::warn!(pattern = normalized, error = %err, "wildcard origin compiled as literal");
                Some(Self::Exact(normalized.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => ANY_ORIGIN,
            Self::Exact(origin) => origin,
            Self::Wildcard { raw, .. } => raw,
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == origin,
            Self::Wildcard { regex, .. } => regex.is_match(origin),
        }
    }
}

/// Configured set of origins allowed to receive echoed CORS headers.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    entries: Vec<OriginPattern>,
}

impl OriginAllowList {
    /// Parse a comma-separated allow-list (e.g. the value of an env var).
    pub fn parse(csv: &str) -> Self {
        Self::from_entries(csv.split(','))
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .filter_map(|entry| OriginPattern::new(entry.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OriginPattern] {
        &self.entries
    }

    /// Decide which value to send in `Access-Control-Allow-Origin`.
    ///
    /// - no request origin: the first configured entry, or `*` for an empty list
    /// - empty list: any origin is echoed back
    /// - otherwise the origin is echoed only when an entry matches; `None` means
    ///   the header must be omitted
    pub fn resolve(&self, request_origin: Option<&str>) -> Option<String> {
        let Some(origin) = request_origin else {
            return Some(
                self.entries
                    .first()
                    .map_or(ANY_ORIGIN, OriginPattern::as_str)
                    .to_string(),
            );
        };

        let origin = normalize_origin(origin);
        if self.entries.is_empty() {
            return Some(origin.to_string());
        }

        self.entries
            .iter()
            .any(|pattern| pattern.matches(origin))
            .then(|| origin.to_string())
    }
}

/// Strip a single trailing `/`.
pub fn normalize_origin(origin: &str) -> &str {
    origin.strip_suffix('/').unwrap_or(origin)
}
