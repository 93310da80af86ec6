use serde::Serialize;

pub mod attempts;
pub mod difficulty;
pub mod index;
pub mod mistakes;
pub mod report;
pub mod rollup;
pub mod roster;
pub mod stats;

#[cfg(test)]
pub(crate) mod fixtures;

/// Number of mistake clusters kept per question unless overridden.
pub const DEFAULT_TOP_MISTAKES: usize = 5;

/// 1-decimal rounding used for every reported rate:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// `part / whole * 100`, rounded to 1 decimal, or 0 when `whole` is 0.
pub fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_off_1_decimal(100.0 * (part as f64) / (whole as f64))
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new("access_denied", message)
    }

    pub fn db(e: impl std::fmt::Display) -> Self {
        Self::new("db_query_failed", e.to_string())
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_mistakes: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_mistakes: DEFAULT_TOP_MISTAKES,
        }
    }
}
