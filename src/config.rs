use crate::calc::{ReportOptions, DEFAULT_TOP_MISTAKES};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "assessd")]
#[command(about = "Test analytics sidecar speaking JSON lines on stdin/stdout")]
#[command(version)]
pub struct Cli {
    /// Workspace directory to open at startup
    #[arg(long, value_name = "DIR", env = "ASSESSD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Tracing filter, e.g. `debug` or `assessd=trace`
    #[arg(long, value_name = "FILTER", env = "ASSESSD_LOG", default_value = "warn")]
    pub log: String,

    /// Mistake clusters kept per question
    #[arg(long, value_name = "N", env = "ASSESSD_TOP_MISTAKES", default_value_t = DEFAULT_TOP_MISTAKES)]
    pub top_mistakes: usize,
}

impl Cli {
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_mistakes: self.top_mistakes,
        }
    }
}
