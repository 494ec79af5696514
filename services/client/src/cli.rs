//! services/client/src/cli.rs
//!
//! Command-line surface of the `trustme` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use trustme_core::AnalysisForm;

#[derive(Parser, Debug)]
#[command(name = "trustme", version, about = "Trust.me analyzer client")]
pub struct Cli {
    /// Backend base URL; beats every environment setting.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a subject for analysis and print the verdict.
    Analyze(AnalyzeArgs),
    /// Log in with the configured provider and store its token.
    Login,
    /// Forget the stored token.
    Logout,
    /// Check that the backend is reachable.
    Health,
}

#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Person or company to analyze.
    pub subject: Option<String>,
    #[arg(long, default_value = "")]
    pub context: String,
    /// Response language (it-IT, en-US, fr-FR, de-DE, es-ES).
    #[arg(long)]
    pub language: Option<String>,
    /// Legacy subject type (person or company).
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// Read the fields from a JSON file instead (`subject`, `context`, `language`, `type`).
    #[arg(long, conflicts_with = "subject")]
    pub query: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// The raw form these arguments describe, when no query file is used.
    pub fn to_form(&self) -> AnalysisForm {
        AnalysisForm {
            subject: self.subject.clone().unwrap_or_default(),
            context: self.context.clone(),
            language: self.language.clone(),
            kind: self.kind.clone(),
        }
    }
}
