use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{AgentConfig, DEFAULT_APP_NAME, DEFAULT_BASE_URL, generate_user_id};

#[derive(Parser, Debug)]
#[command(name = "docrelay")]
#[command(version)]
#[command(about = "Send a message and documents to an agent service", long_about = None)]
#[command(after_help = "Examples:\n  \
  docrelay -m \"Assess this deck\" pitch.docx     stream the agent's reply\n  \
  docrelay --extract-only memo.docx              print the document text only\n  \
  docrelay --no-stream -m hello                  use the synchronous endpoint")]
pub struct Cli {
    /// Documents to attach: PDF, Word, PowerPoint, Excel, TXT, CSV or images
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Message text
    #[arg(short = 'm', long, value_name = "TEXT", default_value = "")]
    pub message: String,

    /// Agent service base URL
    #[arg(long, env = "DOCRELAY_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Agent application name
    #[arg(long, env = "DOCRELAY_APP", default_value = DEFAULT_APP_NAME)]
    pub app: String,

    /// User id (random when omitted)
    #[arg(long, env = "DOCRELAY_USER")]
    pub user: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    pub timeout: u64,

    /// Skip the streaming attempt
    #[arg(long)]
    pub no_stream: bool,

    /// Print extracted document text and exit
    #[arg(long)]
    pub extract_only: bool,

    /// Only log warnings
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug detail
    #[arg(short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            base_url: self.url.clone(),
            app_name: self.app.clone(),
            user_id: self.user.clone().unwrap_or_else(generate_user_id),
            request_timeout: Duration::from_secs(self.timeout),
        }
    }

    /// Default log directive for the chosen verbosity.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            "docrelay=warn"
        } else if self.verbose {
            "docrelay=debug"
        } else {
            "docrelay=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["docrelay", "a.docx", "b.pdf"]).unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("a.docx"), PathBuf::from("b.pdf")]);
        assert_eq!(cli.message, "");
        assert_eq!(cli.log_directive(), "docrelay=info");

        let config = cli.agent_config();
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert!(config.user_id.starts_with("user_"));
    }

    #[test]
    fn explicit_options() {
        let cli = Cli::try_parse_from([
            "docrelay",
            "-m",
            "hi",
            "--url",
            "http://agent:9000/",
            "--user",
            "user_abc",
            "--timeout",
            "5",
            "--no-stream",
            "-v",
        ])
        .unwrap();
        let config = cli.agent_config();
        assert_eq!(config.user_id, "user_abc");
        assert_eq!(config.endpoint("/run"), "http://agent:9000/run");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(cli.no_stream);
        assert_eq!(cli.log_directive(), "docrelay=debug");
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["docrelay", "-q", "-v"]).is_err());
    }
}
