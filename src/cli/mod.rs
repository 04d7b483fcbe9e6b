//! Command-line interface definitions using clap
//!
//! `commentary` with no subcommand runs the HTTP server; the other
//! subcommands are one-shot maintenance tasks.

pub mod commands;

use std::fmt;

use clap::{Parser, Subcommand};

/// Commentary - a threaded comments backend
#[derive(Parser, Debug)]
#[command(name = "commentary")]
#[command(version)]
#[command(about = "A threaded comments backend with CAPTCHA, uploads and analytics", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Run database migrations and exit
    Migrate,

    /// Create a staff user, or promote an existing one
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Recompute daily statistics and popular content
    ///
    /// Without `--date`, yesterday and today are recomputed and older
    /// events are marked processed.
    Rollup {
        /// Day to recompute (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Write a sample configuration file
    GenerateConfig {
        /// Output path (default: config.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// 未给出子命令时默认运行服务器
    pub fn command_or_default(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}

/// 执行一次性子命令；`Serve` 由调用方处理
pub async fn run_command(cmd: &Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by the runtime".to_string(),
        )),
        Commands::Migrate => commands::migrate().await,
        Commands::CreateAdmin {
            username,
            email,
            password,
        } => commands::create_admin(username, email, password).await,
        Commands::Rollup { date } => commands::rollup(date.as_deref()).await,
        Commands::GenerateConfig { output_path, force } => {
            commands::generate_config(output_path.as_deref(), *force)
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::CommentaryError> for CliError {
    fn from(err: crate::errors::CommentaryError) -> Self {
        match err {
            crate::errors::CommentaryError::DatabaseConfig(_)
            | crate::errors::CommentaryError::DatabaseConnection(_)
            | crate::errors::CommentaryError::DatabaseOperation(_) => {
                CliError::StorageError(err.to_string())
            }
            _ => CliError::CommandError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["commentary"]).unwrap();
        assert_eq!(cli.command_or_default(), &Commands::Serve);
        assert_eq!(cli.config, crate::config::DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_create_admin_arguments() {
        let cli = Cli::try_parse_from([
            "commentary",
            "--config",
            "/etc/commentary.toml",
            "create-admin",
            "--username",
            "root",
            "--email",
            "root@example.com",
            "--password",
            "s3cret-pass",
        ])
        .unwrap();
        assert_eq!(cli.config, "/etc/commentary.toml");
        assert_eq!(
            cli.command,
            Some(Commands::CreateAdmin {
                username: "root".into(),
                email: "root@example.com".into(),
                password: "s3cret-pass".into(),
            })
        );
    }

    #[test]
    fn test_rollup_date_is_optional() {
        let cli = Cli::try_parse_from(["commentary", "rollup", "--date", "2024-05-01"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Rollup {
                date: Some("2024-05-01".into())
            })
        );
        let cli = Cli::try_parse_from(["commentary", "rollup"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Rollup { date: None }));
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["commentary", "frobnicate"]).is_err());
    }
}
