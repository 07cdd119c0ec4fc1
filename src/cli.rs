//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

/// Conditional access and download accounting for served files.
///
/// Administers the category, file and URL records a file server consults
/// before serving a download, and records completed downloads.
#[derive(Parser, Debug)]
#[command(name = "filegate")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the record database (default: filegate.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Path to a config file (default: $XDG_CONFIG_HOME/filegate/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether a download would be allowed
    Check(TargetArgs),

    /// Record a confirmed download of a file
    RecordDownload(TargetArgs),

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage file records
    File {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Manage access-controlled URLs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// A `category/filename` pair.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Category name
    pub category: String,
    /// Filename within the managed directory
    pub filename: String,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// Create or update a category
    Set {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// List the category publicly (true/false)
        #[arg(long, value_name = "BOOL")]
        public: Option<bool>,
    },
    /// Print a category as JSON
    Show { name: String },
    /// List categories
    List {
        /// Only public categories
        #[arg(long)]
        public: bool,
    },
    /// Delete a category
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum FileAction {
    /// Create or update a file record
    Set {
        name: String,
        /// Length in bytes
        #[arg(long)]
        size: Option<u64>,
        /// Hex MD5 of the contents
        #[arg(long)]
        md5: Option<String>,
    },
    /// Print a file record as JSON
    Show { name: String },
    /// List file records
    List,
    /// Delete a file record
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum UrlAction {
    /// Create or update a URL
    Set(UrlSetArgs),
    /// Print a URL as JSON
    Show(UrlKeyArgs),
    /// List URLs
    List,
    /// Delete a URL
    Delete(UrlKeyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UrlKeyArgs {
    /// URL key as printed by `url list` (category/filename)
    pub key: String,
}

#[derive(Args, Debug, Clone)]
pub struct UrlSetArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub description: Option<String>,

    /// Enable or disable downloads (true/false)
    #[arg(long, value_name = "BOOL")]
    pub enabled: Option<bool>,

    /// Downloads remaining before the URL disables itself
    #[arg(long, value_name = "N", conflicts_with = "unlimited")]
    pub count: Option<u64>,

    /// Remove any download limit
    #[arg(long)]
    pub unlimited: bool,

    /// Start of the access window (RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub start: Option<DateTime<Utc>>,

    /// End of the access window (RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_check_parses_target() {
        let cli = Cli::try_parse_from(["filegate", "check", "docs", "a.txt"]).unwrap();
        match cli.command {
            Command::Check(target) => {
                assert_eq!(target.category, "docs");
                assert_eq!(target.filename, "a.txt");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["filegate", "check", "docs", "a.txt", "-vv", "--db", "x.db"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn test_cli_url_set_parses_policy_fields() {
        let cli = Cli::try_parse_from([
            "filegate",
            "url",
            "set",
            "docs",
            "a.txt",
            "--enabled",
            "true",
            "--count",
            "3",
            "--start",
            "2026-01-01T00:00:00Z",
        ])
        .unwrap();
        let Command::Url {
            action: UrlAction::Set(args),
        } = cli.command
        else {
            panic!("expected url set");
        };
        assert_eq!(args.enabled, Some(true));
        assert_eq!(args.count, Some(3));
        assert!(args.start.is_some());
        assert!(args.end.is_none());
    }

    #[test]
    fn test_cli_url_show_takes_single_key() {
        let cli = Cli::try_parse_from(["filegate", "url", "show", "docs/a.txt"]).unwrap();
        let Command::Url {
            action: UrlAction::Show(args),
        } = cli.command
        else {
            panic!("expected url show");
        };
        assert_eq!(args.key, "docs/a.txt");

        assert!(Cli::try_parse_from(["filegate", "url", "delete", "docs", "a.txt"]).is_err());
    }

    #[test]
    fn test_cli_url_set_count_conflicts_with_unlimited() {
        let result = Cli::try_parse_from([
            "filegate",
            "url",
            "set",
            "docs",
            "a.txt",
            "--count",
            "3",
            "--unlimited",
        ]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_rejects_bad_timestamp() {
        let result = Cli::try_parse_from([
            "filegate", "url", "set", "docs", "a.txt", "--start", "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["filegate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Cli::try_parse_from(["filegate", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_category_list_public_flag() {
        let cli = Cli::try_parse_from(["filegate", "category", "list", "--public"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Category {
                action: CategoryAction::List { public: true }
            }
        ));
    }
}
