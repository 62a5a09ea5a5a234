use std::path::PathBuf;

use apix_config::BuilderConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Report format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI parser for the `apix` binary.
#[derive(Debug, Parser)]
#[command(name = "apix", version, about = "apix - C++ API extractor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: text, json
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Config file used instead of `.apix/config.toml`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the metamodel and list classes in dependency order
    Summary(BuildArgs),
    /// Build the metamodel and list rejected entities grouped by reason
    Rejects(BuildArgs),
    /// Build the metamodel and list every diagnostic
    Diagnostics(BuildArgs),
}

impl Commands {
    #[must_use]
    pub const fn build_args(&self) -> &BuildArgs {
        match self {
            Self::Summary(args) | Self::Rejects(args) | Self::Diagnostics(args) => args,
        }
    }
}

/// Inputs of a build plus per-run overrides of the `[builder]` config.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// JSON code model dump produced by the parser
    pub code_model: PathBuf,

    /// TOML type-system document
    pub typesystem: PathBuf,

    /// Namespace tried last for unresolved type names
    #[arg(long)]
    pub implicit_scope: Option<String>,

    /// API version checked against entries' `since`
    #[arg(long)]
    pub api_version: Option<String>,

    /// Include root stripped from declaring file names (repeatable)
    #[arg(short = 'I', long = "include-path")]
    pub include_paths: Vec<String>,
}

impl BuildArgs {
    /// Apply the command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut BuilderConfig) {
        if let Some(scope) = &self.implicit_scope {
            config.implicit_scope.clone_from(scope);
        }
        if let Some(version) = &self.api_version {
            config.api_version = Some(version.clone());
        }
        if !self.include_paths.is_empty() {
            config.include_paths.clone_from(&self.include_paths);
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "apix",
            "rejects",
            "model.json",
            "types.toml",
            "--format",
            "json",
            "-I",
            "/usr/include",
            "--verbose",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Rejects(_)));
        let args = cli.command.build_args();
        assert_eq!(args.code_model, PathBuf::from("model.json"));
        assert_eq!(args.include_paths, vec!["/usr/include".to_string()]);
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "apix",
            "summary",
            "m.json",
            "t.toml",
            "--implicit-scope",
            "Gui",
            "--api-version",
            "6.2",
        ])
        .unwrap();
        let mut config = BuilderConfig::default();
        cli.command.build_args().apply_overrides(&mut config);
        assert_eq!(config.implicit_scope, "Gui");
        assert_eq!(config.api_version.as_deref(), Some("6.2"));
        assert!(config.include_paths.is_empty());
    }
}
