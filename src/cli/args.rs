use crate::constants::{exit_codes, verbosity};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::fmt::Display;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#;

/// Output format of `dump` and `get`.
#[derive(Debug, Clone, ValueEnum, Copy, PartialEq, Default)]
#[value(rename_all = "lowercase")]
pub enum Format {
    /// Plain YAML.
    #[default]
    Yaml,
    /// Pretty printed JSON.
    Json,
    /// YAML with a comment column holding flags, dtypes and descriptions.
    Annotated,
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Annotated => "annotated",
        };
        write!(f, "{s}")
    }
}

/// CLI arguments for sectree.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate a configuration against its definitions.
    Validate(ValidateArgs),
    /// Print the resolved configuration.
    Dump(DumpArgs),
    /// Write a template document from definitions.
    Generate(GenerateArgs),
    /// Print one resolved value.
    Get(GetArgs),
}

/// Where the configuration comes from and how it is assembled.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Configuration file, glob pattern or inline YAML.
    #[arg(short, long, value_name = "CONFIG")]
    pub config: String,

    /// Definitions file, glob pattern or inline YAML.
    #[arg(short, long, value_name = "DEFINITIONS")]
    pub definitions: Option<String>,

    /// Sections to merge, e.g. `default<-local`.
    #[arg(short, long, value_name = "PATCH")]
    pub patch: Option<String>,

    /// Set a value after loading (repeatable). Values are read as YAML scalars.
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// YAML or JSON file with engine options.
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Also check fields the definitions created.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,

    /// Write to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Definitions file, glob pattern or inline YAML.
    #[arg(short, long, value_name = "DEFINITIONS")]
    pub definitions: String,

    /// Write to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Dotted path of the value, e.g. `a.b[2].c`.
    #[arg(value_name = "PATH")]
    pub path: String,

    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Parse command line arguments with custom handling for missing required inputs.
pub fn get_args() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| {
        if e.kind() == ErrorKind::MissingRequiredArgument
            || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        {
            let mut command = Cli::command().help_template(HELP_TEMPLATE);
            if let Err(print_err) = command.print_help() {
                eprintln!("Failed to display help information: {print_err}");
            } else {
                println!();
            }
            std::process::exit(exit_codes::FAILURE);
        } else {
            e.exit();
        }
    })
}

/// Map `-v` counts to the appropriate log level.
pub fn get_log_level_from_verbose(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        verbosity::OFF => LevelFilter::Error,
        verbosity::INFO => LevelFilter::Info,
        verbosity::DEBUG => LevelFilter::Debug,
        verbosity::TRACE.. => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_verbose_flags_to_log_filters() {
        assert_eq!(get_log_level_from_verbose(verbosity::OFF), LevelFilter::Error);
        assert_eq!(get_log_level_from_verbose(verbosity::INFO), LevelFilter::Info);
        assert_eq!(get_log_level_from_verbose(verbosity::DEBUG), LevelFilter::Debug);
        assert_eq!(get_log_level_from_verbose(verbosity::TRACE), LevelFilter::Trace);
        assert_eq!(get_log_level_from_verbose(verbosity::TRACE + 1), LevelFilter::Trace);
    }

    #[test]
    fn parses_validate_args() {
        let cli = Cli::parse_from([
            "sectree",
            "validate",
            "-c",
            "config.yaml",
            "-d",
            "defs.yaml",
            "-p",
            "default<-local",
            "-o",
            "a.b=3",
            "-o",
            "c=x",
            "--strict",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Validate(args) = cli.command else {
            panic!("expected the validate command");
        };
        assert_eq!(args.source.config, "config.yaml");
        assert_eq!(args.source.definitions.as_deref(), Some("defs.yaml"));
        assert_eq!(args.source.patch.as_deref(), Some("default<-local"));
        assert_eq!(args.source.overrides, vec!["a.b=3", "c=x"]);
        assert!(args.strict);
    }

    #[test]
    fn parses_dump_generate_and_get() {
        let Commands::Dump(dump) = Cli::parse_from(["sectree", "dump", "-c", "x.yaml", "--format", "json"]).command
        else {
            panic!("expected the dump command");
        };
        assert_eq!(dump.format, Format::Json);

        let Commands::Generate(generate) =
            Cli::parse_from(["sectree", "generate", "-d", "defs.yaml", "--output", "t.yaml"]).command
        else {
            panic!("expected the generate command");
        };
        assert_eq!(generate.output, Some(PathBuf::from("t.yaml")));

        let Commands::Get(get) = Cli::parse_from(["sectree", "get", "-c", "x.yaml", "a.b"]).command else {
            panic!("expected the get command");
        };
        assert_eq!(get.path, "a.b");
        assert_eq!(get.format, Format::Yaml);
    }

    #[test]
    fn display_format_variants() {
        assert_eq!(Format::Yaml.to_string(), "yaml");
        assert_eq!(Format::Json.to_string(), "json");
        assert_eq!(Format::Annotated.to_string(), "annotated");
    }
}
