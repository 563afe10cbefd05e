pub mod args;
pub mod runner;

pub use args::{
    get_args, get_log_level_from_verbose, Cli, Commands, DumpArgs, Format, GenerateArgs, GetArgs,
    SourceArgs, ValidateArgs,
};
pub use runner::{build_config, parse_override, run, Runner};
