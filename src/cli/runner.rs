use crate::{
    cli::{Cli, Commands, DumpArgs, Format, GenerateArgs, GetArgs, SourceArgs, ValidateArgs},
    config::{self, Config},
    error::{Error, Result},
    loader,
    options::Options,
    patch::PatchOrder,
    template,
    value::Value,
};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Runs one sectree command, writing its output to `out`
pub struct Runner {
    command: Commands,
}

impl Runner {
    pub fn new(command: Commands) -> Self {
        Self { command }
    }

    /// Executes the command
    pub fn run<W: Write>(self, out: &mut W) -> Result<()> {
        match self.command {
            Commands::Validate(args) => validate(&args, out),
            Commands::Dump(args) => dump(&args, out),
            Commands::Generate(args) => generate(&args, out),
            Commands::Get(args) => get(&args, out),
        }
    }
}

/// Runs the parsed command line against stdout.
pub fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Runner::new(cli.command).run(&mut out)
}

/// Splits `key=value`, reading the value as a YAML scalar.
pub fn parse_override(text: &str) -> Result<(String, Value)> {
    let (key, value) = text.split_once('=').ok_or_else(|| Error::InvalidPath {
        path: text.to_string(),
        reason: "overrides are written as key=value".to_string(),
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidPath {
            path: text.to_string(),
            reason: "the key of an override cannot be empty".to_string(),
        });
    }
    Ok((key.to_string(), Value::parse_scalar(value.trim())))
}

/// Loads, patches, overrides and defines the configuration described by
/// `source`, then installs it as the global configuration.
pub fn build_config(source: &SourceArgs) -> Result<Config> {
    let options = match &source.options {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    let data = loader::load(&source.config)?;
    let mut builder = Config::builder().data(data).options(options);
    if let Some(patch) = &source.patch {
        builder = builder.patch(PatchOrder::parse(patch));
    }
    let definitions = source.definitions.as_deref().map(loader::load).transpose()?;
    let mut config = builder.build();

    for text in &source.overrides {
        let (key, value) = parse_override(text)?;
        debug!("Overriding {key} with {value}");
        config.override_key(&key, value)?;
    }
    // Definitions go last so overridden sections get their fields too.
    if let Some(definitions) = definitions {
        config.apply_definitions(definitions);
    }
    config::global().replace(config.clone());
    Ok(config)
}

fn emit<W: Write>(text: &str, output: Option<&Path>, out: &mut W) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!("Wrote {}", path.display());
        }
        None => write!(out, "{text}")?,
    }
    Ok(())
}

fn format_value(value: &Value, format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => format!("{}\n", serde_json::to_string_pretty(value)?),
        Format::Yaml | Format::Annotated => serde_yaml::to_string(value)?,
    })
}

fn validate<W: Write>(args: &ValidateArgs, out: &mut W) -> Result<()> {
    let config = build_config(&args.source)?;
    let report = config.validate(args.strict).reduce();
    if report.is_empty() {
        writeln!(out, "Configuration is valid.")?;
        return Ok(());
    }
    writeln!(out, "Validation errors:")?;
    write!(out, "{}", report.render())?;
    Err(Error::ValidationFailed { count: report.count() })
}

fn dump<W: Write>(args: &DumpArgs, out: &mut W) -> Result<()> {
    let config = build_config(&args.source)?;
    let text = match args.format {
        Format::Annotated => template::dump(&config),
        format => format_value(&config.to_value(), format)?,
    };
    emit(&text, args.output.as_deref(), out)
}

fn generate<W: Write>(args: &GenerateArgs, out: &mut W) -> Result<()> {
    let definitions = loader::load(&args.definitions)?;
    emit(&template::generate(&definitions), args.output.as_deref(), out)
}

fn get<W: Write>(args: &GetArgs, out: &mut W) -> Result<()> {
    let config = build_config(&args.source)?;
    let value = config.get(&args.path)?;
    let text = match (&value, args.format) {
        (Value::Str(text), Format::Yaml | Format::Annotated) => format!("{text}\n"),
        (_, format) => format_value(&value, format)?,
    };
    write!(out, "{text}")?;
    Ok(())
}
