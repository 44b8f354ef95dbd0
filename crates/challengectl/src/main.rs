#![warn(clippy::all, clippy::dbg_macro)]

use std::{
    fs,
    io::{Read as _, Write, stdout},
    process::ExitCode,
};

use anstream::{eprintln, stream::IsTerminal};
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::InfoLevel;
use config::Config;
use owo_colors::OwoColorize;
use recordpatch::{
    FieldMap, SaveOutcome,
    keys::{to_persisted_fields, to_ui_fields},
    url::{URL_FIELD, decode_url, encode_url, normalize_fields},
};
use serde_yaml::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod config;

/// Edit hand-authored challenge records without losing their formatting.
#[derive(Parser)]
#[command(about, version)]
struct App {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// Control the use of color in output.
    #[arg(long, value_enum, value_name = "MODE")]
    color: Option<ColorMode>,

    /// The configuration file to load. By default, any config will be
    /// discovered relative to the input.
    #[arg(short, long, env = "CHALLENGECTL_CONFIG", group = "conf")]
    config: Option<Utf8PathBuf>,

    /// Disable all configuration loading.
    #[arg(long, group = "conf")]
    no_config: bool,

    /// Use this time instead of the current time for new timestamps.
    #[arg(long, env = "CHALLENGECTL_NOW", hide = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Patch a record with new values, keeping the document's formatting.
    ///
    /// A record that isn't in the collection yet is appended to it. If the
    /// record can't be patched at all, a fresh document is generated instead
    /// (and a warning is logged).
    Patch(PatchArgs),
    /// Print a record's fields as JSON.
    Read(ReadArgs),
    /// Generate a fresh document from values.
    ///
    /// A list of values generates a collection; a single mapping generates
    /// a bare record.
    Generate(GenerateArgs),
    /// Encode or decode a URL for the `base64-url` field.
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },
}

#[derive(Args)]
struct ValuesArgs {
    /// The new values, as a YAML or JSON mapping. Use `-` for stdin.
    #[arg(long, value_name = "FILE")]
    values: Utf8PathBuf,

    /// The values use editor (camelCase) field names.
    #[arg(long)]
    ui_keys: bool,
}

#[derive(Args)]
struct PatchArgs {
    /// The document to patch.
    input: Utf8PathBuf,

    /// The id of the record to patch. Defaults to the values' `id`.
    #[arg(long)]
    id: Option<i64>,

    #[command(flatten)]
    values: ValuesArgs,

    /// Write the patched document back to the input instead of stdout.
    #[arg(long)]
    in_place: bool,

    /// Fail instead of appending or regenerating when the record can't be
    /// patched in place.
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ReadArgs {
    /// The document to read from.
    input: Utf8PathBuf,

    /// The id of the record to read.
    #[arg(long)]
    id: i64,

    /// Emit editor (camelCase) field names.
    #[arg(long)]
    ui_keys: bool,

    /// Decode the record's `base64-url`.
    #[arg(long)]
    decode_url: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    values: ValuesArgs,
}

#[derive(Subcommand)]
enum UrlAction {
    /// Encode a URL, unless it's already encoded.
    Encode { value: String },
    /// Decode an encoded URL. Other values are printed unchanged.
    Decode { value: String },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub(crate) enum ColorMode {
    /// Use color output if the output supports it.
    Auto,
    /// Force color output, even if the output isn't a terminal.
    Always,
    /// Disable color output, even if the output is a compatible terminal.
    Never,
}

impl ColorMode {
    /// Returns a concrete (i.e. non-auto) `anstream::ColorChoice` for the given terminal.
    fn color_choice_for_terminal(&self, io: impl IsTerminal) -> anstream::ColorChoice {
        match self {
            ColorMode::Auto => {
                if io.is_terminal() {
                    anstream::ColorChoice::Always
                } else {
                    anstream::ColorChoice::Never
                }
            }
            ColorMode::Always => anstream::ColorChoice::Always,
            ColorMode::Never => anstream::ColorChoice::Never,
        }
    }
}

impl From<ColorMode> for anstream::ColorChoice {
    fn from(value: ColorMode) -> Self {
        match value {
            ColorMode::Auto => Self::Auto,
            ColorMode::Always => Self::Always,
            ColorMode::Never => Self::Never,
        }
    }
}

/// Read a values document from `path`, or stdin for `-`.
fn read_values_document(path: &Utf8Path) -> Result<Value> {
    let contents = if path.as_str() == "-" {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("failed to read values from stdin")?;
        contents
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read values from {path}"))?
    };

    serde_yaml::from_str(&contents).with_context(|| format!("invalid values in {path}"))
}

fn to_fields(value: Value, ui_keys: bool) -> Result<FieldMap> {
    let fields: FieldMap =
        serde_yaml::from_value(value).context("values must be a mapping of fields")?;

    Ok(if ui_keys {
        to_persisted_fields(fields)
    } else {
        fields
    })
}

/// Read an input document. A missing input reads as `None`.
fn read_input(path: &Utf8Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{path} doesn't exist yet");
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {path}")),
    }
}

fn emit(output: &str) -> Result<()> {
    stdout()
        .write_all(output.as_bytes())
        .context("failed to write output")
}

fn patch(args: &PatchArgs, config: &Config, now: DateTime<Utc>) -> Result<()> {
    let mut values = to_fields(
        read_values_document(&args.values.values)?,
        args.values.ui_keys,
    )?;

    match (args.id, recordpatch::record_id(&values)) {
        (Some(id), Some(existing)) if id != existing => {
            bail!("--id {id} doesn't match the values' id ({existing})")
        }
        (Some(id), None) => {
            values.shift_insert(0, "id".into(), Value::Number(id.into()));
        }
        _ => {}
    }

    if normalize_fields(&mut values) {
        tracing::info!("encoded plain `{URL_FIELD}`");
    }

    let original = read_input(&args.input)?;

    let output = if args.strict {
        let Some(original) = original else {
            bail!("{input} doesn't exist", input = args.input);
        };
        let id = recordpatch::record_id(&values)
            .ok_or_else(|| anyhow!("values have no `id`, and --id wasn't given"))?;

        recordpatch::update_record_in_collection(&original, id, &values, &config.options)
            .with_context(|| format!("couldn't patch record {id} in {}", args.input))?
    } else {
        let outcome =
            recordpatch::save_record(original.as_deref(), &values, now, &config.options)?;

        match &outcome {
            SaveOutcome::Patched(_) => tracing::debug!("patched record in place"),
            SaveOutcome::Appended(_) => tracing::info!("appended new record to {}", args.input),
            SaveOutcome::Generated { reason: None, .. } => {
                tracing::info!("generated new document")
            }
            SaveOutcome::Generated {
                reason: Some(reason),
                ..
            } if args.in_place => {
                bail!(
                    "refusing to overwrite {input}: the record couldn't be patched in place ({reason})",
                    input = args.input
                );
            }
            SaveOutcome::Generated { .. } => {}
        }

        outcome.into_document()
    };

    if args.in_place {
        fs::write(&args.input, output).with_context(|| format!("failed to write {}", args.input))?;
        tracing::info!("wrote {}", args.input);
        Ok(())
    } else {
        emit(&output)
    }
}

fn read(args: &ReadArgs, config: &Config) -> Result<()> {
    let document =
        fs::read_to_string(&args.input).with_context(|| format!("failed to read {}", args.input))?;

    let mut fields = recordpatch::read_record(&document, args.id, &config.options)
        .with_context(|| format!("couldn't read record {} from {}", args.id, args.input))?;

    if args.decode_url {
        if let Some(Value::String(url)) = fields.get_mut(URL_FIELD) {
            *url = decode_url(url);
        }
    }

    if args.ui_keys {
        fields = to_ui_fields(fields);
    }

    let mut json = serde_json::to_string_pretty(&fields)?;
    json.push('\n');
    emit(&json)
}

fn generate(args: &GenerateArgs, config: &Config, now: DateTime<Utc>) -> Result<()> {
    let output = match read_values_document(&args.values.values)? {
        Value::Sequence(records) => {
            let records = records
                .into_iter()
                .map(|record| {
                    let mut fields = to_fields(record, args.values.ui_keys)?;
                    normalize_fields(&mut fields);
                    Ok(fields)
                })
                .collect::<Result<Vec<_>>>()?;

            recordpatch::generate_collection(&records, now, &config.options)?
        }
        value => {
            let mut fields = to_fields(value, args.values.ui_keys)?;
            normalize_fields(&mut fields);
            recordpatch::generate_record(&fields, now, &config.options)?
        }
    };

    emit(&output)
}

fn run() -> Result<ExitCode> {
    human_panic::setup_panic!();

    let app = App::parse();

    let color_mode = match app.color {
        Some(color_mode) => color_mode,
        None => {
            // If `--color` wasn't specified, we first check a handful
            // of common environment variables, and then fall
            // back to `anstream`'s auto detection.
            if std::env::var("NO_COLOR").is_ok() {
                ColorMode::Never
            } else if std::env::var("FORCE_COLOR").is_ok()
                || std::env::var("CLICOLOR_FORCE").is_ok()
            {
                ColorMode::Always
            } else {
                ColorMode::Auto
            }
        }
    };

    anstream::ColorChoice::write_global(color_mode.into());

    let writer = std::sync::Mutex::new(anstream::AutoStream::new(
        Box::new(std::io::stderr()) as Box<dyn Write + Send>,
        color_mode.color_choice_for_terminal(std::io::stderr()),
    ));

    let filter = EnvFilter::builder()
        .with_default_directive(app.verbose.tracing_level_filter().into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                // NOTE: We don't need `with_ansi` here since our writer is
                // an `anstream::AutoStream` that handles color output for us.
                .with_writer(writer),
        )
        .with(filter)
        .init();

    let near = match &app.command {
        Command::Patch(args) => Some(args.input.as_path()),
        Command::Read(args) => Some(args.input.as_path()),
        Command::Generate(_) | Command::Url { .. } => None,
    };

    let config = Config::new(app.no_config, app.config.as_deref(), near)
        .context("failed to load config")?;
    if let Some(path) = &config.path {
        tracing::debug!("using config from {path}");
    }

    let now = app.now.unwrap_or_else(Utc::now);

    match &app.command {
        Command::Patch(args) => patch(args, &config, now)?,
        Command::Read(args) => read(args, &config)?,
        Command::Generate(args) => generate(args, &config, now)?,
        Command::Url { action } => {
            let output = match action {
                UrlAction::Encode { value } => encode_url(value),
                UrlAction::Decode { value } => decode_url(value),
            };
            emit(&format!("{output}\n"))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // Returning an ExitCode ensures we always exit cleanly,
    // rather than performing a hard process exit.
    match run() {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!(
                "{fatal}: no document was written",
                fatal = "fatal".red().bold()
            );
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
