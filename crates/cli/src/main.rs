// recap CLI - drill-down recap batches over summary workbooks

mod exit_codes;
mod probe;
mod run;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use recap_config::{EngineKind, Settings};
use recap_drill::{DrillError, Profile, Session};

use exit_codes::{drill_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Locate pivot drill cells, expand them and recap the detail rows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process workbooks in order and add their detail records to the session
    #[command(after_help = "\
Examples:
  recap run jan.xlsx feb.xlsx
  recap run reports/*.xlsx --code 8204 --output recap.xlsx
  recap run fixture.json --engine memory --json")]
    Run {
        /// Workbooks to process, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Row anchor pattern (case-insensitive regex search)
        #[arg(long)]
        row: Option<String>,

        /// Column anchor keyword (case-insensitive substring)
        #[arg(long)]
        col: Option<String>,

        /// Type-code filter (case-insensitive regex search)
        #[arg(long)]
        code: Option<String>,

        #[command(flatten)]
        common: CommonArgs,

        /// Spreadsheet engine
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,

        /// Write the session's records here after the batch (.xlsx, .csv, .tsv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the batch report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// No progress on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Export every record in the session
    #[command(after_help = "\
Examples:
  recap export
  recap export --output march.csv")]
    Export {
        #[command(flatten)]
        common: CommonArgs,

        /// Output file (default: Recap_YYYYMMDD_HHMM.xlsx in the export directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Forget all admitted records and identities
    Reset {
        /// Session file
        #[arg(long, env = "RECAP_SESSION")]
        session: Option<PathBuf>,
    },

    /// Show sheets and resolved anchors of one workbook without drilling
    Probe {
        file: PathBuf,

        #[arg(long)]
        row: Option<String>,

        #[arg(long)]
        col: Option<String>,

        #[arg(long, env = "RECAP_PROFILE")]
        profile: Option<PathBuf>,

        #[arg(long, value_enum)]
        engine: Option<EngineArg>,

        #[arg(long)]
        json: bool,
    },

    /// Validate a profile without running
    Validate {
        profile: PathBuf,
    },

    /// Show the saved defaults, or change them
    #[command(after_help = "\
Examples:
  recap config
  recap config --engine memory --export-dir ~/recaps")]
    Config {
        /// Default profile TOML
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Default session file
        #[arg(long)]
        session: Option<PathBuf>,

        /// Default spreadsheet engine
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,

        /// Directory for exports given without --output
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Profile TOML (default: settings, else built-in)
    #[arg(long, env = "RECAP_PROFILE")]
    profile: Option<PathBuf>,

    /// Session file (default: settings, else ~/.config/recap/session.json)
    #[arg(long, env = "RECAP_SESSION")]
    session: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Memory,
    Xlsx,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Memory => EngineKind::Memory,
            EngineArg::Xlsx => EngineKind::Xlsx,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load();

    let result = match cli.command {
        Commands::Run { files, row, col, code, common, engine, output, json, quiet } => {
            run::cmd_run(run::RunArgs {
                files,
                row,
                col,
                code,
                profile: common.profile,
                session: common.session,
                engine: engine.map(EngineKind::from),
                output,
                json,
                quiet,
            }, &settings)
        }
        Commands::Export { common, output } => {
            run::cmd_export(common.profile, common.session, output, &settings)
        }
        Commands::Reset { session } => cmd_reset(session, &settings),
        Commands::Probe { file, row, col, profile, engine, json } => {
            probe::cmd_probe(file, row, col, profile, engine.map(EngineKind::from), json, &settings)
        }
        Commands::Validate { profile } => cmd_validate(profile),
        Commands::Config { profile, session, engine, export_dir } => {
            cmd_config(settings, profile, session, engine.map(EngineKind::from), export_dir)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Exit code without a message; the command already reported.
    pub fn silent(code: u8) -> Self {
        Self::new(code, "")
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<DrillError> for CliError {
    fn from(err: DrillError) -> Self {
        let code = drill_exit_code(&err);
        let hint = match &err {
            DrillError::MissingParameter(_) => Some("pass --row, --col and --code or set them in the profile".to_string()),
            DrillError::InvalidPattern { .. } => Some("escape regex metacharacters such as ( [ . *".to_string()),
            DrillError::HeaderMismatch { .. } => {
                Some("run `recap reset` or use the profile the session was built with".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Profile from `--profile`, else the settings, else the built-in default.
pub fn load_profile(arg: Option<PathBuf>, settings: &Settings) -> Result<Profile, CliError> {
    let Some(path) = arg.or_else(|| settings.profile.clone()) else {
        return Ok(Profile::default());
    };
    read_profile(&path)
}

fn read_profile(path: &Path) -> Result<Profile, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read profile {}: {e}", path.display())))?;
    Ok(Profile::from_toml(&text)?)
}

pub fn session_path(arg: Option<PathBuf>, settings: &Settings) -> PathBuf {
    arg.unwrap_or_else(|| settings.session_path())
}

// ============================================================================
// reset / validate / config
// ============================================================================

fn cmd_reset(session: Option<PathBuf>, settings: &Settings) -> Result<(), CliError> {
    let path = session_path(session, settings);
    let mut session = Session::load(&path)?;
    let cleared = session.records().len();
    session.reset();
    session.save(&path)?;
    println!("cleared {} records from {}", cleared, path.display());
    Ok(())
}

fn cmd_validate(profile: PathBuf) -> Result<(), CliError> {
    let p = read_profile(&profile)?;
    println!(
        "profile ok: {} ({} fields, {} blacklisted sheets)",
        p.name,
        p.fields.len(),
        p.blacklist.len()
    );
    Ok(())
}

fn cmd_config(
    mut settings: Settings,
    profile: Option<PathBuf>,
    session: Option<PathBuf>,
    engine: Option<EngineKind>,
    export_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let changed = profile.is_some() || session.is_some() || engine.is_some() || export_dir.is_some();
    if changed {
        if profile.is_some() {
            settings.profile = profile;
        }
        if session.is_some() {
            settings.session_file = session;
        }
        if let Some(engine) = engine {
            settings.engine = engine;
        }
        if export_dir.is_some() {
            settings.export_dir = export_dir;
        }
        settings
            .save()
            .map_err(|e| CliError::io(format!("cannot write settings: {e}")))?;
    }

    let json = serde_json::to_string_pretty(&settings)
        .map_err(|e| CliError::general(format!("cannot serialize settings: {e}")))?;
    println!("# {}", Settings::config_path().display());
    println!("{}", json);
    Ok(())
}
