use crate::catalog::{self, OptionKind, DEFAULT_EXECUTABLE};
use crate::command;
use crate::engine::ExecutionSupervisor;
use crate::model::{InfoEvent, JobConfiguration, OptionValue, RunEvent, StreamChannel};
use crate::orchestrator::{prepare_run, process_run_completion};
use crate::storage::{self, FsProfileStore, ProfileStore};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Output routing for the stdout/stderr writer. Text is written as-is.
enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputChunk>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputChunk>();
    // Locks are taken per chunk: tracing shares stderr with this thread.
    let handle = tokio::task::spawn_blocking(move || {
        while let Some(chunk) = rx.blocking_recv() {
            match chunk {
                OutputChunk::Stdout(text) => {
                    let mut out = std::io::stdout().lock();
                    let _ = out.write_all(text.as_bytes());
                    let _ = out.flush();
                }
                OutputChunk::Stderr(text) => {
                    let mut err = std::io::stderr().lock();
                    let _ = err.write_all(text.as_bytes());
                    let _ = err.flush();
                }
            }
        }
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "robackup",
    version,
    about = "Build and run robocopy jobs from a terminal UI or the command line"
)]
pub struct Cli {
    /// Copy tool to execute
    #[arg(long, default_value = DEFAULT_EXECUTABLE)]
    pub executable: String,

    /// Source directory
    #[arg(long)]
    pub source: Option<String>,

    /// Destination directory
    #[arg(long)]
    pub dest: Option<String>,

    /// Start from a saved profile
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Merge a named preset into the options (repeatable)
    #[arg(long = "preset", value_name = "NAME")]
    pub presets: Vec<String>,

    /// Select an option, e.g. `-o /MIR`, `-o /R=3`, `-o /COPY=DAT` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "FLAG[=VALUE]")]
    pub options: Vec<String>,

    /// File name or wildcard to exclude (repeatable)
    #[arg(long = "exclude-file", value_name = "PATTERN")]
    pub exclude_files: Vec<String>,

    /// Directory to exclude (repeatable)
    #[arg(long = "exclude-dir", value_name = "PATTERN")]
    pub exclude_dirs: Vec<String>,

    /// File name or wildcard to include (repeatable)
    #[arg(long = "include-file", value_name = "PATTERN")]
    pub include_files: Vec<String>,

    /// Replace the exclusion lists with the built-in defaults
    #[arg(long)]
    pub default_exclusions: bool,

    /// Use --simulate true or --simulate false to override (default: true)
    #[arg(long, action = clap::ArgAction::Set)]
    pub simulate: Option<bool>,

    /// Run without the TUI, streaming the tool's output as-is
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Run without the TUI, printing one JSON event per line
    #[arg(long)]
    pub json: bool,

    /// Print the command line and exit
    #[arg(long)]
    pub preview: bool,

    /// List every known option and exit
    #[arg(long)]
    pub list_options: bool,

    /// List presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// List saved profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Save the resulting configuration as a profile and exit
    #[arg(long, value_name = "NAME")]
    pub save_profile: Option<String>,

    /// Delete a saved profile and exit
    #[arg(long, value_name = "NAME")]
    pub delete_profile: Option<String>,

    /// Print a saved profile as JSON and exit
    #[arg(long, value_name = "NAME")]
    pub show_profile: Option<String>,

    /// Directory holding saved profiles
    #[arg(long)]
    pub profiles_dir: Option<PathBuf>,

    /// Log file used while the TUI is active
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// True when the invocation ends in the interactive TUI.
    pub fn is_interactive(&self) -> bool {
        !(self.text
            || self.json
            || self.preview
            || self.list_options
            || self.list_presets
            || self.list_profiles
            || self.save_profile.is_some()
            || self.delete_profile.is_some()
            || self.show_profile.is_some())
    }

    pub fn profile_store(&self) -> FsProfileStore {
        FsProfileStore::new(
            self.profiles_dir
                .clone()
                .unwrap_or_else(storage::default_profiles_dir),
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionParseError {
    #[error("unknown option '{0}' (see --list-options)")]
    UnknownFlag(String),
    #[error("option {0} needs a value, e.g. {0}=VALUE")]
    MissingValue(&'static str),
    #[error("option {flag} takes on/off, got '{value}'")]
    InvalidBoolean { flag: &'static str, value: String },
    #[error("option {flag} takes a whole number, got '{value}'")]
    InvalidInteger { flag: &'static str, value: String },
    #[error("option {flag} must be between {min} and {max}, got {value}")]
    OutOfRange {
        flag: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("option {flag} accepts only the characters {alphabet}, got '{ch}'")]
    InvalidChar {
        flag: &'static str,
        ch: char,
        alphabet: &'static str,
    },
}

/// A parsed `--option` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOption {
    Value(&'static str, OptionValue),
    /// One entry for a list-valued option.
    Line(&'static str, String),
}

/// Parse `FLAG` or `FLAG=VALUE` against the catalog.
pub fn parse_option(spec: &str) -> Result<ParsedOption, OptionParseError> {
    let (token, value) = match spec.split_once('=') {
        Some((t, v)) => (t.trim(), Some(v.trim())),
        None => (spec.trim(), None),
    };
    let entry = catalog::find_by_token(token)
        .ok_or_else(|| OptionParseError::UnknownFlag(token.to_string()))?;
    let flag = entry.flag;
    let required = || match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(OptionParseError::MissingValue(flag)),
    };

    let parsed = match entry.kind {
        OptionKind::Boolean => {
            let on = match value.map(str::to_ascii_lowercase).as_deref() {
                None | Some("on" | "true" | "yes" | "1") => true,
                Some("off" | "false" | "no" | "0") => false,
                Some(_) => {
                    return Err(OptionParseError::InvalidBoolean {
                        flag,
                        value: value.unwrap_or_default().to_string(),
                    })
                }
            };
            ParsedOption::Value(flag, OptionValue::Boolean(on))
        }
        OptionKind::Integer => {
            let raw = required()?;
            let n: i64 = raw.parse().map_err(|_| OptionParseError::InvalidInteger {
                flag,
                value: raw.to_string(),
            })?;
            if let Some((min, max)) = entry.bounds {
                if n < min || n > max {
                    return Err(OptionParseError::OutOfRange {
                        flag,
                        value: n,
                        min,
                        max,
                    });
                }
            }
            ParsedOption::Value(flag, OptionValue::Integer(n))
        }
        OptionKind::Text => ParsedOption::Value(flag, OptionValue::Text(required()?.to_string())),
        OptionKind::CharSet => {
            let mut set = String::new();
            for ch in required()?.chars().map(|c| c.to_ascii_uppercase()) {
                if !entry.alphabet.contains(ch) {
                    return Err(OptionParseError::InvalidChar {
                        flag,
                        ch,
                        alphabet: entry.alphabet,
                    });
                }
                if !set.contains(ch) {
                    set.push(ch);
                }
            }
            ParsedOption::Value(flag, OptionValue::CharSet(set))
        }
        OptionKind::MultilineList => ParsedOption::Line(flag, required()?.to_string()),
    };
    Ok(parsed)
}

/// Build a `JobConfiguration` from CLI arguments, starting from `--profile` if given.
pub fn build_config(args: &Cli, store: &dyn ProfileStore) -> Result<JobConfiguration> {
    let mut cfg = match args.profile.as_deref() {
        Some(name) => store
            .load(name)
            .with_context(|| format!("failed to load profile '{name}'"))?
            .with_context(|| format!("profile '{name}' not found"))?,
        None => JobConfiguration::default(),
    };

    for name in &args.presets {
        let preset = catalog::find_preset(name)
            .with_context(|| format!("unknown preset '{name}' (see --list-presets)"))?;
        cfg.apply_preset(preset);
    }
    if args.default_exclusions {
        cfg.apply_default_exclusions();
    }
    for spec in &args.options {
        match parse_option(spec)? {
            ParsedOption::Value(flag, value) => cfg.selected_options.set(flag, value),
            ParsedOption::Line(flag, line) => {
                cfg.multiline_options.push_line(flag, &line);
            }
        }
    }
    for (flag, lines) in [
        (catalog::EXCLUDE_FILES_FLAG, &args.exclude_files),
        (catalog::EXCLUDE_DIRS_FLAG, &args.exclude_dirs),
        (catalog::INCLUDE_FILES_FLAG, &args.include_files),
    ] {
        for line in lines {
            cfg.multiline_options.push_line(flag, line);
        }
    }
    if let Some(source) = &args.source {
        cfg.source_path = source.trim().to_string();
    }
    if let Some(dest) = &args.dest {
        cfg.destination_path = dest.trim().to_string();
    }
    if let Some(simulate) = args.simulate {
        cfg.simulate_only = simulate;
    }
    Ok(cfg)
}

/// Run the selected mode. Returns the process exit status for headless modes.
pub async fn run(args: Cli) -> Result<i32> {
    let store = args.profile_store();

    if args.list_options {
        print_options();
        return Ok(0);
    }
    if args.list_presets {
        for p in catalog::PRESETS {
            println!("{:<14} {}", p.name, p.description);
        }
        return Ok(0);
    }
    if args.list_profiles {
        for name in store.list().context("failed to list profiles")? {
            println!("{name}");
        }
        return Ok(0);
    }
    if let Some(name) = args.delete_profile.as_deref() {
        if store.delete(name).context("failed to delete profile")? {
            println!("Deleted profile '{name}'");
            return Ok(0);
        }
        eprintln!("Profile '{name}' not found");
        return Ok(1);
    }
    if let Some(name) = args.show_profile.as_deref() {
        return match store.load(name).context("failed to load profile")? {
            Some(cfg) => {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
                Ok(0)
            }
            None => {
                eprintln!("Profile '{name}' not found");
                Ok(1)
            }
        };
    }

    let config = build_config(&args, &store)?;

    if let Some(name) = args.save_profile.as_deref() {
        store
            .save(name, &config)
            .with_context(|| format!("failed to save profile '{name}'"))?;
        println!("Saved profile '{}' to {}", name.trim(), store.dir().display());
        return Ok(0);
    }
    if args.preview {
        println!("{}", command::preview(&args.executable, &config));
        return Ok(0);
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            crate::tui::run(args, config, store).await?;
            return Ok(0);
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(&args.executable, config, false).await;
        }
    }

    run_headless(&args.executable, config, args.json).await
}

fn print_options() {
    for section in catalog::Section::ALL {
        println!("{}:", section.title());
        for e in catalog::section_entries(section) {
            let kind = match e.kind {
                OptionKind::Boolean => String::new(),
                OptionKind::Integer => match e.bounds {
                    Some((min, max)) => format!("=<{min}..{max}>"),
                    None => "=<n>".to_string(),
                },
                OptionKind::Text => format!("=<{}>", e.placeholder),
                OptionKind::CharSet => format!("=[{}]", e.alphabet),
                OptionKind::MultilineList => "=<entry> (repeatable)".to_string(),
            };
            let marker = if e.destructive { " (deletes files)" } else { "" };
            println!("  {:<24} {}{}", format!("{}{}", e.base_flag(), kind), e.label, marker);
        }
    }
}

/// Run one job without the TUI. Ctrl-C cancels the child.
async fn run_headless(program: &str, config: JobConfiguration, json: bool) -> Result<i32> {
    let prepared = match prepare_run(program, &config) {
        Ok(p) => p,
        Err(notice) => {
            eprintln!("{}", notice.to_message());
            return Ok(2);
        }
    };
    let (out_tx, out_handle) = spawn_output_writer();
    let render = |ev: &RunEvent| -> Option<OutputChunk> {
        if json {
            return serde_json::to_string(ev)
                .ok()
                .map(|line| OutputChunk::Stdout(format!("{line}\n")));
        }
        match ev {
            RunEvent::Started { .. } => None,
            RunEvent::Output {
                channel: StreamChannel::Stdout,
                text,
            } => Some(OutputChunk::Stdout(text.clone())),
            RunEvent::Output {
                channel: StreamChannel::Stderr,
                text,
            } => Some(OutputChunk::Stderr(text.clone())),
            RunEvent::Completed(c) => Some(OutputChunk::Stderr(
                crate::engine::classify(c.code).summary_line(),
            )),
            RunEvent::Failed { message } => {
                Some(OutputChunk::Stderr(format!("Error: {message}\n")))
            }
            RunEvent::Info(info) => Some(OutputChunk::Stderr(info.to_message())),
        }
    };

    let supervisor = ExecutionSupervisor::new(program);
    let mut events = supervisor.subscribe();
    let banner = RunEvent::Info(InfoEvent::Running {
        command: prepared.preview,
    });
    if let Some(chunk) = render(&banner) {
        let _ = out_tx.send(chunk);
    }

    let started = supervisor.start(prepared.args);
    let pending = match started {
        Ok(p) => p,
        Err(e) => {
            if json {
                while let Some(ev) = events.try_recv() {
                    if let Some(chunk) = render(&ev) {
                        let _ = out_tx.send(chunk);
                    }
                }
            }
            drop(out_tx);
            let _ = out_handle.await;
            return Err(e).with_context(|| format!("could not run {program}"));
        }
    };

    let mut cancelled = false;
    loop {
        tokio::select! {
            Some(ev) = events.recv() => {
                if let Some(chunk) = render(&ev) {
                    let _ = out_tx.send(chunk);
                }
                if matches!(ev, RunEvent::Completed(_)) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancelled => {
                cancelled = true;
                if supervisor.cancel() {
                    if let Some(chunk) = render(&RunEvent::Info(InfoEvent::Cancelled)) {
                        let _ = out_tx.send(chunk);
                    }
                }
            }
        }
    }

    let completion = pending.await.context("run task failed")?;
    let processed = process_run_completion(&completion);

    drop(out_tx);
    let _ = out_handle.await;
    Ok(processed.exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["robackup"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    #[test]
    fn parse_boolean_and_values() {
        assert_eq!(
            parse_option("/mir"),
            Ok(ParsedOption::Value("/MIR", OptionValue::Boolean(true)))
        );
        assert_eq!(
            parse_option("/E=off"),
            Ok(ParsedOption::Value("/E", OptionValue::Boolean(false)))
        );
        assert_eq!(
            parse_option("/R=3"),
            Ok(ParsedOption::Value("/R", OptionValue::Integer(3)))
        );
        assert_eq!(
            parse_option("/copy=dta d"),
            Err(OptionParseError::InvalidChar {
                flag: "/COPY",
                ch: ' ',
                alphabet: "DATSOU"
            })
        );
        assert_eq!(
            parse_option("/COPY=datd"),
            Ok(ParsedOption::Value("/COPY", OptionValue::CharSet("DAT".into())))
        );
        assert_eq!(
            parse_option("/MAX=5000"),
            Ok(ParsedOption::Value("/MAX:n", OptionValue::Text("5000".into())))
        );
        assert_eq!(
            parse_option("/XF=*.bak"),
            Ok(ParsedOption::Line("/XF", "*.bak".into()))
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            parse_option("/BOGUS"),
            Err(OptionParseError::UnknownFlag("/BOGUS".into()))
        );
        assert_eq!(parse_option("/R"), Err(OptionParseError::MissingValue("/R")));
        assert!(matches!(
            parse_option("/R=three"),
            Err(OptionParseError::InvalidInteger { .. })
        ));
        assert!(matches!(
            parse_option("/MT=500"),
            Err(OptionParseError::OutOfRange { max: 128, .. })
        ));
        assert!(matches!(
            parse_option("/E=maybe"),
            Err(OptionParseError::InvalidBoolean { .. })
        ));
    }

    #[test]
    fn config_layers_profile_presets_and_flags() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let base = JobConfiguration {
            source_path: "C:\\data".into(),
            destination_path: "D:\\old".into(),
            ..Default::default()
        };
        store.save("base", &base).unwrap();

        let args = cli(&[
            "--profile",
            "base",
            "--dest",
            "E:\\new",
            "--preset",
            "mirror",
            "-o",
            "/R=7",
            "--exclude-dir",
            "node_modules",
            "--simulate",
            "false",
        ]);
        let cfg = build_config(&args, &store).unwrap();
        assert_eq!(cfg.source_path, "C:\\data");
        assert_eq!(cfg.destination_path, "E:\\new");
        assert!(!cfg.simulate_only);
        assert_eq!(cfg.selected_options.get("/R"), Some(&OptionValue::Integer(7)));
        assert!(cfg.selected_options.is_selected("/MIR"));
        assert_eq!(cfg.multiline_options.exclude_dirs, "node_modules");
    }

    #[test]
    fn missing_profile_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let args = cli(&["--profile", "nope"]);
        let err = build_config(&args, &store).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn simulate_defaults_on() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let cfg = build_config(&cli(&[]), &store).unwrap();
        assert!(cfg.simulate_only);
    }

    #[test]
    fn interactive_only_without_mode_flags() {
        assert!(cli(&["--source", "a"]).is_interactive());
        assert!(!cli(&["--preview"]).is_interactive());
        assert!(!cli(&["--json"]).is_interactive());
        assert!(!cli(&["--list-profiles"]).is_interactive());
    }
}
