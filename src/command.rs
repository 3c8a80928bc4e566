//! Command line construction.
//!
//! Turns a `JobConfiguration` into the argument vector handed to the copy tool,
//! plus a display string for the preview pane. Pure: no I/O, no failure modes.

use crate::catalog::SIMULATE_FLAG;
use crate::model::{JobConfiguration, OptionValue};

/// One built argument. `path_like` marks tokens the preview wraps in quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArg {
    pub value: String,
    pub path_like: bool,
}

impl CommandArg {
    fn flag(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            path_like: false,
        }
    }

    fn path(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            path_like: true,
        }
    }

    fn display(&self) -> String {
        if self.path_like {
            format!("\"{}\"", self.value)
        } else {
            self.value.clone()
        }
    }
}

/// Join a flag and its value with a colon. A flag token that already embeds a
/// colon (e.g. `/MAX:n`) keeps only the part before the first colon.
pub fn join_flag_value(flag: &str, value: &str) -> String {
    let prefix = flag.split_once(':').map_or(flag, |(p, _)| p);
    format!("{prefix}:{value}")
}

/// Build the argument list with preview metadata.
pub fn build_tokens(cfg: &JobConfiguration) -> Vec<CommandArg> {
    let mut args = Vec::new();

    if !cfg.source_path.is_empty() {
        args.push(CommandArg::path(cfg.source_path.as_str()));
    }
    if !cfg.destination_path.is_empty() {
        args.push(CommandArg::path(cfg.destination_path.as_str()));
    }

    if cfg.simulate_only && !cfg.selected_options.is_selected(SIMULATE_FLAG) {
        args.push(CommandArg::flag(SIMULATE_FLAG));
    }

    for (flag, value) in cfg.selected_options.iter() {
        match value {
            OptionValue::Boolean(true) => args.push(CommandArg::flag(flag)),
            OptionValue::Boolean(false) => {}
            OptionValue::Text(s) | OptionValue::CharSet(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    args.push(CommandArg::flag(join_flag_value(flag, s)));
                }
            }
            // Zero and negatives read as "unset".
            OptionValue::Integer(n) if *n > 0 => {
                args.push(CommandArg::flag(format!("{flag}:{n}")));
            }
            OptionValue::Integer(_) => {}
        }
    }

    for (flag, text) in cfg.multiline_options.entries() {
        for item in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            args.push(CommandArg::flag(flag));
            args.push(CommandArg::path(item));
        }
    }

    args
}

/// Build the raw, unquoted argument vector passed to the executable.
pub fn build(cfg: &JobConfiguration) -> Vec<String> {
    build_tokens(cfg).into_iter().map(|a| a.value).collect()
}

/// Render the command line for display, quoting path arguments.
pub fn preview(program: &str, cfg: &JobConfiguration) -> String {
    let mut out = program.to_string();
    for arg in build_tokens(cfg) {
        out.push(' ');
        out.push_str(&arg.display());
    }
    out
}
