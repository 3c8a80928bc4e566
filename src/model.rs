use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Value attached to a selected catalog option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
    /// Unique characters drawn from the option's alphabet, e.g. `DAT`.
    CharSet(String),
}

impl OptionValue {
    /// Whether the value counts as "selected" for the purposes of the simulate flag check.
    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::Boolean(b) => *b,
            OptionValue::Integer(n) => *n != 0,
            OptionValue::Text(s) | OptionValue::CharSet(s) => !s.trim().is_empty(),
        }
    }

    /// Render the value the way the editor shows it.
    pub fn display(&self) -> String {
        match self {
            OptionValue::Boolean(true) => "on".to_string(),
            OptionValue::Boolean(false) => "off".to_string(),
            OptionValue::Integer(n) => n.to_string(),
            OptionValue::Text(s) | OptionValue::CharSet(s) => s.clone(),
        }
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Boolean(b) => serializer.serialize_bool(*b),
            OptionValue::Integer(n) => serializer.serialize_i64(*n),
            OptionValue::Text(s) | OptionValue::CharSet(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Strings come back as Text; CharSet is restored from the catalog kind
        // by `JobConfiguration::normalize`.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Boolean(bool),
            Integer(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Boolean(b) => OptionValue::Boolean(b),
            Raw::Integer(n) => OptionValue::Integer(n),
            Raw::Text(s) => OptionValue::Text(s),
        })
    }
}

/// Flag → value mapping that keeps insertion order.
///
/// Re-setting an existing flag keeps its original position, so the built
/// command line stays stable while the user edits values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedOptions(Vec<(String, OptionValue)>);

impl SelectedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: &str) -> Option<&OptionValue> {
        self.0.iter().find(|(f, _)| f == flag).map(|(_, v)| v)
    }

    pub fn set(&mut self, flag: impl Into<String>, value: OptionValue) {
        let flag = flag.into();
        match self.0.iter_mut().find(|(f, _)| *f == flag) {
            Some(slot) => slot.1 = value,
            None => self.0.push((flag, value)),
        }
    }

    pub fn remove(&mut self, flag: &str) -> Option<OptionValue> {
        let idx = self.0.iter().position(|(f, _)| f == flag)?;
        Some(self.0.remove(idx).1)
    }

    /// Flip a boolean option. Unset and non-boolean values become `true`.
    pub fn toggle(&mut self, flag: &str) {
        let next = !matches!(self.get(flag), Some(OptionValue::Boolean(true)));
        self.set(flag, OptionValue::Boolean(next));
    }

    /// Overlay `other` on top of this mapping; later keys win.
    pub fn merge(&mut self, other: &SelectedOptions) {
        for (flag, value) in other.iter() {
            self.set(flag, value.clone());
        }
    }

    pub fn is_selected(&self, flag: &str) -> bool {
        self.get(flag).is_some_and(OptionValue::is_set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, OptionValue)> for SelectedOptions {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        let mut out = SelectedOptions::new();
        for (flag, value) in iter {
            out.set(flag, value);
        }
        out
    }
}

impl Serialize for SelectedOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (flag, value) in &self.0 {
            map.serialize_entry(flag, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SelectedOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = SelectedOptions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of option flags to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = SelectedOptions::new();
                while let Some((flag, value)) = access.next_entry::<String, OptionValue>()? {
                    out.set(flag, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Raw text of the three list-valued options, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilineOptions {
    #[serde(rename = "/XF", default)]
    pub exclude_files: String,
    #[serde(rename = "/XD", default)]
    pub exclude_dirs: String,
    #[serde(rename = "/IF", default)]
    pub include_files: String,
}

impl MultilineOptions {
    /// Entries in the order they are appended to the command line.
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            (crate::catalog::EXCLUDE_FILES_FLAG, &self.exclude_files),
            (crate::catalog::EXCLUDE_DIRS_FLAG, &self.exclude_dirs),
            (crate::catalog::INCLUDE_FILES_FLAG, &self.include_files),
        ]
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.entries()
            .into_iter()
            .find(|(f, _)| *f == flag)
            .map(|(_, text)| text)
    }

    /// Returns false when `flag` is not one of the list-valued options.
    pub fn set(&mut self, flag: &str, text: impl Into<String>) -> bool {
        let slot = match flag {
            crate::catalog::EXCLUDE_FILES_FLAG => &mut self.exclude_files,
            crate::catalog::EXCLUDE_DIRS_FLAG => &mut self.exclude_dirs,
            crate::catalog::INCLUDE_FILES_FLAG => &mut self.include_files,
            _ => return false,
        };
        *slot = text.into();
        true
    }

    /// Add one entry to the end of a list.
    pub fn push_line(&mut self, flag: &str, line: &str) -> bool {
        let Some(current) = self.get(flag) else {
            return false;
        };
        let next = if current.trim().is_empty() {
            line.to_string()
        } else {
            format!("{}\n{}", current.trim_end_matches('\n'), line)
        };
        self.set(flag, next)
    }
}

fn default_simulate() -> bool {
    true
}

/// Working set the command line is built from. Doubles as the persisted profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfiguration {
    #[serde(rename = "sourcePath", default)]
    pub source_path: String,
    #[serde(rename = "destPath", default)]
    pub destination_path: String,
    #[serde(rename = "options", default)]
    pub selected_options: SelectedOptions,
    #[serde(rename = "textOptions", default)]
    pub multiline_options: MultilineOptions,
    #[serde(rename = "simulationMode", default = "default_simulate")]
    pub simulate_only: bool,
}

impl Default for JobConfiguration {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            destination_path: String::new(),
            selected_options: SelectedOptions::new(),
            multiline_options: MultilineOptions::default(),
            simulate_only: true,
        }
    }
}

impl JobConfiguration {
    /// Merge a preset's options into the current selection.
    pub fn apply_preset(&mut self, preset: &crate::catalog::Preset) {
        self.selected_options.merge(&preset.options());
    }

    /// Replace the file and directory exclusion lists with the built-in defaults.
    pub fn apply_default_exclusions(&mut self) {
        self.multiline_options.exclude_files = crate::catalog::DEFAULT_EXCLUDED_FILES.join("\n");
        self.multiline_options.exclude_dirs = crate::catalog::DEFAULT_EXCLUDED_DIRS.join("\n");
    }

    /// Restore value kinds JSON cannot distinguish (character sets are stored as plain strings).
    pub fn normalize(&mut self) {
        let restored: Vec<(String, OptionValue)> = self
            .selected_options
            .iter()
            .filter_map(|(flag, value)| match (crate::catalog::find(flag), value) {
                (Some(entry), OptionValue::Text(s))
                    if entry.kind == crate::catalog::OptionKind::CharSet =>
                {
                    Some((flag.to_string(), OptionValue::CharSet(s.clone())))
                }
                _ => None,
            })
            .collect();
        for (flag, value) in restored {
            self.selected_options.set(flag, value);
        }
    }
}

/// Pipe a chunk of process output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamChannel {
    Stdout,
    Stderr,
}

/// Severity tag of a line in the output log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    Stdout,
    Stderr,
    Info,
    Success,
    Warning,
    Error,
}

impl From<StreamChannel> for LogChannel {
    fn from(c: StreamChannel) -> Self {
        match c {
            StreamChannel::Stdout => LogChannel::Stdout,
            StreamChannel::Stderr => LogChannel::Stderr,
        }
    }
}

/// Terminal payload of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub run_id: u64,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl Completion {
    pub fn from_code(run_id: u64, code: Option<i32>) -> Self {
        Self {
            run_id,
            code,
            // robocopy reports copy failures from 8 upwards
            success: code.is_some_and(|c| c < 8),
        }
    }
}

/// Events streamed by the supervisor and the run controller to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        run_id: u64,
        program: String,
        args: Vec<String>,
        started_at: String,
    },
    /// Raw chunk as read from the pipe; not aligned to lines.
    Output {
        channel: StreamChannel,
        text: String,
    },
    Completed(Completion),
    /// The executable could not be launched.
    Failed {
        message: String,
    },
    Info(InfoEvent),
}

/// Structured notices emitted outside the child process and consumed by UI/CLI layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoEvent {
    Message { text: String },
    /// A run was accepted; carries the preview command line.
    Running { command: String },
    MissingPaths,
    AlreadyRunning,
    Cancelled,
    StillCancelling,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message { text } => text.clone(),
            InfoEvent::Running { command } => format!("> Running: {command}\n"),
            InfoEvent::MissingPaths => {
                "Error: Select source and destination directories.".to_string()
            }
            InfoEvent::AlreadyRunning => "A copy job is already running".to_string(),
            InfoEvent::Cancelled => "\n--- Operation cancelled by user ---\n".to_string(),
            InfoEvent::StillCancelling => {
                "Still waiting for the cancelled process to exit…".to_string()
            }
        }
    }

    pub fn channel(&self) -> LogChannel {
        match self {
            InfoEvent::Message { .. } | InfoEvent::Running { .. } => LogChannel::Info,
            InfoEvent::MissingPaths => LogChannel::Error,
            InfoEvent::AlreadyRunning | InfoEvent::Cancelled | InfoEvent::StillCancelling => {
                LogChannel::Warning
            }
        }
    }
}
