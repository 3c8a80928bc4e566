//! Selectable rows of the Job and Options tabs.

use crate::catalog::{self, OptionCatalogEntry, OptionKind, Preset};
use crate::model::{JobConfiguration, OptionValue};

#[derive(Debug, Clone, PartialEq)]
pub enum FormItem {
    Source,
    Destination,
    Simulate,
    Preset(&'static Preset),
    DefaultExclusions,
    SaveProfile,
    Profile(String),
    Option(&'static OptionCatalogEntry),
}

/// Rows of the Job tab, with one row per saved profile at the end.
pub fn job_items(profiles: &[String]) -> Vec<FormItem> {
    let mut items = vec![FormItem::Source, FormItem::Destination, FormItem::Simulate];
    items.extend(catalog::PRESETS.iter().map(FormItem::Preset));
    items.push(FormItem::DefaultExclusions);
    items.push(FormItem::SaveProfile);
    items.extend(profiles.iter().cloned().map(FormItem::Profile));
    items
}

/// Rows of the Options tab in section order.
pub fn option_items() -> Vec<FormItem> {
    catalog::Section::ALL
        .into_iter()
        .flat_map(catalog::section_entries)
        .map(FormItem::Option)
        .collect()
}

/// How a row reacts to Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Free text, committed as-is.
    Text,
    /// Digits only.
    Digits,
    /// Characters from an alphabet, each typed once toggles it.
    Chars(&'static str),
    /// Entries separated by `|`.
    List,
    /// No text input; Enter acts immediately.
    Action,
}

impl FormItem {
    pub fn edit_kind(&self) -> EditKind {
        match self {
            FormItem::Source | FormItem::Destination | FormItem::SaveProfile => EditKind::Text,
            FormItem::Option(e) => match e.kind {
                OptionKind::Boolean => EditKind::Action,
                OptionKind::Integer => EditKind::Digits,
                OptionKind::Text => EditKind::Text,
                OptionKind::CharSet => EditKind::Chars(e.alphabet),
                OptionKind::MultilineList => EditKind::List,
            },
            _ => EditKind::Action,
        }
    }

    pub fn label(&self) -> String {
        match self {
            FormItem::Source => "Source".into(),
            FormItem::Destination => "Destination".into(),
            FormItem::Simulate => "Simulate only (/L)".into(),
            FormItem::Preset(p) => format!("Preset: {}", p.name),
            FormItem::DefaultExclusions => "Use default exclusions".into(),
            FormItem::SaveProfile => "Save as profile…".into(),
            FormItem::Profile(name) => format!("Profile: {name}"),
            FormItem::Option(e) => format!("[{}] {} {}", e.section.title(), e.base_flag(), e.label),
        }
    }

    /// Current value shown next to the label.
    pub fn value(&self, cfg: &JobConfiguration) -> String {
        match self {
            FormItem::Source => cfg.source_path.clone(),
            FormItem::Destination => cfg.destination_path.clone(),
            FormItem::Simulate => on_off(cfg.simulate_only).into(),
            FormItem::Option(e) if e.kind == OptionKind::MultilineList => cfg
                .multiline_options
                .get(e.flag)
                .map(|text| {
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .unwrap_or_default(),
            FormItem::Option(e) => match cfg.selected_options.get(e.flag) {
                Some(OptionValue::Boolean(b)) => on_off(*b).into(),
                Some(v) => v.display(),
                None if e.kind == OptionKind::Boolean => on_off(false).into(),
                None => String::new(),
            },
            _ => String::new(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            FormItem::Source => "Directory to copy from".into(),
            FormItem::Destination => "Directory to copy to".into(),
            FormItem::Simulate => "List only: nothing is copied, deleted or time-stamped".into(),
            FormItem::Preset(p) => p.description.into(),
            FormItem::DefaultExclusions => format!(
                "Exclude files {} and directories {}",
                catalog::DEFAULT_EXCLUDED_FILES.join(" "),
                catalog::DEFAULT_EXCLUDED_DIRS.join(" ")
            ),
            FormItem::SaveProfile => "Store the current job under a name".into(),
            FormItem::Profile(_) => "Enter loads this profile, d deletes it".into(),
            FormItem::Option(e) => {
                let mut text = e.description.to_string();
                if let Some((min, max)) = e.bounds {
                    text.push_str(&format!(" [{min}..{max}]"));
                }
                if !e.alphabet.is_empty() {
                    text.push_str(&format!(" [{}]", e.alphabet));
                }
                if e.kind == OptionKind::MultilineList {
                    text.push_str(" (separate entries with |)");
                }
                if e.destructive {
                    text.push_str(" WARNING: deletes files");
                }
                text
            }
        }
    }

    /// Initial edit buffer for text-like rows.
    pub fn edit_buffer(&self, cfg: &JobConfiguration) -> String {
        match self {
            FormItem::SaveProfile => String::new(),
            _ => self.value(cfg),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, FormItem::Option(e) if e.destructive)
    }
}

fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}

/// Apply one typed character to an edit buffer, enforcing the row's input rules.
pub fn accept_char(kind: EditKind, buffer: &mut String, ch: char) {
    match kind {
        EditKind::Action => {}
        EditKind::Digits => {
            if ch.is_ascii_digit() {
                buffer.push(ch);
            }
        }
        EditKind::Chars(alphabet) => {
            let ch = ch.to_ascii_uppercase();
            if !alphabet.contains(ch) {
                return;
            }
            if buffer.contains(ch) {
                buffer.retain(|c| c != ch);
            } else {
                buffer.push(ch);
            }
        }
        EditKind::Text | EditKind::List => {
            if !ch.is_control() {
                buffer.push(ch);
            }
        }
    }
}

/// Write an edited value back into the configuration. Empty values deselect the option.
pub fn commit_option(cfg: &mut JobConfiguration, entry: &OptionCatalogEntry, buffer: &str) {
    let text = buffer.trim();
    match entry.kind {
        OptionKind::Boolean => {}
        OptionKind::MultilineList => {
            let joined = text
                .split('|')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            cfg.multiline_options.set(entry.flag, joined);
        }
        _ if text.is_empty() => {
            cfg.selected_options.remove(entry.flag);
        }
        OptionKind::Integer => match text.parse::<i64>() {
            Ok(n) => cfg
                .selected_options
                .set(entry.flag, OptionValue::Integer(entry.clamp(n))),
            // Too many digits for i64: saturate to the upper bound.
            Err(_) => cfg
                .selected_options
                .set(entry.flag, OptionValue::Integer(entry.clamp(i64::MAX))),
        },
        OptionKind::Text => cfg
            .selected_options
            .set(entry.flag, OptionValue::Text(text.to_string())),
        OptionKind::CharSet => cfg
            .selected_options
            .set(entry.flag, OptionValue::CharSet(text.to_string())),
    }
}

/// Clear an option or list row.
pub fn clear_option(cfg: &mut JobConfiguration, entry: &OptionCatalogEntry) {
    if entry.kind == OptionKind::MultilineList {
        cfg.multiline_options.set(entry.flag, "");
    } else {
        cfg.selected_options.remove(entry.flag);
    }
}
