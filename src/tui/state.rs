use super::form::{self, EditKind, FormItem};
use crate::engine::{classify, ExitReport};
use crate::model::{InfoEvent, JobConfiguration, RunEvent};
use crate::output_log::OutputLog;
use crate::storage::ProfileStore;
use std::time::{Duration, Instant};

pub const TAB_JOB: usize = 0;
pub const TAB_OPTIONS: usize = 1;
pub const TAB_OUTPUT: usize = 2;
pub const TAB_HELP: usize = 3;
pub const TAB_COUNT: usize = 4;

/// Text input in progress for one row.
pub struct Editor {
    pub item: FormItem,
    pub kind: EditKind,
    pub buffer: String,
}

pub struct UiState {
    pub tab: usize,
    pub program: String,
    pub config: JobConfiguration,
    pub log: OutputLog,
    pub profiles: Vec<String>,
    pub job_selected: usize,
    pub option_selected: usize,
    pub editor: Option<Editor>,
    /// Lines scrolled up from the bottom of the output pane.
    pub scroll_back: usize,
    pub running: bool,
    pub current_run: Option<u64>,
    pub run_started: Option<Instant>,
    pub last_report: Option<ExitReport>,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_JOB,
            program: crate::catalog::DEFAULT_EXECUTABLE.to_string(),
            config: JobConfiguration::default(),
            log: OutputLog::new(),
            profiles: Vec::new(),
            job_selected: 0,
            option_selected: 0,
            editor: None,
            scroll_back: 0,
            running: false,
            current_run: None,
            run_started: None,
            last_report: None,
            info: String::new(),
        }
    }
}

impl UiState {
    pub fn items(&self) -> Vec<FormItem> {
        match self.tab {
            TAB_JOB => form::job_items(&self.profiles),
            TAB_OPTIONS => form::option_items(),
            _ => Vec::new(),
        }
    }

    pub fn selected_index(&self) -> usize {
        match self.tab {
            TAB_OPTIONS => self.option_selected,
            _ => self.job_selected,
        }
    }

    pub fn selected_item(&self) -> Option<FormItem> {
        self.items().get(self.selected_index()).cloned()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.items().len();
        if len == 0 {
            return;
        }
        let next = self
            .selected_index()
            .saturating_add_signed(delta)
            .min(len - 1);
        match self.tab {
            TAB_OPTIONS => self.option_selected = next,
            _ => self.job_selected = next,
        }
    }

    pub fn refresh_profiles(&mut self, store: &dyn ProfileStore) {
        match store.list() {
            Ok(names) => self.profiles = names,
            Err(e) => self.info = format!("Could not list profiles: {e}"),
        }
        let len = self.items().len();
        if self.tab == TAB_JOB && self.job_selected >= len {
            self.job_selected = len.saturating_sub(1);
        }
    }

    /// Fold a run event into the log and the run status.
    pub fn apply_event(&mut self, ev: &RunEvent) {
        match ev {
            RunEvent::Info(InfoEvent::Running { .. }) => {
                self.running = true;
                self.current_run = None;
                self.run_started = Some(Instant::now());
                self.scroll_back = 0;
            }
            RunEvent::Started { run_id, .. } => self.current_run = Some(*run_id),
            RunEvent::Info(InfoEvent::Cancelled) => self.finish_run(),
            RunEvent::Completed(c) => {
                // A cancelled run completes after it has been replaced.
                if self.current_run != Some(c.run_id) {
                    return;
                }
                self.finish_run();
                self.last_report = Some(classify(c.code));
            }
            // A refused or unstartable run replaces the previous output.
            RunEvent::Failed { message } => {
                self.finish_run();
                self.log.clear();
                self.scroll_back = 0;
                self.info = format!("Could not start {}: {message}", self.program);
            }
            RunEvent::Info(InfoEvent::MissingPaths) => {
                self.log.clear();
                self.scroll_back = 0;
                self.info = InfoEvent::MissingPaths.to_message();
            }
            RunEvent::Info(InfoEvent::AlreadyRunning) => {
                self.info = InfoEvent::AlreadyRunning.to_message();
            }
            _ => {}
        }
        self.log.apply(ev);
    }

    fn finish_run(&mut self) {
        self.running = false;
        self.current_run = None;
        self.run_started = None;
    }

    pub fn status_line(&self) -> String {
        if self.running {
            let elapsed = self
                .run_started
                .map(|t| Duration::from_secs(t.elapsed().as_secs()))
                .unwrap_or_default();
            return format!("Running... {}", humantime::format_duration(elapsed));
        }
        match &self.last_report {
            Some(report) => match report.code {
                Some(code) => format!("Code: {code}"),
                None => "Code: none".to_string(),
            },
            None => "Idle".to_string(),
        }
    }

    /// Enter on the selected row: act immediately or open an editor.
    pub fn activate(&mut self, store: &dyn ProfileStore) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let kind = item.edit_kind();
        if kind != EditKind::Action {
            self.editor = Some(Editor {
                buffer: item.edit_buffer(&self.config),
                item,
                kind,
            });
            return;
        }
        match item {
            FormItem::Simulate => self.toggle_simulate(),
            FormItem::Preset(p) => {
                self.config.apply_preset(p);
                self.info = format!("Applied preset {}", p.name);
            }
            FormItem::DefaultExclusions => {
                self.config.apply_default_exclusions();
                self.info = "Default exclusions applied".into();
            }
            FormItem::Profile(name) => self.load_profile(store, &name),
            FormItem::Option(e) => {
                self.config.selected_options.toggle(e.flag);
                let on = self.config.selected_options.is_selected(e.flag);
                self.info = if on && e.destructive {
                    format!("Warning: {} deletes files", e.flag)
                } else {
                    format!("{} {}", e.flag, if on { "on" } else { "off" })
                };
            }
            _ => {}
        }
    }

    pub fn toggle_simulate(&mut self) {
        self.config.simulate_only = !self.config.simulate_only;
        self.info = if self.config.simulate_only {
            "Simulation on: nothing will be copied".into()
        } else {
            "Simulation off: files will be copied".into()
        };
    }

    fn load_profile(&mut self, store: &dyn ProfileStore, name: &str) {
        match store.load(name) {
            Ok(Some(cfg)) => {
                self.config = cfg;
                self.info = format!("Loaded profile '{name}'");
            }
            Ok(None) => {
                self.info = format!("Profile '{name}' no longer exists");
                self.refresh_profiles(store);
            }
            Err(e) => self.info = format!("Could not load profile: {e}"),
        }
    }

    pub fn type_char(&mut self, ch: char) {
        if let Some(ed) = self.editor.as_mut() {
            form::accept_char(ed.kind, &mut ed.buffer, ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(ed) = self.editor.as_mut() {
            ed.buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    pub fn commit_edit(&mut self, store: &dyn ProfileStore) {
        let Some(ed) = self.editor.take() else {
            return;
        };
        match ed.item {
            FormItem::Source => self.config.source_path = ed.buffer.trim().to_string(),
            FormItem::Destination => self.config.destination_path = ed.buffer.trim().to_string(),
            FormItem::SaveProfile => match store.save(&ed.buffer, &self.config) {
                Ok(()) => {
                    self.info = format!("Saved profile '{}'", ed.buffer.trim());
                    self.refresh_profiles(store);
                }
                Err(e) => self.info = format!("Could not save profile: {e}"),
            },
            FormItem::Option(e) => form::commit_option(&mut self.config, e, &ed.buffer),
            _ => {}
        }
    }

    /// Clear the selected option, or delete the selected profile.
    pub fn delete_selected(&mut self, store: &dyn ProfileStore) {
        match self.selected_item() {
            Some(FormItem::Option(e)) => {
                form::clear_option(&mut self.config, e);
                self.info = format!("{} cleared", e.base_flag());
            }
            Some(FormItem::Profile(name)) => {
                match store.delete(&name) {
                    Ok(_) => self.info = format!("Deleted profile '{name}'"),
                    Err(e) => self.info = format!("Could not delete profile: {e}"),
                }
                self.refresh_profiles(store);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Completion, LogChannel, OptionValue, StreamChannel};
    use crate::storage::FsProfileStore;
    use tempfile::TempDir;

    fn select(state: &mut UiState, wanted: &FormItem) {
        let idx = state.items().iter().position(|i| i == wanted).unwrap();
        match state.tab {
            TAB_OPTIONS => state.option_selected = idx,
            _ => state.job_selected = idx,
        }
    }

    #[test]
    fn run_lifecycle_drives_status() {
        let mut state = UiState::default();
        assert_eq!(state.status_line(), "Idle");

        state.apply_event(&RunEvent::Info(InfoEvent::Running {
            command: "robocopy \"a\" \"b\" /L".into(),
        }));
        state.apply_event(&RunEvent::Started {
            run_id: 4,
            program: "robocopy".into(),
            args: vec![],
            started_at: String::new(),
        });
        assert!(state.running);
        assert!(state.status_line().starts_with("Running..."));

        state.apply_event(&RunEvent::Output {
            channel: StreamChannel::Stdout,
            text: "copied\n".into(),
        });
        state.apply_event(&RunEvent::Completed(Completion::from_code(4, Some(1))));
        assert!(!state.running);
        assert_eq!(state.status_line(), "Code: 1");
        let last = state.log.lines().last().unwrap();
        assert_eq!(last.channel, LogChannel::Success);
    }

    #[test]
    fn refused_or_failed_run_replaces_previous_output() {
        let mut state = UiState::default();
        state.log.push(LogChannel::Stdout, "old run output\n");
        state.apply_event(&RunEvent::Info(InfoEvent::MissingPaths));
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.lines()[0].channel, LogChannel::Error);

        state.log.push(LogChannel::Stdout, "another old run\n");
        state.apply_event(&RunEvent::Failed {
            message: "program not found".into(),
        });
        assert_eq!(state.log.to_plain_text(), "Error: program not found\n");
        assert!(state.info.starts_with("Could not start"));
    }

    #[test]
    fn stale_completion_after_cancel_is_ignored() {
        let mut state = UiState::default();
        state.apply_event(&RunEvent::Info(InfoEvent::Running { command: "x".into() }));
        state.apply_event(&RunEvent::Started {
            run_id: 1,
            program: "robocopy".into(),
            args: vec![],
            started_at: String::new(),
        });
        state.apply_event(&RunEvent::Info(InfoEvent::Cancelled));
        assert!(!state.running);

        state.apply_event(&RunEvent::Info(InfoEvent::Running { command: "y".into() }));
        let before = state.log.len();
        state.apply_event(&RunEvent::Completed(Completion::from_code(1, None)));
        assert!(state.running);
        assert_eq!(state.log.len(), before);
        assert!(state.last_report.is_none());
    }

    #[test]
    fn enter_toggles_booleans_and_edits_text() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let mut state = UiState {
            tab: TAB_OPTIONS,
            ..Default::default()
        };
        let mir = FormItem::Option(crate::catalog::find("/MIR").unwrap());
        select(&mut state, &mir);
        state.activate(&store);
        assert!(state.config.selected_options.is_selected("/MIR"));
        assert!(state.info.starts_with("Warning"));

        let retries = FormItem::Option(crate::catalog::find("/R").unwrap());
        select(&mut state, &retries);
        state.activate(&store);
        for ch in "12x".chars() {
            state.type_char(ch);
        }
        state.commit_edit(&store);
        assert_eq!(
            state.config.selected_options.get("/R"),
            Some(&OptionValue::Integer(12))
        );

        state.delete_selected(&store);
        assert!(state.config.selected_options.get("/R").is_none());
    }

    #[test]
    fn save_load_and_delete_profiles() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let mut state = UiState::default();
        state.config.source_path = "C:\\src".into();

        select(&mut state, &FormItem::SaveProfile);
        state.activate(&store);
        for ch in "nightly".chars() {
            state.type_char(ch);
        }
        state.commit_edit(&store);
        assert_eq!(state.profiles, vec!["nightly"]);

        state.config = JobConfiguration::default();
        select(&mut state, &FormItem::Profile("nightly".into()));
        state.activate(&store);
        assert_eq!(state.config.source_path, "C:\\src");

        state.delete_selected(&store);
        assert!(state.profiles.is_empty());
        assert!(state.job_selected < state.items().len());
    }

    #[test]
    fn bad_profile_name_reports_instead_of_saving() {
        let tmp = TempDir::new().unwrap();
        let store = FsProfileStore::new(tmp.path());
        let mut state = UiState::default();
        select(&mut state, &FormItem::SaveProfile);
        state.activate(&store);
        state.type_char('a');
        state.type_char('/');
        state.commit_edit(&store);
        assert!(state.info.starts_with("Could not save profile"));
        assert!(state.profiles.is_empty());
    }
}
