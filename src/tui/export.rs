use crate::output_log::OutputLog;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// File name for an output export, stamped with the current UTC time.
fn log_file_name() -> String {
    let format = time::macros::format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "now".to_string());
    format!("robackup-output-{stamp}.log")
}

/// Write the plain-text output log into `dir`. Returns the absolute path written.
pub fn write_output_log(log: &OutputLog, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(log_file_name());
    std::fs::write(&path, log.to_plain_text())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Export into the current directory.
pub fn export_output_log(log: &OutputLog) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    write_output_log(log, &current_dir)
}

/// Initialize the clipboard manager thread if not already initialized.
/// Operations are processed sequentially, and each clipboard instance is kept
/// alive long enough for clipboard managers to read it on Linux.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
