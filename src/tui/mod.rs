mod export;
mod form;
mod help;
mod state;

use crate::cli::Cli;
use crate::command;
use crate::model::{JobConfiguration, LogChannel, RunEvent};
use crate::orchestrator::{self, UiCommand};
use crate::output_log::{OutputLog, Segment};
use crate::storage::FsProfileStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{copy_to_clipboard, export_output_log};
use form::FormItem;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{UiState, TAB_COUNT, TAB_HELP, TAB_JOB, TAB_OPTIONS, TAB_OUTPUT};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, config: JobConfiguration, store: FsProfileStore) -> Result<()> {
    // Unbounded channels keep process output flowing without backpressure on the pumps.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let program = args.executable.clone();
    let ui_program = program.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_program, config, store, event_rx, cmd_tx));

    let res = orchestrator::run_controller(program, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    program: String,
    config: JobConfiguration,
    store: FsProfileStore,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        program,
        config,
        ..Default::default()
    };
    state.refresh_profiles(&store);
    tracing::info!(profiles = state.profiles.len(), "tui started");

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(&ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }

        if state.editor.is_some() {
            match k.code {
                KeyCode::Enter => state.commit_edit(&store),
                KeyCode::Esc => state.cancel_edit(),
                KeyCode::Backspace => state.backspace(),
                KeyCode::Char(ch) => state.type_char(ch),
                _ => {}
            }
            continue;
        }

        match (k.modifiers, k.code) {
            (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                let _ = cmd_tx.send(UiCommand::Quit);
                break Ok(());
            }
            (_, KeyCode::Tab) => state.tab = (state.tab + 1) % TAB_COUNT,
            (_, KeyCode::BackTab) => state.tab = (state.tab + TAB_COUNT - 1) % TAB_COUNT,
            (_, KeyCode::Char('?')) => state.tab = TAB_HELP,
            (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.move_selection(-1),
            (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.move_selection(1),
            (_, KeyCode::PageUp) => state.scroll_back = state.scroll_back.saturating_add(10),
            (_, KeyCode::PageDown) => state.scroll_back = state.scroll_back.saturating_sub(10),
            (_, KeyCode::Enter) | (_, KeyCode::Char(' ')) => state.activate(&store),
            (_, KeyCode::Char('d')) | (_, KeyCode::Delete) => state.delete_selected(&store),
            (_, KeyCode::Char('m')) => state.toggle_simulate(),
            (_, KeyCode::Char('x')) | (_, KeyCode::F(5)) => {
                let _ = cmd_tx.send(UiCommand::Start(Box::new(state.config.clone())));
            }
            (_, KeyCode::Char('c')) => {
                if state.running {
                    let _ = cmd_tx.send(UiCommand::Cancel);
                } else {
                    state.info = "Nothing to cancel".into();
                }
            }
            (_, KeyCode::Char('y')) => {
                let preview = command::preview(&state.program, &state.config);
                state.info = match copy_to_clipboard(&preview) {
                    Ok(()) => "✓ Command copied to clipboard".into(),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
            (_, KeyCode::Char('w')) => {
                state.info = match export_output_log(&state.log) {
                    Ok(p) => format!("Output written to {}", p.display()),
                    Err(e) => format!("Export failed: {e:#}"),
                };
            }
            (_, KeyCode::Char('l')) => {
                state.log.clear();
                state.scroll_back = 0;
            }
            _ => {}
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Job"),
        Line::from("Options"),
        Line::from("Output"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("robackup"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_JOB | TAB_OPTIONS => {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
                .split(chunks[1]);
            draw_form(body[0], f, state);
            draw_output(body[1], f, &state.log, state.scroll_back);
        }
        TAB_OUTPUT => draw_output(chunks[1], f, &state.log, state.scroll_back),
        _ => help::draw_help(chunks[1], f),
    }

    draw_preview(chunks[2], f, state);
    draw_status(chunks[3], f, state);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)].as_ref())
        .split(area);

    let items = state.items();
    let selected = state.selected_index();
    let rows: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let editing = state.editor.as_ref().filter(|_| i == selected);
            let value = match editing {
                Some(ed) => format!("{}▏", ed.buffer),
                None => item.value(&state.config),
            };
            let mut spans = vec![Span::raw(item.label())];
            if item.is_destructive() {
                spans.push(Span::styled(" !", Style::default().fg(Color::Red)));
            }
            if !value.is_empty() {
                spans.push(Span::raw("  "));
                let style = if editing.is_some() {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                spans.push(Span::styled(value, style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if state.tab == TAB_JOB { "Job" } else { "Options" };
    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(selected));
    }
    f.render_stateful_widget(list, parts[0], &mut list_state);

    let description = items
        .get(selected)
        .map(FormItem::description)
        .unwrap_or_default();
    let desc = Paragraph::new(description)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("About"));
    f.render_widget(desc, parts[1]);
}

fn channel_style(channel: LogChannel) -> Style {
    match channel {
        LogChannel::Stdout => Style::default(),
        LogChannel::Stderr => Style::default().fg(Color::LightRed),
        LogChannel::Info => Style::default().fg(Color::Cyan),
        LogChannel::Success => Style::default().fg(Color::Green),
        LogChannel::Warning => Style::default().fg(Color::Yellow),
        LogChannel::Error => Style::default().fg(Color::Red),
    }
}

fn styled_line(segments: &[Segment]) -> Line<'static> {
    Line::from(
        segments
            .iter()
            .map(|seg| Span::styled(seg.text.clone(), channel_style(seg.channel)))
            .collect::<Vec<_>>(),
    )
}

/// Only the visible window is styled; the log keeps the split lines.
fn visible_lines(log: &OutputLog, height: usize, scroll_back: usize) -> Vec<Line<'static>> {
    let lines = log.display_lines();
    let end = lines.len().saturating_sub(scroll_back.min(lines.len()));
    let start = end.saturating_sub(height);
    lines[start..end].iter().map(|l| styled_line(l)).collect()
}

fn draw_output(area: Rect, f: &mut ratatui::Frame, log: &OutputLog, scroll_back: usize) {
    let height = area.height.saturating_sub(2) as usize;
    let title = if scroll_back > 0 {
        format!("Output (scrolled {scroll_back})")
    } else {
        "Output".to_string()
    };
    let p = Paragraph::new(visible_lines(log, height, scroll_back))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_preview(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let preview = command::preview(&state.program, &state.config);
    let style = if state.config.simulate_only {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::White)
    };
    let p = Paragraph::new(Line::from(Span::styled(preview, style)))
        .block(Block::default().borders(Borders::ALL).title("Command"));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let status = state.status_line();
    let color = if state.running {
        Color::Yellow
    } else {
        state
            .last_report
            .as_ref()
            .map(|r| match r.class {
                crate::engine::ExitClass::Success => Color::Green,
                crate::engine::ExitClass::Warning => Color::Yellow,
                crate::engine::ExitClass::Error => Color::Red,
                crate::engine::ExitClass::Info => Color::Gray,
            })
            .unwrap_or(Color::Gray)
    };
    let sim = if state.config.simulate_only {
        " [simulate]"
    } else {
        ""
    };
    let line = Line::from(vec![
        Span::styled(status, Style::default().fg(color)),
        Span::styled(sim, Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::raw(state.info.clone()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn window_follows_the_tail() {
        let mut log = OutputLog::new();
        for i in 0..10 {
            log.push(LogChannel::Stdout, format!("line {i}\n"));
        }
        assert_eq!(plain(&visible_lines(&log, 3, 0)), vec!["line 7", "line 8", "line 9"]);
        assert_eq!(plain(&visible_lines(&log, 3, 2)), vec!["line 5", "line 6", "line 7"]);
        assert_eq!(plain(&visible_lines(&log, 3, 50)), Vec::<String>::new());
    }

    #[test]
    fn segments_keep_channel_colours() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Stdout, "copy ");
        log.push(LogChannel::Stderr, "denied\n");
        let lines = visible_lines(&log, 5, 0);
        assert_eq!(plain(&lines), vec!["copy denied"]);
        assert_eq!(lines[0].spans[1].style, channel_style(LogChannel::Stderr));
    }
}
