use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("q / Ctrl-C", "Quit (cancels a running job)"),
    ("tab / shift-tab", "Switch tabs"),
    ("↑/↓ or j/k", "Navigate"),
    ("enter / space", "Toggle, edit or apply the selected row"),
    ("d / del", "Clear option or delete profile"),
    ("x / F5", "Run the job"),
    ("c", "Cancel the running job"),
    ("m", "Toggle simulation (/L)"),
    ("y", "Copy command line to clipboard"),
    ("w", "Write output to a file"),
    ("l", "Clear output"),
    ("PgUp / PgDn", "Scroll output"),
    ("?", "Show this help"),
];

const EDITING: &[(&str, &str)] = &[
    ("enter", "Commit"),
    ("esc", "Discard"),
    ("letters", "Toggle a character (file and directory properties)"),
    ("|", "Separate entries in exclude and include lists"),
];

fn keybind_lines(
    title: &'static str,
    binds: &[(&'static str, &'static str)],
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(title)];
    lines.extend(binds.iter().map(|(key, what)| {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{key:<16}"), Style::default().fg(Color::Magenta)),
            Span::raw(*what),
        ])
    }));
    lines
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = keybind_lines("Keybinds:", KEYBINDS);
    lines.push(Line::from(""));
    lines.extend(keybind_lines("While editing:", EDITING));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Simulation is on by default. Options marked "),
        Span::styled("!", Style::default().fg(Color::Red)),
        Span::raw(" delete files."),
    ]));
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
