use groundwater_core::{LogEntry, Segment, Sender};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};

/// Turn a display line into styled spans, bold segments get the bold modifier
fn segments_to_line(segments: Vec<Segment>) -> Line<'static> {
    if segments.is_empty() {
        return Line::default();
    }
    Line::from(
        segments
            .into_iter()
            .map(|segment| {
                if segment.bold {
                    Span::styled(segment.text, Style::default().add_modifier(Modifier::BOLD))
                } else {
                    Span::raw(segment.text)
                }
            })
            .collect::<Vec<_>>(),
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = Span::styled(" Groundwater Assistant ", Style::default().fg(Color::Cyan).bold());

    let mut x = area.x + title.width() as u16;
    let mut spans = vec![title];
    app.language_areas.clear();

    for (language, active) in app.session.languages().toggles() {
        let label = format!(" {} ", language.display_name());
        let style = if active {
            Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let toggle = Span::styled(label, style);
        let width = toggle.width() as u16;

        app.language_areas.push((language, Rect::new(x, area.y, width, 1)));
        spans.push(toggle);
        spans.push(Span::raw(" "));
        x += width + 1;
    }

    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " CHAT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" F1-F3 ", key_style),
            Span::styled(" language ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
                Span::styled(" j/k ", key_style),
            ];
            if app.focus == FocusPane::Reports {
                hints.extend(vec![
                    Span::styled(" nav ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" open ", label_style),
                    Span::styled(" s ", key_style),
                    Span::styled(" save ", label_style),
                ]);
            } else {
                hints.push(Span::styled(" scroll ", label_style));
            }
            hints.extend(vec![
                Span::styled(" l ", key_style),
                Span::styled(" language ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let report_count = app.report_count();
    let reports_height = if report_count == 0 {
        0
    } else {
        (report_count.min(5) + 2) as u16 // +2 for borders
    };

    let [chat_area, reports_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(reports_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.reports_area = if reports_height > 0 { Some(reports_area) } else { None };

    // Inner size minus borders, used for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_chat(app, frame, chat_area);
    if reports_height > 0 {
        render_reports(app, frame, reports_area);
    }
    render_input(app, frame, input_area);
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Chat { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chat ({}) ", app.session.language().display_name()));

    let conversation = app.session.conversation();
    let busy = app.busy();

    let mut lines: Vec<Line> = Vec::new();

    // Placeholder stays until the session removes it
    if let Some(welcome) = conversation.welcome() {
        lines.extend(welcome.lines().map(|line| {
            Line::from(Span::styled(line.to_string(), Style::default().fg(Color::DarkGray)))
        }));
        lines.push(Line::default());
    }

    for entry in conversation.entries() {
        match entry {
            LogEntry::Message(msg) => {
                let header = match msg.sender {
                    Sender::User => Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Sender::Bot => Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                };
                lines.push(Line::from(header));
                lines.extend(msg.display_lines().into_iter().map(segments_to_line));
            }
            LogEntry::Report(link) => {
                lines.push(Line::from(vec![
                    Span::styled("  ⤓ ", Style::default().fg(Color::Magenta)),
                    Span::styled(
                        link.label(),
                        Style::default().fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
                    ),
                ]));
            }
        }
        lines.push(Line::default());
    }

    if busy {
        lines.push(Line::from(Span::styled(
            "Bot:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let status = if app.session.detecting_location() {
            "Detecting location"
        } else {
            "Thinking"
        };
        lines.push(Line::from(Span::styled(
            format!("{}{}", status, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let text = Text::from(lines);

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_reports(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Reports { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Reports (Enter to open, s to save) ");

    let items: Vec<ListItem> = app
        .session
        .conversation()
        .report_links()
        .iter()
        .enumerate()
        .map(|(i, link)| ListItem::new(format!(" {}. {} ", i + 1, link.label())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.reports_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.session.awaiting_location_confirmation() {
        " Use your location? (yes/no) "
    } else {
        " Ask about groundwater "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Scroll horizontally to keep the cursor visible
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
