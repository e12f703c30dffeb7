use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};
use crate::app::{App, DrugPopup, FocusPane};
use crate::client::DrugInfo;
use crate::highlight::Severity;
use crate::render;

const SIDEBAR_WIDTH: u16 = 26;
const MAX_INPUT_LINES: u16 = 6;

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

    let [sidebar_area, chat_column] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 3)),
        Constraint::Min(0),
    ])
    .areas(body_area);

    // Input grows with its content, up to a limit
    let input_lines = (app.view.input.line_count() as u16).clamp(1, MAX_INPUT_LINES);
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
    ])
    .areas(chat_column);

    render_catalog(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area, input_lines);
    render_footer(app, frame, footer_area);

    if let Some(popup) = &app.drug_popup {
        render_drug_popup(popup, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" PD TreatmentAssist ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.drug_popup.is_some() {
        vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        match app.focus {
            FocusPane::Input => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Alt+Enter ", key_style),
                Span::styled(" newline ", label_style),
            ],
            FocusPane::Catalog => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" info ", label_style),
            ],
        }
    };

    if app.drug_popup.is_none() {
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" ^R ", key_style),
            Span::styled(" reset ", label_style),
            Span::styled(" ^S ", key_style),
            Span::styled(" save ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

    if let Some(status) = &app.status {
        hints.push(Span::raw(" "));
        hints.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_catalog(app: &mut App, frame: &mut Frame, area: Rect) {
    app.catalog_area = Some(area);

    let focused = app.focus == FocusPane::Catalog;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Medications ");

    if app.view.catalog().is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No medications loaded",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .view
        .catalog()
        .entries()
        .iter()
        .map(|entry| ListItem::new(format!(" {} ", entry.name)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(if focused { Color::Cyan } else { Color::DarkGray })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.catalog_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let mut lines: Vec<Line> = Vec::new();
    if app.view.welcome_visible() && app.view.messages().is_empty() {
        lines.extend(render::welcome_lines());
    }
    for message in app.view.messages() {
        lines.extend(render::message_lines(message));
    }
    if app.view.is_typing() {
        lines.extend(render::typing_lines(app.animation_frame));
    }

    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Inner size minus borders
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total_lines = u16::try_from(paragraph.line_count(inner_width)).unwrap_or(u16::MAX);

    app.chat_height = inner_height;
    app.chat_max_scroll = total_lines.saturating_sub(inner_height);
    app.chat_scroll = if app.follow_chat {
        app.chat_max_scroll
    } else {
        app.chat_scroll.min(app.chat_max_scroll)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    frame.render_widget(paragraph.block(block).scroll((app.chat_scroll, 0)), area);

    if app.chat_max_scroll > 0 {
        let mut state = ScrollbarState::new(app.chat_max_scroll as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, visible_lines: u16) {
    let input = &app.view.input;
    let editing = app.focus == FocusPane::Input && app.drug_popup.is_none();

    // Border doubles as the send affordance
    let border_color = if app.view.can_send() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if app.view.is_pending() {
        " Waiting for response... "
    } else {
        " Message "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Scroll so the cursor stays visible, both vertically and horizontally
    let inner_width = area.width.saturating_sub(2) as usize;
    let (cursor_line, cursor_col) = input.cursor_position();
    let line_offset = (cursor_line + 1).saturating_sub(visible_lines as usize);
    let col_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let visible: Vec<Line> = input
        .text()
        .split('\n')
        .skip(line_offset)
        .take(visible_lines as usize)
        .map(|line| {
            Line::from(
                line.chars()
                    .skip(col_offset)
                    .take(inner_width)
                    .collect::<String>(),
            )
        })
        .collect();

    let paragraph = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(paragraph, area);

    if editing {
        let x = (cursor_col - col_offset) as u16;
        let y = (cursor_line - line_offset) as u16;
        frame.set_cursor_position((area.x + 1 + x, area.y + 1 + y));
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn render_drug_popup(popup: &DrugPopup, frame: &mut Frame, area: Rect) {
    let (title, lines) = match popup {
        DrugPopup::Loading(name) => (
            name.clone(),
            vec![Line::from(Span::styled(
                "Loading...",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))],
        ),
        DrugPopup::Loaded(info) => (info.name.clone(), drug_info_lines(info)),
        DrugPopup::Failed { name, message } => (
            name.clone(),
            vec![Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red)))],
        ),
    };

    let popup_area = centered_rect(area, 70, 20);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {title} "));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

fn drug_info_lines(info: &DrugInfo) -> Vec<Line<'static>> {
    let heading = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    let mut push_effects = |label: &str, effects: &[String], severity: Severity| {
        if effects.is_empty() {
            return;
        }
        lines.push(Line::from(Span::styled(label.to_string(), heading)));
        let mut spans = Vec::new();
        for effect in effects {
            spans.push(Span::styled(effect.clone(), render::term_style(severity)));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
        lines.push(Line::default());
    };
    push_effects("Common side effects", &info.common_side_effects, Severity::Common);
    push_effects("Severe side effects", &info.severe_side_effects, Severity::Severe);

    let reading: Vec<(String, String)> = info
        .resources
        .iter()
        .map(|r| (r.name.clone(), r.url.clone()))
        .chain(
            info.case_studies
                .iter()
                .map(|c| (format!("Case Study: {}", c.title), c.url.clone())),
        )
        .collect();
    if !reading.is_empty() {
        lines.push(Line::from(Span::styled("Resources", heading)));
        for (name, url) in reading {
            lines.push(Line::from(vec![
                Span::raw("  • "),
                Span::styled(
                    name,
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled(format!(" ({url})"), Style::default().fg(Color::DarkGray)),
            ]));
        }
    }

    lines
}
