//! Turning view-model messages into styled terminal lines.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::highlight::Severity;
use crate::markup::{BlockKind, Document, Inline};
use crate::state::{ChatRole, Message, MessageBody};

pub const WELCOME_TITLE: &str = "Welcome to PD TreatmentAssist";

const WELCOME_FEATURES: &[&str] = &[
    "Detailed information on Parkinson's medications",
    "Side effect profiles and management strategies",
    "Access to case studies and medical resources",
    "Expert guidance to discuss with your healthcare provider",
];

fn user_label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn bot_label_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

pub fn term_style(severity: Severity) -> Style {
    match severity {
        Severity::Common => Style::default().fg(Color::Black).bg(Color::LightYellow),
        Severity::Severe => Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    }
}

/// Label line, body, and a trailing blank line.
pub fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match (&message.role, &message.body) {
        (ChatRole::User, MessageBody::Text(text)) => {
            lines.push(Line::from(Span::styled("You:", user_label_style())));
            for line in text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        (ChatRole::User, MessageBody::Rendered(document)) => {
            lines.push(Line::from(Span::styled("You:", user_label_style())));
            lines.extend(document_lines(document));
        }
        (ChatRole::Bot, MessageBody::Rendered(document)) => {
            lines.push(Line::from(Span::styled("Assistant:", bot_label_style())));
            lines.extend(document_lines(document));
        }
        (ChatRole::Bot, MessageBody::Text(text)) => {
            lines.push(Line::from(Span::styled("Assistant:", bot_label_style())));
            for line in text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
    }
    lines.push(Line::default());
    lines
}

pub fn document_lines(document: &Document) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(document.blocks.len());
    let mut number = 0;
    for (i, block) in document.blocks.iter().enumerate() {
        let (base, prefix) = match block.kind {
            BlockKind::Heading(_) => {
                number = 0;
                if i > 0 {
                    lines.push(Line::default());
                }
                let heading = Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD);
                (heading, String::new())
            }
            BlockKind::ListItem { ordered: true } => {
                number += 1;
                (Style::default(), format!("  {number}. "))
            }
            BlockKind::ListItem { ordered: false } => {
                number = 0;
                (Style::default(), "  • ".to_string())
            }
            BlockKind::Paragraph => {
                number = 0;
                (Style::default(), String::new())
            }
        };

        // Lines after a <br> are indented under the item text
        let indent = " ".repeat(prefix.chars().count());
        let mut spans = Vec::new();
        if !prefix.is_empty() {
            spans.push(Span::raw(prefix));
        }
        for inline in &block.inlines {
            for (n, piece) in inline.text.split('\n').enumerate() {
                if n > 0 {
                    lines.push(Line::from(std::mem::take(&mut spans)));
                    if !indent.is_empty() {
                        spans.push(Span::raw(indent.clone()));
                    }
                }
                if !piece.is_empty() {
                    spans.extend(inline_spans(inline, piece, base));
                }
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn inline_spans(inline: &Inline, text: &str, base: Style) -> Vec<Span<'static>> {
    let mut style = base;
    if inline.marks.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if inline.marks.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if inline.marks.link.is_some() {
        style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    }
    if let Some(severity) = inline.term {
        style = style.patch(term_style(severity));
    }

    let mut spans = vec![Span::styled(text.to_string(), style)];
    if let Some(href) = &inline.marks.link {
        if href != &inline.text {
            spans.push(Span::styled(
                format!(" ({href})"),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    spans
}

/// Placeholder shown while an exchange is pending.
pub fn typing_lines(animation_frame: u8) -> Vec<Line<'static>> {
    // Animated ellipsis: cycles through ".", "..", "..."
    let dots = ".".repeat(usize::from(animation_frame % 3) + 1);
    vec![
        Line::from(Span::styled("Assistant:", bot_label_style())),
        Line::from(Span::styled(
            format!("Typing{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ]
}

pub fn welcome_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            WELCOME_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(
            "Your knowledgeable companion for understanding Parkinson's disease treatments and their side effects.",
        ),
        Line::default(),
    ];
    for feature in WELCOME_FEATURES {
        lines.push(Line::from(vec![
            Span::styled("  ✚ ", Style::default().fg(Color::Green)),
            Span::raw(*feature),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Get started by asking a question or selecting a medication in the sidebar.",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}
