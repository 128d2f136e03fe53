use chrono::Utc;
use ratatui::{prelude::*, widgets::*};
use timeago::Formatter;

use crate::summary::{format_duration, Summary};

fn card<'a>(title: &'a str, value: String, style: Style) -> Paragraph<'a> {
    Paragraph::new(Line::styled(value, style.add_modifier(Modifier::BOLD)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title))
}

pub fn draw(f: &mut crate::tui::Frame<'_>, area: Rect, summary: &Summary) {
    let last_analyzed = summary
        .last_analyzed_at
        .map(|t| Formatter::default().convert_chrono(t, Utc::now()))
        .unwrap_or_else(|| "—".into());

    let cards = [
        card("MRs", summary.total.to_string(), Style::default()),
        card(
            "Reviewed",
            summary.with_review.to_string(),
            Style::default(),
        ),
        card(
            "Ready for merge",
            summary.rec_merge.to_string(),
            Style::default().fg(Color::Green),
        ),
        card(
            "Changes requested",
            summary.rec_needs_fixes.to_string(),
            Style::default().fg(Color::Yellow),
        ),
        card(
            "Rejected",
            summary.rec_reject.to_string(),
            Style::default().fg(Color::Red),
        ),
        card(
            "Issues",
            summary.total_issues.to_string(),
            Style::default(),
        ),
        card(
            "Avg AI time",
            format_duration(summary.avg_processing_ms),
            Style::default(),
        ),
        card("Last analysis", last_analyzed, Style::default()),
    ];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            cards
                .iter()
                .map(|_| Constraint::Ratio(1, cards.len() as u32))
                .collect::<Vec<_>>(),
        )
        .split(area);

    for (card, column) in cards.into_iter().zip(columns.iter()) {
        f.render_widget(card, *column);
    }
}
