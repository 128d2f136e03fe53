use mrlens_api::models::{Issue, MergeRequest, Recommendation, Severity};
use ratatui::{prelude::*, widgets::*};

use crate::summary::format_duration;

pub fn recommendation_style(recommendation: Recommendation) -> Style {
    match recommendation {
        Recommendation::Merge => Style::default().fg(Color::Black).bg(Color::Green),
        Recommendation::NeedsFixes => Style::default().fg(Color::Black).bg(Color::Yellow),
        Recommendation::Reject => Style::default().fg(Color::White).bg(Color::Red),
        Recommendation::Pending | Recommendation::Failed => {
            Style::default().fg(Color::Black).bg(Color::Gray)
        }
    }
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Info => Style::default().fg(Color::Blue),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Error => Style::default().fg(Color::Red),
        Severity::Critical => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
    }
}

fn issue_lines(issue: &Issue) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{:<8} ", issue.severity), severity_style(issue.severity)),
            Span::from(issue.location()).dark_gray(),
        ]),
        Line::from(format!("  {}", issue.message)),
    ];

    if let Some(fix) = issue.suggested_fix() {
        lines.push(Line::from(Span::from(format!("  fix: {fix}")).green()));
    }
    lines.push(Line::from(Span::from(format!("  rule: {}", issue.rule)).dark_gray()));
    lines.push(Line::default());

    lines
}

fn detail_lines(mr: &MergeRequest, reanalyzing: bool, posting: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::from(format!("!{} {}", mr.mr_iid, mr.title)).bold()),
        Line::from(Span::from(format!("{} · {}", mr.author, mr.web_url)).dark_gray()),
        Line::default(),
    ];

    let Some(review) = mr.latest_review.as_ref() else {
        lines.push(Line::from("This merge request has not been analysed yet."));
        lines.push(Line::from(
            Span::from(if reanalyzing {
                "analysis requested..."
            } else {
                "press a to request an analysis"
            })
            .dark_gray(),
        ));
        return lines;
    };

    lines.push(Line::from(vec![
        Span::styled(
            format!(" {} ", review.recommendation.label()),
            recommendation_style(review.recommendation),
        ),
        Span::from(format!(
            "  confidence {:.0}%  ·  AI time {}",
            review.confidence * 100.0,
            format_duration(review.measured_processing_ms().unwrap_or_default())
        )),
    ]));
    lines.push(Line::default());
    lines.extend(
        review
            .summary_text
            .lines()
            .map(|l| Line::from(l.to_string())),
    );
    lines.push(Line::default());

    let actions = format!(
        "[a] {}   [p] {}",
        if reanalyzing { "re-analysing..." } else { "re-analyse" },
        if posting {
            "posting..."
        } else {
            "post recommendations to GitLab"
        }
    );
    lines.push(Line::from(Span::from(actions).cyan()));
    lines.push(Line::default());

    if review.issues.is_empty() {
        lines.push(Line::from("No issues found."));
    } else {
        lines.push(Line::from(
            Span::from(format!("Issues ({})", review.issues.len())).bold(),
        ));
        lines.extend(review.issues.iter().flat_map(issue_lines));
    }

    lines
}

pub fn draw(
    f: &mut crate::tui::Frame<'_>,
    area: Rect,
    selected: Option<&MergeRequest>,
    reanalyzing: bool,
    posting: bool,
) {
    let block = Block::default().borders(Borders::ALL).title("Review");

    let paragraph = match selected {
        Some(mr) => Paragraph::new(detail_lines(mr, reanalyzing, posting)),
        None => Paragraph::new("Select a merge request"),
    };

    f.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing;

    fn text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_detail_shows_issue_locations_and_fixes() {
        let mut review = testing::review(Recommendation::NeedsFixes, 2);
        review.issues[0].suggested_fix = "use ?".into();
        review.issues[1].line_number = None;
        review.processing_time_ms = Some(4321);
        let mr = testing::reviewed(testing::mr(1, "2024-01-01"), review);

        let rendered = text(&detail_lines(&mr, false, false));

        assert!(rendered.contains("Changes requested"));
        assert!(rendered.contains("confidence 90%"));
        assert!(rendered.contains("AI time 4.3 s"));
        assert!(rendered.contains("src/lib.rs:10"));
        assert!(rendered.contains("fix: use ?"));
        assert_eq!(rendered.matches("fix:").count(), 1);
        assert!(rendered.contains("Issues (2)"));
    }

    #[test]
    fn test_detail_without_review() {
        let mr = testing::mr(1, "2024-01-01");

        let rendered = text(&detail_lines(&mr, true, false));

        assert!(rendered.contains("not been analysed"));
        assert!(rendered.contains("analysis requested"));
    }
}
