use std::collections::HashMap;
use std::path::PathBuf;

use datachat_core::Role;
use datachat_core::views::{Block, BlockBody, BlockHandle, BlockKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block as Panel, Paragraph};
use tui_textarea::TextArea;
use unicode_width::UnicodeWidthStr;

/// Everything the screen shows, borrowed from the surface for one draw
pub struct Screen<'a> {
    pub title: &'a str,
    pub blocks: &'a [Block],
    pub image_paths: &'a HashMap<BlockHandle, PathBuf>,
    pub input: &'a TextArea<'static>,
    pub busy: bool,
    pub scroll_from_bottom: usize,
}

fn role_header(role: Role) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("Assistant", Color::Green),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn markdown_line(line: &str) -> Line<'static> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        Line::from(Span::styled(
            trimmed.trim_start_matches('#').trim_start().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(line.to_string())
    }
}

fn code_lines(content: &str, lines: &mut Vec<Line<'static>>) {
    let style = Style::default().fg(Color::Yellow);
    for line in content.lines() {
        lines.push(Line::from(vec![
            Span::styled("  │ ", Style::default().fg(Color::DarkGray)),
            Span::styled(line.to_string(), style),
        ]));
    }
}

/// Flatten blocks into styled lines, inserting a header whenever the
/// speaking role changes
pub fn transcript_lines(
    blocks: &[Block],
    image_paths: &HashMap<BlockHandle, PathBuf>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut last_role: Option<Role> = None;

    for (index, block) in blocks.iter().enumerate() {
        if block.role.is_some() && block.role != last_role {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            if let Some(role) = block.role {
                lines.push(role_header(role));
            }
        }
        last_role = block.role;

        match &block.body {
            BlockBody::Text { kind: BlockKind::Text, content } => {
                lines.extend(content.lines().map(|l| Line::from(l.to_string())));
            }
            BlockBody::Text { kind: BlockKind::Markdown, content } => {
                lines.extend(content.lines().map(markdown_line));
            }
            BlockBody::Text {
                kind: BlockKind::Code { language, title },
                content,
            } => {
                let marker = if block.collapsed { "▸" } else { "▾" };
                let label = match (title, language) {
                    (Some(title), _) => title.clone(),
                    (None, Some(language)) => language.clone(),
                    (None, None) => "output".to_string(),
                };
                let summary = if block.collapsed {
                    format!("{} {} ({} lines)", marker, label, content.lines().count())
                } else {
                    format!("{} {}", marker, label)
                };
                lines.push(Line::from(Span::styled(
                    summary,
                    Style::default().fg(Color::DarkGray),
                )));
                if !block.collapsed {
                    code_lines(content, &mut lines);
                }
            }
            BlockBody::Image(image) => {
                let location = image_paths
                    .get(&BlockHandle(index))
                    .map(|p| format!(" saved to {}", p.display()))
                    .unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!("[chart {}x{}]{}", image.width, image.height, location),
                    Style::default().fg(Color::Magenta),
                )));
            }
            BlockBody::Error(message) => {
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
                lines.push(Line::from(Span::styled(
                    format!("✗ {}", message),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }
        }
    }
    lines
}

/// Hard-wrap lines to `width` display columns so scrolling can be computed
/// exactly. Wide graphemes never straddle a break.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return lines;
    }
    let mut wrapped = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            wrapped.push(line);
            continue;
        }
        let mut current: Vec<Span<'static>> = Vec::new();
        let mut used = 0;
        for span in &line.spans {
            let mut chunk = String::new();
            for grapheme in span.styled_graphemes(Style::default()) {
                let cells = grapheme.symbol.width();
                if used + cells > width && used > 0 {
                    if !chunk.is_empty() {
                        current.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    wrapped.push(Line::from(std::mem::take(&mut current)));
                    used = 0;
                }
                chunk.push_str(grapheme.symbol);
                used += cells;
            }
            if !chunk.is_empty() {
                current.push(Span::styled(chunk, span.style));
            }
        }
        if !current.is_empty() {
            wrapped.push(Line::from(current));
        }
    }
    wrapped
}

pub fn draw(frame: &mut Frame, screen: &Screen<'_>) {
    let [transcript_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let border = Panel::bordered().title(format!(" {} ", screen.title));
    let inner = border.inner(transcript_area);
    let lines = wrap_lines(
        transcript_lines(screen.blocks, screen.image_paths),
        inner.width as usize,
    );
    let height = inner.height as usize;
    let offset = lines
        .len()
        .saturating_sub(height)
        .saturating_sub(screen.scroll_from_bottom);
    let transcript = Paragraph::new(lines)
        .block(border)
        .scroll((offset.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(transcript, transcript_area);

    frame.render_widget(screen.input, input_area);

    let status = if screen.busy {
        Span::styled("Assistant is working...", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            "Enter send · PgUp/PgDn scroll · Esc quit",
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use datachat_core::views::{BlockList, ChatSurface};

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_role_header_only_when_role_changes() {
        let mut list = BlockList::new();
        list.render_block(Role::User, BlockKind::Text, "question");
        list.render_block(Role::Assistant, BlockKind::Markdown, "# Answer\nbody");
        list.render_block(Role::Assistant, BlockKind::plain_code(), "42");

        let text = plain(&transcript_lines(list.blocks(), &HashMap::new()));
        assert_eq!(
            text,
            vec!["You", "question", "", "Assistant", "Answer", "body", "▾ output", "  │ 42"]
        );
    }

    #[test]
    fn test_collapsed_code_shows_only_summary() {
        let mut list = BlockList::new();
        let handle = list.render_block(
            Role::Assistant,
            BlockKind::collapsible_code(Some("python"), "Assistant is coding..."),
            "a = 1\nb = 2",
        );
        list.collapse_block(handle);

        let text = plain(&transcript_lines(list.blocks(), &HashMap::new()));
        assert_eq!(text, vec!["Assistant", "▸ Assistant is coding... (2 lines)"]);
    }

    #[test]
    fn test_errors_render_without_role_header() {
        let mut list = BlockList::new();
        list.render_error("Failed to upload file: boom");

        let text = plain(&transcript_lines(list.blocks(), &HashMap::new()));
        assert_eq!(text, vec!["✗ Failed to upload file: boom"]);
    }

    #[test]
    fn test_wrap_splits_long_lines() {
        let wrapped = wrap_lines(vec![Line::from("abcdefgh")], 3);
        assert_eq!(plain(&wrapped), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_counts_wide_glyphs_as_two_columns() {
        let wrapped = wrap_lines(vec![Line::from("売上高合計")], 4);
        assert_eq!(plain(&wrapped), vec!["売上", "高合", "計"]);
        assert!(wrapped.iter().all(|line| line.width() <= 4));
    }

    #[test]
    fn test_wrap_never_splits_a_wide_glyph_across_lines() {
        let wrapped = wrap_lines(vec![Line::from("ab📈cd")], 3);
        assert_eq!(plain(&wrapped), vec!["ab", "📈c", "d"]);
    }
}
