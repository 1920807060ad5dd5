use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, LineGauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, InputMode, MAX_SPEED, MIN_SPEED};
use crate::offsets::HighlightSpan;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // styles
        let (r, g, b) = self.settings.highlight_rgb();
        let highlight_color = Color::Rgb(r, g, b);
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let word_style = Style::default().patch(bold_style).fg(highlight_color);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // current word
                Constraint::Length(1), // speed label
                Constraint::Length(1), // speed gauge
                Constraint::Min(3),    // text view
                Constraint::Length(1), // status / legend
            ])
            .split(area);

        Paragraph::new(Line::from(Span::styled(self.label.as_str(), word_style)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(self.speed_label(), dim_style))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let ratio = ((self.speed() - MIN_SPEED) / (MAX_SPEED - MIN_SPEED)).clamp(0.0, 1.0);
        LineGauge::default()
            .ratio(ratio)
            .label("speed")
            .line_set(symbols::line::THICK)
            .filled_style(Style::default().fg(highlight_color))
            .render(chunks[2], buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" clipboard ({}) ", self.engine.state()));
        let inner = block.inner(chunks[3]);
        let (lines, _) = highlighted_lines(
            &self.text,
            self.highlight,
            word_style.add_modifier(Modifier::UNDERLINED),
        );
        let scroll = scroll_offset(&self.text, self.highlight, inner.width, inner.height);
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(chunks[3], buf);

        let footer = match &self.status {
            Some(status) => Span::styled(status.as_str(), italic_style.fg(Color::Yellow)),
            None => Span::styled(
                "(s)tart / (x) stop / ↑↓←→ speed / (c)olour / (q)uit",
                italic_style,
            ),
        };
        Paragraph::new(footer).render(chunks[4], buf);

        if let InputMode::ColorPrompt(buffer) = &self.mode {
            let popup = centered(area, 32, 3);
            Clear.render(popup, buf);
            let preview = crate::settings::parse_hex_color(buffer)
                .map(|(r, g, b)| Style::default().fg(Color::Rgb(r, g, b)))
                .unwrap_or(dim_style);
            Paragraph::new(Line::from(vec![
                Span::styled(buffer.as_str(), bold_style),
                Span::raw("  "),
                Span::styled("████", preview),
            ]))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" highlight #RRGGBB, enter / esc "),
            )
            .render(popup, buf);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Split `text` into display lines, styling the characters covered by `span`.
///
/// Also returns the line holding the span, if any.
pub fn highlighted_lines(
    text: &str,
    span: Option<HighlightSpan>,
    style: Style,
) -> (Vec<Line<'static>>, Option<usize>) {
    let mut lines = Vec::new();
    let mut highlighted_row = None;
    let mut offset = 0;

    for (row, line) in text.split('\n').enumerate() {
        let len = line.chars().count();
        match span.filter(|s| s.start >= offset && s.end <= offset + len) {
            Some(s) => {
                let (start, end) = (s.start - offset, s.end - offset);
                let before: String = line.chars().take(start).collect();
                let word: String = line.chars().skip(start).take(end - start).collect();
                let after: String = line.chars().skip(end).collect();
                lines.push(Line::from(vec![
                    Span::raw(before),
                    Span::styled(word, style),
                    Span::raw(after),
                ]));
                highlighted_row = Some(row);
            }
            None => lines.push(Line::from(line.to_string())),
        }
        offset += len + 1;
    }

    (lines, highlighted_row)
}

/// Rows to scroll so the highlighted word sits around the middle of the view.
///
/// Wrapping is estimated from display width, which is close enough for
/// word-wrapped prose.
pub fn scroll_offset(text: &str, span: Option<HighlightSpan>, width: u16, height: u16) -> u16 {
    let Some(span) = span else {
        return 0;
    };
    let width = usize::from(width.max(1));
    let mut row = 0usize;
    let mut offset = 0usize;

    for line in text.split('\n') {
        let len = line.chars().count();
        if span.start <= offset + len {
            let before: String = line.chars().take(span.start - offset).collect();
            row += before.width() / width;
            break;
        }
        row += line.width().div_ceil(width).max(1);
        offset += len + 1;
    }

    let target = row.saturating_sub(usize::from(height) / 2);
    u16::try_from(target).unwrap_or(u16::MAX)
}
