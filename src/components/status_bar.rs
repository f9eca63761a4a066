use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " spc:sel d:del s:get u:up n:dir r:reload q:quit ";

/// Status bar: the highlighted entry's path and details, or a transient
/// status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    entry_info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    selection_info: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, entry_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            entry_info,
            theme,
            status_message: None,
            is_error: false,
            selection_info: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn selection_info(mut self, info: &'a str) -> Self {
        self.selection_info = Some(info);
        self
    }
}

/// Keep the last `budget` characters, prefixed with `...` when cut.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().take(budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_bg)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };
            let display: String = msg.chars().take(width).collect();
            let line = Line::from(Span::styled(
                format!("{:<width$}", display, width = width),
                style,
            ));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let base = Style::default().bg(self.theme.status_bg);
        let selection = self.selection_info.unwrap_or("");
        let hints_len = KEY_HINTS.len();
        let fixed = hints_len + self.entry_info.chars().count() + selection.chars().count() + 2;
        let path_display = truncate_left(self.path_str, width.saturating_sub(fixed));

        let mut spans = vec![
            Span::styled(path_display, base.fg(self.theme.status_fg)),
            Span::styled(" ", base),
            Span::styled(self.entry_info, base.fg(self.theme.info_fg)),
        ];
        if !selection.is_empty() {
            spans.push(Span::styled(" ", base));
            spans.push(Span::styled(
                selection,
                base.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            ));
        }

        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(hints_len);
        spans.push(Span::styled(" ".repeat(pad), base));
        spans.push(Span::styled(
            KEY_HINTS,
            base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
        ));

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn row(widget: StatusBarWidget<'_>, width: u16) -> (String, Buffer) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (content, buf)
    }

    #[test]
    fn success_message_uses_success_color() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("/", "", &tc).status_message("Deleted notes.md", false);
        let (content, buf) = row(widget, 80);
        assert!(content.starts_with("Deleted notes.md"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, tc.success_fg);
    }

    #[test]
    fn error_message_uses_error_background() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("/", "", &tc).status_message("Forbidden: /", true);
        let (content, buf) = row(widget, 80);
        assert!(content.contains("Forbidden: /"));
        assert_eq!(buf.cell((0, 0)).unwrap().bg, tc.error_fg);
    }

    #[test]
    fn normal_bar_shows_path_info_and_hints() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("/queries/q1.sql", "file 1.2 KB", &tc)
            .selection_info("2 selected");
        let (content, _) = row(widget, 120);
        assert!(content.starts_with("/queries/q1.sql file 1.2 KB 2 selected"));
        assert!(content.contains("d:del"));
        assert!(content.trim_end().ends_with("q:quit"));
    }

    #[test]
    fn long_path_is_cut_from_the_left() {
        assert_eq!(truncate_left("/a/b/c/report.csv", 13), "...report.csv");
        assert_eq!(truncate_left("/short", 20), "/short");
        assert_eq!(truncate_left("/abc", 2), "/a");
    }

    #[test]
    fn zero_area_does_not_panic() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("/", "info", &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}
