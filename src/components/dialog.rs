use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};
use crate::theme::ThemeColors;
use crate::tree::FileTreeNode;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
    theme: &'a ThemeColors,
    upload_node: Option<&'a FileTreeNode>,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState, theme: &'a ThemeColors) -> Self {
        Self {
            mode,
            dialog_state,
            theme,
            upload_node: None,
        }
    }

    /// Directory whose upload the progress dialog reports on.
    pub fn upload_node(mut self, node: Option<&'a FileTreeNode>) -> Self {
        self.upload_node = node;
        self
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }

    fn frame(&self, title: &str, border: Style, rect: Rect, buf: &mut Buffer) -> Rect {
        Clear.render(rect, buf);
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(border)
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        inner
    }

    fn hint(&self, text: &str, inner: Rect, buf: &mut Buffer) {
        if inner.height > 1 {
            let style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM);
            let line = Line::from(Span::styled(text, style));
            buf.set_line(inner.x, inner.y + inner.height - 1, &line, inner.width);
        }
    }

    fn render_input(&self, title: &str, area: Rect, buf: &mut Buffer) {
        let width = 60.min(area.width.saturating_sub(4));
        let rect = Self::centered_rect(width, 5, area);
        let border = Style::default().fg(self.theme.dialog_border_fg);
        let inner = self.frame(title, border, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let input = &self.dialog_state.input;
        let pos = self.dialog_state.cursor_position.min(input.len());
        let before = &input[..pos];
        let mut rest = input[pos..].chars();
        let cursor_char = rest.next().map(String::from).unwrap_or_else(|| " ".into());
        let after = rest.as_str();

        // Keep the cursor visible by dropping characters from the left.
        let room = (inner.width as usize).saturating_sub(1);
        let before_chars = before.chars().count();
        let before_display: String = if before_chars > room {
            before.chars().skip(before_chars - room).collect()
        } else {
            before.to_string()
        };

        let input_style = Style::default().fg(self.theme.tree_fg);
        let cursor_style = Style::default()
            .bg(self.theme.tree_fg)
            .fg(self.theme.dialog_bg)
            .add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::styled(before_display, input_style),
            Span::styled(cursor_char, cursor_style),
            Span::styled(after, input_style),
        ]);
        buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
        self.hint("[Enter] Confirm  [Esc] Cancel", inner, buf);
    }

    fn render_confirm(&self, targets: &[String], area: Rect, buf: &mut Buffer) {
        let longest = targets.iter().map(|t| t.chars().count()).max().unwrap_or(10);
        let width = (longest as u16 + 10)
            .max(40)
            .min(area.width.saturating_sub(4));
        let height = (targets.len() as u16 + 6).min(area.height.saturating_sub(2));
        let rect = Self::centered_rect(width, height, area);
        let border = Style::default().fg(self.theme.error_fg);
        let inner = self.frame("Delete Confirmation", border, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let header = Line::from(Span::styled(
            format!("Delete {} item(s)?", targets.len()),
            Style::default()
                .fg(self.theme.warning_fg)
                .add_modifier(Modifier::BOLD),
        ));
        buf.set_line(inner.x, inner.y, &header, inner.width);

        let room = inner.height.saturating_sub(3) as usize;
        for (i, target) in targets.iter().take(room).enumerate() {
            let line = Line::from(Span::styled(
                format!("  • {}", target),
                Style::default().fg(self.theme.tree_fg),
            ));
            buf.set_line(inner.x, inner.y + 2 + i as u16, &line, inner.width);
        }
        self.hint("[y] Yes  [n/Esc] Cancel", inner, buf);
    }

    fn render_upload(&self, area: Rect, buf: &mut Buffer) {
        let width = 50.min(area.width.saturating_sub(4));
        let rect = Self::centered_rect(width, 6, area);
        let Some(node) = self.upload_node else {
            return;
        };

        let (title, color) = if node.upload_failed() {
            ("Upload failed", self.theme.error_fg)
        } else if node.upload_complete() {
            ("Upload complete", self.theme.success_fg)
        } else {
            ("Uploading", self.theme.warning_fg)
        };
        let inner = self.frame(title, Style::default().fg(color), rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let target = Line::from(Span::styled(
            format!("into {}  {}%", node.path, node.upload_progress),
            Style::default().fg(self.theme.tree_fg),
        ));
        buf.set_line(inner.x, inner.y, &target, inner.width);

        if inner.height > 1 {
            let bar_width = inner.width as usize;
            let filled = node.upload_progress as usize * bar_width / 100;
            let bar = "█".repeat(filled) + &"░".repeat(bar_width.saturating_sub(filled));
            let bar_line = Line::from(Span::styled(bar, Style::default().fg(color)));
            buf.set_line(inner.x, inner.y + 1, &bar_line, inner.width);
        }

        let hint = if node.uploading() {
            "[Esc] Hide"
        } else {
            "[Enter/Esc] Close"
        };
        if inner.height > 2 {
            self.hint(hint, inner, buf);
        }
    }

    fn render_error(&self, message: &str, area: Rect, buf: &mut Buffer) {
        let width = (message.chars().count() as u16 + 6)
            .max(30)
            .min(area.width.saturating_sub(4));
        let rect = Self::centered_rect(width, 5, area);
        let inner = self.frame("Error", Style::default().fg(self.theme.error_fg), rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }
        let line = Line::from(Span::styled(message, Style::default().fg(self.theme.error_fg)));
        buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
        self.hint("[Enter/Esc] Dismiss", inner, buf);
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let AppMode::Dialog(kind) = self.mode else {
            return;
        };
        match kind {
            DialogKind::CreateDirectory => self.render_input("New Folder", area, buf),
            DialogKind::Upload => self.render_input("Upload File (local path)", area, buf),
            DialogKind::DeleteConfirm { targets, .. } => self.render_confirm(targets, area, buf),
            DialogKind::UploadProgress { .. } => self.render_upload(area, buf),
            DialogKind::Error { message } => self.render_error(message, area, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::EntryDefinition;
    use crate::theme;
    use crate::tree::{NodeId, UploadState};

    fn render(widget: DialogWidget<'_>) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }

    #[test]
    fn input_dialog_shows_title_and_text() {
        let tc = theme::dark_theme();
        let mode = AppMode::Dialog(DialogKind::CreateDirectory);
        let state = DialogState {
            input: "reports".to_string(),
            cursor_position: 7,
        };
        let content = render(DialogWidget::new(&mode, &state, &tc));
        assert!(content.contains("New Folder"));
        assert!(content.contains("reports"));
    }

    #[test]
    fn input_dialog_handles_multibyte_cursor() {
        let tc = theme::dark_theme();
        let mode = AppMode::Dialog(DialogKind::Upload);
        let state = DialogState {
            input: "é.csv".to_string(),
            cursor_position: 0,
        };
        let content = render(DialogWidget::new(&mode, &state, &tc));
        assert!(content.contains("Upload File"));
        assert!(content.contains(".csv"));
    }

    #[test]
    fn confirm_dialog_lists_targets() {
        let tc = theme::dark_theme();
        let mode = AppMode::Dialog(DialogKind::DeleteConfirm {
            stager: NodeId(0),
            targets: vec!["q1.sql".to_string(), "notes".to_string()],
        });
        let state = DialogState::default();
        let content = render(DialogWidget::new(&mode, &state, &tc));
        assert!(content.contains("Delete 2 item(s)?"));
        assert!(content.contains("q1.sql"));
        assert!(content.contains("notes"));
    }

    #[test]
    fn upload_dialog_reports_progress_and_failure() {
        let tc = theme::dark_theme();
        let mode = AppMode::Dialog(DialogKind::UploadProgress { node: NodeId(0) });
        let state = DialogState::default();
        let mut node = FileTreeNode::new(NodeId(0), EntryDefinition::directory("/docs"), None);
        node.upload_state = UploadState::Uploading;
        node.upload_progress = 42;

        let content = render(DialogWidget::new(&mode, &state, &tc).upload_node(Some(&node)));
        assert!(content.contains("Uploading"));
        assert!(content.contains("42%"));

        node.upload_state = UploadState::Failed;
        let content = render(DialogWidget::new(&mode, &state, &tc).upload_node(Some(&node)));
        assert!(content.contains("Upload failed"));
    }

    #[test]
    fn error_dialog_shows_message() {
        let tc = theme::dark_theme();
        let mode = AppMode::Dialog(DialogKind::Error {
            message: "Permission denied".to_string(),
        });
        let state = DialogState::default();
        let content = render(DialogWidget::new(&mode, &state, &tc));
        assert!(content.contains("Error"));
        assert!(content.contains("Permission denied"));
    }

    #[test]
    fn normal_mode_draws_nothing() {
        let tc = theme::dark_theme();
        let mode = AppMode::Normal;
        let state = DialogState::default();
        let content = render(DialogWidget::new(&mode, &state, &tc));
        assert!(content.trim().is_empty());
    }
}
