use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode, DialogKind};
use crate::components::dialog::DialogWidget;
use crate::components::listing::ListingWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::theme::ThemeColors;
use crate::tree::FileTreeNode;

/// Human-readable size, e.g. `1.2 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn entry_info(node: &FileTreeNode) -> String {
    let kind = &node.definition.entry_type;
    match node.definition.size {
        Some(size) if !node.is_directory => format!("{} {}", kind, format_size(size)),
        _ => kind.clone(),
    }
}

/// Render the application UI.
pub fn render(app: &mut App, theme: &ThemeColors, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let visible_height = chunks[0].height.saturating_sub(2) as usize;
    app.update_scroll(visible_height);

    let mut title = app.breadcrumb_labels().join(" › ");
    if app.tree.active_node().is_some_and(|n| n.loading()) {
        title.push_str(" (loading)");
    }
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_fg));
    let listing = ListingWidget::new(&app.tree, app.cursor, app.scroll_offset, theme).block(block);
    frame.render_widget(listing, chunks[0]);

    let highlighted = app.highlighted().and_then(|id| app.tree.get(id));
    let path = highlighted
        .or_else(|| app.tree.active_node())
        .map(|n| n.path.clone())
        .unwrap_or_default();
    let info = highlighted.map(entry_info).unwrap_or_default();
    let selected = app.selected_count();
    let selection = format!("{} selected", selected);

    let mut status = StatusBarWidget::new(&path, &info, theme);
    if selected > 0 {
        status = status.selection_info(&selection);
    }
    if let Some((msg, _)) = &app.status_message {
        status = status.status_message(msg, app.status_is_error);
    }
    frame.render_widget(status, chunks[1]);

    if let AppMode::Dialog(kind) = &app.mode {
        let upload_node = match kind {
            DialogKind::UploadProgress { node } => app.tree.get(*node),
            _ => None,
        };
        let dialog = DialogWidget::new(&app.mode, &app.dialog_state, theme).upload_node(upload_node);
        frame.render_widget(dialog, frame.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
