use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::theme::ThemeColors;
use crate::tree::{FileTree, FileTreeNode};

/// Renders the children of the active directory, one per row.
///
/// Shows a placeholder row while the directory is loading, after a failed
/// load, or when it has no entries.
pub struct ListingWidget<'a> {
    tree: &'a FileTree,
    cursor: usize,
    scroll_offset: usize,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> ListingWidget<'a> {
    pub fn new(tree: &'a FileTree, cursor: usize, scroll_offset: usize, theme: &'a ThemeColors) -> Self {
        Self {
            tree,
            cursor,
            scroll_offset,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn indicator(node: &FileTreeNode) -> &'static str {
        if !node.is_directory {
            return "[F] ";
        }
        if node.has_errors() {
            "[!] "
        } else if node.loading() {
            "[…] "
        } else {
            "[D] "
        }
    }

    fn placeholder(&self, dir: &FileTreeNode) -> Option<(&'static str, Style)> {
        if dir.has_errors() {
            Some((
                "Could not load this directory. Press r to retry.",
                Style::default().fg(self.theme.error_fg),
            ))
        } else if dir.loading() && dir.children.is_empty() {
            Some((
                "Loading…",
                Style::default()
                    .fg(self.theme.info_fg)
                    .add_modifier(Modifier::ITALIC),
            ))
        } else if dir.loaded() && dir.children.is_empty() {
            Some((
                "This directory is empty.",
                Style::default().fg(self.theme.dim_fg),
            ))
        } else {
            None
        }
    }

    fn row_style(&self, node: &FileTreeNode, highlighted: bool) -> Style {
        if highlighted {
            Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else if node.selected {
            Style::default()
                .fg(self.theme.tree_marked_fg)
                .add_modifier(Modifier::BOLD)
        } else if node.is_directory {
            Style::default()
                .fg(self.theme.tree_dir_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.tree_file_fg)
        }
    }
}

impl<'a> Widget for ListingWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }
        let Some(dir) = self.tree.active_node() else {
            return;
        };

        if let Some((text, style)) = self.placeholder(dir) {
            let line = Line::from(Span::styled(text, style));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let rows = dir
            .children
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(inner.height as usize);
        for (row, (idx, id)) in rows.enumerate() {
            let Some(node) = self.tree.get(*id) else {
                continue;
            };
            let marker = if node.selected { "● " } else { "  " };
            let line = Line::from(Span::styled(
                format!("{}{}{}", marker, Self::indicator(node), node.label()),
                self.row_style(node, idx == self.cursor),
            ));
            buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
        }
    }
}
