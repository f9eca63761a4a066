//! Color palettes and their resolution from the `[theme]` config section.

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};

/// Runtime colors used by the widgets.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Listing
    pub tree_fg: Color,
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_file_fg: Color,
    pub tree_marked_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Chrome
    pub border_fg: Color,
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,

    // Semantic colors, not configurable
    pub error_fg: Color,
    pub warning_fg: Color,
    pub success_fg: Color,
    pub info_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

/// Dark theme (Catppuccin Mocha).
pub fn dark_theme() -> ThemeColors {
    let text = Color::Rgb(205, 214, 244); // #cdd6f4
    let blue = Color::Rgb(137, 180, 250); // #89b4fa
    ThemeColors {
        tree_fg: text,
        tree_selected_bg: Color::Rgb(69, 71, 90), // #45475a
        tree_selected_fg: text,
        tree_dir_fg: blue,
        tree_file_fg: text,
        tree_marked_fg: Color::Rgb(249, 226, 175), // #f9e2af

        status_bg: Color::Rgb(30, 30, 46), // #1e1e2e
        status_fg: text,

        border_fg: Color::Rgb(88, 91, 112), // #585b70
        dialog_bg: Color::Rgb(49, 50, 68),  // #313244
        dialog_border_fg: blue,

        error_fg: Color::Rgb(243, 139, 168),   // #f38ba8
        warning_fg: Color::Rgb(249, 226, 175), // #f9e2af
        success_fg: Color::Rgb(166, 227, 161), // #a6e3a1
        info_fg: blue,
        accent_fg: Color::Rgb(203, 166, 247), // #cba6f7
        dim_fg: Color::Rgb(108, 112, 134),    // #6c7086
    }
}

/// Light theme (Catppuccin Latte).
pub fn light_theme() -> ThemeColors {
    let text = Color::Rgb(76, 79, 105); // #4c4f69
    let blue = Color::Rgb(30, 102, 245); // #1e66f5
    ThemeColors {
        tree_fg: text,
        tree_selected_bg: Color::Rgb(204, 208, 218), // #ccd0da
        tree_selected_fg: text,
        tree_dir_fg: blue,
        tree_file_fg: text,
        tree_marked_fg: Color::Rgb(223, 142, 29), // #df8e1d

        status_bg: Color::Rgb(239, 241, 245), // #eff1f5
        status_fg: text,

        border_fg: Color::Rgb(172, 176, 190), // #acb0be
        dialog_bg: Color::Rgb(230, 233, 239), // #e6e9ef
        dialog_border_fg: blue,

        error_fg: Color::Rgb(210, 15, 57),    // #d20f39
        warning_fg: Color::Rgb(223, 142, 29), // #df8e1d
        success_fg: Color::Rgb(64, 160, 43),  // #40a02b
        info_fg: blue,
        accent_fg: Color::Rgb(136, 57, 239), // #8839ef
        dim_fg: Color::Rgb(156, 160, 176),   // #9ca0b0
    }
}

/// Parse `"#aabbcc"` (the `#` is optional). Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Resolve runtime colors: `"light"`, `"custom"` (dark plus overrides), or
/// dark for anything else.
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    match config.scheme.as_deref().unwrap_or("dark") {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(),
    }
}

fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    let overrides = [
        (&mut theme.tree_fg, &custom.tree_fg),
        (&mut theme.tree_selected_bg, &custom.tree_selected_bg),
        (&mut theme.tree_selected_fg, &custom.tree_selected_fg),
        (&mut theme.tree_dir_fg, &custom.tree_dir_fg),
        (&mut theme.tree_file_fg, &custom.tree_file_fg),
        (&mut theme.tree_marked_fg, &custom.tree_marked_fg),
        (&mut theme.status_bg, &custom.status_bg),
        (&mut theme.status_fg, &custom.status_fg),
        (&mut theme.border_fg, &custom.border_fg),
        (&mut theme.dialog_border_fg, &custom.dialog_border_fg),
    ];
    for (slot, hex) in overrides {
        if let Some(color) = hex.as_deref().and_then(parse_hex_color) {
            *slot = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_color_accepts_with_and_without_hash() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("1a1b26"), Some(Color::Rgb(26, 27, 38)));
    }

    #[test]
    fn parse_hex_color_rejects_malformed() {
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color(""), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn resolve_named_schemes() {
        let light = resolve_theme(&ThemeConfig {
            scheme: Some("light".to_string()),
            custom: None,
        });
        assert_eq!(light.tree_dir_fg, Color::Rgb(30, 102, 245));

        let fallback = resolve_theme(&ThemeConfig {
            scheme: Some("neon".to_string()),
            custom: None,
        });
        assert_eq!(fallback.tree_dir_fg, dark_theme().tree_dir_fg);
        assert_eq!(
            resolve_theme(&ThemeConfig::default()).tree_dir_fg,
            dark_theme().tree_dir_fg
        );
    }

    #[test]
    fn custom_overrides_apply_over_dark() {
        let config = ThemeConfig {
            scheme: Some("custom".to_string()),
            custom: Some(ThemeColorsConfig {
                tree_marked_fg: Some("#c0caf5".to_string()),
                status_bg: Some("#zzzzzz".to_string()),
                ..Default::default()
            }),
        };
        let theme = resolve_theme(&config);
        assert_eq!(theme.tree_marked_fg, Color::Rgb(192, 202, 245));
        // Invalid hex keeps the dark default.
        assert_eq!(theme.status_bg, dark_theme().status_bg);
        assert_eq!(theme.tree_dir_fg, dark_theme().tree_dir_fg);
    }

    #[test]
    fn custom_without_table_is_dark() {
        let config = ThemeConfig {
            scheme: Some("custom".to_string()),
            custom: None,
        };
        assert_eq!(resolve_theme(&config).border_fg, dark_theme().border_fg);
    }
}
