//! Theme colors for page rendering
//! Reads colors from ~/.config/foliant/theme.conf (kitty.conf format)

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub notice: Color,      // Notice-severity banners (color4/blue)
    pub ok: Color,          // Ok-severity banners (color2/green)
    pub warning: Color,     // Warning-severity banners (color3/yellow)
    pub error: Color,       // Error-severity banners (color1/red)
    pub accent: Color,      // Active borders, focus highlight
    pub text: Color,        // Primary text (foreground)
    pub text_dim: Color,    // Placeholder/prompt gray (color8/bright black)
    pub bg_selected: Color, // Selected field contents
    pub inactive: Color,    // Inactive borders
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired fallback when no theme file is present
        Self {
            notice: Color::Rgb(137, 180, 250),
            ok: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            error: Color::Rgb(243, 139, 168),
            accent: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
        }
    }
}

impl Theme {
    /// Load theme from the user's theme file, falling back to defaults
    pub fn load() -> Self {
        if let Some(theme) = Self::load_user_theme() {
            return theme;
        }
        Self::default()
    }

    fn load_user_theme() -> Option<Self> {
        let theme_path = dirs::config_dir()?.join("foliant/theme.conf");

        let content = fs::read_to_string(&theme_path).ok()?;
        let colors = Self::parse_kitty_conf(&content);

        if colors.is_empty() {
            return None;
        }

        let defaults = Self::default();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k))
                .copied()
                .unwrap_or(fallback)
        };

        Some(Self {
            notice: pick(&["color4", "color12"], defaults.notice),
            ok: pick(&["color2", "color10"], defaults.ok),
            warning: pick(&["color3", "color11"], defaults.warning),
            error: pick(&["color1", "color9"], defaults.error),
            accent: pick(&["color6", "color14"], defaults.accent),
            text: pick(&["foreground"], defaults.text),
            text_dim: pick(&["color8"], defaults.text_dim),
            bg_selected: pick(&["selection_background", "color0"], defaults.bg_selected),
            inactive: pick(&["inactive_border_color", "color8"], defaults.inactive),
        })
    }

    /// Parse kitty.conf format: `key value` or `key #hexcolor`
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
            if parts.len() == 2 {
                let key = parts[0].trim();
                let value = parts[1].trim();

                if let Some(color) = Self::parse_hex_color(value) {
                    colors.insert(key.to_string(), color);
                }
            }
        }

        colors
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kitty_conf() {
        let conf = "# comment\nforeground #bebebe\ncolor1 #D35F5F\nbad line without color\n";
        let colors = Theme::parse_kitty_conf(conf);
        assert_eq!(colors.get("foreground"), Some(&Color::Rgb(190, 190, 190)));
        assert_eq!(colors.get("color1"), Some(&Color::Rgb(211, 95, 95)));
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_parse_hex_variants() {
        assert_eq!(Theme::parse_hex_color("#fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(Theme::parse_hex_color("121212"), Some(Color::Rgb(18, 18, 18)));
        assert_eq!(Theme::parse_hex_color("#12345"), None);
    }
}
