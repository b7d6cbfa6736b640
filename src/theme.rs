//! Theme loading: btop-style `theme[key]="value"` files mapped onto tile and UI colours.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of distinct tile colours a theme provides (the largest palette the engine accepts).
pub const TILE_COLOURS: usize = 12;

/// Tile colours and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// One colour per tile kind.
    pub tiles: [Color; TILE_COLOURS],
    /// Board background.
    pub bg: Color,
    /// Borders and grid.
    pub div_line: Color,
    /// Sidebar text.
    pub main_fg: Color,
    /// Titles and the cursor.
    pub title: Color,
    /// Obstacles and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// One Dark tile colours, then six softer companions for large palettes.
const ONEDARK_TILES: [Color; TILE_COLOURS] = [
    rgb(0x98C379),
    rgb(0xE5C07B),
    rgb(0xE06C75),
    rgb(0x61AFEF),
    rgb(0xC678DD),
    rgb(0x56B6C2),
    rgb(0xD19A66),
    rgb(0xBE5046),
    rgb(0x7EC699),
    rgb(0x9DA5F4),
    rgb(0xF0A6CA),
    rgb(0xDCDFE4),
];

const HIGH_CONTRAST_TILES: [Color; TILE_COLOURS] = [
    rgb(0x00FF00),
    rgb(0xFFFF00),
    rgb(0xFF0000),
    rgb(0x0088FF),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
    rgb(0xFF8800),
    rgb(0xFFFFFF),
    rgb(0x88FF88),
    rgb(0x8888FF),
    rgb(0xFF88CC),
    rgb(0xAAAAAA),
];

/// Paul Tol's bright and muted sets; no pair relies on red vs green alone.
const COLORBLIND_TILES: [Color; TILE_COLOURS] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
    rgb(0x33BBEE),
    rgb(0x332288),
    rgb(0xDDCC77),
    rgb(0x882255),
    rgb(0x44AA99),
    rgb(0xBBBBBB),
];

/// btop keys tried, in order, for each tile colour.
const TILE_KEYS: [&[&str]; TILE_COLOURS] = [
    &["mem_box", "cpu_start"],
    &["title", "cpu_mid"],
    &["cpu_end", "temp_end"],
    &["cpu_box"],
    &["net_box"],
    &["hi_fg", "proc_misc"],
    &["temp_mid"],
    &["used_end"],
    &["free_mid", "available_mid"],
    &["download_mid"],
    &["upload_mid"],
    &["selected_fg"],
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    pub const fn onedark_default() -> Self {
        Self {
            tiles: ONEDARK_TILES,
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load a btop-style theme file. A missing path gives the One Dark defaults.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Swap the tile colours for the high-contrast or colourblind sets.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.tiles = HIGH_CONTRAST_TILES,
            crate::Palette::Colorblind => self.tiles = COLORBLIND_TILES,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        let mut tiles = base.tiles;
        for (slot, keys) in tiles.iter_mut().zip(TILE_KEYS) {
            if let Some(c) = keys.iter().find_map(|&k| get(k)) {
                *slot = c;
            }
        }
        Self {
            tiles,
            bg: get("meter_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
        }
    }

    #[inline]
    pub fn tile_color(&self, kind: u8) -> Color {
        self.tiles[kind as usize % TILE_COLOURS]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| bad());
    match s.len() {
        6 => Ok(Color::Rgb(channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)),
        3 => Ok(Color::Rgb(
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_from_map_overrides_and_falls_back() {
        let map = parse_theme_file("theme[cpu_box]='#010203'\ntheme[net_box]=\"zz\"\n# comment");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tiles[3], Color::Rgb(1, 2, 3));
        assert_eq!(theme.tiles[4], ONEDARK_TILES[4]);
        assert_eq!(theme.bg, Theme::onedark_default().bg);
    }

    #[test]
    fn test_tile_color_wraps() {
        let theme = Theme::default();
        assert_eq!(theme.tile_color(13), theme.tiles[1]);
    }
}
