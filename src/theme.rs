use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex regex"));
static RGB_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[\d.]+\s*)?\)$")
        .expect("valid rgb regex")
});

const LIGHT_PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

const DARK_PALETTE: [&str; 10] = [
    "#6b9bd1", "#ffa94d", "#ff6b6b", "#63e6be", "#8ce99a", "#ffe066", "#da77f2", "#faa2c1",
    "#c0a080", "#ced4da",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub background: String,
    pub node_stroke: String,
    pub link_color: String,
    pub link_opacity: f32,
    pub selection_color: String,
    pub palette: Vec<String>,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            node_stroke: "#C7D2E5".to_string(),
            link_color: "#7A8AA6".to_string(),
            link_opacity: 0.45,
            selection_color: "#E8590C".to_string(),
            palette: LIGHT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#E9ECEF".to_string(),
            background: "#1B1E23".to_string(),
            node_stroke: "#495057".to_string(),
            link_color: "#868E96".to_string(),
            link_opacity: 0.55,
            selection_color: "#FFD43B".to_string(),
            palette: DARK_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    pub fn palette_color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return self.link_color.as_str();
        }
        self.palette[index % self.palette.len()].as_str()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

pub fn parse_color(input: &str) -> Option<(u8, u8, u8)> {
    let input = input.trim();
    if let Some(caps) = HEX_COLOR_RE.captures(input) {
        let hex = &caps[1];
        if hex.len() == 3 {
            let mut out = [0u8; 3];
            for (idx, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[idx] = v * 17;
            }
            return Some((out[0], out[1], out[2]));
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        return Some((r, g, b));
    }
    let caps = RGB_COLOR_RE.captures(input)?;
    let channel = |idx: usize| caps[idx].parse::<u16>().ok().map(|v| v.min(255) as u8);
    Some((channel(1)?, channel(2)?, channel(3)?))
}

/// Mixes `color` toward `toward` by `t` (0 keeps `color`). Unparseable input is returned as-is.
pub fn blend_colors(color: &str, toward: &str, t: f32) -> String {
    let (Some(a), Some(b)) = (parse_color(color), parse_color(toward)) else {
        return color.to_string();
    };
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
