use crate::config::LayoutConfig;
use crate::theme::Theme;

use super::TextBlock;

pub(crate) fn measure_label(text: &str, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let font_size = theme.font_size.max(1.0);
    let max_width = config.max_label_width_chars.max(1) as f32 * average_char_width(font_size);
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font_size));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub(crate) fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

fn average_char_width(font_size: f32) -> f32 {
    font_size * 0.56
}

// Rough proportional widths for a sans-serif face at 1px.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'i' | 'j' | 'l' | 'I' => 0.25,
        'f' | 't' | 'r' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.946,
        c if c.is_ascii_digit() => 0.6,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii_lowercase() => 0.56,
        c if c.is_ascii() => 0.568,
        // CJK and other wide glyphs
        _ => 1.0,
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

fn wrap_line(line: &str, max_width: f32, font_size: f32) -> Vec<String> {
    if text_width(line, font_size) <= max_width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_br_tags() {
        assert_eq!(split_lines("a<br/>b"), vec!["a", "b"]);
        assert_eq!(split_lines("  a  \n b "), vec!["a", "b"]);
    }

    #[test]
    fn width_scales_with_font_size() {
        let w10 = text_width("Iron plate", 10.0);
        let w20 = text_width("Iron plate", 20.0);
        assert!((w20 - w10 * 2.0).abs() < 0.01);
    }

    #[test]
    fn long_labels_wrap() {
        let theme = Theme::light();
        let config = LayoutConfig {
            max_label_width_chars: 8,
            ..Default::default()
        };
        let block = measure_label("advanced electronic circuit assembly", &theme, &config);
        assert!(block.lines.len() > 1, "{:?}", block.lines);
        assert!(block.height > theme.font_size);
    }

    #[test]
    fn empty_label_is_one_line() {
        let block = measure_label("", &Theme::light(), &LayoutConfig::default());
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.width, 0.0);
    }
}
