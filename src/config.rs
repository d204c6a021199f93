use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    #[default]
    Sankey,
    #[serde(rename = "boxline", alias = "box-line")]
    BoxLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SankeyAlign {
    #[default]
    Justify,
    Left,
    Right,
    Center,
}

/// Which quantity drives link thickness or link text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkValue {
    None,
    Percent,
    #[default]
    Items,
    Belts,
    Wagons,
    Machines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowSettings {
    pub diagram: DiagramKind,
    pub sankey_align: SankeyAlign,
    pub link_size: LinkValue,
    pub link_text: LinkValue,
    pub precision: Option<usize>,
    pub hide_excluded: bool,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            diagram: DiagramKind::Sankey,
            sankey_align: SankeyAlign::Justify,
            link_size: LinkValue::Items,
            link_text: LinkValue::Items,
            precision: Some(1),
            hide_excluded: false,
        }
    }
}

/// How much of the pipeline a settings change invalidates, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingsImpact {
    Unchanged,
    Render,
    Layout,
    Graph,
}

impl FlowSettings {
    pub fn impact_of(&self, next: &FlowSettings) -> SettingsImpact {
        if self.diagram != next.diagram || self.hide_excluded != next.hide_excluded {
            SettingsImpact::Graph
        } else if self.sankey_align != next.sankey_align || self.link_size != next.link_size {
            SettingsImpact::Layout
        } else if self.link_text != next.link_text || self.precision != next.precision {
            SettingsImpact::Render
        } else {
            SettingsImpact::Unchanged
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SankeyConfig {
    pub node_width: f32,
    pub node_padding: f32,
    pub iterations: usize,
    pub margin: f32,
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            node_width: 24.0,
            node_padding: 8.0,
            iterations: 6,
            margin: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxLineConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub item_radius: f32,
    pub link_width: f32,
    pub margin: f32,
    pub budget_ms: u64,
}

impl Default for BoxLineConfig {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            rank_spacing: 80.0,
            node_padding_x: 16.0,
            node_padding_y: 10.0,
            item_radius: 18.0,
            link_width: 2.0,
            margin: 16.0,
            budget_ms: 5_000,
        }
    }
}

impl BoxLineConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub label_line_height: f32,
    pub max_label_width_chars: usize,
    pub sankey: SankeyConfig,
    pub boxline: BoxLineConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_line_height: 1.3,
            max_label_width_chars: 22,
            sankey: SankeyConfig::default(),
            boxline: BoxLineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub resize_debounce_ms: u64,
    pub drag_threshold: f32,
    pub fit_padding: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 8.0,
            resize_debounce_ms: 200,
            drag_threshold: 3.0,
            fit_padding: 12.0,
        }
    }
}

impl InteractionConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Replaces non-finite or non-positive scale bounds with the defaults and
    /// orders them, so `min_scale <= max_scale` always holds.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            self.min_scale = defaults.min_scale;
        }
        if !(self.max_scale.is_finite() && self.max_scale > 0.0) {
            self.max_scale = defaults.max_scale;
        }
        if self.min_scale > self.max_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub settings: FlowSettings,
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    background: Option<String>,
    node_stroke: Option<String>,
    link_color: Option<String>,
    link_opacity: Option<f32>,
    selection_color: Option<String>,
    palette: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SankeyConfigFile {
    node_width: Option<f32>,
    node_padding: Option<f32>,
    iterations: Option<usize>,
    margin: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BoxLineConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    item_radius: Option<f32>,
    link_width: Option<f32>,
    margin: Option<f32>,
    budget_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InteractionConfigFile {
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    resize_debounce_ms: Option<u64>,
    drag_threshold: Option<f32>,
    fit_padding: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    flow: Option<FlowSettings>,
    sankey: Option<SankeyConfigFile>,
    #[serde(rename = "boxLine", alias = "boxline")]
    boxline: Option<BoxLineConfigFile>,
    interaction: Option<InteractionConfigFile>,
    label_line_height: Option<f32>,
    max_label_width_chars: Option<usize>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let parsed: ConfigFile = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

fn scale_bound(name: &str, value: f32) -> anyhow::Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(anyhow::anyhow!(
            "interaction.{name} must be a positive number, got {value}"
        ))
    }
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(name) = parsed.theme.as_deref() {
        config.theme =
            Theme::from_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme `{name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.node_stroke {
            config.theme.node_stroke = v;
        }
        if let Some(v) = vars.link_color {
            config.theme.link_color = v;
        }
        if let Some(v) = vars.link_opacity {
            config.theme.link_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = vars.selection_color {
            config.theme.selection_color = v;
        }
        if let Some(v) = vars.palette {
            if !v.is_empty() {
                config.theme.palette = v;
            }
        }
    }

    if let Some(settings) = parsed.flow {
        config.settings = settings;
    }

    if let Some(sankey) = parsed.sankey {
        if let Some(v) = sankey.node_width {
            config.layout.sankey.node_width = v;
        }
        if let Some(v) = sankey.node_padding {
            config.layout.sankey.node_padding = v;
        }
        if let Some(v) = sankey.iterations {
            config.layout.sankey.iterations = v;
        }
        if let Some(v) = sankey.margin {
            config.layout.sankey.margin = v;
        }
    }

    if let Some(boxline) = parsed.boxline {
        if let Some(v) = boxline.node_spacing {
            config.layout.boxline.node_spacing = v;
        }
        if let Some(v) = boxline.rank_spacing {
            config.layout.boxline.rank_spacing = v;
        }
        if let Some(v) = boxline.node_padding_x {
            config.layout.boxline.node_padding_x = v;
        }
        if let Some(v) = boxline.node_padding_y {
            config.layout.boxline.node_padding_y = v;
        }
        if let Some(v) = boxline.item_radius {
            config.layout.boxline.item_radius = v;
        }
        if let Some(v) = boxline.link_width {
            config.layout.boxline.link_width = v;
        }
        if let Some(v) = boxline.margin {
            config.layout.boxline.margin = v;
        }
        if let Some(v) = boxline.budget_ms {
            config.layout.boxline.budget_ms = v;
        }
    }

    if let Some(interaction) = parsed.interaction {
        if let Some(v) = interaction.min_scale {
            config.interaction.min_scale = scale_bound("minScale", v)?;
        }
        if let Some(v) = interaction.max_scale {
            config.interaction.max_scale = scale_bound("maxScale", v)?;
        }
        if let Some(v) = interaction.resize_debounce_ms {
            config.interaction.resize_debounce_ms = v;
        }
        if let Some(v) = interaction.drag_threshold {
            config.interaction.drag_threshold = v;
        }
        if let Some(v) = interaction.fit_padding {
            config.interaction.fit_padding = v;
        }
    }
    if config.interaction.min_scale > config.interaction.max_scale {
        std::mem::swap(
            &mut config.interaction.min_scale,
            &mut config.interaction.max_scale,
        );
    }

    if let Some(v) = parsed.label_line_height {
        config.layout.label_line_height = v;
    }
    if let Some(v) = parsed.max_label_width_chars {
        config.layout.max_label_width_chars = v;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Config {
        let mut config = Config::default();
        let parsed: ConfigFile = serde_json::from_str(json).unwrap();
        apply_config_file(&mut config, parsed).unwrap();
        config
    }

    #[test]
    fn merges_over_defaults() {
        let config = parse(
            r##"{"theme":"dark","themeVariables":{"linkOpacity":3.0},
                "flow":{"diagram":"boxline","sankeyAlign":"center"},
                "sankey":{"iterations":12},"boxLine":{"budgetMs":50}}"##,
        );
        assert_eq!(config.theme.background, Theme::dark().background);
        assert_eq!(config.theme.link_opacity, 1.0);
        assert_eq!(config.settings.diagram, DiagramKind::BoxLine);
        assert_eq!(config.settings.sankey_align, SankeyAlign::Center);
        assert_eq!(config.settings.link_size, LinkValue::Items);
        assert_eq!(config.layout.sankey.iterations, 12);
        assert_eq!(config.layout.sankey.node_width, 24.0);
        assert_eq!(config.layout.boxline.budget_ms, 50);
    }

    #[test]
    fn rejects_invalid_scale_bounds() {
        for source in [
            "{interaction: {minScale: NaN}}",
            "{interaction: {maxScale: Infinity}}",
            "{interaction: {minScale: 0}}",
            "{interaction: {maxScale: -2}}",
        ] {
            let mut config = Config::default();
            let parsed: ConfigFile = json5::from_str(source).unwrap();
            assert!(apply_config_file(&mut config, parsed).is_err(), "{source}");
        }

        let config = parse(r#"{"interaction":{"minScale":4.0,"maxScale":2.0}}"#);
        assert_eq!(config.interaction.min_scale, 2.0);
        assert_eq!(config.interaction.max_scale, 4.0);
    }

    #[test]
    fn sanitized_scale_bounds_are_ordered_and_finite() {
        let inverted = InteractionConfig {
            min_scale: 4.0,
            max_scale: 2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!((inverted.min_scale, inverted.max_scale), (2.0, 4.0));

        let broken = InteractionConfig {
            min_scale: f32::NAN,
            max_scale: f32::NEG_INFINITY,
            ..Default::default()
        }
        .sanitized();
        let defaults = InteractionConfig::default();
        assert_eq!(broken.min_scale, defaults.min_scale);
        assert_eq!(broken.max_scale, defaults.max_scale);
    }

    #[test]
    fn rejects_unknown_theme() {
        let mut config = Config::default();
        let parsed: ConfigFile = serde_json::from_str(r#"{"theme":"neon"}"#).unwrap();
        assert!(apply_config_file(&mut config, parsed).is_err());
    }

    #[test]
    fn settings_impact_is_graded() {
        let base = FlowSettings::default();
        let mut next = base.clone();
        assert_eq!(base.impact_of(&next), SettingsImpact::Unchanged);
        next.precision = Some(3);
        assert_eq!(base.impact_of(&next), SettingsImpact::Render);
        next.sankey_align = SankeyAlign::Right;
        assert_eq!(base.impact_of(&next), SettingsImpact::Layout);
        next.diagram = DiagramKind::BoxLine;
        assert_eq!(base.impact_of(&next), SettingsImpact::Graph);
    }
}
