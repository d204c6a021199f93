use flow_diagram::{FlowSettings, RenderOptions, Theme, Viewport, parse_flow_steps, render_flow};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    settings: Option<FlowSettings>,
}

fn build_render_options(options: FlowRenderOptions) -> Result<RenderOptions, String> {
    let mut render_options = RenderOptions::default();
    if let Some(name) = options.theme.as_deref() {
        render_options.theme =
            Theme::from_name(name).ok_or_else(|| format!("unknown theme `{name}`"))?;
    }
    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    if let Some(settings) = options.settings {
        render_options.settings = settings;
    }
    let default_viewport = Viewport::default();
    render_options.viewport = Viewport::new(
        options.width.unwrap_or(default_viewport.width),
        options.height.unwrap_or(default_viewport.height),
    );
    Ok(render_options)
}

fn render(steps_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<FlowRenderOptions>(raw).map_err(|e| e.to_string())?,
        None => FlowRenderOptions::default(),
    };
    let render_options = build_render_options(options)?;
    let steps = parse_flow_steps(steps_json).map_err(|e| e.to_string())?;
    render_flow(&steps, &render_options).map_err(|e| e.to_string())
}

/// Box-line diagrams are laid out synchronously here; there is no worker thread in wasm.
#[wasm_bindgen]
pub fn render_flow_svg(steps_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    render(steps_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}
