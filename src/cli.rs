use crate::config::{Config, DiagramKind, SankeyAlign, load_config};
use crate::graph::build_graph;
use crate::interaction::ViewTransform;
use crate::ir::parse_flow_steps;
use crate::layout::{DagreBackend, LayoutResult, LayoutWorker, Viewport, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_scene, scene_to_svg, write_output_png, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowdr", version, about = "Render production flows as Sankey or box-line diagrams")]
pub struct Args {
    /// Input flow JSON (array of steps or {"steps": [...]}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Diagram type, overrides the config file
    #[arg(short = 'd', long = "diagram", value_enum)]
    pub diagram: Option<DiagramArg>,

    /// Sankey column alignment, overrides the config file
    #[arg(short = 'a', long = "align", value_enum)]
    pub align: Option<AlignArg>,

    /// Step id to highlight
    #[arg(short = 's', long = "select")]
    pub select: Option<String>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Write the computed layout as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DiagramArg {
    Sankey,
    #[value(alias = "box-line")]
    Boxline,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AlignArg {
    Justify,
    Left,
    Right,
    Center,
}

impl From<DiagramArg> for DiagramKind {
    fn from(arg: DiagramArg) -> Self {
        match arg {
            DiagramArg::Sankey => DiagramKind::Sankey,
            DiagramArg::Boxline => DiagramKind::BoxLine,
        }
    }
}

impl From<AlignArg> for SankeyAlign {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Justify => SankeyAlign::Justify,
            AlignArg::Left => SankeyAlign::Left,
            AlignArg::Right => SankeyAlign::Right,
            AlignArg::Center => SankeyAlign::Center,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // SVG goes to stdout, so logs stay on stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let input = read_input(args.input.as_deref())?;
    let steps = parse_flow_steps(&input)?;
    let viewport = Viewport::new(config.render.width, config.render.height);
    let graph = build_graph(&steps, &config.settings)?;

    let layout = match config.settings.diagram {
        DiagramKind::Sankey => compute_layout(
            &graph,
            &config.settings,
            &config.theme,
            &config.layout,
            viewport,
        )?,
        DiagramKind::BoxLine => {
            let worker = LayoutWorker::spawn(
                0,
                Arc::new(graph),
                Arc::new(DagreBackend),
                config.theme.clone(),
                config.layout.clone(),
                viewport,
                Instant::now(),
            );
            LayoutResult::BoxLine(worker.wait(config.layout.boxline.budget())?)
        }
    };
    tracing::debug!(
        nodes = layout.node_count(),
        links = layout.link_count(),
        "layout complete"
    );

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout)?;
    }

    let selection = args.select.as_deref().filter(|id| {
        let present = layout.contains_step(id);
        if !present {
            tracing::warn!(step = *id, "selected step is not in the diagram");
        }
        present
    });
    let scene = render_scene(
        &layout,
        &config.settings,
        &config.theme,
        &config.layout,
        selection,
    );
    let svg = scene_to_svg(
        &scene,
        &config.theme,
        &config.layout,
        &ViewTransform::identity(),
    );

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render)?;
        }
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;
    if let Some(diagram) = args.diagram {
        config.settings.diagram = diagram.into();
    }
    if let Some(align) = args.align {
        config.settings.sankey_align = align.into();
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
