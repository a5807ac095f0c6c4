use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use carousel_wm::actor::carousel::{CarouselActor, Event, RenderStage};
use carousel_wm::common::config::Config;
use carousel_wm::common::log::init_logging;
use carousel_wm::layout_engine::{CarouselCommand, ProxyLayout};
use carousel_wm::model::server::WindowId;
use carousel_wm::sys::headless::{HeadlessHost, HeadlessScene};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

const FRAME: Duration = Duration::from_millis(16);

/// Runs the carousel against an in-memory desktop and prints the result.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML file describing monitors and windows.
    scene: PathBuf,

    /// Configuration file. Defaults to the user's carousel config if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Commands to run after opening, e.g. `next,next,down`.
    #[arg(long, value_delimiter = ',')]
    commands: Vec<CarouselCommand>,

    /// Frames to simulate after the commands.
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Print the element tree instead of the layout.
    #[arg(long)]
    tree: bool,
}

#[derive(Serialize)]
struct Report {
    active: bool,
    selected: Option<WindowId>,
    proxies: Vec<ProxyLayout>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display())),
        None => match Config::default_path() {
            Some(path) => Ok(Config::load_or_default(&path)?),
            None => Ok(Config::default()),
        },
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("reading scene {}", args.scene.display()))?;
    let scene: HeadlessScene = toml::from_str(&text).context("invalid scene")?;
    let config = load_config(args.config.as_ref())?;
    debug!(monitors = scene.monitors.len(), windows = scene.windows.len(), "scene loaded");

    let mut host = HeadlessHost::from_scene(scene);
    let mut actor = CarouselActor::new(config, &mut host).context("installing hooks")?;

    let mut now = Instant::now();
    actor.handle_event_at(Event::Command(CarouselCommand::Toggle), &mut host, now);
    if !actor.is_active() {
        info!("nothing to show");
    }
    for command in args.commands {
        actor.handle_event_at(Event::Command(command), &mut host, now);
    }
    for _ in 0..args.frames {
        now += FRAME;
        actor.handle_event_at(Event::Frame(RenderStage::Pre), &mut host, now);
        actor.handle_event_at(Event::Frame(RenderStage::LastMoment), &mut host, now);
    }

    let manager = actor.manager();
    if args.tree {
        print!("{}", manager.debug_tree());
    } else {
        let report = Report {
            active: manager.is_active(),
            selected: manager.selected_window(),
            proxies: manager.layout_snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
