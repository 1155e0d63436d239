use std::{path::PathBuf, rc::Rc};

use clap::{Args, Parser, Subcommand};
use portfolio_motion_core::{
    InputEvent, LifecycleBinder, ManualFrameScheduler, MarqueeStrip, MemoryElement, MemoryInput,
    MemoryViewport, MotionConfig, MotionError, ScrollViewport, Surface,
};
use tracing_subscriber::EnvFilter;

const TECH_STACK: [&str; 8] = [
    "TypeScript",
    "React.js",
    "Next.js",
    "Node.js",
    "Tailwind CSS",
    "Docker",
    "PostgreSQL",
    "Figma",
];

fn main() -> portfolio_motion_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Navigate(args) => run_navigate(&args),
        Commands::Config { config } => run_config(config.as_ref()),
    }
}

fn run_simulate(args: &SimulateArgs) -> portfolio_motion_core::Result<()> {
    if !args.frame_ms.is_finite() || args.frame_ms <= 0.0 {
        return Err(MotionError::msg("--frame-ms must be greater than zero"));
    }
    let config = load_config(args.config.as_ref())?;
    tracing::info!(frames = args.frames, scroll = args.scroll, "starting simulation");

    let scheduler = Rc::new(ManualFrameScheduler::new());
    let page = SimulatedPage::new("home", args.extent, true, &config)?;
    let mut binder = LifecycleBinder::new(config, scheduler.clone())?;
    binder.bind(&page.surface)?;
    page.input.emit(InputEvent::wheel(args.scroll));

    let sample_every = (args.frames / 10).max(1);
    for frame in 0..args.frames {
        let now = frame as f64 * args.frame_ms;
        scheduler.run_frame(now);
        if frame % sample_every == 0 || frame + 1 == args.frames {
            println!(
                "{now:>9.0}ms  scroll {:>9.2}  marquee {:>7.2}%",
                page.viewport.scroll_offset(),
                page.marquee_percent()
            );
        }
    }

    let leaks = binder.unbind();
    println!(
        "unbound `{}`: {} pending registrations, {leaks} leak warnings",
        page.surface.name(),
        scheduler.pending_count()
    );
    Ok(())
}

fn run_navigate(args: &NavigateArgs) -> portfolio_motion_core::Result<()> {
    let config = load_config(args.config.as_ref())?;
    tracing::info!(cycles = args.cycles, "simulating route navigation");

    let scheduler = Rc::new(ManualFrameScheduler::new());
    let pages = [
        SimulatedPage::new("home", 6_000.0, true, &config)?,
        SimulatedPage::new("projects", 9_000.0, false, &config)?,
    ];
    let mut binder = LifecycleBinder::new(config, scheduler.clone())?;

    let mut now = 0.0;
    let mut peak = 0;
    for cycle in 0..args.cycles {
        let page = &pages[cycle % pages.len()];
        binder.bind(&page.surface)?;
        page.input.emit(InputEvent::wheel(240.0));

        let expected = 1 + page.surface.marquees().len();
        for _ in 0..args.frames {
            now += 16.0;
            let fired = scheduler.run_frame(now);
            peak = peak.max(fired);
            if fired != expected {
                return Err(MotionError::msg(format!(
                    "cycle {cycle}: {fired} frame callbacks fired on `{}`, expected {expected}",
                    page.surface.name()
                )));
            }
        }
        binder.unbind();
    }

    let (binds, unbinds) = binder.cycle_counts();
    println!(
        "{binds} binds / {unbinds} unbinds, peak {peak} callbacks per frame, {} pending, {} leak warnings",
        scheduler.pending_count(),
        binder.leak_warnings().len()
    );
    Ok(())
}

fn run_config(path: Option<&PathBuf>) -> portfolio_motion_core::Result<()> {
    let config = load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> portfolio_motion_core::Result<MotionConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            MotionConfig::load(path)
        }
        None => Ok(MotionConfig::site_defaults()),
    }
}

/// In-memory page standing in for a mounted section of the site.
struct SimulatedPage {
    surface: Surface,
    viewport: Rc<MemoryViewport>,
    input: Rc<MemoryInput>,
    marquee: Option<Rc<MemoryElement>>,
}

impl SimulatedPage {
    fn new(
        name: &str,
        extent: f64,
        with_marquee: bool,
        config: &MotionConfig,
    ) -> portfolio_motion_core::Result<Self> {
        let viewport = Rc::new(MemoryViewport::new(extent));
        let input = Rc::new(MemoryInput::new());
        let mut surface = Surface::new(name, viewport.clone(), input.clone());

        let mut marquee = None;
        if with_marquee {
            let strip = MarqueeStrip::doubled(TECH_STACK.to_vec())?;
            tracing::debug!(items = strip.len(), copies = strip.copies(), "tech stack strip");
            let element = Rc::new(MemoryElement::new("techScroller"));
            surface = surface.with_marquee_options(
                "tech-stack",
                element.clone(),
                strip.loop_options(&config.marquee),
            );
            marquee = Some(element);
        }

        Ok(Self {
            surface,
            viewport,
            input,
            marquee,
        })
    }

    fn marquee_percent(&self) -> f64 {
        self.marquee
            .as_ref()
            .map_or(0.0, |element| element.translate_x_percent())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Smooth-scroll and marquee animation driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind a simulated page, scroll it and print samples frame by frame.
    Simulate(SimulateArgs),
    /// Bind and unbind alternating pages to check that loops never stack.
    Navigate(NavigateArgs),
    /// Print the effective configuration as JSON.
    Config {
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of frames to run.
    #[arg(long, default_value_t = 240)]
    frames: usize,
    /// Milliseconds between frames.
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,
    /// Wheel delta injected after binding.
    #[arg(long, default_value_t = 1_000.0)]
    scroll: f64,
    /// Maximum scroll offset of the simulated page.
    #[arg(long, default_value_t = 5_000.0)]
    extent: f64,
}

#[derive(Args, Debug)]
struct NavigateArgs {
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of bind/unbind cycles.
    #[arg(long, default_value_t = 20)]
    cycles: usize,
    /// Frames to run while each page is bound.
    #[arg(long, default_value_t = 30)]
    frames: usize,
}
