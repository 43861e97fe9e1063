use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use page_behaviors::config::DEFAULT_CONFIG_FILE;
use page_behaviors::{
  BehaviorConfig, CarouselController, CarouselEvent, CarouselParts, CarouselSettings,
  PageSelection, SiteReport, SiteRewriter, Slide,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "page-behaviors", version, about = "Rewrite internal site links and simulate carousels")]
struct Cli {
  /// Configuration file (defaults to page-behaviors.json in the working directory).
  #[arg(long, global = true)]
  config: Option<PathBuf>,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Rewrite the internal anchors of every page under a site directory.
  Rewrite {
    /// Built site directory.
    #[arg(long)]
    root: PathBuf,
    /// Write into this directory instead of rewriting in place.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Override the configured base path.
    #[arg(long)]
    base_path: Option<String>,
    /// Page selection file (include/exclude rules).
    #[arg(long)]
    selection: Option<PathBuf>,
    /// Report what would change without writing.
    #[arg(long)]
    dry_run: bool,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Print the rewritten form of each href.
  Transform {
    /// Hrefs to rewrite.
    #[arg(required = true)]
    hrefs: Vec<String>,
    /// Override the configured base path.
    #[arg(long)]
    base_path: Option<String>,
  },
  /// Run a carousel on a virtual clock and print every slide change.
  Simulate {
    /// Number of slides.
    #[arg(long, default_value_t = 3)]
    slides: usize,
    /// Simulated run time in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    run_ms: u64,
    /// Time at which the pointer enters the carousel.
    #[arg(long)]
    hover_at: Option<u64>,
    /// Time at which the pointer leaves the carousel.
    #[arg(long)]
    leave_at: Option<u64>,
    /// Override the configured autoplay interval.
    #[arg(long)]
    autoplay_ms: Option<u64>,
    /// Override the configured settle delay.
    #[arg(long)]
    settle_ms: Option<u64>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("page_behaviors=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let (config, config_dir) = load_config(cli.config.as_deref())?;

  match cli.command {
    Command::Rewrite {
      root,
      out,
      base_path,
      selection,
      dry_run,
      json,
    } => {
      let config = with_base_path(config, base_path);
      let selection_path = selection.unwrap_or_else(|| config.selection_path(&config_dir));
      let selection = PageSelection::load_from_path(&selection_path)?;
      let output = out.unwrap_or_else(|| root.clone());

      let report = SiteRewriter::new(&config, &root, &output, &selection)
        .dry_run(dry_run)
        .run()?;
      print_report(&report, json)?;
    }
    Command::Transform { hrefs, base_path } => {
      let rewriter = with_base_path(config, base_path).rewriter();
      for href in hrefs {
        println!("{}", rewriter.transform(&href));
      }
    }
    Command::Simulate {
      slides,
      run_ms,
      hover_at,
      leave_at,
      autoplay_ms,
      settle_ms,
    } => {
      let mut timing = config.carousel;
      if let Some(value) = autoplay_ms {
        timing.autoplay_interval_ms = value;
      }
      if let Some(value) = settle_ms {
        timing.settle_delay_ms = value;
      }
      for line in simulate(slides, run_ms, hover_at, leave_at, timing.into())? {
        println!("{line}");
      }
    }
  }

  Ok(())
}

fn load_config(path: Option<&Path>) -> Result<(BehaviorConfig, PathBuf)> {
  match path {
    Some(path) => {
      let config = BehaviorConfig::from_path(path)?;
      let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
      Ok((config, dir))
    }
    None => {
      let dir = std::env::current_dir().context("failed to resolve working directory")?;
      tracing::debug!(file = DEFAULT_CONFIG_FILE, dir = %dir.display(), "discovering configuration");
      Ok((BehaviorConfig::discover(&dir), dir))
    }
  }
}

fn with_base_path(mut config: BehaviorConfig, base_path: Option<String>) -> BehaviorConfig {
  if let Some(base_path) = base_path {
    config.base_path = base_path;
  }
  config
}

fn print_report(report: &SiteReport, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(report)?);
    return Ok(());
  }

  for page in &report.pages {
    println!("{:>4}  {}", page.links_rewritten, page.path);
  }
  let verb = if report.dry_run { "would rewrite" } else { "rewrote" };
  println!(
    "{verb} {} links in {} of {} pages ({} other files mirrored, {} stale files pruned)",
    report.links_rewritten,
    report.pages_changed,
    report.pages_scanned,
    report.files_mirrored,
    report.files_pruned
  );
  Ok(())
}

struct TimelineSlide {
  active: bool,
}

impl Slide for TimelineSlide {
  fn set_active(&mut self, active: bool) {
    self.active = active;
  }
}

/// Run a carousel on its virtual clock and return the timeline, one line per event.
///
/// Every started transition is listed, including those that land on the slide already shown.
fn simulate(
  slides: usize,
  run_ms: u64,
  hover_at: Option<u64>,
  leave_at: Option<u64>,
  settings: CarouselSettings,
) -> Result<Vec<String>> {
  let parts = CarouselParts::new((0..slides).map(|_| TimelineSlide { active: false }).collect());
  let mut carousel = CarouselController::init(parts, settings)?;
  let mut shown = carousel.state().current_index;
  let mut was_transitioning = false;
  let mut timeline = vec![format!("{:>7} ms  slide {shown}", 0)];

  let step = Duration::from_millis(1);
  for elapsed in 0..=run_ms {
    if elapsed > 0 {
      carousel.advance(step);
    }
    if hover_at == Some(elapsed) {
      carousel.handle(CarouselEvent::PointerEnter);
      timeline.push(format!("{elapsed:>7} ms  pointer enter (autoplay paused)"));
    }
    if leave_at == Some(elapsed) {
      carousel.handle(CarouselEvent::PointerLeave);
      timeline.push(format!("{elapsed:>7} ms  pointer leave (autoplay restarted)"));
    }

    let state = carousel.state();
    let started = state.is_transitioning && !was_transitioning;
    if started || state.current_index != shown {
      debug_assert!(carousel.slides()[state.current_index].active);
      timeline.push(format!("{elapsed:>7} ms  slide {}", state.current_index));
      shown = state.current_index;
    }
    was_transitioning = state.is_transitioning;
  }

  Ok(timeline)
}
