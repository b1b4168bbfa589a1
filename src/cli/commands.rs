//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed arguments
//! and returns an `anyhow::Result<()>`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use playlist_drawer::config::{self, Config};
use playlist_drawer::geometry::{MeasurementSnapshot, Rect, SnapPointPlanner};
use playlist_drawer::gesture::{GestureRecognizer, PointerEvent, PointerPhase, Sensitivity};
use playlist_drawer::playlist::{
    ItemId, PlaylistItem, PlaylistReconciler, RowSink, ScrollRequest, VisibilityClassifier, title_key, version_key,
};
use playlist_drawer::DrawerMode;

/// Playlist Drawer CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PLAYLIST_DRAWER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Compute drawer extents and snap points for a layout
    SnapPoints {
        /// Player container height
        #[arg(long)]
        container: f64,
        /// Video area height (0 for none)
        #[arg(long, default_value = "0")]
        video: f64,
        /// Control bar height
        #[arg(long)]
        controls: f64,
        /// Button group width
        #[arg(long, default_value = "0")]
        button_group: f64,
        /// Plan as if no playlist were loaded
        #[arg(long)]
        no_playlist: bool,
        /// Drawer mode to report the resting height for (default: from config)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Classify a single pointer displacement
    Gesture {
        /// Horizontal travel (negative is left)
        #[arg(long, allow_hyphen_values = true)]
        dx: f64,
        /// Vertical travel (negative is up)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        dy: f64,
        /// Fingers on the surface
        #[arg(long, default_value = "1")]
        fingers: u8,
        /// Press duration in milliseconds
        #[arg(long, default_value = "200")]
        duration_ms: u64,
        /// low, normal or high (default: from config)
        #[arg(long)]
        sensitivity: Option<String>,
    },
    /// Print the dedup keys of a title
    DedupKey {
        /// Item title
        title: String,
        /// Item artist
        #[arg(long, default_value = "")]
        artist: String,
    },
    /// Show the row operations that turn one item list into another
    Reconcile {
        /// JSON array of items currently rendered
        before: PathBuf,
        /// JSON array of items to render
        after: PathBuf,
        /// List id for per-list removals and seasonal bypass
        #[arg(long)]
        list: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        return Ok(false);
    };
    let config = load_config(cli.config.as_deref())?;

    match command {
        Commands::SnapPoints {
            container,
            video,
            controls,
            button_group,
            no_playlist,
            mode,
        } => {
            let mode = mode.clone().map(DrawerMode::from).unwrap_or(config.drawer.mode);
            let layout = Layout {
                container: *container,
                video: *video,
                controls: *controls,
                button_group: *button_group,
            };
            cmd_snap_points(&config, layout, !*no_playlist, mode)?;
        }
        Commands::Gesture {
            dx,
            dy,
            fingers,
            duration_ms,
            sensitivity,
        } => {
            let sensitivity = sensitivity
                .clone()
                .map(Sensitivity::from)
                .unwrap_or(config.gestures.sensitivity);
            cmd_gesture(&config, *dx, *dy, *fingers, Duration::from_millis(*duration_ms), sensitivity);
        }
        Commands::DedupKey { title, artist } => cmd_dedup_key(title, artist),
        Commands::Reconcile { before, after, list } => {
            cmd_reconcile(&config, before, after, list.as_deref())?;
        }
        Commands::Config { path } => cmd_config(&config, cli.config.as_deref(), *path)?,
    }
    Ok(true)
}

/// What the binary prints without a subcommand.
pub fn print_summary() -> anyhow::Result<()> {
    let config = config::load();
    match config::config_path() {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: <no config directory>"),
    }
    println!("Drawer mode: {}", config.drawer.mode);
    println!("Gesture sensitivity: {}", config.gestures.sensitivity);
    println!();
    println!("Run with --help to list the inspection commands.");
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            config::load_from(path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(config::load()),
    }
}

// ============================================================================
// snap-points
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Layout {
    container: f64,
    video: f64,
    controls: f64,
    button_group: f64,
}

impl Layout {
    /// Stack video, list and controls top to bottom in the container.
    fn snapshot(&self) -> MeasurementSnapshot {
        let controls_top = self.container - self.controls;
        MeasurementSnapshot::derive(
            Some(Rect::new(0.0, 0.0, 0.0, self.container)),
            (self.video > 0.0).then(|| Rect::new(0.0, 0.0, 0.0, self.video)),
            Some(Rect::new(controls_top, 0.0, 0.0, self.controls)),
            Some(Rect::new(controls_top, 0.0, self.button_group, self.controls)),
        )
    }
}

fn cmd_snap_points(config: &Config, layout: Layout, has_playlist: bool, mode: DrawerMode) -> anyhow::Result<()> {
    let snapshot = layout.snapshot();
    debug!("Derived snapshot {:?}", snapshot);
    if !snapshot.valid {
        anyhow::bail!("Container and control bar heights must both be greater than 0");
    }

    let snap = SnapPointPlanner::new(config.drawer.min_snap_difference).plan(&snapshot, has_playlist);
    println!("Max drawer height: {:.1}", snapshot.max_drawer_height);
    println!("Mid drawer height: {:.1}", snapshot.mid_drawer_height);
    println!("Controls height:   {:.1}", snapshot.controls_height);
    println!();
    println!("Snap points: {}", snap);
    for &point in snap.points() {
        println!("  {:>8.1}  {}", point, snap.state_for(point));
    }
    println!();
    println!("Resting height in {} mode: {:.1}", mode, mode.resting_height(&snap));
    Ok(())
}

// ============================================================================
// gesture
// ============================================================================

fn cmd_gesture(config: &Config, dx: f64, dy: f64, fingers: u8, duration: Duration, sensitivity: Sensitivity) {
    let mut recognizer = GestureRecognizer::new(sensitivity, config.gestures.actions.clone(), Box::new(|_| false));
    let t = recognizer.thresholds();
    info!(
        "Thresholds at {}: distance {:.0}, duration {:?}, ratio {:.2}",
        sensitivity, t.distance, t.max_duration, t.vertical_ratio
    );

    let start = Instant::now();
    recognizer.handle(&PointerEvent::new(PointerPhase::Down, 0.0, 0.0, start, fingers));
    let up = PointerEvent::new(PointerPhase::Up, dx, dy, start + duration, fingers);
    match recognizer.handle(&up) {
        Some(gesture) => {
            let action = recognizer.actions().lookup(gesture);
            println!("{} -> {}", gesture, action);
        }
        None => println!("Not a gesture at {} sensitivity", sensitivity),
    }
}

// ============================================================================
// dedup-key
// ============================================================================

fn cmd_dedup_key(title: &str, artist: &str) {
    println!("Title key:   {:?}", title_key(title));
    println!("Version key: {:?}", version_key(artist, title));
}

// ============================================================================
// reconcile
// ============================================================================

/// Row sink that prints each operation it receives.
#[derive(Debug, Default)]
struct PrintingRows {
    echo: bool,
    log: Vec<String>,
}

impl PrintingRows {
    fn record(&mut self, line: String) {
        if self.echo {
            println!("  {}", line);
        }
        self.log.push(line);
    }
}

impl RowSink for PrintingRows {
    fn create_row(&mut self, index: usize, item: &PlaylistItem) {
        self.record(format!("create {} at {} ({:?})", item.id, index, item.title));
    }

    fn update_row(&mut self, item: &PlaylistItem) {
        self.record(format!("update {} ({:?})", item.id, item.title));
    }

    fn move_row(&mut self, id: &ItemId, index: usize) {
        self.record(format!("move {} to {}", id, index));
    }

    fn remove_row(&mut self, id: &ItemId) {
        self.record(format!("remove {}", id));
    }

    fn set_active(&mut self, id: Option<&ItemId>) {
        match id {
            Some(id) => self.record(format!("highlight {}", id)),
            None => self.record("highlight none".to_string()),
        }
    }

    fn scroll_by(&mut self, request: ScrollRequest) {
        self.record(format!("scroll {:?} by {:+.1}", request.axis, request.delta));
    }
}

fn read_items(path: &Path) -> anyhow::Result<Vec<PlaylistItem>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON item list", path.display()))
}

fn cmd_reconcile(config: &Config, before: &Path, after: &Path, list: Option<&str>) -> anyhow::Result<()> {
    let before = read_items(before)?;
    let after = read_items(after)?;
    let settings = config.playlist.visibility();
    let today = chrono::Local::now().date_naive();
    let classifier = VisibilityClassifier::new(&settings, list, today);

    let mut reconciler = PlaylistReconciler::new();
    let mut rows = PrintingRows::default();
    reconciler.update(before, &classifier, &mut rows);
    println!("Rendered: {}", join_ids(reconciler.rendered()));

    rows.echo = true;
    println!("Operations:");
    let report = reconciler.update(after, &classifier, &mut rows);
    if report.is_noop() {
        println!("  (none)");
    }
    println!("Rendered: {}", join_ids(reconciler.rendered()));
    println!(
        "{} created, {} moved, {} updated, {} removed, {} hidden",
        report.created, report.moved, report.updated, report.removed, report.hidden
    );
    for item in reconciler.items().iter().filter(|i| i.is_hidden()) {
        let reason = classifier.classify(item, &mut Default::default());
        match reason {
            Some(reason) => println!("  hidden {}: {}", item.id, reason),
            None => println!("  hidden {}: duplicate", item.id),
        }
    }
    Ok(())
}

fn join_ids(ids: &[ItemId]) -> String {
    if ids.is_empty() {
        return "(empty)".to_string();
    }
    ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(" ")
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(config: &Config, explicit: Option<&Path>, path_only: bool) -> anyhow::Result<()> {
    if path_only {
        let path = explicit.map(Path::to_path_buf).or_else(config::config_path);
        match path {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("No config directory available on this platform"),
        }
        return Ok(());
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{}", text);
    Ok(())
}
