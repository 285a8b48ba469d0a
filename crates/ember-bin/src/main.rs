//! Ember entrypoint: data-driven particle physics rendered to the
//! terminal.

mod hud;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use core_analytics as analytics;
use core_config::{Config, ConfigContext, load_from};
use core_data::{CsvLimits, CsvSource, SourceRegistry, bind_particles};
use core_events::{Event, SimCommand};
use core_physics::{CollisionSettings, ForceField};
use core_render::{FrameBuffer, color};
use core_sim::{Simulation, StepReport};
use core_sysmon::SysMonitor;
use core_terminal::TerminalSession;
use hud::Hud;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Rows reserved at the top of the frame for the status line.
const HUD_ROWS: u16 = 1;
/// Samples of the particle-count series kept for analytics.
const SERIES_CAP: usize = 600;
/// Ticks between analytics passes over the series.
const ANALYTICS_STRIDE: u64 = 60;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "ember", version, about = "Terminal particle physics driven by live data")]
struct Args {
    /// Data file to seed particles from.
    #[arg(long)]
    source: Option<PathBuf>,
    /// Source type for `--source` ("csv", "json").
    #[arg(long, default_value = "csv")]
    format: String,
    /// Particle capacity override.
    #[arg(long)]
    particles: Option<usize>,
    /// Target frames per second override.
    #[arg(long)]
    fps: Option<u32>,
    /// Feed the simulation from kernel statistics.
    #[arg(long)]
    sysmon: bool,
    /// Configuration file path (overrides discovery of `ember.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log file path; defaults to the config's `[log] file`.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Run this many ticks without entering the terminal, print a
    /// summary, and exit. Diagnostics and smoke tests.
    #[arg(long)]
    headless_ticks: Option<u64>,
}

fn configure_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .file
                .log
                .level
                .clone()
                .unwrap_or_else(|| "warn".to_string()),
        )
    });
    let file = args.log_file.clone().or_else(|| config.file.log.file.clone());
    match file {
        Some(path) => {
            let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| ".".into());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ember.log".to_string());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            // Raw-mode screens and stderr logs don't mix; keep it quiet
            // unless someone asked via RUST_LOG or the config.
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Best effort: never leave the user's shell in raw mode.
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );
        default_hook(panic_info);
    }));
}

fn build_simulation(config: &Config, columns: u16, world_rows: u16) -> Result<Simulation> {
    let mut sim = Simulation::new(
        config.effective_particles,
        columns as usize,
        world_rows as usize,
    )
    .context("creating simulation")?;
    let physics = &config.file.physics;
    sim.set_gravity(physics.gravity);
    sim.set_wind(physics.wind_x, physics.wind_y);
    sim.set_collision_settings(CollisionSettings {
        radius: physics.collision_radius,
        restitution: physics.restitution,
        friction: physics.friction,
        enabled: physics.collisions,
    })
    .context("applying collision settings")?;
    Ok(sim)
}

fn seed_from_source(args: &Args, config: &Config, sim: &mut Simulation) -> Result<()> {
    let Some(path) = &args.source else {
        return Ok(());
    };
    let registry = SourceRegistry::with_defaults();
    let mut source = if args.format == "csv" {
        // The csv source honors the configured input bounds.
        let data = &config.file.data;
        Box::new(CsvSource::with_limits(CsvLimits {
            max_line_len: data.max_line_len,
            max_columns: data.max_columns,
            max_rows: data.max_rows,
        })) as Box<dyn core_data::RecordStream>
    } else {
        registry
            .create(&args.format)
            .with_context(|| format!("unknown source format `{}`", args.format))?
    };

    let path = path
        .to_str()
        .context("source path is not valid UTF-8")?
        .to_string();
    source.init(&path).context("initializing source")?;
    source.open().context("opening source")?;
    let report = bind_particles(source.as_mut(), sim, sim.capacity())
        .context("binding records to particles")?;
    info!(target: "runtime", bound = report.bound, "seeded particles from source");
    source.close();
    Ok(())
}

/// Demo force fields cycled by the `f` key.
fn demo_field(index: usize, width: f32, height: f32) -> Option<(&'static str, ForceField)> {
    let cx = width / 2.0;
    let cy = height / 2.0;
    match index {
        1 => Some(("vortex", ForceField::vortex(cx, cy, 40.0, height.min(width) / 2.5))),
        2 => Some(("attractor", ForceField::attractor(cx, cy, 200.0, 0.0))),
        3 => Some(("radial", ForceField::radial(cx, cy, 30.0, height.min(width) / 3.0))),
        _ => None,
    }
}

struct App {
    sim: Simulation,
    fb: FrameBuffer,
    hud: Hud,
    config: Config,
    sysmon: Option<SysMonitor>,
    sysmon_interval: Duration,
    last_sysmon: Option<Instant>,
    series: Vec<f32>,
    field_index: usize,
    should_quit: bool,
    tick: u64,
}

impl App {
    fn new(config: Config, columns: u16, rows: u16, sysmon_enabled: bool) -> Result<Self> {
        let world_rows = rows.saturating_sub(HUD_ROWS).max(2);
        let sim = build_simulation(&config, columns.max(2), world_rows)?;
        let fb = FrameBuffer::new(columns.max(2) as usize, rows.max(3) as usize)
            .context("creating framebuffer")?;
        let sysmon_interval = Duration::from_millis(config.file.sysmon.interval_ms.max(100));
        Ok(Self {
            sim,
            fb,
            hud: Hud::default(),
            config,
            sysmon: sysmon_enabled.then(SysMonitor::new),
            sysmon_interval,
            last_sysmon: None,
            series: Vec::with_capacity(SERIES_CAP),
            field_index: 0,
            should_quit: false,
            tick: 0,
        })
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.handle_command(command),
            Event::Resize(columns, rows) => {
                // The framebuffer's dimensions are immutable; a resize
                // swaps in a fresh one. The world keeps its size and the
                // plot pass clips.
                match FrameBuffer::new(columns.max(2) as usize, rows.max(3) as usize) {
                    Ok(fb) => self.fb = fb,
                    Err(err) => warn!(target: "runtime", error = %err, "resize rejected"),
                }
            }
            Event::Shutdown => self.should_quit = true,
        }
    }

    fn handle_command(&mut self, command: SimCommand) {
        match command {
            SimCommand::Burst => {
                let (w, h) = (self.sim.width(), self.sim.height());
                self.sim
                    .spawn_burst(w / 2.0, h / 3.0, 40, std::f32::consts::PI);
            }
            SimCommand::WindDelta(dx, dy) => {
                let (wx, wy) = self.sim.wind();
                self.sim.set_wind(wx + dx, wy + dy);
            }
            SimCommand::GravityDelta(dg) => {
                self.sim.set_gravity(self.sim.gravity() + dg);
            }
            SimCommand::ToggleCollisions => {
                let enabled = !self.sim.collision_settings().enabled;
                self.sim.set_collisions_enabled(enabled);
            }
            SimCommand::CycleField => {
                self.field_index = (self.field_index + 1) % 4;
                self.sim.clear_fields();
                self.hud.field_name = "";
                if let Some((name, field)) =
                    demo_field(self.field_index, self.sim.width(), self.sim.height())
                {
                    // Table was just cleared; the push cannot overflow.
                    let _ = self.sim.add_field(field);
                    self.hud.field_name = name;
                }
            }
            SimCommand::ClearParticles => self.sim.clear(),
            SimCommand::TogglePause => self.hud.paused = !self.hud.paused,
            SimCommand::Quit => self.should_quit = true,
        }
    }

    /// Sample kernel statistics and turn CPU load into particle bursts,
    /// one fountain per core.
    fn feed_from_sysmon(&mut self) {
        if self
            .last_sysmon
            .is_some_and(|last| last.elapsed() < self.sysmon_interval)
        {
            return;
        }
        self.last_sysmon = Some(Instant::now());
        let Some(monitor) = self.sysmon.as_mut() else {
            return;
        };
        match monitor.sample() {
            Ok(sample) => {
                self.hud.cpu_percent = Some(sample.aggregate.usage_percent);
                let cores = sample.cpus.len().max(1);
                let lane = self.sim.width() / (cores as f32 + 1.0);
                let floor = self.sim.height() - 2.0;
                for cpu in &sample.cpus {
                    let count = (cpu.usage_percent / 10.0) as usize;
                    if count > 0 {
                        let x = lane * (cpu.id.unwrap_or(0) as f32 + 1.0);
                        self.sim
                            .spawn_burst(x, floor, count, std::f32::consts::FRAC_PI_2);
                    }
                }
            }
            Err(err) => {
                self.sim.error_counters().record(&err);
                warn!(target: "sysmon", error = %err, "sample failed, disabling feed");
                self.sysmon = None;
            }
        }
    }

    /// Track the particle-count series and flag statistical anomalies.
    fn run_analytics(&mut self) {
        if self.series.len() == SERIES_CAP {
            self.series.remove(0);
        }
        self.series.push(self.sim.particle_count() as f32);

        if self.tick % ANALYTICS_STRIDE != 0 || self.series.len() < 32 {
            return;
        }
        let window = &self.series[self.series.len().saturating_sub(240)..];
        if !analytics::detect_zscore(window, 3.0).is_empty() {
            self.hud.flag_anomaly(90);
        }
        self.hud.forecast_particles = Some(analytics::linear(window, 30).value.max(0.0));
    }

    fn plot(&mut self, report: StepReport, fps: u32) {
        self.fb.clear();
        let render = &self.config.file.render;
        for (_, p) in self.sim.pool().iter() {
            let cell_color = match render.color_mode {
                core_config::ColorMode::Speed => color::speed_color(p.speed()),
                core_config::ColorMode::Energy => {
                    color::energy_color(p.vx * p.vx + p.vy * p.vy)
                }
                core_config::ColorMode::Fixed => render.fixed_color,
            };
            self.fb.plot(
                p.x.round() as i32,
                p.y.round() as i32 + HUD_ROWS as i32,
                render.glyph,
                cell_color,
            );
        }
        self.hud.draw(&mut self.fb, &self.sim, report, fps);
        self.hud.tick();
    }

    fn advance(&mut self, dt: f32) -> Result<StepReport> {
        self.tick += 1;
        if self.sysmon.is_some() {
            self.feed_from_sysmon();
        }
        let report = if self.hud.paused {
            StepReport {
                active: self.sim.particle_count(),
                ..StepReport::default()
            }
        } else {
            self.sim.step(dt).context("simulation step")?
        };
        self.run_analytics();
        Ok(report)
    }
}

async fn run_interactive(args: Args, mut config: Config) -> Result<()> {
    let (columns, rows) = core_terminal::size().context("querying terminal size")?;
    config.apply_context(ConfigContext::new(columns, rows, HUD_ROWS));
    if let Some(particles) = args.particles {
        config.effective_particles = particles;
    }
    let fps = args.fps.unwrap_or(config.effective_fps).clamp(1, 240);
    let dt = 1.0 / fps as f32;

    let mut app = App::new(config, columns, rows, args.sysmon)?;
    let seed_config = app.config.clone();
    seed_from_source(&args, &seed_config, &mut app.sim)?;

    let mut session = TerminalSession::acquire_titled("ember").context("entering terminal")?;

    let (tx, mut rx) = core_events::channel();
    let input_task = core_input::spawn_input_task(tx);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(target: "runtime", fps, "entering driver loop");
    let stdout = std::io::stdout();
    while !app.should_quit {
        ticker.tick().await;
        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }
        if app.should_quit {
            break;
        }

        let report = app.advance(dt)?;
        app.plot(report, fps);
        let mut out = stdout.lock();
        app.fb.flush(&mut out).context("flushing frame")?;
        out.flush().ok();
    }

    input_task.abort();
    session.release().context("restoring terminal")?;
    info!(target: "runtime", "shutdown");
    Ok(())
}

/// Run without a terminal: fixed world, burst seeding, summary on stdout.
fn run_headless(args: &Args, mut config: Config, ticks: u64) -> Result<()> {
    config.apply_context(ConfigContext::new(120, 40, HUD_ROWS));
    if let Some(particles) = args.particles {
        config.effective_particles = particles;
    }
    let mut sim = build_simulation(&config, 120, 39)?;
    seed_from_source(args, &config, &mut sim)?;
    if sim.particle_count() == 0 {
        sim.spawn_burst(60.0, 10.0, 500, std::f32::consts::PI);
    }

    let dt = 1.0 / config.effective_fps.max(1) as f32;
    let started = Instant::now();
    let mut contacts = 0usize;
    let mut reaped = 0usize;
    for _ in 0..ticks {
        let report = sim.step(dt)?;
        contacts += report.contacts;
        reaped += report.reaped;
    }
    let elapsed = started.elapsed();
    println!(
        "ember headless: {ticks} ticks in {:.1} ms ({:.0} ticks/s), kernel {}, active {}, reaped {reaped}, contacts {contacts}",
        elapsed.as_secs_f64() * 1e3,
        ticks as f64 / elapsed.as_secs_f64().max(1e-9),
        sim.integrator_kernel().name(),
        sim.particle_count(),
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let _log_guard = configure_logging(&args, &config)?;
    install_panic_hook();
    info!(target: "runtime", "startup");

    if args.sysmon && args.source.is_some() {
        bail!("--sysmon and --source are mutually exclusive feeds");
    }

    match args.headless_ticks {
        Some(ticks) => run_headless(&args, config, ticks),
        None => run_interactive(args, config).await,
    }
}
