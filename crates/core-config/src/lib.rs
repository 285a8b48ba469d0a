//! Configuration loading and parsing.
//!
//! Parses `ember.toml` (or an override path provided by the binary) into
//! a tolerant [`ConfigFile`]: every table and field has a default, and
//! unknown fields are ignored so configs survive version skew in both
//! directions. Effective values that depend on runtime context (terminal
//! geometry) are clamped in [`Config::apply_context`]; the raw parsed
//! values are retained so a resize can re-clamp.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// Runtime context the effective values are clamped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub terminal_columns: u16,
    pub terminal_rows: u16,
    /// Rows reserved for the HUD at the top of the frame.
    pub hud_rows: u16,
}

impl ConfigContext {
    pub fn new(terminal_columns: u16, terminal_rows: u16, hud_rows: u16) -> Self {
        Self {
            terminal_columns,
            terminal_rows,
            hud_rows,
        }
    }

    /// Rows left for the simulation world.
    pub fn world_rows(&self) -> u16 {
        self.terminal_rows.saturating_sub(self.hud_rows)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PhysicsConfig {
    #[serde(default = "PhysicsConfig::default_gravity")]
    pub gravity: f32,
    #[serde(default)]
    pub wind_x: f32,
    #[serde(default)]
    pub wind_y: f32,
    #[serde(default = "PhysicsConfig::default_collisions")]
    pub collisions: bool,
    #[serde(default = "PhysicsConfig::default_collision_radius")]
    pub collision_radius: f32,
    #[serde(default = "PhysicsConfig::default_restitution")]
    pub restitution: f32,
    #[serde(default = "PhysicsConfig::default_friction")]
    pub friction: f32,
}

impl PhysicsConfig {
    fn default_gravity() -> f32 {
        30.0
    }
    fn default_collisions() -> bool {
        false
    }
    fn default_collision_radius() -> f32 {
        1.0
    }
    fn default_restitution() -> f32 {
        0.8
    }
    fn default_friction() -> f32 {
        0.95
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Self::default_gravity(),
            wind_x: 0.0,
            wind_y: 0.0,
            collisions: Self::default_collisions(),
            collision_radius: Self::default_collision_radius(),
            restitution: Self::default_restitution(),
            friction: Self::default_friction(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Speed,
    Energy,
    Fixed,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_glyph")]
    pub glyph: char,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default = "RenderConfig::default_fixed_color")]
    pub fixed_color: u32,
}

impl RenderConfig {
    fn default_glyph() -> char {
        '●'
    }
    fn default_fixed_color() -> u32 {
        0x00C8FF
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            glyph: Self::default_glyph(),
            color_mode: ColorMode::default(),
            fixed_color: Self::default_fixed_color(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SimTable {
    #[serde(default = "SimTable::default_particles")]
    pub particles: usize,
    #[serde(default = "SimTable::default_target_fps")]
    pub target_fps: u32,
}

impl SimTable {
    fn default_particles() -> usize {
        2000
    }
    fn default_target_fps() -> u32 {
        60
    }
}

impl Default for SimTable {
    fn default() -> Self {
        Self {
            particles: Self::default_particles(),
            target_fps: Self::default_target_fps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DataConfig {
    #[serde(default = "DataConfig::default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "DataConfig::default_max_columns")]
    pub max_columns: usize,
    #[serde(default = "DataConfig::default_max_line_len")]
    pub max_line_len: usize,
}

impl DataConfig {
    fn default_max_rows() -> usize {
        1000
    }
    fn default_max_columns() -> usize {
        10
    }
    fn default_max_line_len() -> usize {
        1024
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            max_rows: Self::default_max_rows(),
            max_columns: Self::default_max_columns(),
            max_line_len: Self::default_max_line_len(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct SysmonConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "SysmonConfig::default_interval_ms")]
    pub interval_ms: u64,
}

impl SysmonConfig {
    fn default_interval_ms() -> u64 {
        1000
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct LogConfig {
    /// EnvFilter directive, e.g. "info" or "sim=debug,info".
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sim: SimTable,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub sysmon: SysmonConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Original file text, retained for diagnostics.
    pub raw: Option<String>,
    pub file: ConfigFile,
    /// Particle capacity clamped against the world size.
    pub effective_particles: usize,
    pub effective_fps: u32,
}

impl Config {
    /// Clamp context-dependent values. Particle capacity is bounded by
    /// four particles per world cell so a tiny terminal cannot be asked
    /// to host tens of thousands of live particles; fps is bounded to
    /// something a terminal can plausibly sustain.
    pub fn apply_context(&mut self, ctx: ConfigContext) {
        let cells = ctx.terminal_columns as usize * ctx.world_rows() as usize;
        let particle_cap = (cells * 4).max(64);
        self.effective_particles = self.file.sim.particles.clamp(1, particle_cap);
        self.effective_fps = self.file.sim.target_fps.clamp(1, 240);
    }
}

/// Search order: explicit override, `./ember.toml`, then the user config
/// directory (`<config>/ember/ember.toml`). Absence is not an error; a
/// malformed file is.
pub fn load_from(override_path: Option<PathBuf>) -> Result<Config> {
    let candidate = override_path.or_else(discover);
    let Some(path) = candidate else {
        info!(target: "config", "no config file found, using defaults");
        return Ok(Config::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(target: "config", path = %path.display(), "config loaded");
    Ok(Config {
        raw: Some(raw),
        file,
        effective_particles: 0,
        effective_fps: 0,
    })
}

fn discover() -> Option<PathBuf> {
    let local = PathBuf::from("ember.toml");
    if local.is_file() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("ember").join("ember.toml");
    user.is_file().then_some(user)
}
