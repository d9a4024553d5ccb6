//! Parsing and rendering of `config.ini`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::debug;

use crate::collab::{
    CanvasSizing, ContextConfig, DetectionMode, MarkerKind, MatrixCodeType, PoseWriteMode,
    SmoothingConfig, SourceConfig, SourceKind, TrackerConfig,
};
use crate::error::ConfigError;
use crate::lifecycle::{ControllerConfig, ResizePolicy, DEFAULT_RESIZE_QUIET, DEFAULT_RETRY_DELAY};
use crate::logging::LoggingConfig;
use crate::render_loop::{RenderConfig, MAX_FRAME_RATE};
use crate::scene::Dimensions;
use crate::sim::{MarkerVisibility, SimConfig};

use super::config_file_path;

/// Commented configuration file containing every key at its default.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"; ARSession configuration
;
; Every key is optional. Durations are in milliseconds.

[source]
; webcam, image or video
type = webcam
; media file for image/video sources
url =
; requested resolution; the long side follows the viewport's orientation
long_side = 640
short_side = 480

[context]
; camera calibration file, empty for built-in parameters
camera_parameters =
; color, color_and_matrix, mono, mono_and_matrix
detection_mode = mono_and_matrix
; 3x3, 3x3_hamming63, 3x3_parity65, 4x4, 4x4_bch_13_9_3, 4x4_bch_13_5_5
matrix_code_type = 3x3
pattern_ratio = 0.5
; "source" to match the video frames, or WIDTHxHEIGHT
canvas = source

[marker]
; barcode or pattern
type = barcode
value = 0
; .patt file for pattern markers
url =
smooth = true
smooth_count = 5
smooth_tolerance = 0.01
smooth_threshold = 2
; camera_transform or model_view
pose_mode = camera_transform

[lifecycle]
wait_for_first_frame = true
; reinit or recompute
resize_policy = reinit
resize_quiet_ms = 1000
; empty waits forever
init_timeout_ms =
init_attempts = 1
retry_delay_ms = 2000

[render]
; 1 to 1000
frame_rate = 60
max_delta_ms = 200

[logging]
; filter directive; RUST_LOG overrides it
level = info
; directory for daily log files, empty for stderr only
directory =
file_prefix = arsession.log

[simulation]
ready_delay_ms = 100
first_frame_delay_ms = 50
context_delay_ms = 200
; WIDTHxHEIGHT the simulated camera delivers, empty to honor the request
native_resolution =
never_ready = false
failing_sources = 0
; always, never or cycle
visibility = always
cycle_period = 120
cycle_visible = 90
"#;

/// The `[lifecycle]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub wait_for_first_frame: bool,
    pub resize_policy: ResizePolicy,
    pub resize_quiet: Duration,
    pub init_timeout: Option<Duration>,
    pub init_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            wait_for_first_frame: true,
            resize_policy: ResizePolicy::FullReinit,
            resize_quiet: DEFAULT_RESIZE_QUIET,
            init_timeout: None,
            init_attempts: 1,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub source: SourceConfig,
    pub context: ContextConfig,
    pub tracker: TrackerConfig,
    pub lifecycle: LifecycleSettings,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
    pub simulation: SimConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            context: ContextConfig::default(),
            tracker: TrackerConfig::default(),
            lifecycle: LifecycleSettings::default(),
            render: RenderConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let reader = SectionReader { ini: &ini };
        let defaults = Self::default();

        Ok(Self {
            source: reader.source(defaults.source)?,
            context: reader.context(defaults.context)?,
            tracker: reader.tracker(defaults.tracker)?,
            lifecycle: reader.lifecycle(defaults.lifecycle)?,
            render: reader.render(defaults.render)?,
            logging: reader.logging(defaults.logging)?,
            simulation: reader.simulation(defaults.simulation)?,
        })
    }

    /// Controller settings assembled from `[source]`, `[context]`,
    /// `[marker]` and `[lifecycle]`.
    pub fn controller_config(&self) -> ControllerConfig {
        let lifecycle = &self.lifecycle;
        ControllerConfig::default()
            .with_source(self.source.clone())
            .with_context(self.context.clone())
            .with_tracker(self.tracker.clone())
            .with_wait_for_first_frame(lifecycle.wait_for_first_frame)
            .with_resize_policy(lifecycle.resize_policy)
            .with_resize_quiet(lifecycle.resize_quiet)
            .with_init_timeout(lifecycle.init_timeout)
            .with_retry(lifecycle.init_attempts, lifecycle.retry_delay)
    }

    /// Simulation settings with the configured marker placed in view.
    pub fn sim_config(&self) -> SimConfig {
        self.simulation
            .clone()
            .with_marker(self.tracker.marker.clone())
    }

    /// Render the effective configuration as INI text.
    pub fn to_ini_string(&self) -> Result<String, ConfigError> {
        let mut ini = Ini::new();

        ini.with_section(Some("source"))
            .set("type", self.source.kind.name())
            .set("url", self.source.kind.url().unwrap_or(""))
            .set("long_side", self.source.long_side.to_string())
            .set("short_side", self.source.short_side.to_string());

        let context = &self.context;
        ini.with_section(Some("context"))
            .set(
                "camera_parameters",
                context
                    .camera_parameters
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            )
            .set("detection_mode", context.detection_mode.as_str())
            .set("matrix_code_type", context.matrix_code_type.as_str())
            .set("pattern_ratio", context.pattern_ratio.to_string())
            .set("canvas", context.canvas.to_string());

        let tracker = &self.tracker;
        let (value, url) = match &tracker.marker {
            MarkerKind::Barcode { value } => (value.to_string(), String::new()),
            MarkerKind::Pattern { url } => (String::new(), url.clone()),
        };
        ini.with_section(Some("marker"))
            .set("type", tracker.marker.type_name())
            .set("value", value)
            .set("url", url)
            .set("smooth", tracker.smoothing.enabled.to_string())
            .set("smooth_count", tracker.smoothing.count.to_string())
            .set("smooth_tolerance", tracker.smoothing.tolerance.to_string())
            .set("smooth_threshold", tracker.smoothing.threshold.to_string())
            .set("pose_mode", tracker.pose_mode.as_str());

        let lifecycle = &self.lifecycle;
        ini.with_section(Some("lifecycle"))
            .set(
                "wait_for_first_frame",
                lifecycle.wait_for_first_frame.to_string(),
            )
            .set("resize_policy", lifecycle.resize_policy.as_str())
            .set("resize_quiet_ms", millis(lifecycle.resize_quiet))
            .set(
                "init_timeout_ms",
                lifecycle.init_timeout.map(millis).unwrap_or_default(),
            )
            .set("init_attempts", lifecycle.init_attempts.to_string())
            .set("retry_delay_ms", millis(lifecycle.retry_delay));

        ini.with_section(Some("render"))
            .set("frame_rate", self.render.frame_rate.to_string())
            .set("max_delta_ms", millis(self.render.max_delta));

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            )
            .set("file_prefix", self.logging.file_prefix.as_str());

        let sim = &self.simulation;
        let (visibility, period, visible) = match sim.visibility {
            MarkerVisibility::Always => ("always", 120, 90),
            MarkerVisibility::Never => ("never", 120, 90),
            MarkerVisibility::Cycle { period, visible } => ("cycle", period, visible),
        };
        ini.with_section(Some("simulation"))
            .set("ready_delay_ms", millis(sim.ready_delay))
            .set("first_frame_delay_ms", millis(sim.first_frame_delay))
            .set("context_delay_ms", millis(sim.context_delay))
            .set(
                "native_resolution",
                sim.native_resolution
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            )
            .set("never_ready", sim.never_ready.to_string())
            .set("failing_sources", sim.failing_sources.to_string())
            .set("visibility", visibility)
            .set("cycle_period", period.to_string())
            .set("cycle_visible", visible.to_string());

        let mut buf = Vec::new();
        ini.write_to(&mut buf).map_err(ConfigError::Render)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

// =============================================================================
// Section readers
// =============================================================================

/// Typed access to INI values. Empty values count as absent.
struct SectionReader<'a> {
    ini: &'a Ini,
}

impl<'a> SectionReader<'a> {
    fn section(&self, name: &str) -> Option<&'a Properties> {
        self.ini.section(Some(name))
    }

    fn raw(&self, section: &str, key: &str) -> Option<&'a str> {
        self.section(section)
            .and_then(|props| props.get(key))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| invalid(section, key, value)),
        }
    }

    fn flag(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(invalid(section, key, value)),
            },
        }
    }

    fn duration_ms(&self, section: &str, key: &str) -> Result<Option<Duration>, ConfigError> {
        Ok(self
            .parse::<u64>(section, key)?
            .map(Duration::from_millis))
    }

    fn source(&self, mut config: SourceConfig) -> Result<SourceConfig, ConfigError> {
        const S: &str = "source";
        if let Some(name) = self.raw(S, "type") {
            config.kind = SourceKind::from_parts(name, self.raw(S, "url"))
                .ok_or_else(|| invalid(S, "type", name))?;
        }
        if let Some(long_side) = self.parse(S, "long_side")? {
            config.long_side = long_side;
        }
        if let Some(short_side) = self.parse(S, "short_side")? {
            config.short_side = short_side;
        }
        if config.long_side == 0 || config.short_side == 0 {
            return Err(invalid(
                S,
                "long_side",
                &format!("{}x{}", config.long_side, config.short_side),
            ));
        }
        Ok(config)
    }

    fn context(&self, mut config: ContextConfig) -> Result<ContextConfig, ConfigError> {
        const S: &str = "context";
        if let Some(path) = self.raw(S, "camera_parameters") {
            config.camera_parameters = Some(PathBuf::from(path));
        }
        if let Some(mode) = self.parse::<DetectionMode>(S, "detection_mode")? {
            config.detection_mode = mode;
        }
        if let Some(code) = self.parse::<MatrixCodeType>(S, "matrix_code_type")? {
            config.matrix_code_type = code;
        }
        if let Some(ratio) = self.parse::<f64>(S, "pattern_ratio")? {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(invalid(S, "pattern_ratio", &ratio.to_string()));
            }
            config.pattern_ratio = ratio;
        }
        if let Some(canvas) = self.parse::<CanvasSizing>(S, "canvas")? {
            config.canvas = canvas;
        }
        Ok(config)
    }

    fn tracker(&self, mut config: TrackerConfig) -> Result<TrackerConfig, ConfigError> {
        const S: &str = "marker";
        if let Some(kind) = self.raw(S, "type") {
            config.marker = match kind.to_lowercase().as_str() {
                "barcode" => MarkerKind::Barcode {
                    value: self.parse(S, "value")?.unwrap_or(0),
                },
                "pattern" => MarkerKind::Pattern {
                    url: self
                        .raw(S, "url")
                        .ok_or_else(|| invalid(S, "url", ""))?
                        .to_string(),
                },
                _ => return Err(invalid(S, "type", kind)),
            };
        } else if let Some(value) = self.parse(S, "value")? {
            config.marker = MarkerKind::Barcode { value };
        }

        let smoothing: &mut SmoothingConfig = &mut config.smoothing;
        if let Some(enabled) = self.flag(S, "smooth")? {
            smoothing.enabled = enabled;
        }
        if let Some(count) = self.parse::<usize>(S, "smooth_count")? {
            if count == 0 {
                return Err(invalid(S, "smooth_count", "0"));
            }
            smoothing.count = count;
        }
        if let Some(tolerance) = self.parse(S, "smooth_tolerance")? {
            smoothing.tolerance = tolerance;
        }
        if let Some(threshold) = self.parse(S, "smooth_threshold")? {
            smoothing.threshold = threshold;
        }
        if let Some(mode) = self.parse::<PoseWriteMode>(S, "pose_mode")? {
            config.pose_mode = mode;
        }
        Ok(config)
    }

    fn lifecycle(&self, mut config: LifecycleSettings) -> Result<LifecycleSettings, ConfigError> {
        const S: &str = "lifecycle";
        if let Some(wait) = self.flag(S, "wait_for_first_frame")? {
            config.wait_for_first_frame = wait;
        }
        if let Some(policy) = self.parse(S, "resize_policy")? {
            config.resize_policy = policy;
        }
        if let Some(quiet) = self.duration_ms(S, "resize_quiet_ms")? {
            config.resize_quiet = quiet;
        }
        if let Some(timeout) = self.duration_ms(S, "init_timeout_ms")? {
            config.init_timeout = Some(timeout).filter(|t| !t.is_zero());
        }
        if let Some(attempts) = self.parse::<u32>(S, "init_attempts")? {
            if attempts == 0 {
                return Err(invalid(S, "init_attempts", "0"));
            }
            config.init_attempts = attempts;
        }
        if let Some(delay) = self.duration_ms(S, "retry_delay_ms")? {
            config.retry_delay = delay;
        }
        Ok(config)
    }

    fn render(&self, mut config: RenderConfig) -> Result<RenderConfig, ConfigError> {
        const S: &str = "render";
        if let Some(rate) = self.parse::<u32>(S, "frame_rate")? {
            if rate == 0 || rate > MAX_FRAME_RATE {
                return Err(invalid(S, "frame_rate", &rate.to_string()));
            }
            config.frame_rate = rate;
        }
        if let Some(max_delta) = self.duration_ms(S, "max_delta_ms")? {
            config.max_delta = max_delta;
        }
        Ok(config)
    }

    fn logging(&self, mut config: LoggingConfig) -> Result<LoggingConfig, ConfigError> {
        const S: &str = "logging";
        if let Some(level) = self.raw(S, "level") {
            config.level = level.to_string();
        }
        if let Some(dir) = self.raw(S, "directory") {
            config.directory = Some(PathBuf::from(dir));
        }
        if let Some(prefix) = self.raw(S, "file_prefix") {
            config.file_prefix = prefix.to_string();
        }
        Ok(config)
    }

    fn simulation(&self, mut config: SimConfig) -> Result<SimConfig, ConfigError> {
        const S: &str = "simulation";
        if let Some(delay) = self.duration_ms(S, "ready_delay_ms")? {
            config.ready_delay = delay;
        }
        if let Some(delay) = self.duration_ms(S, "first_frame_delay_ms")? {
            config.first_frame_delay = delay;
        }
        if let Some(delay) = self.duration_ms(S, "context_delay_ms")? {
            config.context_delay = delay;
        }
        if let Some(resolution) = self.parse::<Dimensions>(S, "native_resolution")? {
            config.native_resolution = Some(resolution);
        }
        if let Some(never_ready) = self.flag(S, "never_ready")? {
            config.never_ready = never_ready;
        }
        if let Some(failing) = self.parse(S, "failing_sources")? {
            config.failing_sources = failing;
        }
        if let Some(visibility) = self.raw(S, "visibility") {
            config.visibility = match visibility.to_lowercase().as_str() {
                "always" => MarkerVisibility::Always,
                "never" => MarkerVisibility::Never,
                "cycle" => MarkerVisibility::Cycle {
                    period: self.parse(S, "cycle_period")?.unwrap_or(120),
                    visible: self.parse(S, "cycle_visible")?.unwrap_or(90),
                },
                _ => return Err(invalid(S, "visibility", visibility)),
            };
        }
        Ok(config)
    }
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}
