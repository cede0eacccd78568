//! Benchmark configuration
//!
//! Loaded from an optional JSON file and then overridden by command line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Configuration for one benchmark run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Window / output width in pixels
    pub width: u32,
    /// Window / output height in pixels
    pub height: u32,
    /// Number of moving objects in the scene
    pub object_count: u32,
    /// Capacity reserved for per-frame instances (TLAS leaves)
    pub max_instances: u32,
    /// Wall-clock duration of the measured part of the run, in seconds
    pub duration_secs: f32,
    /// Frames rendered before measurements start
    pub warmup_frames: u32,
    /// Frames averaged into one measurement
    pub frames_per_measurement: u32,
    /// Trace compute dispatches issued per frame in full mode
    pub dispatches_per_frame: u32,
    /// Reduced dispatch count and trace resolution
    pub lightweight: bool,
    /// Maximum ray bounces evaluated by the trace shader
    pub max_bounces: u32,
    /// OBJ meshes to use instead of the built-in procedural set
    pub mesh_paths: Vec<PathBuf>,
    /// Directory holding px/nx/py/ny/pz/nz skybox faces
    pub skybox_dir: Option<PathBuf>,
    /// Name reported with the score
    pub username: String,
    /// Seed for object placement and motion
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            object_count: 24,
            max_instances: 256,
            duration_secs: 30.0,
            warmup_frames: 30,
            frames_per_measurement: 20,
            dispatches_per_frame: 2,
            lightweight: false,
            max_bounces: 3,
            mesh_paths: Vec::new(),
            skybox_dir: None,
            username: "anonymous".to_string(),
            seed: 1337,
        }
    }
}

impl BenchConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build configuration from command line arguments
    ///
    /// `--config <path>` is applied first, remaining flags override it.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = match parse_str_arg(args, "--config") {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    /// Apply command line overrides
    pub fn apply_args(&mut self, args: &[String]) {
        if args.iter().any(|a| a == "--lightweight") {
            self.lightweight = true;
        }
        if let Some(n) = parse_u32_arg(args, "--objects") {
            self.object_count = n;
        }
        if let Some(secs) = parse_f32_arg(args, "--duration") {
            self.duration_secs = secs;
        }
        if let Some(name) = parse_str_arg(args, "--user") {
            self.username = name;
        }
        if let Some((w, h)) = parse_size_arg(args) {
            self.width = w;
            self.height = h;
        }
        if let Some(seed) = parse_str_arg(args, "--seed").and_then(|s| s.parse().ok()) {
            self.seed = seed;
        }
        self.max_instances = self.max_instances.max(self.object_count).max(1);
    }

    /// Trace dispatches per frame, taking lightweight mode into account
    pub fn effective_dispatches(&self) -> u32 {
        if self.lightweight {
            1
        } else {
            self.dispatches_per_frame.max(1)
        }
    }

    /// Trace image resolution for a given output size
    pub fn trace_resolution(&self, width: u32, height: u32) -> (u32, u32) {
        if self.lightweight {
            ((width / 2).max(1), (height / 2).max(1))
        } else {
            (width.max(1), height.max(1))
        }
    }
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    parse_str_arg(args, flag).and_then(|s| s.parse().ok())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    parse_str_arg(args, flag).and_then(|s| s.parse().ok())
}

/// Parse `--size WxH`
fn parse_size_arg(args: &[String]) -> Option<(u32, u32)> {
    let value = parse_str_arg(args, "--size")?;
    let (w, h) = value.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = BenchConfig::default();
        config.apply_args(&args(&[
            "raybench", "--lightweight", "--objects", "40", "--size", "800x600", "--user", "ada",
        ]));
        assert!(config.lightweight);
        assert_eq!(config.object_count, 40);
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.username, "ada");
    }

    #[test]
    fn test_max_instances_covers_objects() {
        let mut config = BenchConfig::default();
        config.apply_args(&args(&["raybench", "--objects", "1000"]));
        assert_eq!(config.max_instances, 1000);
    }

    #[test]
    fn test_malformed_size_is_ignored() {
        let mut config = BenchConfig::default();
        config.apply_args(&args(&["raybench", "--size", "wide"]));
        assert_eq!((config.width, config.height), (1280, 720));
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "object_count": 7, "lightweight": true }}"#).unwrap();

        let config = BenchConfig::load(file.path()).unwrap();
        assert_eq!(config.object_count, 7);
        assert!(config.lightweight);
        assert_eq!(config.frames_per_measurement, 20);
    }

    #[test]
    fn test_lightweight_reduces_work() {
        let mut config = BenchConfig::default();
        assert_eq!(config.effective_dispatches(), 2);
        assert_eq!(config.trace_resolution(1280, 720), (1280, 720));

        config.lightweight = true;
        assert_eq!(config.effective_dispatches(), 1);
        assert_eq!(config.trace_resolution(1280, 720), (640, 360));
    }
}
