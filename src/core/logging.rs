//! env_logger setup

/// Default filter; wgpu's internals are chatty at info level.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

fn builder(default_filter: &str) -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
}

/// Install the global logger. `RUST_LOG` overrides the default filter.
///
/// ```no_run
/// raybench::core::logging::init();
/// log::info!("Benchmark started");
/// ```
pub fn init() {
    builder(DEFAULT_FILTER).format_timestamp_millis().init();
}

/// Test variant; repeated calls are ignored.
pub fn init_for_tests() {
    let _ = builder("debug").is_test(true).try_init();
}
