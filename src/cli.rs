use clap::Parser;
use std::path::PathBuf;

// Build version with frame format info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Frames: ", crate::config::SEQUENCE_COUNT, " x ", crate::config::FRAMES_PER_SEQUENCE, " WebP\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Headless scroll-driven frame animation driver
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Local mirror of the frame server (contains "Webp Sequence N" folders).
    /// Falls back to SCROLLPLAY_FRAMES_DIR.
    #[arg(value_name = "FRAMES_DIR")]
    pub frames_dir: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long = "width", value_name = "PX", default_value_t = 1280)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long = "height", value_name = "PX", default_value_t = 720)]
    pub height: u32,

    /// Number of scroll positions to sweep from top to bottom
    #[arg(short = 's', long = "steps", value_name = "N", default_value_t = 48)]
    pub steps: usize,

    /// Directory for PNG snapshots and the overlay log
    #[arg(short = 'o', long = "out", value_name = "DIR", default_value = "scrollplay_out")]
    pub out_dir: PathBuf,

    /// Loader threads (default: 3/4 of CPU cores)
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Bound the frame cache to N entries (default: keep every frame)
    #[arg(long = "cache-capacity", value_name = "N")]
    pub cache_capacity: Option<usize>,

    /// Refresh rate of the render loop
    #[arg(long = "fps", value_name = "HZ", default_value_t = 60)]
    pub fps: u32,

    /// Seconds to wait for the initial frames before giving up
    #[arg(long = "load-timeout", value_name = "SECS", default_value_t = 30)]
    pub load_timeout: u64,

    /// Enable debug logging to file (default: scrollplay.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Print the effective animation settings as JSON and exit
    #[arg(long = "print-config")]
    pub print_config: bool,
}
