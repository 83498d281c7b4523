//! Command-line harness.
//!
//! Creates or ends a live room with a saved browser session, and pushes a
//! local file to the room's ingest URL through FFmpeg.

mod commands;
mod config;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use streamkey_encoder::Preset;
use streamkey_session::{SessionConfig, DEFAULT_TIMEOUT_SECS};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "streamkey")]
#[command(about = "Live room stream key generator and FFmpeg streamer", long_about = None)]
struct Cli {
    /// Log at debug level instead of info (RUST_LOG, when set, wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Room settings file
    #[arg(long, env = "STREAMKEY_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    /// Directory containing credential (cookie) files
    #[arg(long, env = "STREAMKEY_COOKIES_DIR", default_value = "cookies", global = true)]
    cookies_dir: PathBuf,

    /// Directory for stream records and the last-used credential pointer
    #[arg(long, env = "STREAMKEY_DATA_DIR", default_value = ".", global = true)]
    data_dir: PathBuf,

    /// HTTP request timeout in seconds
    #[arg(long, env = "STREAMKEY_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a room and print its ingest URL
    Create(CreateArgs),

    /// End the active room
    End {
        /// Credential file (default: the one used last)
        #[arg(long, env = "STREAMKEY_COOKIES")]
        cookies: Option<PathBuf>,
    },

    /// Push a local file to an ingest URL with FFmpeg
    Stream(StreamArgs),

    /// List credential files
    Cookies,

    /// List saved stream records
    Streams,

    /// Delete a saved stream record
    DeleteStream {
        /// Record id, as shown by `streams`
        id: String,
    },

    /// List topics
    Topics,

    /// List game tags
    Games {
        /// Credential file (default: first valid in the cookies directory)
        #[arg(long, env = "STREAMKEY_COOKIES")]
        cookies: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Room title
    #[arg(long)]
    title: Option<String>,

    /// Pick the title at random from the lines of this file
    #[arg(long, conflicts_with = "title")]
    random_title: Option<PathBuf>,

    /// Topic name (see `topics`)
    #[arg(long)]
    topic: Option<String>,

    /// Game name, required for the Gaming topic (see `games`)
    #[arg(long)]
    game: Option<String>,

    /// Priority region, e.g. US
    #[arg(long)]
    region: Option<String>,

    /// Generate a replay after the room ends
    #[arg(long)]
    replay: bool,

    /// Keep the room open when the ingest stream closes
    #[arg(long)]
    no_close_room: bool,

    /// Mark the room as age restricted
    #[arg(long)]
    age_restricted: bool,

    /// Client profile: 0 studio, 1 mobile camera, 2 mobile screenshare
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    platform: Option<u8>,

    /// Cover image
    #[arg(long)]
    thumbnail: Option<PathBuf>,

    /// OpenUDID for the mobile profiles
    #[arg(long, env = "STREAMKEY_OPENUDID")]
    openudid: Option<String>,

    /// Device id for the mobile profiles
    #[arg(long, env = "STREAMKEY_DEVICE_ID")]
    device_id: Option<String>,

    /// Install id for the mobile profiles
    #[arg(long, env = "STREAMKEY_IID")]
    iid: Option<String>,

    /// Credential file (default: first valid in the cookies directory)
    #[arg(long, env = "STREAMKEY_COOKIES")]
    cookies: Option<PathBuf>,

    /// Write the merged settings back to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Video file or other input FFmpeg can read
    input: PathBuf,

    /// Ingest URL (server and key)
    #[arg(env = "STREAMKEY_RTMP_URL")]
    rtmp_url: Option<String>,

    /// Video codec
    #[arg(long, default_value = "libx264")]
    video_codec: String,

    /// Encoder speed preset
    #[arg(long, default_value_t = Preset::Veryfast)]
    preset: Preset,

    /// Maximum video bitrate
    #[arg(long, default_value = "3000k")]
    maxrate: String,

    /// Rate control buffer size
    #[arg(long, default_value = "6000k")]
    bufsize: String,

    /// Audio codec
    #[arg(long, default_value = "aac")]
    audio_codec: String,

    /// Audio bitrate
    #[arg(long, default_value = "128k")]
    audio_bitrate: String,

    /// Play the input once instead of looping it
    #[arg(long)]
    no_loop: bool,

    /// FFmpeg executable
    #[arg(long, env = "FFMPEG_PATH")]
    ffmpeg_path: Option<PathBuf>,

    /// Read the ingest URL from the URL file
    #[arg(long)]
    load_url: bool,

    /// Write the ingest URL to the URL file
    #[arg(long)]
    save_url: bool,

    /// File used by --load-url and --save-url
    #[arg(long, default_value = "rtmp_url.txt")]
    url_file: PathBuf,

    /// Print the server/key split of the ingest URL and exit
    #[arg(long)]
    info: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .init();

    debug!(?cli, "Parsed arguments");

    let ctx = commands::Context {
        config_path: cli.config,
        cookies_dir: cli.cookies_dir,
        store: store::RunStore::new(cli.data_dir),
        session: SessionConfig::default().with_timeout(Duration::from_secs(cli.timeout)),
    };

    match cli.command {
        Command::Create(args) => commands::create(&ctx, args),
        Command::End { cookies } => commands::end(&ctx, cookies),
        Command::Stream(args) => commands::stream(args),
        Command::Cookies => commands::list_cookies(&ctx),
        Command::Streams => commands::list_streams(&ctx),
        Command::DeleteStream { id } => commands::delete_stream(&ctx, &id),
        Command::Topics => commands::list_topics(),
        Command::Games { cookies } => commands::list_games(&ctx, cookies),
    }
}

/// RUST_LOG if it is set and parses, otherwise info (debug with `--verbose`).
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}
