//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context as _, Result};
use streamkey_encoder::{
    EncoderLauncher, EncodingOptions, StopHandle, StopOutcome, DEFAULT_PROGRAM,
};
use streamkey_session::credentials::{self, CookieFileStatus, CookieFileSummary};
use streamkey_session::{
    game_tag_id_by_name, CookieJar, FinishOutcome, IngestUrl, RoomClient, RoomOutcome,
    SessionConfig,
};
use streamkey_types::{
    topic_id_by_name, topic_name, EncoderState, Platform, StopReason, StreamRecord, TOPICS,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::store::{self, RunStore};
use crate::{CreateArgs, StreamArgs};

/// Settings shared by every subcommand.
pub struct Context {
    pub config_path: PathBuf,
    pub cookies_dir: PathBuf,
    pub store: RunStore,
    pub session: SessionConfig,
}

impl Context {
    /// The explicit credential file, or the first valid one on disk.
    fn select_cookies(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        credentials::first_valid(&self.cookies_dir)
            .with_context(|| format!("scanning {}", self.cookies_dir.display()))?
            .ok_or_else(|| {
                anyhow!(
                    "No valid cookies files found in {}",
                    self.cookies_dir.display()
                )
            })
    }

    fn client(&self, cookies: &Path) -> Result<RoomClient> {
        let account = cookies
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("Using account: {account}");
        println!("Cookies file: {}", cookies.display());

        RoomClient::from_cookie_file(cookies, self.session.clone())
            .with_context(|| format!("loading {}", cookies.display()))
    }

    /// Client for lookups that work without a session. Uses the explicit or
    /// first valid credential file if there is one, no cookies otherwise.
    fn lookup_client(&self, explicit: Option<PathBuf>) -> Result<RoomClient> {
        let cookies = match explicit {
            Some(path) => Some(path),
            None => credentials::first_valid(&self.cookies_dir)
                .with_context(|| format!("scanning {}", self.cookies_dir.display()))?,
        };

        match cookies {
            Some(path) => self.client(&path),
            None => {
                debug!("No credential file, sending lookup without cookies");
                RoomClient::new(CookieJar::default(), self.session.clone())
                    .context("building client")
            }
        }
    }
}

pub fn create(ctx: &Context, args: CreateArgs) -> Result<ExitCode> {
    let mut config = AppConfig::load(&ctx.config_path)?;

    if let Some(title) = args.title {
        config.title = Some(title);
    } else if let Some(path) = &args.random_title {
        let title = store::random_title(path)?;
        println!("Generated title: {title}");
        config.title = Some(title);
    }

    if let Some(topic) = &args.topic {
        let id = topic_id_by_name(TOPICS, topic).ok_or_else(|| {
            let names: Vec<&str> = TOPICS.iter().map(|t| t.name).collect();
            anyhow!(
                "Invalid topic '{topic}'. Valid options are: {}",
                names.join(", ")
            )
        })?;
        config.topic_id = Some(id.to_string());
    }

    if let Some(region) = args.region {
        config.priority_region = Some(region);
    }
    if args.replay {
        config.gen_replay = Some(true);
    }
    if args.no_close_room {
        config.close_room_when_close_stream = Some(false);
    }
    if args.age_restricted {
        config.age_restricted = Some(true);
    }
    if let Some(platform) = args.platform {
        config.platform = Some(Platform::try_from(platform)?);
    }
    if let Some(thumbnail) = args.thumbnail {
        config.cover_path = Some(thumbnail);
    }
    if let Some(openudid) = args.openudid {
        config.openudid = Some(openudid);
    }
    if let Some(device_id) = args.device_id {
        config.device_id = Some(device_id);
    }
    if let Some(iid) = args.iid {
        config.iid = Some(iid);
    }

    let cookies = ctx.select_cookies(args.cookies)?;
    let client = ctx.client(&cookies)?;

    if let Some(game) = &args.game {
        let tags = client.game_tags();
        let id = game_tag_id_by_name(&tags, game).ok_or_else(|| {
            anyhow!("Invalid game '{game}'. Use the games command to see available games.")
        })?;
        config.game_tag_id = Some(id.to_string());
    }

    if args.save_config {
        config.save(&ctx.config_path)?;
        println!("Config saved to {}", ctx.config_path.display());
    }

    let request = config.to_request();
    request.validate()?;

    ctx.store.save_last_cookies(&cookies)?;

    match client.create_room(&request).context("creating room")? {
        RoomOutcome::Created(room) => {
            println!("Stream created successfully!");
            println!("Server URL: {}", room.base_stream_url());
            println!("Stream Key: {}", room.stream_key());
            println!("Share URL: {}", room.share_url);
            println!();
            println!("RTMP URL:");
            println!("{}", room.ingest.full_url());

            let record = StreamRecord {
                title: request.title.clone(),
                base_stream_url: room.base_stream_url().to_string(),
                stream_key: room.stream_key().to_string(),
                stream_share_url: room.share_url.clone(),
                topic_id: request.topic_id.clone(),
                game_tag_id: request.game_tag_id.clone(),
                priority_region: request.priority_region.clone(),
                created_at: unix_seconds(),
            };
            let id = ctx.store.save_record(&record)?;
            println!("Saved as stream {id}");
            Ok(ExitCode::SUCCESS)
        }
        RoomOutcome::Rejected(rejection) => {
            eprintln!("Failed to create stream: {rejection}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn end(ctx: &Context, cookies: Option<PathBuf>) -> Result<ExitCode> {
    let cookies = match cookies.or_else(|| ctx.store.load_last_cookies()) {
        Some(path) => path,
        None => ctx.select_cookies(None)?,
    };
    let client = ctx.client(&cookies)?;

    match client.end_room().context("ending room")? {
        FinishOutcome::Finished => {
            println!("Stream ended successfully.");
            Ok(ExitCode::SUCCESS)
        }
        FinishOutcome::Rejected(rejection) => {
            eprintln!("Failed to end stream: {rejection}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn stream(args: StreamArgs) -> Result<ExitCode> {
    let url = if args.load_url {
        store::load_url(&args.url_file)?
            .ok_or_else(|| anyhow!("No RTMP URL found in {}", args.url_file.display()))?
    } else {
        args.rtmp_url.ok_or_else(|| {
            anyhow!("RTMP URL is required. Provide it as an argument or use --load-url")
        })?
    };

    if args.info {
        print_stream_info(&url);
        return Ok(ExitCode::SUCCESS);
    }

    if args.save_url {
        store::save_url(&args.url_file, &url)?;
        println!("RTMP URL saved to {}", args.url_file.display());
    }

    let options = EncodingOptions {
        program: args
            .ffmpeg_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
        video_codec: args.video_codec,
        preset: args.preset,
        maxrate: args.maxrate,
        bufsize: args.bufsize,
        audio_codec: args.audio_codec,
        audio_bitrate: args.audio_bitrate,
        loop_input: !args.no_loop,
    };

    println!("Starting stream with command:");
    println!("{}", options.command_line(&args.input, &url));
    println!("Press Ctrl+C to stop streaming...");

    let launcher = EncoderLauncher::new(options);
    install_signal_handler(launcher.stop_handle())?;

    let completed = launcher.start(&args.input, &url, |line| println!("{line}"))?;
    if completed {
        println!("Streaming completed successfully");
        return Ok(ExitCode::SUCCESS);
    }

    match launcher.state() {
        EncoderState::Stopped { reason } => {
            println!("{}", reason.message());
            Ok(ExitCode::SUCCESS)
        }
        state => {
            eprintln!("Streaming failed: {}", state.message());
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn list_cookies(ctx: &Context) -> Result<ExitCode> {
    let files = credentials::discover(&ctx.cookies_dir)
        .with_context(|| format!("scanning {}", ctx.cookies_dir.display()))?;
    if files.is_empty() {
        println!("No cookies files found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Cookies files in '{}':", ctx.cookies_dir.display());
    println!("{}", "-".repeat(50));
    for path in files {
        let summary = CookieFileSummary::inspect(&path);
        match &summary.status {
            CookieFileStatus::Valid {
                cookie_count,
                domains,
            } => {
                println!("{}", summary.file_name());
                println!("   Account: {}", summary.account_name());
                println!("   Size: {} bytes", summary.size);
                println!("   Cookies: {cookie_count}");
                if domains.is_empty() {
                    println!("   Domains: No domain info");
                } else {
                    println!("   Domains: {}", domains.join(", "));
                }
            }
            CookieFileStatus::InvalidFormat => {
                println!("{} (Invalid format)", summary.file_name());
                println!("   Size: {} bytes", summary.size);
            }
            CookieFileStatus::Unreadable(reason) => {
                println!("{} (Error reading: {reason})", summary.file_name());
            }
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

pub fn list_streams(ctx: &Context) -> Result<ExitCode> {
    let records = ctx.store.list()?;
    if records.is_empty() {
        println!("No saved streams.");
        return Ok(ExitCode::SUCCESS);
    }

    for (id, record) in records {
        let topic = topic_name(TOPICS, &record.topic_id).unwrap_or("Unknown");
        println!("[{id}] {} ({topic})", record.title);
        println!("   Server URL: {}", record.base_stream_url);
        println!("   Stream Key: {}", record.stream_key);
        println!("   Share URL: {}", record.stream_share_url);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn delete_stream(ctx: &Context, id: &str) -> Result<ExitCode> {
    if ctx.store.delete(id)? {
        println!("Stream {id} deleted.");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Stream {id} not found.");
        Ok(ExitCode::FAILURE)
    }
}

pub fn list_topics() -> Result<ExitCode> {
    for topic in TOPICS {
        println!("{:>3}  {}", topic.id, topic.name);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn list_games(ctx: &Context, cookies: Option<PathBuf>) -> Result<ExitCode> {
    let tags = ctx.lookup_client(cookies)?.game_tags();
    if tags.is_empty() {
        println!("No game tags available.");
        return Ok(ExitCode::FAILURE);
    }

    for tag in tags {
        println!("{:>8}  {}", tag.id, tag.show_name);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_stream_info(url: &str) {
    println!("Stream Information:");
    println!("  Full URL: {url}");
    match IngestUrl::parse(url) {
        Ok(ingest) => {
            println!("  Server: {}", ingest.base_url);
            println!("  Stream Key: {}", ingest.stream_key);
        }
        Err(e) => warn!("Could not split ingest URL: {}", e),
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Stop the encoder when an interrupt or terminate signal arrives.
fn install_signal_handler(handle: StopHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    thread::Builder::new()
        .name("signal".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let (sender, receiver) = mpsc::unbounded_channel();
                tokio::spawn(listen_for_signals(sender));
                relay_signals(&handle, receiver, |outcome| info!("{}", outcome.message())).await;
            });
        })
        .context("spawning signal thread")?;

    Ok(())
}

/// Turn every signal into a stop request, for as long as signals arrive.
///
/// A signal that lands before the encoder is running stops nothing, so the
/// relay keeps listening for the next one.
async fn relay_signals<F>(
    handle: &StopHandle,
    mut signals: mpsc::UnboundedReceiver<&'static str>,
    mut on_outcome: F,
) where
    F: FnMut(StopOutcome),
{
    while let Some(signal) = signals.recv().await {
        info!(signal, "Stopping stream...");
        on_outcome(handle.stop_for(StopReason::Signal));
    }
}

/// Forward interrupt and terminate signals by name.
async fn listen_for_signals(sender: mpsc::UnboundedSender<&'static str>) {
    #[cfg(unix)]
    let mut terminate =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                None
            }
        };

    loop {
        #[cfg(unix)]
        let terminated = async {
            if let Some(signal) = terminate.as_mut() {
                if signal.recv().await.is_some() {
                    return;
                }
            }
            std::future::pending::<()>().await
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        let name = tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => "SIGINT",
                Err(e) => {
                    error!("Failed to install Ctrl+C handler: {}", e);
                    return;
                }
            },
            () = terminated => "SIGTERM",
        };

        if sender.send(name).is_err() {
            return;
        }
    }
}
