//! Encoder process launch and supervision.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use streamkey_types::{EncoderState, StopReason};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::error::EncoderError;
use crate::options::EncodingOptions;
use crate::{EncoderResult, OUTPUT_CHANNEL_CAPACITY, POLL_INTERVAL, STOP_TIMEOUT};

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The encoder exited after being asked to terminate.
    Graceful,

    /// The encoder did not exit in time and was killed.
    Forced,

    /// No encoder was running.
    NothingToStop,
}

impl StopOutcome {
    /// Get status message for the operator.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Graceful => "Stream stopped gracefully",
            Self::Forced => "Stream force stopped",
            Self::NothingToStop => "No active stream to stop",
        }
    }
}

/// State shared between the launcher and its stop handles.
struct Shared {
    /// The running encoder, if any. Held for the whole of a stop.
    child: Mutex<Option<Child>>,
    state: RwLock<EncoderState>,
    should_stop: AtomicBool,
    stop_timeout: Duration,
}

impl Shared {
    #[instrument(name = "encoder_stop", skip(self))]
    fn stop(&self, reason: StopReason) -> StopOutcome {
        let mut slot = self.child.lock();
        let Some(child) = slot.as_mut() else {
            info!("No active stream to stop");
            return StopOutcome::NothingToStop;
        };

        self.should_stop.store(true, Ordering::SeqCst);
        info!(pid = child.id(), "Stopping stream");

        let outcome = terminate(child, self.stop_timeout);
        slot.take();
        *self.state.write() = EncoderState::Stopped { reason };

        info!("{}", outcome.message());
        outcome
    }
}

/// Cloneable handle that can stop a running encoder from another thread.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Stop on operator request.
    pub fn stop(&self) -> StopOutcome {
        self.shared.stop(StopReason::UserRequested)
    }

    /// Stop for the given reason.
    pub fn stop_for(&self, reason: StopReason) -> StopOutcome {
        self.shared.stop(reason)
    }

    /// Check if an encoder is running.
    pub fn is_running(&self) -> bool {
        self.shared.child.lock().is_some()
    }
}

/// Launches one encoder process at a time and supervises it.
pub struct EncoderLauncher {
    options: EncodingOptions,
    shared: Arc<Shared>,
}

impl EncoderLauncher {
    /// Create a launcher with the given options.
    pub fn new(options: EncodingOptions) -> Self {
        Self::with_stop_timeout(options, STOP_TIMEOUT)
    }

    /// Create a launcher that gives a terminated encoder `stop_timeout`
    /// before killing it.
    pub fn with_stop_timeout(options: EncodingOptions, stop_timeout: Duration) -> Self {
        Self {
            options,
            shared: Arc::new(Shared {
                child: Mutex::new(None),
                state: RwLock::new(EncoderState::Idle),
                should_stop: AtomicBool::new(false),
                stop_timeout,
            }),
        }
    }

    /// Get a handle for stopping the encoder from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> EncoderState {
        self.shared.state.read().clone()
    }

    /// Check if an encoder is running.
    pub fn is_running(&self) -> bool {
        self.shared.child.lock().is_some()
    }

    /// Run the encoder until it exits or is stopped.
    ///
    /// Each diagnostic line is passed to `on_line` as it arrives. Returns
    /// `Ok(true)` only if the encoder exited with status zero; a stop or a
    /// nonzero exit is `Ok(false)`. A missing input fails before anything
    /// is spawned.
    #[instrument(name = "encoder_start", skip(self, ingest_url, on_line), fields(input = %input.display()))]
    pub fn start<F>(&self, input: &Path, ingest_url: &str, mut on_line: F) -> EncoderResult<bool>
    where
        F: FnMut(&str),
    {
        if self.is_running() {
            return Err(EncoderError::AlreadyRunning);
        }
        if !input.exists() {
            return Err(EncoderError::InputNotFound(input.to_path_buf()));
        }
        let server = Url::parse(ingest_url)
            .map_err(|e| EncoderError::InvalidUrl(e.to_string()))?
            .host_str()
            .unwrap_or_default()
            .to_string();

        let program = self.options.program.display().to_string();
        debug!(command = %self.options.command_line(input, ingest_url), "Launching encoder");

        let spawned = Command::new(&self.options.program)
            .args(self.options.build_args(input, ingest_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let err = if e.kind() == io::ErrorKind::NotFound {
                    EncoderError::ExecutableNotFound(program)
                } else {
                    EncoderError::LaunchFailed(e.to_string())
                };
                error!("{}", err);
                *self.shared.state.write() = EncoderState::Failed {
                    code: None,
                    message: err.to_string(),
                };
                return Err(err);
            }
        };

        let pid = child.id();
        let (sender, receiver) = crossbeam_channel::bounded(OUTPUT_CHANNEL_CAPACITY);
        if let Some(stderr) = child.stderr.take() {
            let reader = thread::Builder::new()
                .name("encoder-output".to_string())
                .spawn(move || forward_lines(stderr, sender));

            if let Err(e) = reader {
                error!("Failed to start output reader: {}", e);
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncoderError::Io(e));
            }
        }

        self.shared.should_stop.store(false, Ordering::SeqCst);
        *self.shared.child.lock() = Some(child);
        *self.shared.state.write() = EncoderState::Running { pid };
        info!(pid, %server, "Stream started");

        let exit = match self.supervise(&receiver, &mut on_line) {
            Ok(exit) => exit,
            Err(e) => {
                error!("Lost track of encoder: {}", e);
                *self.shared.state.write() = EncoderState::Failed {
                    code: None,
                    message: e.to_string(),
                };
                return Err(e);
            }
        };
        drain(&receiver, &mut on_line);

        let Some(status) = exit else {
            return Ok(false);
        };

        if status.success() {
            info!("Stream completed successfully");
            *self.shared.state.write() = EncoderState::Completed;
            Ok(true)
        } else {
            let state = EncoderState::Failed {
                code: status.code(),
                message: status.to_string(),
            };
            warn!("{}", state.message());
            *self.shared.state.write() = state;
            Ok(false)
        }
    }

    /// Stop the running encoder on operator request.
    ///
    /// Calling it with nothing running is a no-op that reports
    /// [`StopOutcome::NothingToStop`].
    pub fn stop(&self) -> StopOutcome {
        self.shared.stop(StopReason::UserRequested)
    }

    /// Poll output and liveness until the encoder exits (`Some`) or is
    /// stopped (`None`).
    fn supervise<F>(
        &self,
        receiver: &Receiver<String>,
        on_line: &mut F,
    ) -> EncoderResult<Option<ExitStatus>>
    where
        F: FnMut(&str),
    {
        let mut output_open = true;

        loop {
            if output_open {
                match receiver.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => on_line(&line),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        debug!("Encoder output closed");
                        output_open = false;
                    }
                }
            } else {
                thread::sleep(POLL_INTERVAL);
            }

            // Blocks while a stop is in progress.
            let mut slot = self.shared.child.lock();
            if self.shared.should_stop.load(Ordering::SeqCst) {
                return Ok(None);
            }
            let Some(child) = slot.as_mut() else {
                return Ok(None);
            };

            if let Some(status) = child.try_wait()? {
                slot.take();
                return Ok(Some(status));
            }
        }
    }
}

impl Drop for EncoderLauncher {
    fn drop(&mut self) {
        if self.is_running() {
            self.shared.stop(StopReason::UserRequested);
        }
    }
}

/// Forward each line of `stream` until it closes or the receiver is gone.
///
/// Progress lines end in `\r` rather than `\n`; both end a line.
fn forward_lines<R: Read>(stream: R, sender: Sender<String>) {
    let reader = BufReader::new(stream);
    for chunk in reader.split(b'\n') {
        let Ok(chunk) = chunk else {
            break;
        };
        for part in chunk.split(|&b| b == b'\r') {
            let line = String::from_utf8_lossy(part);
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if sender.send(line.to_string()).is_err() {
                return;
            }
        }
    }
}

/// Pass on output that is still buffered, without waiting on a stream that
/// another process may hold open.
fn drain<F: FnMut(&str)>(receiver: &Receiver<String>, on_line: &mut F) {
    while let Ok(line) = receiver.recv_timeout(POLL_INTERVAL) {
        on_line(&line);
    }
}

/// Ask `child` to exit, then kill it if it is still alive after `timeout`.
fn terminate(child: &mut Child, timeout: Duration) -> StopOutcome {
    if request_exit(child) && wait_for_exit(child, timeout) {
        return StopOutcome::Graceful;
    }

    warn!("Force killing stream");
    if let Err(e) = child.kill() {
        warn!("Kill failed: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Wait after kill failed: {}", e);
    }
    StopOutcome::Forced
}

#[cfg(unix)]
fn request_exit(child: &Child) -> bool {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child that has not been reaped.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child) -> bool {
    false
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to poll encoder: {}", e);
                return false;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL.min(timeout));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stop_without_process() {
        let launcher = EncoderLauncher::new(EncodingOptions::default());
        assert_eq!(launcher.stop(), StopOutcome::NothingToStop);
        assert_eq!(launcher.stop(), StopOutcome::NothingToStop);
        assert!(launcher.state().is_idle());
    }

    #[test]
    fn test_missing_input_spawns_nothing() {
        let launcher = EncoderLauncher::new(EncodingOptions {
            program: "/nonexistent/encoder".into(),
            ..Default::default()
        });

        let result = launcher.start(
            Path::new("/nonexistent/input.mp4"),
            "rtmp://host/app/key",
            |_| {},
        );
        assert!(matches!(result, Err(EncoderError::InputNotFound(_))));
        assert!(launcher.state().is_idle());
    }

    #[test]
    fn test_forward_lines_splits_progress() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let output = b"ffmpeg version 6\nframe=1 fps=0\rframe=2 fps=30\r\n\nend\n".to_vec();

        forward_lines(Cursor::new(output), sender);

        let lines: Vec<String> = receiver.try_iter().collect();
        assert_eq!(
            lines,
            ["ffmpeg version 6", "frame=1 fps=0", "frame=2 fps=30", "end"]
        );
    }

    #[test]
    fn test_stop_outcome_messages() {
        assert_eq!(StopOutcome::Graceful.message(), "Stream stopped gracefully");
        assert_eq!(StopOutcome::NothingToStop.message(), "No active stream to stop");
    }
}
