//! ffmpeg-backed worker.
//!
//! The command line mirrors what HomeKit viewers expect from an H.264
//! camera: a zero-latency libx264 encode scaled to the negotiated size,
//! packetized as RTP payload type 99 and encrypted with
//! `AES_CM_128_HMAC_SHA1_80`.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{SRTP_SUITE, VIDEO_PAYLOAD_TYPE, Worker, WorkerParameters, WorkerSpawner};
use crate::error::{CameraError, Result};

pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Build the ffmpeg argument vector for one session.
///
/// The source locator is split on whitespace so configs can carry input
/// options (`-re -i rtsp://...`) in a single string.
pub fn command_args(params: &WorkerParameters) -> Vec<String> {
    let mut args: Vec<String> = params
        .source
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let bitrate = format!("{}k", params.bitrate);

    args.extend([
        "-threads".to_string(),
        "0".to_string(),
        "-vcodec".to_string(),
        "libx264".to_string(),
        "-an".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        params.fps.to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-tune".to_string(),
        "zerolatency".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", params.width, params.height),
        "-b:v".to_string(),
        bitrate.clone(),
        "-bufsize".to_string(),
        bitrate,
        "-payload_type".to_string(),
        VIDEO_PAYLOAD_TYPE.to_string(),
        "-ssrc".to_string(),
        params.ssrc.to_string(),
        "-f".to_string(),
        "rtp".to_string(),
        "-srtp_out_suite".to_string(),
        SRTP_SUITE.to_string(),
        "-srtp_out_params".to_string(),
        params.srtp_params(),
        params.destination_url(),
    ]);

    args
}

/// Launches one ffmpeg process per session.
#[derive(Debug, Clone)]
pub struct FfmpegSpawner {
    program: String,
}

impl FfmpegSpawner {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl WorkerSpawner for FfmpegSpawner {
    fn spawn(&self, params: &WorkerParameters) -> Result<Box<dyn Worker>> {
        let args = command_args(params);
        tracing::info!(program = %self.program, args = %args.join(" "), "spawning ffmpeg");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CameraError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let pid = child.id();
        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || forward_stderr(pid, stderr));
        }

        let process = FfmpegProcess {
            pid,
            child: Arc::new(Mutex::new(child)),
            killed: Arc::new(AtomicBool::new(false)),
        };

        let child = process.child.clone();
        let killed = process.killed.clone();
        thread::spawn(move || monitor_exit(pid, child, killed));

        Ok(Box::new(process))
    }
}

/// Handle to a spawned ffmpeg process.
pub struct FfmpegProcess {
    pid: u32,
    child: Arc<Mutex<Child>>,
    killed: Arc<AtomicBool>,
}

impl Worker for FfmpegProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn kill(&mut self) {
        self.killed.store(true, Ordering::SeqCst);
        match self.child.lock().kill() {
            Ok(()) => tracing::debug!(pid = self.pid, "sent SIGKILL to ffmpeg"),
            Err(e) => tracing::debug!(pid = self.pid, error = %e, "ffmpeg already gone"),
        }
    }
}

/// Poll the child until it exits, then log how it ended.
///
/// Polling with `try_wait` keeps the `Child` available for [`Worker::kill`]
/// while still reaping the process.
fn monitor_exit(pid: u32, child: Arc<Mutex<Child>>, killed: Arc<AtomicBool>) {
    loop {
        let status = child.lock().try_wait();
        match status {
            Ok(Some(status)) => {
                if killed.load(Ordering::SeqCst) {
                    tracing::info!(pid, %status, "ffmpeg terminated");
                } else if status.success() {
                    tracing::info!(pid, "ffmpeg exited");
                } else {
                    tracing::warn!(pid, %status, "ffmpeg exited abnormally");
                }
                return;
            }
            Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
            Err(e) => {
                tracing::warn!(pid, error = %e, "failed to poll ffmpeg status");
                return;
            }
        }
    }
}

fn forward_stderr(pid: u32, stderr: ChildStderr) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) => tracing::debug!(pid, "ffmpeg: {}", line),
            Err(_) => break,
        }
    }
}
