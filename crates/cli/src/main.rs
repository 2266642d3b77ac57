use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use hkcam::camera::worker_parameters;
use hkcam::protocol::{MediaLegRequest, PrepareRequest, SnapshotRequest, StreamRequest, VideoRequest};
use hkcam::session::transport;
use hkcam::worker::ffmpeg::command_args;
use hkcam::{CameraConfig, CameraSource, SessionId, negotiate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hkcam",
    about = "SRTP camera stream negotiation and ffmpeg worker management"
)]
struct Args {
    /// Camera config file (JSON)
    #[arg(long, short, default_value = "camera.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Negotiate a resolution against the configured catalog
    Negotiate {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 30)]
        fps: u32,
    },
    /// Print the ffmpeg command a start request would launch
    Plan(StreamArgs),
    /// Prepare and start a stream, stop it when Enter is pressed
    Stream(StreamArgs),
    /// Print the streaming options advertised by each stream slot
    Options,
    /// Fetch a snapshot and write it to a file
    Snapshot {
        #[arg(long, short, default_value = "snapshot.jpg")]
        out: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 360)]
        height: u32,
    },
}

#[derive(ClapArgs)]
struct StreamArgs {
    /// Viewer address
    #[arg(long)]
    target: String,
    /// Viewer RTP port
    #[arg(long)]
    port: u16,
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Bitrate in kbit/s
    #[arg(long, default_value_t = 300)]
    bitrate: u32,
}

impl StreamArgs {
    /// Prepare request with a freshly generated SRTP key and salt.
    fn prepare_request(&self, session_id: SessionId) -> PrepareRequest {
        PrepareRequest {
            session_id,
            target_address: self.target.clone(),
            video: Some(MediaLegRequest {
                port: self.port,
                srtp_key: rand::random::<[u8; 16]>().to_vec(),
                srtp_salt: rand::random::<[u8; 14]>().to_vec(),
            }),
            audio: None,
        }
    }

    fn video_request(&self) -> VideoRequest {
        VideoRequest {
            width: self.width,
            height: self.height,
            fps: self.fps,
            max_bit_rate: self.bitrate,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> hkcam::Result<()> {
    tracing::debug!(config = %args.config.display(), "loading camera config");
    let config = CameraConfig::load(&args.config)?;
    config.validate()?;

    match args.command {
        Command::Negotiate { width, height, fps } => {
            let res = negotiate(&config.video_resolutions, width, height, fps);
            println!(
                "{}x{}@{} (within capability: {})",
                res.width, res.height, res.fps, res.within_capability
            );
        }
        Command::Plan(stream) => {
            let request = stream.prepare_request(SessionId::random());
            let (_, pending) = transport::prepare(&request, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
            if let Some(params) = worker_parameters(
                &config.source,
                &config.video_resolutions,
                &pending,
                &stream.video_request(),
            ) {
                println!("{} {}", config.ffmpeg_path, command_args(&params).join(" "));
            }
        }
        Command::Stream(stream) => {
            let camera = CameraSource::new(config)?;
            let session_id = SessionId::random();

            let response = camera.prepare_stream(&stream.prepare_request(session_id));
            println!(
                "session {} prepared, streaming from {} ({})",
                session_id,
                response.address.address,
                response.address.kind.as_str()
            );

            camera.handle_stream_request(&StreamRequest::Start {
                session_id,
                video: stream.video_request(),
            })?;

            println!("streaming to {}:{}, press Enter to stop", stream.target, stream.port);
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            camera.handle_stream_request(&StreamRequest::Stop { session_id })?;
        }
        Command::Options => {
            let camera = CameraSource::new(config)?;
            for slot in camera.stream_slots() {
                println!("slot {}: {}", slot.index(), serde_json::to_string(slot.options())?);
            }
        }
        Command::Snapshot { out, width, height } => {
            let camera = CameraSource::new(config)?;
            let image = camera.handle_snapshot_request(&SnapshotRequest { width, height })?;
            std::fs::write(&out, &image)?;
            println!("wrote {} bytes to {}", image.len(), out.display());
        }
    }

    Ok(())
}
