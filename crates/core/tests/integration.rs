//! Integration test: full prepare → start → stop cycle against a recording
//! worker spawner, plus snapshot fetches from a throwaway HTTP server.

use std::io::{BufRead, BufReader, Write};
use std::net::{IpAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use hkcam::net::{AddressType, FixedAddress};
use hkcam::protocol::{
    MediaLegRequest, PrepareRequest, SnapshotRequest, StreamRequest, VideoRequest,
};
use hkcam::{
    CameraConfig, CameraError, CameraSource, ResolutionEntry, SessionId, Worker,
    WorkerParameters, WorkerSpawner,
};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder {
    spawned: Mutex<Vec<WorkerParameters>>,
    killed: Mutex<Vec<u32>>,
}

struct MockSpawner {
    recorder: Arc<Recorder>,
    fail: bool,
}

struct MockWorker {
    pid: u32,
    recorder: Arc<Recorder>,
}

impl Worker for MockWorker {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn kill(&mut self) {
        self.recorder.killed.lock().push(self.pid);
    }
}

impl WorkerSpawner for MockSpawner {
    fn spawn(&self, params: &WorkerParameters) -> hkcam::Result<Box<dyn Worker>> {
        if self.fail {
            return Err(CameraError::Spawn {
                program: "ffmpeg".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        let mut spawned = self.recorder.spawned.lock();
        spawned.push(params.clone());
        Ok(Box::new(MockWorker {
            pid: spawned.len() as u32,
            recorder: self.recorder.clone(),
        }))
    }
}

const LOCAL: &str = "192.168.1.20";

fn camera_with(config: CameraConfig, fail: bool) -> (CameraSource, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let local: IpAddr = LOCAL.parse().unwrap();
    let camera = CameraSource::new(config)
        .expect("camera")
        .with_spawner(Box::new(MockSpawner {
            recorder: recorder.clone(),
            fail,
        }))
        .with_resolver(Box::new(FixedAddress(local)));
    (camera, recorder)
}

fn camera() -> (CameraSource, Arc<Recorder>) {
    let config = CameraConfig::new("-re -i rtsp://cam/live").with_resolutions(&[
        ResolutionEntry::new(1920, 1080, 30),
        ResolutionEntry::new(1280, 720, 30),
    ]);
    camera_with(config, false)
}

fn prepare_request(id: SessionId, target: &str, port: u16) -> PrepareRequest {
    PrepareRequest {
        session_id: id,
        target_address: target.to_string(),
        video: Some(MediaLegRequest {
            port,
            srtp_key: vec![0x11; 16],
            srtp_salt: vec![0x22; 14],
        }),
        audio: Some(MediaLegRequest {
            port: port + 2,
            srtp_key: vec![0x33; 16],
            srtp_salt: vec![0x44; 14],
        }),
    }
}

fn start(id: SessionId, width: u32, height: u32, fps: u32, bitrate: u32) -> StreamRequest {
    StreamRequest::Start {
        session_id: id,
        video: VideoRequest {
            width,
            height,
            fps,
            max_bit_rate: bitrate,
        },
    }
}

#[test]
fn prepare_start_stop_end_to_end() {
    let (camera, recorder) = camera();
    let id = SessionId::random();

    let resp = camera.prepare_stream(&prepare_request(id, "10.0.0.5", 5000));
    assert_eq!(resp.address.address, LOCAL);
    assert_eq!(resp.address.kind, AddressType::V4);
    let video = resp.video.expect("video leg");
    assert_eq!(video.port, 5000);
    assert_eq!(video.ssrc, 1);
    assert_eq!(video.srtp_key, vec![0x11; 16]);
    assert_eq!(video.srtp_salt, vec![0x22; 14]);
    assert_eq!(resp.audio.expect("audio leg").port, 5002);
    assert!(camera.sessions().is_pending(&id));

    camera
        .handle_stream_request(&start(id, 1920, 1080, 30, 300))
        .expect("start");

    {
        let spawned = recorder.spawned.lock();
        assert_eq!(spawned.len(), 1);
        let params = &spawned[0];
        assert_eq!((params.width, params.height, params.fps), (1920, 1080, 30));
        assert_eq!(params.bitrate, 300);
        assert_eq!(params.source, "-re -i rtsp://cam/live");
        assert_eq!(params.srtp_key_material.len(), 30);
        assert!(
            params
                .destination_url()
                .starts_with("srtp://10.0.0.5:5000?")
        );
    }
    assert!(!camera.sessions().is_pending(&id));
    assert!(camera.sessions().is_ongoing(&id));

    camera
        .handle_stream_request(&StreamRequest::Stop { session_id: id })
        .expect("stop");
    assert_eq!(*recorder.killed.lock(), vec![1]);
    assert!(!camera.sessions().is_ongoing(&id));
}

#[test]
fn second_start_spawns_nothing() {
    let (camera, recorder) = camera();
    let id = SessionId::random();

    camera.prepare_stream(&prepare_request(id, "10.0.0.5", 5000));
    let video = VideoRequest {
        width: 1280,
        height: 720,
        fps: 30,
        max_bit_rate: 132,
    };
    assert!(camera.start_stream(&id, &video).unwrap());
    assert!(!camera.start_stream(&id, &video).unwrap());
    camera
        .handle_stream_request(&start(id, 1280, 720, 30, 132))
        .unwrap();

    assert_eq!(recorder.spawned.lock().len(), 1);
    assert_eq!(camera.sessions().ongoing_count(), 1);
}

#[test]
fn start_without_prepare_is_noop() {
    let (camera, recorder) = camera();
    camera
        .handle_stream_request(&start(SessionId::random(), 1280, 720, 30, 132))
        .unwrap();
    assert!(recorder.spawned.lock().is_empty());
    assert_eq!(camera.sessions().ongoing_count(), 0);
}

#[test]
fn stop_unknown_session_is_noop() {
    let (camera, recorder) = camera();
    let id = SessionId::random();
    camera
        .handle_stream_request(&StreamRequest::Stop { session_id: id })
        .unwrap();
    assert!(!camera.stop_stream(&id));
    assert!(recorder.killed.lock().is_empty());
}

#[test]
fn second_prepare_overwrites_first() {
    let (camera, recorder) = camera();
    let id = SessionId::random();

    camera.prepare_stream(&prepare_request(id, "10.0.0.5", 5000));
    camera.prepare_stream(&prepare_request(id, "10.0.0.9", 6000));
    assert_eq!(camera.sessions().pending_count(), 1);

    camera
        .handle_stream_request(&start(id, 1280, 720, 30, 132))
        .unwrap();
    let spawned = recorder.spawned.lock();
    assert_eq!(spawned[0].address, "10.0.0.9");
    assert_eq!(spawned[0].port, 6000);
}

#[test]
fn sessions_are_independent() {
    let (camera, recorder) = camera();
    let a = SessionId::random();
    let b = SessionId::random();

    camera.prepare_stream(&prepare_request(a, "10.0.0.5", 5000));
    camera.prepare_stream(&prepare_request(b, "10.0.0.6", 5100));
    camera.handle_stream_request(&start(a, 1920, 1080, 30, 300)).unwrap();
    camera.handle_stream_request(&start(b, 1280, 720, 15, 100)).unwrap();
    assert_eq!(camera.sessions().ongoing_count(), 2);

    assert!(camera.stop_stream(&a));
    assert_eq!(*recorder.killed.lock(), vec![1]);
    assert!(camera.sessions().is_ongoing(&b));

    let spawned = recorder.spawned.lock();
    assert_eq!((spawned[1].width, spawned[1].fps), (1280, 15));
}

#[test]
fn no_fitting_resolution_starts_at_zero() {
    let (camera, recorder) = camera();
    let id = SessionId::random();

    camera.prepare_stream(&prepare_request(id, "10.0.0.5", 5000));
    camera.handle_stream_request(&start(id, 640, 360, 30, 100)).unwrap();

    let spawned = recorder.spawned.lock();
    assert_eq!((spawned[0].width, spawned[0].height, spawned[0].fps), (0, 0, 30));
}

#[test]
fn spawn_failure_propagates_and_consumes_pending() {
    let config = CameraConfig::new("-i cam").with_resolutions(&[ResolutionEntry::new(640, 480, 30)]);
    let (camera, _) = camera_with(config, true);
    let id = SessionId::random();

    camera.prepare_stream(&prepare_request(id, "10.0.0.5", 5000));
    let err = camera
        .handle_stream_request(&start(id, 640, 480, 30, 100))
        .unwrap_err();
    assert!(matches!(err, CameraError::Spawn { .. }));
    assert!(!camera.sessions().is_pending(&id));
    assert!(!camera.sessions().is_ongoing(&id));
}

#[test]
fn shutdown_kills_all_workers() {
    let (camera, recorder) = camera();
    for port in [5000, 5100] {
        let id = SessionId::random();
        camera.prepare_stream(&prepare_request(id, "10.0.0.5", port));
        camera.handle_stream_request(&start(id, 1280, 720, 30, 100)).unwrap();
    }
    camera.prepare_stream(&prepare_request(SessionId::random(), "10.0.0.5", 5200));

    camera.shutdown();
    assert_eq!(recorder.killed.lock().len(), 2);
    assert_eq!(camera.sessions().ongoing_count(), 0);
    assert_eq!(camera.sessions().pending_count(), 0);
}

/// Serve one HTTP response on an ephemeral port and return the base URL.
fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
        }
        let head = format!(
            "{status_line}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
        stream.flush().unwrap();
    });

    format!("http://{}/snapshot.jpg", addr)
}

#[test]
fn snapshot_returns_body() {
    let url = serve_once("HTTP/1.1 200 OK", b"\xFF\xD8jpeg\xFF\xD9");
    let (camera, _) = camera_with(CameraConfig::new("-i cam").with_snapshot_url(&url), false);

    let image = camera
        .handle_snapshot_request(&SnapshotRequest {
            width: 640,
            height: 360,
        })
        .expect("snapshot");
    assert_eq!(image, b"\xFF\xD8jpeg\xFF\xD9");
}

#[test]
fn snapshot_error_status() {
    let url = serve_once("HTTP/1.1 503 Service Unavailable", b"busy");
    let (camera, _) = camera_with(CameraConfig::new("-i cam").with_snapshot_url(&url), false);

    let err = camera
        .handle_snapshot_request(&SnapshotRequest {
            width: 640,
            height: 360,
        })
        .unwrap_err();
    assert!(matches!(err, CameraError::SnapshotStatus(503)));
}
