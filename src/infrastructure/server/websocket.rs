//! WebSocket Handler
//!
//! Per-connection detection-request/response protocol, plus the shared
//! `attendance_event` broadcast relayed from the [`EventBus`].
//!
//! Three tasks per connection: the read loop decodes incoming frames and
//! drops them into a single-slot mailbox (newest-wins: a frame still
//! waiting to be picked up is replaced, not queued, so inference always
//! runs on the freshest image); a processing task drains that slot and
//! runs the pipeline; a writer task owns the socket's send half and
//! drains an outbox fed by both the processing task and the event-bus
//! relay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};
use ulid::Ulid;

use crate::application::use_cases::pipeline_orchestrator::{FaceResult, PipelineOrchestrator};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::LivenessVerdict;
use crate::infrastructure::server::AppState;

const OUTBOX_CAPACITY: usize = 64;

/// Client → server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    DetectionRequest {
        image: String,
        #[serde(default)]
        model_type: Option<String>,
        #[serde(default)]
        confidence_threshold: Option<f32>,
        #[serde(default)]
        nms_threshold: Option<f32>,
        #[serde(default = "default_true")]
        enable_liveness: bool,
    },
    Ping,
}

fn default_true() -> bool {
    true
}

/// Server → client messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    DetectionResponse {
        session_id: String,
        faces: Vec<FacePayload>,
        model_used: String,
        processing_time: f64,
        timestamp: DateTime<Utc>,
        frame_dropped: bool,
        performance_metrics: PerformanceMetrics,
    },
    RequestNextFrame {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    Pong {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        session_id: String,
        message: String,
    },
    AttendanceEvent {
        data: AttendanceEventPayload,
    },
}

#[derive(Debug, Serialize)]
struct BoundingBoxPayload {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct LivenessPayload {
    is_real: bool,
    live_score: f32,
    spoof_score: f32,
    confidence: f32,
    status: crate::domain::value_objects::LivenessStatus,
}

impl From<&LivenessVerdict> for LivenessPayload {
    fn from(v: &LivenessVerdict) -> Self {
        Self {
            is_real: v.is_real,
            live_score: v.live_score,
            spoof_score: v.spoof_score,
            confidence: v.confidence,
            status: v.status,
        }
    }
}

#[derive(Debug, Serialize)]
struct FacePayload {
    bbox: BoundingBoxPayload,
    confidence: f32,
    landmarks_5: Vec<[f32; 2]>,
    liveness: Option<LivenessPayload>,
    track_id: Option<i64>,
    person_id: Option<String>,
    similarity: Option<f32>,
}

impl From<&FaceResult> for FacePayload {
    fn from(face: &FaceResult) -> Self {
        Self {
            bbox: BoundingBoxPayload {
                x: face.bbox.x(),
                y: face.bbox.y(),
                width: face.bbox.width(),
                height: face.bbox.height(),
            },
            confidence: face.liveness.confidence,
            landmarks_5: face
                .landmarks
                .as_array()
                .iter()
                .map(|p| [p.x, p.y])
                .collect(),
            liveness: Some(LivenessPayload::from(&face.liveness)),
            track_id: Some(face.track_id),
            person_id: face.person_id.map(|id| id.to_string()),
            similarity: Some(face.similarity),
        }
    }
}

#[derive(Debug, Serialize)]
struct PerformanceMetrics {
    actual_fps: f64,
    avg_processing_time: f64,
    queue_size: usize,
    dropped_frames: u64,
}

#[derive(Debug, Serialize)]
struct AttendanceEventPayload {
    id: Ulid,
    person_id: Ulid,
    group_id: Ulid,
    timestamp: DateTime<Utc>,
    confidence: f32,
    location: Option<crate::domain::value_objects::GeoLocation>,
    member_name: String,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Single-slot, newest-wins mailbox for incoming frames.
struct FrameMailbox {
    slot: Mutex<Option<image::RgbImage>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl FrameMailbox {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn deposit(&self, frame: image::RgbImage) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        *slot = Some(frame);
        drop(slot);
        self.notify.notify_one();
    }

    async fn take(&self) -> image::RgbImage {
        loop {
            if let Some(frame) = self.slot.lock().unwrap().take() {
                return frame;
            }
            self.notify.notified().await;
        }
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Ulid::new().to_string();
    let (mut sink, mut receiver) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut event_subscriber = state.event_bus.subscribe();
    let relay_tx = outbox_tx.clone();
    let relay_task = tokio::spawn(async move {
        while let Some(event) = event_subscriber.recv().await {
            if let DomainEvent::AttendanceRecorded(e) = event.as_ref() {
                let msg = ServerMessage::AttendanceEvent {
                    data: AttendanceEventPayload {
                        id: e.id,
                        person_id: e.person_id,
                        group_id: e.group_id,
                        timestamp: e.timestamp,
                        confidence: e.confidence,
                        location: e.location.clone(),
                        member_name: e.member_name.clone(),
                    },
                };
                if relay_tx.send(msg).await.is_err() {
                    break;
                }
            }
        }
    });

    let mailbox = Arc::new(FrameMailbox::new());
    let pipeline = state.new_pipeline(None);
    let process_tx = outbox_tx.clone();
    let process_mailbox = mailbox.clone();
    let process_session_id = session_id.clone();
    let processing_task = tokio::spawn(run_pipeline_loop(
        pipeline,
        process_mailbox,
        process_tx,
        process_session_id,
    ));

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    let _ = outbox_tx
                        .send(ServerMessage::Pong {
                            session_id: session_id.clone(),
                            timestamp: Utc::now(),
                        })
                        .await;
                }
                Ok(ClientMessage::DetectionRequest { image, enable_liveness, .. }) => {
                    let _ = enable_liveness;
                    match decode_frame(&image) {
                        Ok(frame) => mailbox.deposit(frame),
                        Err(err) => {
                            let _ = outbox_tx
                                .send(ServerMessage::Error {
                                    session_id: session_id.clone(),
                                    message: err,
                                })
                                .await;
                        }
                    }
                }
                Err(err) => {
                    let _ = outbox_tx
                        .send(ServerMessage::Error {
                            session_id: session_id.clone(),
                            message: format!("malformed message: {err}"),
                        })
                        .await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    processing_task.abort();
    relay_task.abort();
    drop(outbox_tx);
    let _ = writer_task.await;

    info!(%session_id, "websocket client disconnected");
}

/// Drains the frame mailbox and runs the pipeline on each freshest
/// frame, forever (until the socket's other tasks abort it).
async fn run_pipeline_loop(
    mut pipeline: PipelineOrchestrator,
    mailbox: Arc<FrameMailbox>,
    outbox_tx: mpsc::Sender<ServerMessage>,
    session_id: String,
) {
    let mut frame_count: u64 = 0;
    let stream_started = Instant::now();
    let avg_processing_millis = AtomicU64::new(0);

    loop {
        let frame = mailbox.take().await;
        let started = Instant::now();

        match pipeline.process_frame(&frame, None).await {
            Ok(faces) => {
                frame_count += 1;
                let elapsed = started.elapsed().as_secs_f64();
                avg_processing_millis.store((elapsed * 1000.0) as u64, Ordering::Relaxed);

                let response = ServerMessage::DetectionResponse {
                    session_id: session_id.clone(),
                    faces: faces.iter().map(FacePayload::from).collect(),
                    model_used: "onnx".to_string(),
                    processing_time: elapsed,
                    timestamp: Utc::now(),
                    frame_dropped: false,
                    performance_metrics: PerformanceMetrics {
                        actual_fps: frame_count as f64 / stream_started.elapsed().as_secs_f64().max(1e-6),
                        avg_processing_time: avg_processing_millis.load(Ordering::Relaxed) as f64 / 1000.0,
                        queue_size: 0,
                        dropped_frames: mailbox.dropped_count(),
                    },
                };
                if outbox_tx.send(response).await.is_err() {
                    return;
                }
                let _ = outbox_tx
                    .send(ServerMessage::RequestNextFrame {
                        session_id: session_id.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            Err(err) => {
                warn!(%err, %session_id, "frame processing failed");
                if outbox_tx
                    .send(ServerMessage::Error {
                        session_id: session_id.clone(),
                        message: err.to_string(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// Decodes a base64 JPEG/PNG payload into an RGB frame.
fn decode_frame(payload: &str) -> Result<image::RgbImage, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 image: {e}"))?;
    let image = image::load_from_memory(&bytes).map_err(|e| format!("invalid image: {e}"))?;
    Ok(image.to_rgb8())
}
