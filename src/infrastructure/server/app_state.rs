//! Application State
//!
//! Shared state for the HTTP/WebSocket server: repositories, the event
//! bus, the perception collaborators and the use cases built on top of
//! them. A fresh [`PipelineOrchestrator`] is assembled per connection
//! from the shared, stateless pieces stored here (see
//! [`AppState::new_pipeline`]).

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::application::ports::{Embedder, FaceAligner, FaceDetector, LivenessScorer};
use crate::application::services::{
    EventBus, IdentityGallery, LivenessSmoother, Recognizer, Tracker,
};
use crate::application::use_cases::pipeline_orchestrator::{PipelineConfig, PipelineOrchestrator};
use crate::application::use_cases::{ManageGallery, ManageGroups, ManageMembers, QueryAttendance};
use crate::application::services::AttendanceStateMachine;
use crate::domain::repositories::{
    GalleryRepository, GroupRepository, MemberRepository, RecordRepository, SessionRepository,
    SettingsRepository,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database::{
    create_pool, run_migrations, PgGalleryRepository, PgGroupRepository, PgMemberRepository,
    PgRecordRepository, PgSessionRepository, PgSettingsRepository,
};
use crate::infrastructure::vision::{OnnxEmbedder, OnnxFaceDetector, OnnxLivenessScorer, SimilarityAligner};

use std::time::Duration;

/// Application state shared across HTTP handlers and WebSocket connections.
pub struct AppState {
    pub config: AppConfig,
    pub pool: PgPool,
    pub event_bus: EventBus,

    pub groups_repo: Arc<dyn GroupRepository>,
    pub members_repo: Arc<dyn MemberRepository>,
    pub records_repo: Arc<dyn RecordRepository>,
    pub sessions_repo: Arc<dyn SessionRepository>,
    pub settings_repo: Arc<dyn SettingsRepository>,
    pub gallery_repo: Arc<dyn GalleryRepository>,

    detector: Arc<dyn FaceDetector>,
    liveness_scorer: Arc<dyn LivenessScorer>,
    embedder: Arc<dyn Embedder>,
    gallery: Arc<IdentityGallery>,
    attendance: Arc<AttendanceStateMachine>,

    pub manage_groups: Arc<ManageGroups>,
    pub manage_members: Arc<ManageMembers>,
    pub manage_gallery: Arc<ManageGallery>,
    pub query_attendance: Arc<QueryAttendance>,
}

impl AppState {
    /// The attendance state machine, exposed for the event ingestion
    /// endpoint (`POST /api/v1/events`).
    pub fn attendance(&self) -> &Arc<AttendanceStateMachine> {
        &self.attendance
    }
}

impl AppState {
    /// Builds application state: connects to the database, runs pending
    /// migrations, constructs every repository and the shared perception
    /// collaborators, and wires the use cases on top of them.
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let pool = create_pool(&config.database_url).await?;
        run_migrations(&pool).await?;

        let groups_repo: Arc<dyn GroupRepository> = Arc::new(PgGroupRepository::new(pool.clone()));
        let members_repo: Arc<dyn MemberRepository> = Arc::new(PgMemberRepository::new(pool.clone()));
        let records_repo: Arc<dyn RecordRepository> = Arc::new(PgRecordRepository::new(pool.clone()));
        let sessions_repo: Arc<dyn SessionRepository> = Arc::new(PgSessionRepository::new(pool.clone()));
        let settings_repo: Arc<dyn SettingsRepository> =
            Arc::new(PgSettingsRepository::new(pool.clone()));
        let gallery_repo: Arc<dyn GalleryRepository> = Arc::new(PgGalleryRepository::new(pool.clone()));

        let event_bus = EventBus::new();

        let gallery = Arc::new(IdentityGallery::with_ttl(
            gallery_repo.clone(),
            Duration::from_secs_f64(config.recognizer.cache_ttl_seconds),
        ));

        let attendance = Arc::new(AttendanceStateMachine::new(
            members_repo.clone(),
            groups_repo.clone(),
            records_repo.clone(),
            sessions_repo.clone(),
            settings_repo.clone(),
            event_bus.clone(),
        ));

        let detector: Arc<dyn FaceDetector> = Arc::new(OnnxFaceDetector::new(
            config.detector.model_path.clone(),
            config.detector.clone(),
        )?);
        let aligner: Arc<dyn FaceAligner> = Arc::new(SimilarityAligner::new());
        let liveness_scorer: Arc<dyn LivenessScorer> = Arc::new(OnnxLivenessScorer::new(
            &config.liveness.model_path,
            config.liveness.confidence_threshold,
            config.liveness.bbox_inc,
            config.liveness.model_img_size,
        )?);
        let embedder: Arc<dyn Embedder> = Arc::new(OnnxEmbedder::new(
            &config.recognizer.model_path,
            aligner,
            config.recognizer.embedding_img_size,
        )?);

        let manage_groups = Arc::new(ManageGroups::new(groups_repo.clone()));
        let manage_members = Arc::new(ManageMembers::new(members_repo.clone()));
        let manage_gallery = Arc::new(ManageGallery::new(gallery_repo.clone(), gallery.clone()));
        let query_attendance = Arc::new(QueryAttendance::new(
            members_repo.clone(),
            groups_repo.clone(),
            records_repo.clone(),
            sessions_repo.clone(),
        ));

        info!("application state initialized");

        Ok(Self {
            config: config.clone(),
            pool,
            event_bus,
            groups_repo,
            members_repo,
            records_repo,
            sessions_repo,
            settings_repo,
            gallery_repo,
            detector,
            liveness_scorer,
            embedder,
            gallery,
            attendance,
            manage_groups,
            manage_members,
            manage_gallery,
            query_attendance,
        })
    }

    /// Assembles a fresh, connection-scoped [`PipelineOrchestrator`]. The
    /// tracker and liveness smoother hold per-stream state and must not be
    /// shared across connections; everything else (models, gallery,
    /// attendance machine) is shared.
    pub fn new_pipeline(&self, allowed_person_ids: Option<Vec<ulid::Ulid>>) -> PipelineOrchestrator {
        let tracker_config = crate::application::services::TrackerConfig {
            max_age: self.config.tracker.max_age,
            n_init: self.config.tracker.n_init,
            max_iou_distance: self.config.tracker.max_iou_distance,
            max_cosine_distance: self.config.tracker.max_cosine_distance,
            feature_budget: self.config.tracker.feature_budget,
            appearance_weight: self.config.tracker.weights.appearance,
            motion_weight: self.config.tracker.weights.motion,
        };

        let smoother = LivenessSmoother::new(
            self.config.liveness.alpha,
            self.config.liveness.confidence_threshold,
        )
        .with_cleanup_interval_frames(self.config.liveness.cleanup_interval_frames)
        .with_stale_after_frames(self.config.liveness.max_stale_frames);

        PipelineOrchestrator::new(
            self.detector.clone(),
            self.liveness_scorer.clone(),
            self.embedder.clone(),
            self.gallery.clone(),
            Recognizer::new(self.config.recognizer.similarity_threshold),
            self.attendance.clone(),
            Tracker::new(tracker_config),
            smoother,
            PipelineConfig {
                min_face_size: self.config.detector.min_face_size,
                allowed_person_ids,
            },
        )
    }
}
