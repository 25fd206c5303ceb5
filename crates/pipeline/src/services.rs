//! The wired-up service graph.

use std::sync::Arc;

use subhub_events::jobs::JOB_EXTERNAL_SYNC;
use subhub_events::JobRunner;

use crate::collaborators::CollaboratorService;
use crate::context::ServiceContext;
use crate::external_sync::{ExternalSyncGate, SyncJobHandler, SyncTarget};
use crate::language_prefs::LanguagePreferenceService;
use crate::pipeline::Pipeline;
use crate::tasks::TaskService;
use crate::teams::TeamService;
use crate::videos::VideoService;
use crate::workflow::WorkflowEngine;
use crate::writelock::WriteLockManager;

/// Every service, sharing one context and one workflow engine so the
/// resolution cache is invalidated in a single place.
#[derive(Clone)]
pub struct Services {
    pub ctx: ServiceContext,
    pub workflow: Arc<WorkflowEngine>,
    pub pipeline: Arc<Pipeline>,
    pub writelocks: Arc<WriteLockManager>,
    pub tasks: Arc<TaskService>,
    pub teams: Arc<TeamService>,
    pub videos: Arc<VideoService>,
    pub language_prefs: Arc<LanguagePreferenceService>,
    pub collaborators: Arc<CollaboratorService>,
    pub sync: Arc<ExternalSyncGate>,
}

impl Services {
    pub fn new(ctx: ServiceContext, sync_targets: Vec<Arc<dyn SyncTarget>>) -> Self {
        let workflow = Arc::new(WorkflowEngine::new(ctx.clone()));
        let teams = Arc::new(TeamService::new(ctx.clone(), Arc::clone(&workflow)));
        Self {
            pipeline: Arc::new(Pipeline::new(ctx.clone(), Arc::clone(&workflow))),
            writelocks: Arc::new(WriteLockManager::new(ctx.clone())),
            tasks: Arc::new(TaskService::new(ctx.clone(), Arc::clone(&workflow))),
            videos: Arc::new(VideoService::new(
                ctx.clone(),
                Arc::clone(&workflow),
                Arc::clone(&teams),
            )),
            language_prefs: Arc::new(LanguagePreferenceService::new(ctx.clone())),
            collaborators: Arc::new(CollaboratorService::new(ctx.clone())),
            sync: Arc::new(ExternalSyncGate::new(ctx.clone(), sync_targets)),
            teams,
            workflow,
            ctx,
        }
    }

    /// Register the job handlers this crate owns.
    pub fn register_jobs(&self, runner: JobRunner) -> JobRunner {
        runner.register(
            JOB_EXTERNAL_SYNC,
            Arc::new(SyncJobHandler::new(Arc::clone(&self.sync))),
        )
    }
}
