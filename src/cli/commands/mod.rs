use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::approval::{ApprovalService, MemoryBackend};
use crate::config::WorkflowConfig;
use crate::workspace_file::{load_workspace, save_workspace, WorkspaceFile};

pub mod contract;
pub mod invitation;
pub mod notifications;
pub mod seed;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// What a command gets to work with while it holds the workspace
pub struct WorkspaceSession {
    pub service: ApprovalService,
    pub backend: MemoryBackend,
}

/// Where commands find the workspace and how the service behaves
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub workspace: PathBuf,
    pub workflow: WorkflowConfig,
}

impl CommandContext {
    pub fn new(workspace: impl Into<PathBuf>, workflow: WorkflowConfig) -> Self {
        Self {
            workspace: workspace.into(),
            workflow,
        }
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace
    }

    /// Lock the workspace, run `f` against a service over its contents and,
    /// when `persist` is set, write the result back before releasing the lock.
    /// The write happens even when `f` fails: a failed effect script leaves the
    /// status it already swapped in place, and the file must agree.
    pub async fn with_workspace<F, Fut, R>(&self, persist: bool, f: F) -> Result<R>
    where
        F: FnOnce(WorkspaceSession) -> Fut,
        Fut: std::future::Future<Output = Result<R>>,
    {
        let mut file = WorkspaceFile::open(&self.workspace)?;
        let _guard = file.lock()?;

        let backend = MemoryBackend::from_workspace(load_workspace(&self.workspace)?);
        let session = WorkspaceSession {
            service: ApprovalService::from_backend(&backend, &self.workflow),
            backend: backend.clone(),
        };

        let result = f(session).await;
        if persist {
            save_workspace(&self.workspace, &backend.snapshot().await)?;
        }
        result
    }
}
