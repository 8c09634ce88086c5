// Concordat Library - Multi-Company Contract Approval Workflow
// This exposes the core components for testing and integration

pub mod approval;
pub mod cli;
pub mod config;
pub mod observability;
pub mod telemetry;
pub mod workspace_file;

// Re-export key types for easy access
pub use approval::{
    apply, permitted_invitations, plan_transition, project, ApprovalError, ApprovalService,
    ContractView, EffectScript, MemoryBackend, TransitionOutcome, Workspace,
};
pub use config::{config, init_config, ConcordatConfig};
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
pub use telemetry::{create_transition_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
