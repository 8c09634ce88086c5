// Contract Approval Module - phase state machine with injected collaborators
//
// The core (state machine, projector, invitation gate, effect policy) is pure
// and synchronous. The service and executor wrap it with stores, a directory
// and a notification transport so every side effect can be tested in isolation.

pub mod types;
pub mod errors;
pub mod state_machine;
pub mod projector;
pub mod invitations;
pub mod effects;
pub mod traits;
pub mod executor;
pub mod memory;
pub mod service;

#[cfg(test)]
pub mod mocks;


pub use errors::ApprovalError;
pub use types::{
    AcceptanceMatrix, Action, Actor, Company, CompanyId, Contract, ContractId, ContractStatus,
    Employee, EmployeeId, Invitation, InvitationId, InvitationStatus, InvitationType,
    NotificationEvent, NotificationKind, Phase, Role, RoleFlags, VersionedContract,
};
pub use state_machine::apply;
pub use projector::{project, AcceptanceState, AcceptanceView, CompanyAcceptance};
pub use invitations::{permitted_invitations, InvitationOptions};
pub use effects::{plan_transition, Effect, EffectScript, NotificationPlan, RecipientCriteria};
pub use executor::{EffectExecutor, ExecutionReport};
pub use memory::{MemoryBackend, Workspace};
pub use service::{ApprovalService, ContractView, TransitionOutcome};
