// Error taxonomy for the approval core and the service around it

use thiserror::Error;

use crate::approval::types::{CompanyId, ContractId, EmployeeId, InvitationId, InvitationType};

/// Failures surfaced by the approval workflow.
///
/// Business outcomes are never errors: an action that does not apply to the
/// current phase, a gate with nothing to offer, or an empty effect script are
/// all ordinary values. Only malformed input, unknown identities, concurrency
/// conflicts and collaborator failures end up here.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Company {company} does not participate in the contract")]
    UnknownParticipant { company: CompanyId },

    #[error("Malformed acceptance matrix: {reason}")]
    MalformedAcceptanceMatrix { reason: String },

    #[error("Stale snapshot of contract {contract}: read version {expected}, store holds {found}")]
    StaleSnapshot {
        contract: ContractId,
        expected: u64,
        found: u64,
    },

    #[error("Gave up updating contract {contract} after {attempts} stale snapshots")]
    RetriesExhausted { contract: ContractId, attempts: u32 },

    #[error("Contract {0} not found")]
    ContractNotFound(ContractId),

    #[error("Employee {0} not found")]
    EmployeeNotFound(EmployeeId),

    #[error("Invitation {0} not found")]
    InvitationNotFound(InvitationId),

    #[error("{invitation_type} invitation to company {company} is not permitted: {reason}")]
    InvitationNotPermitted {
        invitation_type: InvitationType,
        company: CompanyId,
        reason: String,
    },

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl ApprovalError {
    /// Whether the caller may re-run the operation against a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApprovalError::StaleSnapshot { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ApprovalError::MalformedAcceptanceMatrix {
            reason: reason.into(),
        }
    }
}
