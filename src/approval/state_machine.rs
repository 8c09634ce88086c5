// Status state machine - next contract status from one participant's request

use tracing::{debug, info};

use crate::approval::errors::ApprovalError;
use crate::approval::types::{Action, CompanyId, Contract, ContractStatus, Phase, PhaseKind, Role};

/// Compute the status that results from `company`/`role` requesting `action`.
///
/// An action that does not apply to the current phase returns the status
/// unchanged. Otherwise the actor's flag is recorded first, then:
///
/// - entry phases (`Creating`, `Harmonized`, `Signed`) advance at once and the
///   matrix is carried forward as is;
/// - consensus phases (`Harmonization`, `Signing`) advance only once every
///   company approves, and the whole matrix is cleared on the way out.
///
/// The input is never mutated; callers persist the returned value with a
/// compare-and-swap against the version they read.
pub fn apply(
    status: &ContractStatus,
    company: &CompanyId,
    role: Role,
    action: Action,
) -> Result<ContractStatus, ApprovalError> {
    if status.acceptance.is_empty() {
        return Err(ApprovalError::malformed("matrix has no companies"));
    }
    if !status.acceptance.contains(company) {
        return Err(ApprovalError::UnknownParticipant {
            company: company.clone(),
        });
    }

    let current = status.phase;
    if !action.is_valid_in(current) {
        debug!(phase = %current, action = %action, "Action does not apply to phase, ignoring");
        return Ok(status.clone());
    }

    let mut next = status.clone();
    next.acceptance.record(company, role);

    let Some(following) = current.next() else {
        return Ok(next);
    };

    match current.kind() {
        PhaseKind::Entry => {
            next.phase = following;
            info!(
                from = %current,
                to = %following,
                company = %company,
                role = %role,
                "Contract advanced from entry phase"
            );
        }
        PhaseKind::Consensus => {
            if !next.acceptance.all_approved(current) {
                debug!(
                    phase = %current,
                    company = %company,
                    role = %role,
                    "Acceptance recorded, waiting for remaining companies"
                );
                return Ok(next);
            }
            next.phase = following;
            next.acceptance.reset();
            info!(
                from = %current,
                to = %following,
                company = %company,
                role = %role,
                "Consensus reached, contract advanced"
            );
        }
        PhaseKind::Terminal => {}
    }

    Ok(next)
}

/// [`apply`] against a whole contract, after checking that its matrix is
/// keyed by exactly the contract's companies.
pub fn apply_to_contract(
    contract: &Contract,
    company: &CompanyId,
    role: Role,
    action: Action,
) -> Result<ContractStatus, ApprovalError> {
    contract.status.acceptance.ensure_matches(&contract.companies)?;
    if !contract.has_company(company) {
        return Err(ApprovalError::UnknownParticipant {
            company: company.clone(),
        });
    }
    apply(&contract.status, company, role, action)
}

/// Whether moving from `from` to `to` left a consensus phase
pub fn left_consensus_phase(from: Phase, to: Phase) -> bool {
    from != to && from.kind() == PhaseKind::Consensus
}
