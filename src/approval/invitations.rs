// Invitation gate - which collaboration invitations the current phase allows

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::approval::errors::ApprovalError;
use crate::approval::types::{
    Actor, Company, CompanyId, Contract, ContractId, Employee, Invitation, InvitationId,
    InvitationStatus, InvitationType, Phase, Role,
};

/// Eligible recipient companies per invitation type, in contract order
pub type InvitationOptions = BTreeMap<InvitationType, Vec<Company>>;

/// Invitation types a phase allows at all
pub fn offered_types(phase: Phase) -> &'static [InvitationType] {
    match phase {
        Phase::Creating => &[InvitationType::Editing, InvitationType::Harmonization],
        Phase::Harmonization => &[InvitationType::Harmonization],
        Phase::Harmonized | Phase::Signing => &[InvitationType::Signing],
        Phase::Signed | Phase::Archived => &[],
    }
}

/// Compute the invitations `requester` may still send on `contract`.
///
/// Every other contract company is eligible for each type the phase offers,
/// minus companies that already hold a pending invitation of that type on
/// this contract, whoever sent it. Types left with no company are dropped.
pub fn permitted_invitations(
    contract: &Contract,
    requester: &CompanyId,
    outstanding: &[Invitation],
) -> InvitationOptions {
    let mut options = InvitationOptions::new();
    for &kind in offered_types(contract.phase()) {
        let eligible: Vec<Company> = contract
            .companies
            .iter()
            .filter(|company| &company.id != requester)
            .filter(|company| {
                !outstanding
                    .iter()
                    .any(|invitation| invitation.blocks(&contract.id, kind, &company.id))
            })
            .cloned()
            .collect();
        if !eligible.is_empty() {
            options.insert(kind, eligible);
        }
    }
    options
}

/// Reject an invitation request the gate does not offer
pub fn ensure_permitted(
    options: &InvitationOptions,
    kind: InvitationType,
    company: &CompanyId,
) -> Result<(), ApprovalError> {
    let Some(eligible) = options.get(&kind) else {
        return Err(ApprovalError::InvitationNotPermitted {
            invitation_type: kind,
            company: company.clone(),
            reason: "type is not open in the current phase".to_string(),
        });
    };
    if eligible.iter().any(|c| &c.id == company) {
        Ok(())
    } else {
        Err(ApprovalError::InvitationNotPermitted {
            invitation_type: kind,
            company: company.clone(),
            reason: "company is not eligible or is already invited".to_string(),
        })
    }
}

/// Employees of the recipient company who receive an invitation of `kind`.
/// Signing goes to the company's director alone; everything else goes to all
/// employees.
pub fn select_recipients(kind: InvitationType, company_employees: &[Employee]) -> Vec<&Employee> {
    match kind {
        InvitationType::Signing => company_employees
            .iter()
            .find(|employee| employee.role == Role::Director)
            .into_iter()
            .collect(),
        InvitationType::Editing | InvitationType::Harmonization => {
            company_employees.iter().collect()
        }
    }
}

/// One pending invitation per recipient
pub fn draft_invitations(
    contract_id: &ContractId,
    kind: InvitationType,
    creator: &Actor,
    recipients: &[&Employee],
    created_at: DateTime<Utc>,
) -> Vec<Invitation> {
    recipients
        .iter()
        .map(|recipient| Invitation {
            id: InvitationId::generate(),
            contract_id: contract_id.clone(),
            invitation_type: kind,
            creator: creator.clone(),
            recipient: Actor::from(*recipient),
            status: InvitationStatus::Pending,
            created_at,
        })
        .collect()
}
