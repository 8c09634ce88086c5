// Acceptance projection - what a given viewer may do, and where each company stands

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::approval::errors::ApprovalError;
use crate::approval::types::{Action, CompanyId, ContractStatus, Phase, Role};

/// Per-company standing inside a consensus phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptanceState {
    Harmonized,
    Signed,
    Pending,
}

impl fmt::Display for AcceptanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AcceptanceState::Harmonized => "harmonized",
            AcceptanceState::Signed => "signed",
            AcceptanceState::Pending => "pending",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAcceptance {
    pub company: CompanyId,
    pub state: AcceptanceState,
}

/// Read model for one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceView {
    pub offered_action: Option<Action>,
    pub companies: Vec<CompanyAcceptance>,
}

pub fn project(
    status: &ContractStatus,
    viewer_company: &CompanyId,
    viewer_role: Role,
) -> Result<AcceptanceView, ApprovalError> {
    let flags = status
        .acceptance
        .flags(viewer_company)
        .ok_or_else(|| ApprovalError::UnknownParticipant {
            company: viewer_company.clone(),
        })?;

    let phase = status.phase;
    let already_accepted = flags.get(viewer_role);
    let gated_out = phase.restricted_to_directors() && viewer_role != Role::Director;
    let offered_action = if already_accepted || gated_out {
        None
    } else {
        phase.offered_action()
    };

    let approved_label = match phase {
        Phase::Harmonization => Some(AcceptanceState::Harmonized),
        Phase::Signing => Some(AcceptanceState::Signed),
        _ => None,
    };
    let companies = match approved_label {
        Some(label) => status
            .acceptance
            .iter()
            .map(|(company, flags)| CompanyAcceptance {
                company: company.clone(),
                state: if flags.approves(phase) {
                    label
                } else {
                    AcceptanceState::Pending
                },
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(AcceptanceView {
        offered_action,
        companies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::{AcceptanceMatrix, Company};

    fn status_in(phase: Phase) -> ContractStatus {
        let companies = vec![Company::new("a", "Zesla Group"), Company::new("b", "ABC")];
        ContractStatus {
            phase,
            acceptance: AcceptanceMatrix::for_companies(&companies),
        }
    }

    #[test]
    fn test_offered_action_by_phase() {
        let a = CompanyId::from("a");
        let expected = [
            (Phase::Creating, Some(Action::Harmonize)),
            (Phase::Harmonization, Some(Action::Harmonize)),
            (Phase::Harmonized, Some(Action::Sign)),
            (Phase::Signing, Some(Action::Sign)),
            (Phase::Signed, Some(Action::Archive)),
            (Phase::Archived, None),
        ];
        for (phase, action) in expected {
            let view = project(&status_in(phase), &a, Role::Director).unwrap();
            assert_eq!(view.offered_action, action, "phase {phase}");
        }
    }

    #[test]
    fn test_non_directors_get_nothing_at_signing_gates() {
        let a = CompanyId::from("a");
        for phase in [Phase::Harmonized, Phase::Signing] {
            let view = project(&status_in(phase), &a, Role::Lawyer).unwrap();
            assert_eq!(view.offered_action, None);
        }
        let view = project(&status_in(Phase::Signed), &a, Role::Economist).unwrap();
        assert_eq!(view.offered_action, Some(Action::Archive));
    }

    #[test]
    fn test_already_accepted_role_is_not_offered_again() {
        let a = CompanyId::from("a");
        let mut status = status_in(Phase::Harmonization);
        status.acceptance.record(&a, Role::Economist);
        let view = project(&status, &a, Role::Economist).unwrap();
        assert_eq!(view.offered_action, None);
        let view = project(&status, &a, Role::Lawyer).unwrap();
        assert_eq!(view.offered_action, Some(Action::Harmonize));
    }

    #[test]
    fn test_summary_only_in_consensus_phases() {
        let a = CompanyId::from("a");
        let b = CompanyId::from("b");

        let mut signing = status_in(Phase::Signing);
        signing.acceptance.record(&b, Role::Director);
        let view = project(&signing, &a, Role::Director).unwrap();
        assert_eq!(
            view.companies,
            vec![
                CompanyAcceptance {
                    company: a.clone(),
                    state: AcceptanceState::Pending
                },
                CompanyAcceptance {
                    company: b.clone(),
                    state: AcceptanceState::Signed
                },
            ]
        );

        let mut harmonization = status_in(Phase::Harmonization);
        for role in Role::ALL {
            harmonization.acceptance.record(&a, role);
        }
        let view = project(&harmonization, &b, Role::Lawyer).unwrap();
        assert_eq!(view.companies[0].state, AcceptanceState::Harmonized);
        assert_eq!(view.companies[1].state, AcceptanceState::Pending);
        assert_eq!(view.companies[0].state.to_string(), "harmonized");

        for phase in [Phase::Creating, Phase::Harmonized, Phase::Signed, Phase::Archived] {
            let view = project(&status_in(phase), &a, Role::Director).unwrap();
            assert!(view.companies.is_empty());
        }
    }

    #[test]
    fn test_unknown_viewer_company() {
        let result = project(&status_in(Phase::Creating), &CompanyId::from("x"), Role::Lawyer);
        assert!(matches!(result, Err(ApprovalError::UnknownParticipant { .. })));
    }
}
