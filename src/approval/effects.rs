// Transition effect policy - cleanup and notifications a transition must trigger
//
// The policy only describes work. Nothing here touches a store; the script is
// handed to an executor that runs it against the collaborators.

use serde::{Deserialize, Serialize};

use crate::approval::types::{
    Action, CompanyId, Contract, ContractId, EmployeeId, InvitationType, NotificationKind, Phase,
};

/// Who should receive a notification, before directory lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientCriteria {
    /// Every employee of the companies except the acting employee
    AllEmployeesExcept {
        companies: Vec<CompanyId>,
        actor: EmployeeId,
    },
    /// Director-role employees of each company
    DirectorsOf { companies: Vec<CompanyId> },
    /// An explicit list, already resolved by the caller
    Employees(Vec<EmployeeId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub contract_id: ContractId,
    pub kind: NotificationKind,
    pub recipients: RecipientCriteria,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    PurgeInvitations {
        contract_id: ContractId,
        invitation_type: InvitationType,
    },
    PurgeComments {
        contract_id: ContractId,
    },
    /// Only planned when the contract itself goes away
    PurgeNotifications {
        contract_id: ContractId,
    },
    Notify(NotificationPlan),
}

/// Ordered side effects of one policy invocation. Items are independent of
/// each other, but the whole script must run before the next transition on
/// the same contract is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectScript {
    pub effects: Vec<Effect>,
}

impl EffectScript {
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Effect> {
        self.effects.iter()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &NotificationPlan> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Notify(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn purged_invitation_types(&self) -> Vec<InvitationType> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::PurgeInvitations {
                    invitation_type, ..
                } => Some(*invitation_type),
                _ => None,
            })
            .collect()
    }

    pub fn purges_comments(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| matches!(effect, Effect::PurgeComments { .. }))
    }
}

impl IntoIterator for EffectScript {
    type Item = Effect;
    type IntoIter = std::vec::IntoIter<Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.effects.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    EveryoneButActor,
    Directors,
}

/// Invitation type that stops making sense once a contract sits in `phase`
fn obsolete_invitation_type(phase: Phase) -> Option<InvitationType> {
    match phase {
        Phase::Harmonization => Some(InvitationType::Editing),
        Phase::Signing => Some(InvitationType::Harmonization),
        Phase::Signed => Some(InvitationType::Signing),
        Phase::Creating | Phase::Harmonized | Phase::Archived => None,
    }
}

/// Notification sent when a contract advances out of `from`
fn notification_on_leaving(from: Phase) -> Option<(NotificationKind, Audience)> {
    match from {
        Phase::Creating => Some((NotificationKind::Harmonization, Audience::EveryoneButActor)),
        Phase::Harmonization => Some((NotificationKind::Signing, Audience::Directors)),
        Phase::Signed => Some((NotificationKind::Archived, Audience::EveryoneButActor)),
        Phase::Harmonized | Phase::Signing | Phase::Archived => None,
    }
}

/// Plan the effects of an attempted transition `old -> new` caused by
/// `actor` requesting `action`. Also called when the phase did not move.
pub fn plan_transition(
    old: Phase,
    new: Phase,
    action: Action,
    contract: &Contract,
    actor: &EmployeeId,
) -> EffectScript {
    let mut script = EffectScript::default();

    if let Some(invitation_type) = obsolete_invitation_type(new) {
        script.push(Effect::PurgeInvitations {
            contract_id: contract.id.clone(),
            invitation_type,
        });
    }

    // every harmonize attempt resets the discussion, advanced or not
    if action == Action::Harmonize {
        script.push(Effect::PurgeComments {
            contract_id: contract.id.clone(),
        });
    }

    let advanced = old.next() == Some(new);
    if let Some((kind, audience)) = notification_on_leaving(old).filter(|_| advanced) {
        let companies = contract.company_ids();
        let recipients = match audience {
            Audience::EveryoneButActor => RecipientCriteria::AllEmployeesExcept {
                companies,
                actor: actor.clone(),
            },
            Audience::Directors => RecipientCriteria::DirectorsOf { companies },
        };
        script.push(Effect::Notify(NotificationPlan {
            contract_id: contract.id.clone(),
            kind,
            recipients,
        }));
    }

    script
}

/// Cleanup for a deleted contract: every invitation type, all comments and
/// the notifications already delivered about it
pub fn plan_deletion(contract_id: &ContractId) -> EffectScript {
    let mut script = EffectScript::default();
    for invitation_type in InvitationType::ALL {
        script.push(Effect::PurgeInvitations {
            contract_id: contract_id.clone(),
            invitation_type,
        });
    }
    script.push(Effect::PurgeComments {
        contract_id: contract_id.clone(),
    });
    script.push(Effect::PurgeNotifications {
        contract_id: contract_id.clone(),
    });
    script
}

/// Editing invitations are announced to their recipients; other types are not
pub fn plan_invitation_notice(
    contract_id: &ContractId,
    invitation_type: InvitationType,
    recipients: Vec<EmployeeId>,
) -> EffectScript {
    let mut script = EffectScript::default();
    if invitation_type == InvitationType::Editing && !recipients.is_empty() {
        script.push(Effect::Notify(NotificationPlan {
            contract_id: contract_id.clone(),
            kind: NotificationKind::Editing,
            recipients: RecipientCriteria::Employees(recipients),
        }));
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::Company;
    use chrono::Utc;

    fn contract() -> Contract {
        Contract::new(
            "text",
            vec![Company::new("a", "Zesla Group"), Company::new("b", "ABC")],
            Utc::now(),
        )
    }

    fn actor() -> EmployeeId {
        EmployeeId::from("l1")
    }

    #[test]
    fn test_creating_to_harmonization() {
        let contract = contract();
        let script = plan_transition(
            Phase::Creating,
            Phase::Harmonization,
            Action::Harmonize,
            &contract,
            &actor(),
        );
        assert_eq!(script.purged_invitation_types(), vec![InvitationType::Editing]);
        assert!(script.purges_comments());

        let notifications: Vec<_> = script.notifications().collect();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Harmonization);
        assert_eq!(
            notifications[0].recipients,
            RecipientCriteria::AllEmployeesExcept {
                companies: contract.company_ids(),
                actor: actor(),
            }
        );
    }

    #[test]
    fn test_harmonization_to_harmonized_notifies_directors_only() {
        let contract = contract();
        let script = plan_transition(
            Phase::Harmonization,
            Phase::Harmonized,
            Action::Harmonize,
            &contract,
            &actor(),
        );
        let notifications: Vec<_> = script.notifications().collect();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Signing);
        assert_eq!(
            notifications[0].recipients,
            RecipientCriteria::DirectorsOf {
                companies: contract.company_ids()
            }
        );
        assert!(script.purged_invitation_types().is_empty());
    }

    #[test]
    fn test_partial_harmonize_still_purges_comments() {
        let contract = contract();
        let script = plan_transition(
            Phase::Harmonization,
            Phase::Harmonization,
            Action::Harmonize,
            &contract,
            &actor(),
        );
        assert!(script.purges_comments());
        assert_eq!(script.notifications().count(), 0);
        // resulting phase is still Harmonization, editing invitations stay obsolete
        assert_eq!(script.purged_invitation_types(), vec![InvitationType::Editing]);
    }

    #[test]
    fn test_signing_phase_purges() {
        let contract = contract();
        let entering = plan_transition(Phase::Harmonized, Phase::Signing, Action::Sign, &contract, &actor());
        assert_eq!(entering.purged_invitation_types(), vec![InvitationType::Harmonization]);
        assert!(!entering.purges_comments());
        assert_eq!(entering.notifications().count(), 0);

        let leaving = plan_transition(Phase::Signing, Phase::Signed, Action::Sign, &contract, &actor());
        assert_eq!(leaving.purged_invitation_types(), vec![InvitationType::Signing]);
        assert_eq!(leaving.notifications().count(), 0);
    }

    #[test]
    fn test_archive_notifies_everyone_but_actor() {
        let contract = contract();
        let script = plan_transition(Phase::Signed, Phase::Archived, Action::Archive, &contract, &actor());
        assert!(script.purged_invitation_types().is_empty());
        let kinds: Vec<_> = script.notifications().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Archived]);
    }

    #[test]
    fn test_no_op_sign_attempt_produces_nothing() {
        let contract = contract();
        let script = plan_transition(Phase::Creating, Phase::Creating, Action::Sign, &contract, &actor());
        assert!(script.is_empty());
    }

    #[test]
    fn test_notification_table_exactness() {
        let contract = contract();
        for old in Phase::ALL {
            for new in Phase::ALL {
                let script = plan_transition(old, new, Action::Sign, &contract, &actor());
                let kinds: Vec<_> = script.notifications().map(|n| n.kind).collect();
                let expected = match (old, new) {
                    (Phase::Creating, Phase::Harmonization) => vec![NotificationKind::Harmonization],
                    (Phase::Harmonization, Phase::Harmonized) => vec![NotificationKind::Signing],
                    (Phase::Signed, Phase::Archived) => vec![NotificationKind::Archived],
                    _ => vec![],
                };
                assert_eq!(kinds, expected, "{old} -> {new}");
            }
        }
    }

    #[test]
    fn test_plan_deletion_covers_everything() {
        let id = ContractId::from("k");
        let script = plan_deletion(&id);
        assert_eq!(script.purged_invitation_types(), InvitationType::ALL.to_vec());
        assert!(script.purges_comments());
        assert!(matches!(
            script.effects.last(),
            Some(Effect::PurgeNotifications { contract_id }) if contract_id == &id
        ));
    }

    #[test]
    fn test_only_editing_invitations_are_announced() {
        let id = ContractId::from("k");
        let recipients = vec![EmployeeId::from("l2")];
        let editing = plan_invitation_notice(&id, InvitationType::Editing, recipients.clone());
        assert_eq!(editing.len(), 1);
        assert!(plan_invitation_notice(&id, InvitationType::Harmonization, recipients).is_empty());
        assert!(plan_invitation_notice(&id, InvitationType::Editing, vec![]).is_empty());
    }
}
