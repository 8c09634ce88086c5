// Property-Based Testing for the Contract Phase Machine
// Checks the status invariants over arbitrary sequences of approvals

use concordat::approval::state_machine::apply;
use concordat::approval::types::{
    Action, Company, CompanyId, ContractStatus, Phase, PhaseKind, Role,
};
use proptest::prelude::*;
use proptest_derive::Arbitrary;

#[derive(Debug, Clone, Arbitrary)]
struct Step {
    #[proptest(strategy = "0usize..3")]
    company: usize,
    #[proptest(strategy = "role_strategy()")]
    role: Role,
    #[proptest(strategy = "action_strategy()")]
    action: Action,
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Lawyer), Just(Role::Economist), Just(Role::Director)]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Harmonize), Just(Action::Sign), Just(Action::Archive)]
}

fn companies() -> Vec<Company> {
    vec![
        Company::new("a", "Zesla Group"),
        Company::new("b", "ABC"),
        Company::new("c", "Northwind"),
    ]
}

fn company_id(index: usize) -> CompanyId {
    companies()[index].id.clone()
}

proptest! {
    #[test]
    fn test_phase_never_decreases(steps in prop::collection::vec(any::<Step>(), 0..120)) {
        let companies = companies();
        let mut status = ContractStatus::initial(&companies);
        for step in steps {
            let next = apply(&status, &company_id(step.company), step.role, step.action).unwrap();
            prop_assert!(next.phase >= status.phase);
            prop_assert!(next.acceptance.ensure_matches(&companies).is_ok());
            status = next;
        }
    }

    #[test]
    fn test_leaving_consensus_phase_clears_matrix(steps in prop::collection::vec(any::<Step>(), 0..120)) {
        let mut status = ContractStatus::initial(&companies());
        for step in steps {
            let next = apply(&status, &company_id(step.company), step.role, step.action).unwrap();
            if next.phase != status.phase && status.phase.kind() == PhaseKind::Consensus {
                prop_assert!(next.acceptance.is_cleared());
            }
            status = next;
        }
    }

    #[test]
    fn test_phase_moves_at_most_one_step(steps in prop::collection::vec(any::<Step>(), 0..120)) {
        let mut status = ContractStatus::initial(&companies());
        for step in steps {
            let next = apply(&status, &company_id(step.company), step.role, step.action).unwrap();
            prop_assert!(next.phase == status.phase || status.phase.next() == Some(next.phase));
            status = next;
        }
    }

    #[test]
    fn test_invalid_action_leaves_status_untouched(
        steps in prop::collection::vec(any::<Step>(), 0..60),
        probe in any::<Step>(),
    ) {
        let mut status = ContractStatus::initial(&companies());
        for step in steps {
            status = apply(&status, &company_id(step.company), step.role, step.action).unwrap();
        }
        if !probe.action.is_valid_in(status.phase) {
            let next = apply(&status, &company_id(probe.company), probe.role, probe.action).unwrap();
            prop_assert_eq!(next, status);
        }
    }

    #[test]
    fn test_signing_needs_every_director(
        non_directors in prop::collection::vec((0usize..3, prop_oneof![Just(Role::Lawyer), Just(Role::Economist)]), 0..30),
    ) {
        let companies = companies();
        let mut status = ContractStatus::initial(&companies);
        status.phase = Phase::Signing;
        for (company, role) in non_directors {
            status = apply(&status, &company_id(company), role, Action::Sign).unwrap();
            prop_assert_eq!(status.phase, Phase::Signing);
        }
        for index in 0..companies.len() {
            let before = status.phase;
            status = apply(&status, &company_id(index), Role::Director, Action::Sign).unwrap();
            if index + 1 < companies.len() {
                prop_assert_eq!(status.phase, before);
            }
        }
        prop_assert_eq!(status.phase, Phase::Signed);
        prop_assert!(status.acceptance.is_cleared());
    }
}
