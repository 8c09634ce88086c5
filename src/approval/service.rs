// Approval service - read-modify-write of contract status with compare-and-swap retry
//
// The pure core decides; this layer loads snapshots, writes them back only if
// nobody else wrote in between, and runs the resulting effect scripts.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use crate::approval::effects::{plan_deletion, plan_invitation_notice, plan_transition, EffectScript};
use crate::approval::errors::ApprovalError;
use crate::approval::executor::{EffectExecutor, ExecutionReport};
use crate::approval::invitations::{
    draft_invitations, ensure_permitted, offered_types, permitted_invitations, select_recipients,
    InvitationOptions,
};
use crate::approval::memory::MemoryBackend;
use crate::approval::projector::{project, AcceptanceView};
use crate::approval::state_machine::apply_to_contract;
use crate::approval::traits::{
    CommentStore, ContractStore, Directory, InvitationStore, NotificationTransport, SwapResult,
};
use crate::approval::types::{
    Action, Actor, CompanyId, Contract, ContractId, ContractStatus, Employee, EmployeeId,
    Invitation, InvitationId, InvitationStatus, InvitationType, Phase, VersionedContract,
};
use crate::config::WorkflowConfig;
use crate::observability::{workflow_metrics, OperationTimer};
use crate::telemetry::{create_transition_span, generate_correlation_id};

/// Result of one `perform_action` call
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub old_phase: Phase,
    pub new_phase: Phase,
    pub status: ContractStatus,
    /// Store version the status is persisted at
    pub version: u64,
    pub script: EffectScript,
    pub report: ExecutionReport,
}

impl TransitionOutcome {
    pub fn advanced(&self) -> bool {
        self.new_phase != self.old_phase
    }
}

/// Everything one viewer sees of a contract
#[derive(Debug, Clone)]
pub struct ContractView {
    pub contract: Contract,
    pub version: u64,
    pub acceptance: AcceptanceView,
    pub invitations: InvitationOptions,
}

struct Committed {
    contract: Contract,
    status: ContractStatus,
    version: u64,
}

pub struct ApprovalService {
    contracts: Arc<dyn ContractStore>,
    invitations: Arc<dyn InvitationStore>,
    directory: Arc<dyn Directory>,
    executor: EffectExecutor,
    max_status_retries: u32,
}

impl ApprovalService {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        invitations: Arc<dyn InvitationStore>,
        comments: Arc<dyn CommentStore>,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn NotificationTransport>,
        settings: &WorkflowConfig,
    ) -> Self {
        let executor = EffectExecutor::new(
            invitations.clone(),
            comments,
            directory.clone(),
            transport,
        );
        Self {
            contracts,
            invitations,
            directory,
            executor,
            max_status_retries: settings.max_status_retries.max(1),
        }
    }

    pub fn from_backend(backend: &MemoryBackend, settings: &WorkflowConfig) -> Self {
        Self::new(
            backend.contracts.clone(),
            backend.invitations.clone(),
            backend.comments.clone(),
            backend.directory.clone(),
            backend.outbox.clone(),
            settings,
        )
    }

    /// Create a contract between the given companies, in `Creating` with an
    /// all-false acceptance matrix
    pub async fn create_contract(
        &self,
        text: &str,
        company_ids: &[CompanyId],
    ) -> Result<VersionedContract, ApprovalError> {
        let mut companies = Vec::with_capacity(company_ids.len());
        for id in company_ids {
            let company = self
                .directory
                .company(id)
                .await?
                .ok_or_else(|| ApprovalError::UnknownParticipant {
                    company: id.clone(),
                })?;
            companies.push(company);
        }
        if companies.is_empty() {
            return Err(ApprovalError::malformed("a contract needs at least one company"));
        }

        let contract = Contract::new(text, companies, Utc::now());
        let entry = self.contracts.insert(contract).await?;
        info!(
            contract_id = %entry.contract.id,
            companies = entry.contract.companies.len(),
            "Contract created"
        );
        Ok(entry)
    }

    /// Record `employee_id`'s request for `action` on the contract, persist the
    /// resulting status and run the effects of the (attempted) transition.
    pub async fn perform_action(
        &self,
        contract_id: &ContractId,
        employee_id: &EmployeeId,
        action: Action,
    ) -> Result<TransitionOutcome, ApprovalError> {
        let correlation_id = generate_correlation_id();
        let span = create_transition_span(
            "perform_action",
            Some(contract_id.as_str()),
            Some(employee_id.as_str()),
            &correlation_id,
        );
        self.perform_action_inner(contract_id, employee_id, action)
            .instrument(span)
            .await
    }

    async fn perform_action_inner(
        &self,
        contract_id: &ContractId,
        employee_id: &EmployeeId,
        action: Action,
    ) -> Result<TransitionOutcome, ApprovalError> {
        let timer = OperationTimer::new("perform_action");
        let metrics = workflow_metrics();
        metrics.record_action();

        let employee = self.employee(employee_id).await?;
        let actor = &employee;
        let (old_phase, committed) = self
            .with_retries(contract_id, move || self.attempt_action(contract_id, actor, action))
            .await?;
        let new_phase = committed.status.phase;

        if new_phase != old_phase {
            metrics.record_advance();
        } else if !action.is_valid_in(old_phase) {
            metrics.record_no_op();
        }

        let script = plan_transition(
            old_phase,
            new_phase,
            action,
            &committed.contract,
            &employee.id,
        );
        let report = self.executor.execute(&script, Utc::now()).await?;
        timer.finish();

        Ok(TransitionOutcome {
            old_phase,
            new_phase,
            status: committed.status,
            version: committed.version,
            script,
            report,
        })
    }

    /// One read-apply-swap round. A lost race comes back as `StaleSnapshot`.
    async fn attempt_action(
        &self,
        contract_id: &ContractId,
        employee: &Employee,
        action: Action,
    ) -> Result<(Phase, Committed), ApprovalError> {
        let VersionedContract { contract, version } = self.load(contract_id).await?;
        let old_phase = contract.phase();
        let status = apply_to_contract(&contract, &employee.company_id, employee.role, action)?;

        if status == contract.status {
            debug!(phase = %old_phase, action = %action, "Status unchanged, nothing to write");
            return Ok((
                old_phase,
                Committed {
                    contract,
                    status,
                    version,
                },
            ));
        }

        let swapped = self
            .contracts
            .compare_and_swap_status(contract_id, version, status.clone())
            .await?;
        let version = swapped_version(contract_id, version, swapped)?;
        Ok((
            old_phase,
            Committed {
                contract,
                status,
                version,
            },
        ))
    }

    /// Replace the contract text. The status is left alone.
    pub async fn revise_text(
        &self,
        contract_id: &ContractId,
        text: &str,
    ) -> Result<VersionedContract, ApprovalError> {
        self.with_retries(contract_id, || async move {
            let VersionedContract { mut contract, version } = self.load(contract_id).await?;
            let swapped = self
                .contracts
                .compare_and_swap_text(contract_id, version, text.to_string())
                .await?;
            let version = swapped_version(contract_id, version, swapped)?;
            contract.text = text.to_string();
            Ok(VersionedContract { contract, version })
        })
        .await
    }

    /// Remove a contract together with its invitations, comments and notifications
    pub async fn delete_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<ExecutionReport, ApprovalError> {
        if !self.contracts.remove(contract_id).await? {
            return Err(ApprovalError::ContractNotFound(contract_id.clone()));
        }
        let report = self
            .executor
            .execute(&plan_deletion(contract_id), Utc::now())
            .await?;
        info!(
            contract_id = %contract_id,
            invitations_purged = report.invitations_purged,
            comments_purged = report.comments_purged,
            notifications_purged = report.notifications_purged,
            "Contract deleted"
        );
        Ok(report)
    }

    /// Acceptance projection and invitation options for one employee
    pub async fn view(
        &self,
        contract_id: &ContractId,
        employee_id: &EmployeeId,
    ) -> Result<ContractView, ApprovalError> {
        let employee = self.employee(employee_id).await?;
        let VersionedContract { contract, version } = self.load(contract_id).await?;
        contract.status.acceptance.ensure_matches(&contract.companies)?;
        let acceptance = project(&contract.status, &employee.company_id, employee.role)?;
        let invitations = self.options_for(&contract, &employee.company_id).await?;
        Ok(ContractView {
            contract,
            version,
            acceptance,
            invitations,
        })
    }

    /// Invitations `employee_id` may still send on the contract
    pub async fn invitation_options(
        &self,
        contract_id: &ContractId,
        employee_id: &EmployeeId,
    ) -> Result<InvitationOptions, ApprovalError> {
        let employee = self.employee(employee_id).await?;
        let VersionedContract { contract, .. } = self.load(contract_id).await?;
        self.options_for(&contract, &employee.company_id).await
    }

    /// Send an invitation of `kind` from `creator_id` to `company`. Returns the
    /// invitations created, one per recipient employee.
    pub async fn invite(
        &self,
        contract_id: &ContractId,
        creator_id: &EmployeeId,
        kind: InvitationType,
        company: &CompanyId,
    ) -> Result<Vec<Invitation>, ApprovalError> {
        let creator = self.employee(creator_id).await?;
        let creator = &creator;
        let invitations = self
            .with_retries(contract_id, move || {
                self.attempt_invite(contract_id, creator, kind, company)
            })
            .await?;

        let recipient_ids = invitations
            .iter()
            .map(|i| i.recipient.employee_id.clone())
            .collect();
        let notice = plan_invitation_notice(contract_id, kind, recipient_ids);
        self.executor.execute(&notice, Utc::now()).await?;

        info!(
            contract_id = %contract_id,
            invitation_type = %kind,
            company = %company,
            recipients = invitations.len(),
            "Invitations sent"
        );
        Ok(invitations)
    }

    /// Gate check and insert against one snapshot. If the contract moved
    /// before the insert landed, the batch is taken back out and the round
    /// reports `StaleSnapshot`; a transition that commits later purges it.
    async fn attempt_invite(
        &self,
        contract_id: &ContractId,
        creator: &Employee,
        kind: InvitationType,
        company: &CompanyId,
    ) -> Result<Vec<Invitation>, ApprovalError> {
        let VersionedContract { contract, version } = self.load(contract_id).await?;
        if !contract.has_company(&creator.company_id) {
            return Err(ApprovalError::UnknownParticipant {
                company: creator.company_id.clone(),
            });
        }

        let options = self.options_for(&contract, &creator.company_id).await?;
        ensure_permitted(&options, kind, company)?;

        let staff = self.directory.employees_of(company).await?;
        let recipients = select_recipients(kind, &staff);
        if recipients.is_empty() {
            return Err(ApprovalError::InvitationNotPermitted {
                invitation_type: kind,
                company: company.clone(),
                reason: "company has nobody to receive it".to_string(),
            });
        }

        let invitations = draft_invitations(&contract.id, kind, &Actor::from(creator), &recipients, Utc::now());
        self.invitations.insert_many(invitations.clone()).await?;

        let found = self.contracts.load(contract_id).await?.map(|entry| entry.version);
        if found == Some(version) {
            return Ok(invitations);
        }

        let ids: Vec<InvitationId> = invitations.iter().map(|i| i.id.clone()).collect();
        let withdrawn = self.invitations.remove_many(&ids).await?;
        debug!(
            contract_id = %contract_id,
            expected = version,
            found = ?found,
            withdrawn,
            "Contract moved while inviting, invitations withdrawn"
        );
        match found {
            Some(found) => Err(ApprovalError::StaleSnapshot {
                contract: contract_id.clone(),
                expected: version,
                found,
            }),
            None => Err(ApprovalError::ContractNotFound(contract_id.clone())),
        }
    }

    /// Mark an invitation accepted. Accepting twice changes nothing.
    pub async fn accept_invitation(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<Invitation, ApprovalError> {
        let mut invitation = self
            .invitations
            .get(invitation_id)
            .await?
            .ok_or_else(|| ApprovalError::InvitationNotFound(invitation_id.clone()))?;
        if invitation.status == InvitationStatus::Accepted {
            return Ok(invitation);
        }
        if !self
            .invitations
            .set_status(invitation_id, InvitationStatus::Accepted)
            .await?
        {
            return Err(ApprovalError::InvitationNotFound(invitation_id.clone()));
        }
        invitation.status = InvitationStatus::Accepted;
        Ok(invitation)
    }

    async fn options_for(
        &self,
        contract: &Contract,
        requester: &CompanyId,
    ) -> Result<InvitationOptions, ApprovalError> {
        let types = offered_types(contract.phase());
        if types.is_empty() {
            return Ok(InvitationOptions::new());
        }
        let outstanding = self.invitations.outstanding(&contract.id, types).await?;
        Ok(permitted_invitations(contract, requester, &outstanding))
    }

    async fn employee(&self, id: &EmployeeId) -> Result<Employee, ApprovalError> {
        self.directory
            .employee(id)
            .await?
            .ok_or_else(|| ApprovalError::EmployeeNotFound(id.clone()))
    }

    async fn load(&self, id: &ContractId) -> Result<VersionedContract, ApprovalError> {
        self.contracts
            .load(id)
            .await?
            .ok_or_else(|| ApprovalError::ContractNotFound(id.clone()))
    }

    /// Re-run `attempt` on a fresh read while it reports a stale snapshot
    async fn with_retries<T, F, Fut>(
        &self,
        contract_id: &ContractId,
        mut attempt: F,
    ) -> Result<T, ApprovalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApprovalError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Err(err) if err.is_retryable() => {
                    workflow_metrics().record_stale_retry();
                    if attempts >= self.max_status_retries {
                        error!(
                            contract_id = %contract_id,
                            attempts,
                            "Contract kept changing underneath, giving up"
                        );
                        return Err(ApprovalError::RetriesExhausted {
                            contract: contract_id.clone(),
                            attempts,
                        });
                    }
                    warn!(contract_id = %contract_id, attempts, error = %err, "Retrying with a fresh read");
                }
                other => return other,
            }
        }
    }
}

/// Translate a compare-and-swap answer, turning a lost race into `StaleSnapshot`
fn swapped_version(
    contract_id: &ContractId,
    expected: u64,
    result: SwapResult,
) -> Result<u64, ApprovalError> {
    match result {
        SwapResult::Swapped { version } => Ok(version),
        SwapResult::Stale { current_version } => Err(ApprovalError::StaleSnapshot {
            contract: contract_id.clone(),
            expected,
            found: current_version,
        }),
        SwapResult::Missing => Err(ApprovalError::ContractNotFound(contract_id.clone())),
    }
}
