// Effect script executor - runs planned effects against the collaborators

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::approval::effects::{Effect, EffectScript, NotificationPlan, RecipientCriteria};
use crate::approval::errors::ApprovalError;
use crate::approval::traits::{CommentStore, Directory, InvitationStore, NotificationTransport};
use crate::approval::types::{EmployeeId, NotificationEvent, Role};
use crate::observability::workflow_metrics;

/// What running a script did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub invitations_purged: usize,
    pub comments_purged: usize,
    pub notifications_purged: usize,
    /// Events handed to the transport
    pub notifications: Vec<NotificationEvent>,
    /// Events the transport refused
    pub undelivered: usize,
}

pub struct EffectExecutor {
    invitations: Arc<dyn InvitationStore>,
    comments: Arc<dyn CommentStore>,
    directory: Arc<dyn Directory>,
    transport: Arc<dyn NotificationTransport>,
}

impl EffectExecutor {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        comments: Arc<dyn CommentStore>,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        Self {
            invitations,
            comments,
            directory,
            transport,
        }
    }

    /// Run every effect in order. The first store or directory failure stops
    /// the script and is returned; effects already applied stay applied. A
    /// transport that refuses a batch is logged and the script goes on.
    pub async fn execute(
        &self,
        script: &EffectScript,
        now: DateTime<Utc>,
    ) -> Result<ExecutionReport, ApprovalError> {
        let mut report = ExecutionReport::default();
        let metrics = workflow_metrics();

        for effect in script.iter() {
            match effect {
                Effect::PurgeInvitations {
                    contract_id,
                    invitation_type,
                } => {
                    let purged = self.invitations.purge(contract_id, *invitation_type).await?;
                    metrics.record_invitations_purged(purged as u64);
                    debug!(
                        contract_id = %contract_id,
                        invitation_type = %invitation_type,
                        purged,
                        "Purged obsolete invitations"
                    );
                    report.invitations_purged += purged;
                }
                Effect::PurgeComments { contract_id } => {
                    let purged = self.comments.purge(contract_id).await?;
                    metrics.record_comments_purged(purged as u64);
                    debug!(contract_id = %contract_id, purged, "Purged comments");
                    report.comments_purged += purged;
                }
                Effect::PurgeNotifications { contract_id } => {
                    let purged = self.transport.purge(contract_id).await?;
                    metrics.record_notifications_purged(purged as u64);
                    debug!(contract_id = %contract_id, purged, "Purged notifications");
                    report.notifications_purged += purged;
                }
                Effect::Notify(plan) => {
                    let events = self.notification_events(plan, now).await?;
                    if events.is_empty() {
                        debug!(contract_id = %plan.contract_id, kind = %plan.kind, "No recipients, nothing delivered");
                        continue;
                    }
                    if let Err(err) = self.transport.deliver(events.clone()).await {
                        metrics.record_delivery_failure();
                        warn!(
                            contract_id = %plan.contract_id,
                            kind = %plan.kind,
                            recipients = events.len(),
                            error = %err,
                            "Transport refused notifications"
                        );
                        report.undelivered += events.len();
                        continue;
                    }
                    metrics.record_notifications(events.len() as u64);
                    info!(
                        contract_id = %plan.contract_id,
                        kind = %plan.kind,
                        recipients = events.len(),
                        "Notifications handed to transport"
                    );
                    report.notifications.extend(events);
                }
            }
        }

        Ok(report)
    }

    /// Expand recipient criteria into concrete employees, each at most once
    pub async fn resolve(&self, criteria: &RecipientCriteria) -> Result<Vec<EmployeeId>, ApprovalError> {
        let mut recipients: Vec<EmployeeId> = Vec::new();
        match criteria {
            RecipientCriteria::AllEmployeesExcept { companies, actor } => {
                for company in companies {
                    for employee in self.directory.employees_of(company).await? {
                        if &employee.id != actor && !recipients.contains(&employee.id) {
                            recipients.push(employee.id);
                        }
                    }
                }
            }
            RecipientCriteria::DirectorsOf { companies } => {
                for company in companies {
                    for employee in self.directory.employees_of(company).await? {
                        if employee.role == Role::Director && !recipients.contains(&employee.id) {
                            recipients.push(employee.id);
                        }
                    }
                }
            }
            RecipientCriteria::Employees(list) => {
                for id in list {
                    if !recipients.contains(id) {
                        recipients.push(id.clone());
                    }
                }
            }
        }
        Ok(recipients)
    }

    async fn notification_events(
        &self,
        plan: &NotificationPlan,
        now: DateTime<Utc>,
    ) -> Result<Vec<NotificationEvent>, ApprovalError> {
        let recipients = self.resolve(&plan.recipients).await?;
        Ok(recipients
            .into_iter()
            .map(|recipient_id| NotificationEvent {
                contract_id: plan.contract_id.clone(),
                recipient_id,
                kind: plan.kind,
                text: plan.kind.text().to_string(),
                created_at: now,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::memory::{MemoryCommentStore, MemoryDirectory, MemoryInvitationStore, MemoryOutbox};
    use crate::approval::types::{CompanyId, ContractId, Employee, NotificationKind};

    fn staff() -> Vec<Employee> {
        [("l1", "a", Role::Lawyer), ("d1", "a", Role::Director), ("d2", "b", Role::Director)]
            .into_iter()
            .map(|(id, company, role)| Employee {
                id: EmployeeId::from(id),
                name: id.to_string(),
                company_id: CompanyId::from(company),
                role,
                email: format!("{id}@example.com"),
            })
            .collect()
    }

    fn executor(outbox: Arc<MemoryOutbox>) -> EffectExecutor {
        EffectExecutor::new(
            Arc::new(MemoryInvitationStore::default()),
            Arc::new(MemoryCommentStore::default()),
            Arc::new(MemoryDirectory::new(Vec::new(), staff())),
            outbox,
        )
    }

    #[tokio::test]
    async fn test_resolve_criteria() {
        let executor = executor(Arc::new(MemoryOutbox::default()));
        let companies = vec![CompanyId::from("a"), CompanyId::from("b"), CompanyId::from("a")];

        let directors = executor
            .resolve(&RecipientCriteria::DirectorsOf {
                companies: companies.clone(),
            })
            .await
            .unwrap();
        assert_eq!(directors, vec![EmployeeId::from("d1"), EmployeeId::from("d2")]);

        let others = executor
            .resolve(&RecipientCriteria::AllEmployeesExcept {
                companies,
                actor: EmployeeId::from("d1"),
            })
            .await
            .unwrap();
        assert_eq!(others, vec![EmployeeId::from("l1"), EmployeeId::from("d2")]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_delivered() {
        let outbox = Arc::new(MemoryOutbox::default());
        let executor = executor(outbox.clone());
        let mut script = EffectScript::default();
        script.push(Effect::Notify(NotificationPlan {
            contract_id: ContractId::from("c"),
            kind: NotificationKind::Archived,
            recipients: RecipientCriteria::DirectorsOf {
                companies: vec![CompanyId::from("nobody")],
            },
        }));
        script.push(Effect::Notify(NotificationPlan {
            contract_id: ContractId::from("c"),
            kind: NotificationKind::Signing,
            recipients: RecipientCriteria::Employees(vec![EmployeeId::from("d2"), EmployeeId::from("d2")]),
        }));

        let now = Utc::now();
        let report = executor.execute(&script, now).await.unwrap();
        assert_eq!(report.notifications.len(), 1);
        let delivered = outbox.delivered().await;
        assert_eq!(delivered, report.notifications);
        assert_eq!(delivered[0].text, NotificationKind::Signing.text());
        assert_eq!(delivered[0].created_at, now);
    }

    #[tokio::test]
    async fn test_refused_batch_does_not_stop_the_script() {
        let mut transport = crate::approval::traits::MockNotificationTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_deliver()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("mail relay down")));
        transport
            .expect_deliver()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let comments = Arc::new(MemoryCommentStore::default());
        let executor = EffectExecutor::new(
            Arc::new(MemoryInvitationStore::default()),
            comments,
            Arc::new(MemoryDirectory::new(Vec::new(), staff())),
            Arc::new(transport),
        );
        let contract_id = ContractId::from("c");
        let mut script = EffectScript::default();
        for (kind, who) in [(NotificationKind::Editing, "l1"), (NotificationKind::Signing, "d2")] {
            script.push(Effect::Notify(NotificationPlan {
                contract_id: contract_id.clone(),
                kind,
                recipients: RecipientCriteria::Employees(vec![EmployeeId::from(who)]),
            }));
        }
        script.push(Effect::PurgeComments { contract_id });

        let report = executor.execute(&script, Utc::now()).await.unwrap();
        assert_eq!(report.undelivered, 1);
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].recipient_id, EmployeeId::from("d2"));
    }
}
