// In-memory collaborators backed by a serializable workspace snapshot

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::approval::traits::{
    CommentStore, ContractStore, Directory, InvitationStore, NotificationTransport, SwapResult,
};
use crate::approval::types::{
    Comment, Company, CompanyId, Contract, ContractId, ContractStatus, Employee, EmployeeId,
    Invitation, InvitationId, InvitationStatus, InvitationType, NotificationEvent,
    VersionedContract,
};

/// Everything the in-memory backend holds, in a form that round-trips through JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub contracts: Vec<VersionedContract>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub notifications: Vec<NotificationEvent>,
}

/// Contract arena indexed by id, each entry carrying its own version
#[derive(Debug, Default)]
pub struct MemoryContractStore {
    contracts: RwLock<BTreeMap<ContractId, VersionedContract>>,
}

impl MemoryContractStore {
    pub fn new(contracts: Vec<VersionedContract>) -> Self {
        Self {
            contracts: RwLock::new(
                contracts
                    .into_iter()
                    .map(|entry| (entry.contract.id.clone(), entry))
                    .collect(),
            ),
        }
    }

    pub async fn all(&self) -> Vec<VersionedContract> {
        self.contracts.read().await.values().cloned().collect()
    }

    async fn swap_with(
        &self,
        id: &ContractId,
        expected_version: u64,
        update: impl FnOnce(&mut Contract),
    ) -> SwapResult {
        let mut contracts = self.contracts.write().await;
        let Some(entry) = contracts.get_mut(id) else {
            return SwapResult::Missing;
        };
        if entry.version != expected_version {
            return SwapResult::Stale {
                current_version: entry.version,
            };
        }
        update(&mut entry.contract);
        entry.version += 1;
        SwapResult::Swapped {
            version: entry.version,
        }
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn load(&self, id: &ContractId) -> Result<Option<VersionedContract>> {
        Ok(self.contracts.read().await.get(id).cloned())
    }

    async fn insert(&self, contract: Contract) -> Result<VersionedContract> {
        let mut contracts = self.contracts.write().await;
        if contracts.contains_key(&contract.id) {
            anyhow::bail!("contract {} already exists", contract.id);
        }
        let entry = VersionedContract {
            contract,
            version: 0,
        };
        contracts.insert(entry.contract.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn compare_and_swap_status(
        &self,
        id: &ContractId,
        expected_version: u64,
        status: ContractStatus,
    ) -> Result<SwapResult> {
        Ok(self
            .swap_with(id, expected_version, |contract| contract.status = status)
            .await)
    }

    async fn compare_and_swap_text(
        &self,
        id: &ContractId,
        expected_version: u64,
        text: String,
    ) -> Result<SwapResult> {
        Ok(self
            .swap_with(id, expected_version, |contract| contract.text = text)
            .await)
    }

    async fn remove(&self, id: &ContractId) -> Result<bool> {
        Ok(self.contracts.write().await.remove(id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct MemoryInvitationStore {
    invitations: RwLock<Vec<Invitation>>,
}

impl MemoryInvitationStore {
    pub fn new(invitations: Vec<Invitation>) -> Self {
        Self {
            invitations: RwLock::new(invitations),
        }
    }

    pub async fn all(&self) -> Vec<Invitation> {
        self.invitations.read().await.clone()
    }
}

#[async_trait]
impl InvitationStore for MemoryInvitationStore {
    async fn outstanding(
        &self,
        contract_id: &ContractId,
        types: &[InvitationType],
    ) -> Result<Vec<Invitation>> {
        Ok(self
            .invitations
            .read()
            .await
            .iter()
            .filter(|i| {
                &i.contract_id == contract_id && i.is_pending() && types.contains(&i.invitation_type)
            })
            .cloned()
            .collect())
    }

    async fn insert_many(&self, invitations: Vec<Invitation>) -> Result<()> {
        self.invitations.write().await.extend(invitations);
        Ok(())
    }

    async fn remove_many(&self, ids: &[InvitationId]) -> Result<usize> {
        let mut invitations = self.invitations.write().await;
        let before = invitations.len();
        invitations.retain(|i| !ids.contains(&i.id));
        Ok(before - invitations.len())
    }

    async fn purge(
        &self,
        contract_id: &ContractId,
        invitation_type: InvitationType,
    ) -> Result<usize> {
        let mut invitations = self.invitations.write().await;
        let before = invitations.len();
        invitations
            .retain(|i| !(&i.contract_id == contract_id && i.invitation_type == invitation_type));
        Ok(before - invitations.len())
    }

    async fn get(&self, id: &InvitationId) -> Result<Option<Invitation>> {
        Ok(self
            .invitations
            .read()
            .await
            .iter()
            .find(|i| &i.id == id)
            .cloned())
    }

    async fn set_status(&self, id: &InvitationId, status: InvitationStatus) -> Result<bool> {
        let mut invitations = self.invitations.write().await;
        match invitations.iter_mut().find(|i| &i.id == id) {
            Some(invitation) => {
                invitation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCommentStore {
    comments: RwLock<Vec<Comment>>,
}

impl MemoryCommentStore {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            comments: RwLock::new(comments),
        }
    }

    pub async fn add(&self, comment: Comment) {
        self.comments.write().await.push(comment);
    }

    pub async fn count_for(&self, contract_id: &ContractId) -> usize {
        self.comments
            .read()
            .await
            .iter()
            .filter(|c| &c.contract_id == contract_id)
            .count()
    }

    pub async fn all(&self) -> Vec<Comment> {
        self.comments.read().await.clone()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn purge(&self, contract_id: &ContractId) -> Result<usize> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| &c.contract_id != contract_id);
        Ok(before - comments.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    companies: Vec<Company>,
    employees: Vec<Employee>,
}

impl MemoryDirectory {
    pub fn new(companies: Vec<Company>, employees: Vec<Employee>) -> Self {
        Self {
            companies,
            employees,
        }
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>> {
        Ok(self.employees.iter().find(|e| &e.id == id).cloned())
    }

    async fn employees_of(&self, company: &CompanyId) -> Result<Vec<Employee>> {
        Ok(self
            .employees
            .iter()
            .filter(|e| &e.company_id == company)
            .cloned()
            .collect())
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>> {
        Ok(self.companies.iter().find(|c| &c.id == id).cloned())
    }
}

/// Transport that keeps every delivered notification in memory
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    delivered: RwLock<Vec<NotificationEvent>>,
}

impl MemoryOutbox {
    pub fn new(delivered: Vec<NotificationEvent>) -> Self {
        Self {
            delivered: RwLock::new(delivered),
        }
    }

    pub async fn delivered(&self) -> Vec<NotificationEvent> {
        self.delivered.read().await.clone()
    }

    pub async fn for_recipient(&self, recipient: &EmployeeId) -> Vec<NotificationEvent> {
        self.delivered
            .read()
            .await
            .iter()
            .filter(|n| &n.recipient_id == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationTransport for MemoryOutbox {
    async fn deliver(&self, events: Vec<NotificationEvent>) -> Result<()> {
        self.delivered.write().await.extend(events);
        Ok(())
    }

    async fn purge(&self, contract_id: &ContractId) -> Result<usize> {
        let mut delivered = self.delivered.write().await;
        let before = delivered.len();
        delivered.retain(|n| &n.contract_id != contract_id);
        Ok(before - delivered.len())
    }
}

/// All in-memory collaborators, sharing one workspace
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    pub contracts: Arc<MemoryContractStore>,
    pub invitations: Arc<MemoryInvitationStore>,
    pub comments: Arc<MemoryCommentStore>,
    pub directory: Arc<MemoryDirectory>,
    pub outbox: Arc<MemoryOutbox>,
}

impl MemoryBackend {
    pub fn from_workspace(workspace: Workspace) -> Self {
        Self {
            contracts: Arc::new(MemoryContractStore::new(workspace.contracts)),
            invitations: Arc::new(MemoryInvitationStore::new(workspace.invitations)),
            comments: Arc::new(MemoryCommentStore::new(workspace.comments)),
            directory: Arc::new(MemoryDirectory::new(workspace.companies, workspace.employees)),
            outbox: Arc::new(MemoryOutbox::new(workspace.notifications)),
        }
    }

    pub async fn snapshot(&self) -> Workspace {
        Workspace {
            companies: self.directory.companies().to_vec(),
            employees: self.directory.employees().to_vec(),
            contracts: self.contracts.all().await,
            invitations: self.invitations.all().await,
            comments: self.comments.all().await,
            notifications: self.outbox.delivered().await,
        }
    }
}
