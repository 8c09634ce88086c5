// Collaborator interfaces - the stores, directory and transport around the core

use anyhow::Result;
use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::approval::types::{
    Company, CompanyId, Contract, ContractId, ContractStatus, Employee, EmployeeId, Invitation, InvitationId,
    InvitationStatus, InvitationType, NotificationEvent, VersionedContract,
};

/// Outcome of a compare-and-swap write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapResult {
    /// Written; the contract now carries `version`
    Swapped { version: u64 },
    /// Someone wrote first; re-read and try again
    Stale { current_version: u64 },
    /// Contract no longer exists
    Missing,
}

/// Contract persistence with per-contract versions
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn load(&self, id: &ContractId) -> Result<Option<VersionedContract>>;

    /// Insert a new contract at version 0
    async fn insert(&self, contract: Contract) -> Result<VersionedContract>;

    /// Replace the status only if the stored version still equals `expected_version`
    async fn compare_and_swap_status(
        &self,
        id: &ContractId,
        expected_version: u64,
        status: ContractStatus,
    ) -> Result<SwapResult>;

    /// Replace the text only if the stored version still equals `expected_version`
    async fn compare_and_swap_text(
        &self,
        id: &ContractId,
        expected_version: u64,
        text: String,
    ) -> Result<SwapResult>;

    /// Returns false when there was nothing to remove
    async fn remove(&self, id: &ContractId) -> Result<bool>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Pending invitations on `contract_id` of any of `types`
    async fn outstanding(
        &self,
        contract_id: &ContractId,
        types: &[InvitationType],
    ) -> Result<Vec<Invitation>>;

    async fn insert_many(&self, invitations: Vec<Invitation>) -> Result<()>;

    /// Delete the given invitations, returns how many existed
    async fn remove_many(&self, ids: &[InvitationId]) -> Result<usize>;

    /// Delete every invitation of `invitation_type` on the contract, returns how many
    async fn purge(&self, contract_id: &ContractId, invitation_type: InvitationType)
        -> Result<usize>;

    async fn get(&self, id: &InvitationId) -> Result<Option<Invitation>>;

    async fn set_status(&self, id: &InvitationId, status: InvitationStatus) -> Result<bool>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Delete all comments on the contract, returns how many
    async fn purge(&self, contract_id: &ContractId) -> Result<usize>;
}

/// Company and employee lookups
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    async fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>>;

    async fn employees_of(&self, company: &CompanyId) -> Result<Vec<Employee>>;

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>>;
}

/// Asynchronous notification delivery. A failed `deliver` is logged by the
/// executor and never undoes the transition that produced the events.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, events: Vec<NotificationEvent>) -> Result<()>;

    /// Drop every notification about the contract, returns how many
    async fn purge(&self, contract_id: &ContractId) -> Result<usize>;
}
