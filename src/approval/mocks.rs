// Mock collaborators for testing - races and failures on demand

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::approval::memory::{MemoryContractStore, MemoryDirectory, MemoryInvitationStore};
use crate::approval::traits::*;
use crate::approval::types::*;

/// Calls seen by a mock store, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Load(ContractId),
    SwapStatus { id: ContractId, expected_version: u64 },
    SwapText { id: ContractId, expected_version: u64 },
}

/// Contract store where another writer sneaks in before each of the first
/// `races` status writes, so those writes come back stale
#[derive(Debug)]
pub struct RacingContractStore {
    pub inner: MemoryContractStore,
    pub races_left: Mutex<u32>,
    pub calls: Mutex<Vec<StoreCall>>,
}

impl RacingContractStore {
    pub fn new(races: u32) -> Self {
        Self {
            inner: MemoryContractStore::default(),
            races_left: Mutex::new(races),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn get_calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_writes(&self) -> usize {
        self.get_calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::SwapStatus { .. }))
            .count()
    }

    async fn interfere(&self, id: &ContractId) -> Result<()> {
        let race = {
            let mut left = self.races_left.lock().unwrap();
            if *left == 0 {
                false
            } else {
                *left -= 1;
                true
            }
        };
        if race {
            let current = self
                .inner
                .load(id)
                .await?
                .ok_or_else(|| anyhow!("contract {} vanished", id))?;
            self.inner
                .compare_and_swap_text(id, current.version, current.contract.text)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContractStore for RacingContractStore {
    async fn load(&self, id: &ContractId) -> Result<Option<VersionedContract>> {
        self.calls.lock().unwrap().push(StoreCall::Load(id.clone()));
        self.inner.load(id).await
    }

    async fn insert(&self, contract: Contract) -> Result<VersionedContract> {
        self.inner.insert(contract).await
    }

    async fn compare_and_swap_status(
        &self,
        id: &ContractId,
        expected_version: u64,
        status: ContractStatus,
    ) -> Result<SwapResult> {
        self.calls.lock().unwrap().push(StoreCall::SwapStatus {
            id: id.clone(),
            expected_version,
        });
        self.interfere(id).await?;
        self.inner
            .compare_and_swap_status(id, expected_version, status)
            .await
    }

    async fn compare_and_swap_text(
        &self,
        id: &ContractId,
        expected_version: u64,
        text: String,
    ) -> Result<SwapResult> {
        self.calls.lock().unwrap().push(StoreCall::SwapText {
            id: id.clone(),
            expected_version,
        });
        self.interfere(id).await?;
        self.inner
            .compare_and_swap_text(id, expected_version, text)
            .await
    }

    async fn remove(&self, id: &ContractId) -> Result<bool> {
        self.inner.remove(id).await
    }
}

/// Comment store whose backend is down
#[derive(Debug, Default)]
pub struct FailingCommentStore {
    pub attempts: Mutex<u32>,
}

#[async_trait]
impl CommentStore for FailingCommentStore {
    async fn purge(&self, contract_id: &ContractId) -> Result<usize> {
        *self.attempts.lock().unwrap() += 1;
        Err(anyhow!("comment store unavailable while purging {}", contract_id))
    }
}

/// Write another session commits while `invite` is between its gate check
/// and its insert
#[derive(Debug, Clone)]
pub enum RivalWrite {
    /// Move the contract to `to` and run that phase's invitation purge
    Advance { to: Phase, purges: InvitationType },
    Revise(String),
}

/// Directory that lets a rival write land on the first staff lookup
#[derive(Debug)]
pub struct InterleavingDirectory {
    pub inner: Arc<MemoryDirectory>,
    pub contracts: Arc<MemoryContractStore>,
    pub invitations: Arc<MemoryInvitationStore>,
    pub contract_id: ContractId,
    pub rival: Mutex<Option<RivalWrite>>,
    pub lookups: Mutex<u32>,
}

impl InterleavingDirectory {
    pub fn new(
        inner: Arc<MemoryDirectory>,
        contracts: Arc<MemoryContractStore>,
        invitations: Arc<MemoryInvitationStore>,
        contract_id: ContractId,
        rival: RivalWrite,
    ) -> Self {
        Self {
            inner,
            contracts,
            invitations,
            contract_id,
            rival: Mutex::new(Some(rival)),
            lookups: Mutex::new(0),
        }
    }

    async fn commit_rival(&self, rival: RivalWrite) -> Result<()> {
        let current = self
            .contracts
            .load(&self.contract_id)
            .await?
            .ok_or_else(|| anyhow!("contract {} vanished", self.contract_id))?;
        match rival {
            RivalWrite::Advance { to, purges } => {
                let mut status = current.contract.status.clone();
                status.phase = to;
                self.contracts
                    .compare_and_swap_status(&self.contract_id, current.version, status)
                    .await?;
                self.invitations.purge(&self.contract_id, purges).await?;
            }
            RivalWrite::Revise(text) => {
                self.contracts
                    .compare_and_swap_text(&self.contract_id, current.version, text)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for InterleavingDirectory {
    async fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>> {
        self.inner.employee(id).await
    }

    async fn employees_of(&self, company: &CompanyId) -> Result<Vec<Employee>> {
        *self.lookups.lock().unwrap() += 1;
        let rival = self.rival.lock().unwrap().take();
        if let Some(rival) = rival {
            self.commit_rival(rival).await?;
        }
        self.inner.employees_of(company).await
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>> {
        self.inner.company(id).await
    }
}
