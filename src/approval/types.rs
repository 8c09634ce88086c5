// Core types for the contract approval workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::approval::errors::ApprovalError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of a contract
    ContractId
);
string_id!(
    /// Identity of a participating company
    CompanyId
);
string_id!(
    /// Identity of a single employee of a company
    EmployeeId
);
string_id!(
    /// Identity of a collaboration invitation
    InvitationId
);

/// A company that can take part in contracts. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CompanyId::new(id),
            name: name.into(),
        }
    }
}

/// Roles an employee can hold inside its company
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Lawyer,
    Economist,
    Director,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Lawyer, Role::Economist, Role::Director];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Lawyer => "lawyer",
            Role::Economist => "economist",
            Role::Director => "director",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role '{s}' (expected lawyer, economist or director)"))
    }
}

/// Directory entry for an employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub company_id: CompanyId,
    pub role: Role,
    pub email: String,
}

/// The party on either end of an invitation, or the one acting on a contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub employee_id: EmployeeId,
    pub company_id: CompanyId,
}

impl From<&Employee> for Actor {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id.clone(),
            company_id: employee.company_id.clone(),
        }
    }
}

/// Lifecycle phases of a contract, in their total order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Creating,
    Harmonization,
    Harmonized,
    Signing,
    Signed,
    Archived,
}

/// How a phase is left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    /// One valid action advances the phase
    Entry,
    /// Every company has to agree before the phase advances
    Consensus,
    /// No action is valid
    Terminal,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Creating,
        Phase::Harmonization,
        Phase::Harmonized,
        Phase::Signing,
        Phase::Signed,
        Phase::Archived,
    ];

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Creating => Some(Phase::Harmonization),
            Phase::Harmonization => Some(Phase::Harmonized),
            Phase::Harmonized => Some(Phase::Signing),
            Phase::Signing => Some(Phase::Signed),
            Phase::Signed => Some(Phase::Archived),
            Phase::Archived => None,
        }
    }

    pub fn kind(self) -> PhaseKind {
        match self {
            Phase::Creating | Phase::Harmonized | Phase::Signed => PhaseKind::Entry,
            Phase::Harmonization | Phase::Signing => PhaseKind::Consensus,
            Phase::Archived => PhaseKind::Terminal,
        }
    }

    /// The action that moves a contract out of this phase
    pub fn offered_action(self) -> Option<Action> {
        match self {
            Phase::Creating | Phase::Harmonization => Some(Action::Harmonize),
            Phase::Harmonized | Phase::Signing => Some(Action::Sign),
            Phase::Signed => Some(Action::Archive),
            Phase::Archived => None,
        }
    }

    /// Only directors may act at the review and signing gates
    pub fn restricted_to_directors(self) -> bool {
        matches!(self, Phase::Harmonized | Phase::Signing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Creating => "creating",
            Phase::Harmonization => "harmonization",
            Phase::Harmonized => "harmonized",
            Phase::Signing => "signing",
            Phase::Signed => "signed",
            Phase::Archived => "archived",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a participant can request on a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Harmonize,
    Sign,
    Archive,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Harmonize, Action::Sign, Action::Archive];

    /// Phases from which this action has any effect
    pub fn valid_phases(self) -> &'static [Phase] {
        match self {
            Action::Harmonize => &[Phase::Creating, Phase::Harmonization],
            Action::Sign => &[Phase::Harmonized, Phase::Signing],
            Action::Archive => &[Phase::Signed],
        }
    }

    pub fn is_valid_in(self, phase: Phase) -> bool {
        self.valid_phases().contains(&phase)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Harmonize => "harmonize",
            Action::Sign => "sign",
            Action::Archive => "archive",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action '{s}' (expected harmonize, sign or archive)"))
    }
}

/// Acceptance flags of one company, one per role.
///
/// The three fields are the whole role set, so a persisted entry with a
/// missing or unexpected role key fails to deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleFlags {
    pub lawyer: bool,
    pub economist: bool,
    pub director: bool,
}

impl RoleFlags {
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::Lawyer => self.lawyer,
            Role::Economist => self.economist,
            Role::Director => self.director,
        }
    }

    pub fn set(&mut self, role: Role) {
        match role {
            Role::Lawyer => self.lawyer = true,
            Role::Economist => self.economist = true,
            Role::Director => self.director = true,
        }
    }

    pub fn all(&self) -> bool {
        self.lawyer && self.economist && self.director
    }

    pub fn any(&self) -> bool {
        self.lawyer || self.economist || self.director
    }

    /// Whether these flags count as the company's approval in `phase`.
    /// Signing needs the director alone, every other phase needs all roles.
    pub fn approves(&self, phase: Phase) -> bool {
        if phase == Phase::Signing {
            self.director
        } else {
            self.all()
        }
    }
}

/// Per-company, per-role ledger of recorded agreement within the current phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcceptanceMatrix(BTreeMap<CompanyId, RoleFlags>);

impl AcceptanceMatrix {
    /// All-false matrix keyed by exactly the given companies
    pub fn for_companies(companies: &[Company]) -> Self {
        Self(
            companies
                .iter()
                .map(|company| (company.id.clone(), RoleFlags::default()))
                .collect(),
        )
    }

    pub fn flags(&self, company: &CompanyId) -> Option<&RoleFlags> {
        self.0.get(company)
    }

    pub fn contains(&self, company: &CompanyId) -> bool {
        self.0.contains_key(company)
    }

    pub fn is_accepted(&self, company: &CompanyId, role: Role) -> bool {
        self.0.get(company).is_some_and(|flags| flags.get(role))
    }

    /// Record acceptance for `company`/`role`. Returns false when the company
    /// has no entry; the matrix is never extended.
    pub fn record(&mut self, company: &CompanyId, role: Role) -> bool {
        match self.0.get_mut(company) {
            Some(flags) => {
                flags.set(role);
                true
            }
            None => false,
        }
    }

    pub fn approved(&self, company: &CompanyId, phase: Phase) -> bool {
        self.0.get(company).is_some_and(|flags| flags.approves(phase))
    }

    pub fn all_approved(&self, phase: Phase) -> bool {
        self.0.values().all(|flags| flags.approves(phase))
    }

    pub fn reset(&mut self) {
        for flags in self.0.values_mut() {
            *flags = RoleFlags::default();
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.0.values().all(|flags| !flags.any())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompanyId, &RoleFlags)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key set must equal the contract's companies, no more, no less
    pub fn ensure_matches(&self, companies: &[Company]) -> Result<(), ApprovalError> {
        if self.0.is_empty() {
            return Err(ApprovalError::malformed("matrix has no companies"));
        }
        if let Some(missing) = companies.iter().find(|c| !self.0.contains_key(&c.id)) {
            return Err(ApprovalError::malformed(format!(
                "no entry for company {}",
                missing.id
            )));
        }
        if let Some(extra) = self
            .0
            .keys()
            .find(|id| !companies.iter().any(|c| &c.id == *id))
        {
            return Err(ApprovalError::malformed(format!(
                "entry for company {extra} which is not on the contract"
            )));
        }
        Ok(())
    }
}

/// Phase plus acceptance ledger. Replaced as a whole on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStatus {
    pub phase: Phase,
    pub acceptance: AcceptanceMatrix,
}

impl ContractStatus {
    pub fn initial(companies: &[Company]) -> Self {
        Self {
            phase: Phase::Creating,
            acceptance: AcceptanceMatrix::for_companies(companies),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub text: String,
    pub companies: Vec<Company>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// New contract in `Creating` with an all-false matrix. Repeated company
    /// ids keep their first occurrence.
    pub fn new(text: impl Into<String>, companies: Vec<Company>, created_at: DateTime<Utc>) -> Self {
        let mut unique: Vec<Company> = Vec::with_capacity(companies.len());
        for company in companies {
            if !unique.iter().any(|c| c.id == company.id) {
                unique.push(company);
            }
        }
        let status = ContractStatus::initial(&unique);
        Self {
            id: ContractId::generate(),
            text: text.into(),
            companies: unique,
            status,
            created_at,
        }
    }

    pub fn has_company(&self, company: &CompanyId) -> bool {
        self.companies.iter().any(|c| &c.id == company)
    }

    pub fn company_ids(&self) -> Vec<CompanyId> {
        self.companies.iter().map(|c| c.id.clone()).collect()
    }

    pub fn phase(&self) -> Phase {
        self.status.phase
    }
}

/// A contract together with the store version it was read at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedContract {
    pub contract: Contract,
    pub version: u64,
}

/// Kinds of collaboration request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationType {
    Editing,
    Harmonization,
    Signing,
}

impl InvitationType {
    pub const ALL: [InvitationType; 3] = [
        InvitationType::Editing,
        InvitationType::Harmonization,
        InvitationType::Signing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvitationType::Editing => "editing",
            InvitationType::Harmonization => "harmonization",
            InvitationType::Signing => "signing",
        }
    }
}

impl fmt::Display for InvitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvitationType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown invitation type '{s}' (expected editing, harmonization or signing)")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub contract_id: ContractId,
    #[serde(rename = "type")]
    pub invitation_type: InvitationType,
    pub creator: Actor,
    pub recipient: Actor,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Pending invitation of `kind` on `contract` already addressing `company`
    pub fn blocks(&self, contract: &ContractId, kind: InvitationType, company: &CompanyId) -> bool {
        self.is_pending()
            && &self.contract_id == contract
            && self.invitation_type == kind
            && &self.recipient.company_id == company
    }
}

/// Free-text comment attached to a contract. Only its lifetime matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub contract_id: ContractId,
    pub author: EmployeeId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Editing,
    Harmonization,
    Signing,
    Archived,
}

impl NotificationKind {
    pub fn text(self) -> &'static str {
        match self {
            NotificationKind::Editing => "Invitation to editing contract was received",
            NotificationKind::Harmonization => {
                "Contract needs a harmonization for changing its status to \"harmonized\""
            }
            NotificationKind::Signing => {
                "Contract is harmonized and needs to be signed for changing its status to \"signed\""
            }
            NotificationKind::Archived => "Contract is archived",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Editing => "editing",
            NotificationKind::Harmonization => "harmonization",
            NotificationKind::Signing => "signing",
            NotificationKind::Archived => "archived",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved notification, handed to the transport for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub contract_id: ContractId,
    pub recipient_id: EmployeeId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
