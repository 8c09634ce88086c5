use anyhow::Result;

use super::{Command, CommandContext};
use crate::approval::{CompanyId, ContractId, EmployeeId, InvitationId, InvitationType};

pub struct InviteCommand {
    context: CommandContext,
    contract: ContractId,
    employee: EmployeeId,
    invitation_type: InvitationType,
    company: CompanyId,
}

impl InviteCommand {
    pub fn new(
        context: CommandContext,
        contract: String,
        employee: String,
        invitation_type: InvitationType,
        company: String,
    ) -> Self {
        Self {
            context,
            contract: ContractId::new(contract),
            employee: EmployeeId::new(employee),
            invitation_type,
            company: CompanyId::new(company),
        }
    }
}

impl Command for InviteCommand {
    async fn execute(&self) -> Result<()> {
        let invitations = self
            .context
            .with_workspace(true, |session| async move {
                Ok(session
                    .service
                    .invite(&self.contract, &self.employee, self.invitation_type, &self.company)
                    .await?)
            })
            .await?;

        println!(
            "✉️  Sent {} {} invitation(s) to company {}",
            invitations.len(),
            self.invitation_type,
            self.company
        );
        for invitation in &invitations {
            println!("   {} -> {}", invitation.id, invitation.recipient.employee_id);
        }
        Ok(())
    }
}

pub struct AcceptCommand {
    context: CommandContext,
    invitation: InvitationId,
}

impl AcceptCommand {
    pub fn new(context: CommandContext, invitation: String) -> Self {
        Self {
            context,
            invitation: InvitationId::new(invitation),
        }
    }
}

impl Command for AcceptCommand {
    async fn execute(&self) -> Result<()> {
        let invitation = self
            .context
            .with_workspace(true, |session| async move {
                Ok(session.service.accept_invitation(&self.invitation).await?)
            })
            .await?;

        println!(
            "🤝 {} accepted the {} invitation on contract {}",
            invitation.recipient.employee_id, invitation.invitation_type, invitation.contract_id
        );
        Ok(())
    }
}
