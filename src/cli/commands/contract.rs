use anyhow::Result;

use super::{Command, CommandContext};
use crate::approval::{Action, CompanyId, ContractId, EmployeeId};

pub struct CreateCommand {
    context: CommandContext,
    text: String,
    companies: Vec<CompanyId>,
}

impl CreateCommand {
    pub fn new(context: CommandContext, text: String, companies: Vec<String>) -> Self {
        Self {
            context,
            text,
            companies: companies.into_iter().map(CompanyId::new).collect(),
        }
    }
}

impl Command for CreateCommand {
    async fn execute(&self) -> Result<()> {
        let created = self
            .context
            .with_workspace(true, |session| async move {
                Ok(session
                    .service
                    .create_contract(&self.text, &self.companies)
                    .await?)
            })
            .await?;

        println!("📄 Created contract {}", created.contract.id);
        println!("   Phase: {}", created.contract.phase());
        for company in &created.contract.companies {
            println!("   🏢 {} ({})", company.name, company.id);
        }
        Ok(())
    }
}

pub struct ActCommand {
    context: CommandContext,
    contract: ContractId,
    employee: EmployeeId,
    action: Action,
}

impl ActCommand {
    pub fn new(context: CommandContext, contract: String, employee: String, action: Action) -> Self {
        Self {
            context,
            contract: ContractId::new(contract),
            employee: EmployeeId::new(employee),
            action,
        }
    }
}

impl Command for ActCommand {
    async fn execute(&self) -> Result<()> {
        let outcome = self
            .context
            .with_workspace(true, |session| async move {
                Ok(session
                    .service
                    .perform_action(&self.contract, &self.employee, self.action)
                    .await?)
            })
            .await?;

        if outcome.advanced() {
            println!(
                "✅ {} by {}: {} -> {}",
                self.action, self.employee, outcome.old_phase, outcome.new_phase
            );
        } else {
            println!(
                "⏳ {} by {} recorded, phase stays {}",
                self.action, self.employee, outcome.new_phase
            );
        }
        if outcome.report.invitations_purged > 0 {
            println!("   🧹 {} obsolete invitations removed", outcome.report.invitations_purged);
        }
        if outcome.report.comments_purged > 0 {
            println!("   🧹 {} comments removed", outcome.report.comments_purged);
        }
        if !outcome.report.notifications.is_empty() {
            println!("   📬 {} notifications sent", outcome.report.notifications.len());
        }
        if outcome.report.undelivered > 0 {
            println!("   ⚠️  {} notifications could not be delivered", outcome.report.undelivered);
        }
        Ok(())
    }
}

pub struct ShowCommand {
    context: CommandContext,
    contract: ContractId,
    employee: EmployeeId,
}

impl ShowCommand {
    pub fn new(context: CommandContext, contract: String, employee: String) -> Self {
        Self {
            context,
            contract: ContractId::new(contract),
            employee: EmployeeId::new(employee),
        }
    }
}

impl Command for ShowCommand {
    async fn execute(&self) -> Result<()> {
        let view = self
            .context
            .with_workspace(false, |session| async move {
                Ok(session.service.view(&self.contract, &self.employee).await?)
            })
            .await?;

        println!("📄 CONTRACT {}", view.contract.id);
        println!("==========================");
        println!("Phase: {}", view.contract.phase());
        println!("Version: {}", view.version);
        println!("Text: {}", view.contract.text);
        println!();

        match view.acceptance.offered_action {
            Some(action) => println!("👉 Available to {}: {}", self.employee, action),
            None => println!("👉 Nothing for {} to do right now", self.employee),
        }

        if !view.acceptance.companies.is_empty() {
            println!();
            println!("🤝 ACCEPTANCE:");
            for entry in &view.acceptance.companies {
                println!("   {} - {}", entry.company, entry.state);
            }
        }

        if !view.invitations.is_empty() {
            println!();
            println!("✉️  CAN INVITE:");
            for (kind, companies) in &view.invitations {
                let names: Vec<String> = companies
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.id))
                    .collect();
                println!("   {}: {}", kind, names.join(", "));
            }
        }
        Ok(())
    }
}

pub struct DeleteCommand {
    context: CommandContext,
    contract: ContractId,
}

impl DeleteCommand {
    pub fn new(context: CommandContext, contract: String) -> Self {
        Self {
            context,
            contract: ContractId::new(contract),
        }
    }
}

impl Command for DeleteCommand {
    async fn execute(&self) -> Result<()> {
        let report = self
            .context
            .with_workspace(true, |session| async move {
                Ok(session.service.delete_contract(&self.contract).await?)
            })
            .await?;

        println!("🗑️  Deleted contract {}", self.contract);
        println!(
            "   🧹 {} invitations, {} comments and {} notifications removed",
            report.invitations_purged, report.comments_purged, report.notifications_purged
        );
        Ok(())
    }
}
