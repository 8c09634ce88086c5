use anyhow::Result;

use super::{Command, CommandContext};
use crate::approval::EmployeeId;

pub struct NotificationsCommand {
    context: CommandContext,
    employee: EmployeeId,
}

impl NotificationsCommand {
    pub fn new(context: CommandContext, employee: String) -> Self {
        Self {
            context,
            employee: EmployeeId::new(employee),
        }
    }
}

impl Command for NotificationsCommand {
    async fn execute(&self) -> Result<()> {
        let delivered = self
            .context
            .with_workspace(false, |session| async move {
                Ok(session.backend.outbox.for_recipient(&self.employee).await)
            })
            .await?;

        if delivered.is_empty() {
            println!("📭 No notifications for {}", self.employee);
            return Ok(());
        }

        println!("📬 {} notification(s) for {}", delivered.len(), self.employee);
        for event in &delivered {
            println!(
                "   [{}] {} {}: {}",
                event.created_at.format("%Y-%m-%d %H:%M:%S"),
                event.contract_id,
                event.kind,
                event.text
            );
        }
        Ok(())
    }
}
