use anyhow::Result;

use super::{Command, CommandContext};
use crate::approval::{Company, CompanyId, Employee, EmployeeId, Role, Workspace};
use crate::workspace_file::{load_workspace, save_workspace, WorkspaceFile};

pub struct SeedCommand {
    context: CommandContext,
    force: bool,
}

impl SeedCommand {
    pub fn new(context: CommandContext, force: bool) -> Self {
        Self { context, force }
    }
}

/// Two companies, each with a lawyer, an economist and a director
pub fn demo_workspace() -> Workspace {
    let companies = vec![Company::new("a", "Zesla Group"), Company::new("b", "ABC")];
    let mut employees = Vec::new();
    for (company, suffix) in [("a", "1"), ("b", "2")] {
        for role in Role::ALL {
            let id = format!("{}{}", &role.as_str()[..1], suffix);
            employees.push(Employee {
                id: EmployeeId::new(id.clone()),
                name: format!("{} {}", role, suffix),
                company_id: CompanyId::from(company),
                role,
                email: format!("{}@{}.example", id, company),
            });
        }
    }
    Workspace {
        companies,
        employees,
        ..Workspace::default()
    }
}

impl Command for SeedCommand {
    async fn execute(&self) -> Result<()> {
        let path = self.context.workspace_path();
        let mut file = WorkspaceFile::open(path)?;
        let _guard = file.lock()?;

        let existing = load_workspace(path)?;
        if existing != Workspace::default() && !self.force {
            anyhow::bail!(
                "Workspace {} already has data; pass --force to replace it",
                path.display()
            );
        }

        let workspace = demo_workspace();
        save_workspace(path, &workspace)?;

        println!("🌱 Seeded workspace {}", path.display());
        for company in &workspace.companies {
            println!("🏢 {} ({})", company.name, company.id);
            for employee in workspace.employees.iter().filter(|e| e.company_id == company.id) {
                println!("   👤 {} - {}", employee.id, employee.role);
            }
        }
        Ok(())
    }
}
