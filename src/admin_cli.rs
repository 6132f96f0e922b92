// src/admin_cli.rs
use crate::core::database::{
    AnalysisExportRow, AnalysisRepository, DatabaseConfig, User, UserRepository,
};
use crate::core::ConfigManager;
use crate::sections::{extract_identity, parse_sections, SectionPolicy};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lead-admin")]
#[command(about = "Manage users, credits and stored analyses")]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,

    /// Database file, defaults to the configured one
    #[arg(long)]
    pub database_path: Option<PathBuf>,

    /// Section policy used to derive identities, defaults to the configured one
    #[arg(long)]
    pub section_policy: Option<SectionPolicy>,
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Create the database tables
    Init,
    /// List all users with their role, plan and credits
    ListUsers,
    /// Set the credit balance of a user
    SetCredits { user_id: String, credits: i64 },
    /// Set the role of a user (user or admin)
    SetRole { user_id: String, role: String },
    /// Set the plan of a user (trial or subscribed)
    SetPlan { user_id: String, plan: String },
    /// Export every stored analysis as CSV lead rows
    Export { csv_file: PathBuf },
}

pub async fn handle_admin_command(cli: AdminCli) -> Result<()> {
    let config = ConfigManager::load()?;
    let database_path = cli
        .database_path
        .clone()
        .unwrap_or_else(|| config.environment.database_path.clone());
    let policy = cli.section_policy.unwrap_or(config.section_policy);

    let mut db_config = DatabaseConfig::new(database_path);
    db_config.init_pool().await?;
    db_config.migrate().await?;

    run_admin_command(cli.command, &db_config, policy).await
}

/// Execute one subcommand against an initialized database
pub async fn run_admin_command(
    command: AdminCommand,
    db_config: &DatabaseConfig,
    policy: SectionPolicy,
) -> Result<()> {
    let pool = db_config.pool()?;
    let user_repo = UserRepository::new(pool);

    match command {
        AdminCommand::Init => {
            info!(
                "✅ Database initialized at: {}",
                db_config.database_path.display()
            );
            info!("   Tables created: users, analyses");
        }

        AdminCommand::ListUsers => {
            let users = user_repo.list().await?;
            if users.is_empty() {
                info!("No users found.");
            } else {
                info!(
                    "{:<38} {:<30} {:<8} {:<12} {:>8} {:<20}",
                    "ID", "Email", "Role", "Plan", "Credits", "Created"
                );
                info!("{}", "-".repeat(121));

                for user in users {
                    info!(
                        "{:<38} {:<30} {:<8} {:<12} {:>8} {:<20}",
                        user.id,
                        user.email,
                        user.role(),
                        user.plan(),
                        user.credits,
                        user.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        AdminCommand::SetCredits { user_id, credits } => {
            let user = user_repo
                .set_credits(&user_id, credits)
                .await
                .inspect_err(|e| error!("Failed to set credits: {}", e))?;
            let user = found(user, &user_id)?;
            info!("✅ {} now has {} credits", user.email, user.credits);
        }

        AdminCommand::SetRole { user_id, role } => {
            let role = role.parse()?;
            let user = found(user_repo.set_role(&user_id, role).await?, &user_id)?;
            info!("✅ {} is now {}", user.email, user.role());
        }

        AdminCommand::SetPlan { user_id, plan } => {
            let plan = plan.parse()?;
            let user = found(user_repo.set_plan(&user_id, plan).await?, &user_id)?;
            info!("✅ {} is now on the {} plan", user.email, user.plan());
        }

        AdminCommand::Export { csv_file } => {
            let rows = AnalysisRepository::new(pool).list_all().await?;
            let file = std::fs::File::create(&csv_file)
                .with_context(|| format!("Failed to create {}", csv_file.display()))?;

            let written = write_leads_csv(&rows, policy, file)?;
            info!(
                "✅ Exported {} leads to {} (section policy: {})",
                written,
                csv_file.display(),
                policy
            );
        }
    }

    Ok(())
}

fn found(user: Option<User>, user_id: &str) -> Result<User> {
    user.ok_or_else(|| anyhow::anyhow!("No user found with id: {}", user_id))
}

/// Write one CSV row per stored analysis with its derived identity
pub fn write_leads_csv<W: Write>(
    rows: &[AnalysisExportRow],
    policy: SectionPolicy,
    writer: W,
) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "user_email",
        "linkedin_url",
        "name",
        "title",
        "company",
        "created_at",
    ])?;

    for row in rows {
        let identity = extract_identity(&parse_sections(&row.profile_data, policy));
        csv_writer.write_record([
            row.email.as_str(),
            row.linkedin_url.as_str(),
            identity.name.as_str(),
            identity.title.as_str(),
            identity.company.as_str(),
            row.created_at.to_rfc3339().as_str(),
        ])?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn exports_identity_columns() {
        let rows = vec![
            AnalysisExportRow {
                email: "sales@example.com".to_string(),
                linkedin_url: "https://www.linkedin.com/in/jane".to_string(),
                profile_data: "Profile Info\n- Jane Doe\n- CTO\n- Acme Corp".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            },
            AnalysisExportRow {
                email: "sales@example.com".to_string(),
                linkedin_url: "https://www.linkedin.com/in/empty".to_string(),
                profile_data: String::new(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
            },
        ];

        let mut output = Vec::new();
        let written = write_leads_csv(&rows, SectionPolicy::Heuristic, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 2);
        assert_eq!(
            lines[0],
            "user_email,linkedin_url,name,title,company,created_at"
        );
        assert_eq!(
            lines[1],
            "sales@example.com,https://www.linkedin.com/in/jane,Jane Doe,CTO,Acme Corp,2024-05-01T09:30:00+00:00"
        );
        assert_eq!(
            lines[2],
            "sales@example.com,https://www.linkedin.com/in/empty,-,-,-,2024-05-02T09:30:00+00:00"
        );
    }

    #[test]
    fn parses_cli_arguments() {
        let cli = AdminCli::try_parse_from([
            "lead-admin",
            "--section-policy",
            "blocks",
            "set-credits",
            "uid-1",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.section_policy, Some(SectionPolicy::Blocks));
        match cli.command {
            AdminCommand::SetCredits { user_id, credits } => {
                assert_eq!(user_id, "uid-1");
                assert_eq!(credits, 10);
            }
            _ => panic!("expected set-credits"),
        }
    }

    #[tokio::test]
    async fn failed_updates_are_reported_as_errors() {
        let db = DatabaseConfig::in_memory().await.unwrap();
        crate::core::UserService::new(db.pool().unwrap())
            .get_or_create("uid-1", "jane@example.com", 3, &[])
            .await
            .unwrap();
        let set_credits = |user_id: &str, credits| AdminCommand::SetCredits {
            user_id: user_id.to_string(),
            credits,
        };

        assert!(
            run_admin_command(set_credits("uid-1", -5), &db, SectionPolicy::Heuristic)
                .await
                .is_err()
        );
        assert!(
            run_admin_command(set_credits("missing", 5), &db, SectionPolicy::Heuristic)
                .await
                .is_err()
        );
        let bogus_role = AdminCommand::SetRole {
            user_id: "uid-1".to_string(),
            role: "root".to_string(),
        };
        assert!(run_admin_command(bogus_role, &db, SectionPolicy::Heuristic)
            .await
            .is_err());

        run_admin_command(set_credits("uid-1", 7), &db, SectionPolicy::Heuristic)
            .await
            .unwrap();
        let user = UserRepository::new(db.pool().unwrap())
            .find("uid-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.credits, 7);
    }
}
