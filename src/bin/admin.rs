//! ireporter-admin - management commands against the MongoDB stores

use clap::{Parser, Subcommand};
use ireporter::auth::JwtValidator;
use ireporter::config::MongoArgs;
use ireporter::db::MongoClient;
use ireporter::model::Role;
use ireporter::store::Stores;
use ireporter::{logging, Services};

#[derive(Debug, Parser)]
#[command(name = "ireporter-admin")]
#[command(about = "iReporter management commands")]
struct Cli {
    #[command(flatten)]
    mongo: MongoArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an admin account
    CreateAdmin {
        email: String,
        password: String,
        name: String,
    },

    /// List all users, oldest first
    ListUsers,

    /// List all incidents, newest first
    ListIncidents,

    /// Show user and incident totals
    Stats,
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mongo = MongoClient::new(&cli.mongo.mongodb_uri, &cli.mongo.mongodb_db).await?;
    // Commands here never issue tokens
    let services = Services::new(Stores::mongo(&mongo).await?, JwtValidator::new_dev());

    match cli.command {
        Command::CreateAdmin {
            email,
            password,
            name,
        } => {
            let admin = services.users.create_admin(&name, &email, &password).await?;
            println!("Admin user created");
            println!("   Email: {}", admin.email);
            println!("   ID: {}", admin.id);
        }

        Command::ListUsers => {
            let users = services.users.all_users().await?;
            println!("{}", "-".repeat(90));
            println!("{:<25} {:<20} {:<30} {:<10}", "ID", "Name", "Email", "Role");
            println!("{}", "-".repeat(90));
            for user in &users {
                println!(
                    "{:<25} {:<20} {:<30} {:<10}",
                    user.id,
                    truncate(&user.name, 20),
                    truncate(&user.email, 30),
                    user.role.as_str()
                );
            }
            println!("{}", "-".repeat(90));
            println!("Total users: {}", users.len());
        }

        Command::ListIncidents => {
            let incidents = services.incidents.all().await?;
            println!("{}", "-".repeat(100));
            println!(
                "{:<25} {:<30} {:<13} {:<14} {:<12}",
                "ID", "Title", "Type", "Status", "Created"
            );
            println!("{}", "-".repeat(100));
            for incident in &incidents {
                println!(
                    "{:<25} {:<30} {:<13} {:<14} {:<12}",
                    incident.id,
                    truncate(&incident.title, 30),
                    incident.kind.as_str(),
                    incident.status.as_str(),
                    incident.created_at.format("%Y-%m-%d").to_string()
                );
            }
            println!("{}", "-".repeat(100));
            println!("Total incidents: {}", incidents.len());
        }

        Command::Stats => {
            let users = services.users.all_users().await?;
            let admins = users.iter().filter(|u| u.role == Role::Admin).count();
            let stats = services.incidents.stats().await?;

            println!("{}", "-".repeat(50));
            println!("Total users:           {}", users.len());
            println!("Admin users:           {}", admins);
            println!("Total incidents:       {}", stats.total);
            println!("Pending:               {}", stats.pending);
            println!("Investigating:         {}", stats.investigating);
            println!("Resolved:              {}", stats.resolved);
            println!("Rejected:              {}", stats.rejected);
            println!("Red flags:             {}", stats.redflags);
            println!("Interventions:         {}", stats.interventions);
            println!("{}", "-".repeat(50));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(&cli.log_level, false);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
