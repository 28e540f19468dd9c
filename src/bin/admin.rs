//! Treeform Admin CLI
//!
//! Administration tool for managing user accounts directly in the server
//! database, e.g. to create the first admin.
//!
//! # Usage
//!
//! ```bash
//! treeform-admin user add alice@example.com --name Alice --role admin --password '...'
//! treeform-admin user list
//! treeform-admin user set-role alice@example.com write
//! ```
//!
//! Reads the same configuration as the server (`TREEFORM_CONFIG`,
//! `TREEFORM_DATABASE_PATH`, ...).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use treeform::auth::{RequestContext, SignupRequest, TokenIssuer, UserService};
use treeform::config::Config;
use treeform::db::{init_db, UserRepository};
use treeform::models::Role;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "treeform-admin")]
#[command(version)]
#[command(about = "Treeform server administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// Add a new user
    Add {
        /// User's email address
        email: String,
        /// User's display name
        #[arg(long, short)]
        name: String,
        /// Role: read, write, or admin
        #[arg(long, short, default_value = "read")]
        role: Role,
        /// Initial password (at least 8 characters)
        #[arg(long, short)]
        password: String,
    },
    /// List all users
    List,
    /// Change a user's role
    SetRole {
        /// User's email address
        email: String,
        /// New role: read, write, or admin
        role: Role,
    },
}

// ============================================================================
// Commands
// ============================================================================

async fn add_user(
    service: &UserService,
    email: String,
    name: String,
    role: Role,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = SignupRequest {
        user_name: name,
        email,
        password,
    };
    let user = service.create_user(request, role, None).await?;

    println!("Added user: {}", user.email);
    println!("  Name: {}", user.user_name);
    println!("  Role: {}", user.role);
    println!("  Id: {}", user.id);

    Ok(())
}

async fn list_users(service: &UserService) -> Result<(), Box<dyn std::error::Error>> {
    let users = service.list(&RequestContext::system()).await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("{:<40} {:<24} {:<8}", "EMAIL", "NAME", "ROLE");
    println!("{}", "-".repeat(72));

    for user in &users {
        println!("{:<40} {:<24} {:<8}", user.email, user.user_name, user.role);
    }

    println!();
    println!("Total: {} user(s)", users.len());

    Ok(())
}

async fn set_role(
    repo: &UserRepository,
    service: &UserService,
    email: String,
    role: Role,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user) = repo.get_by_email(&email).await? else {
        return Err(format!("User '{}' not found", email).into());
    };

    let user = service
        .set_role(&RequestContext::system(), user.id, role)
        .await?;
    println!("Set role of {} to {}", user.email, user.role);

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    let pool = init_db(&config.database_path).await?;
    let repo = UserRepository::new(pool);
    // No tokens are issued here, the signing key is not needed
    let tokens = Arc::new(TokenIssuer::new(
        config.jwt.key.as_bytes(),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
        config.jwt.expiry_minutes,
    ));
    let service = UserService::new(repo.clone(), tokens);

    match cli.command {
        Commands::User(user_cmd) => match user_cmd.command {
            UserSubcommand::Add {
                email,
                name,
                role,
                password,
            } => add_user(&service, email, name, role, password).await,
            UserSubcommand::List => list_users(&service).await,
            UserSubcommand::SetRole { email, role } => {
                set_role(&repo, &service, email, role).await
            }
        },
    }
}
