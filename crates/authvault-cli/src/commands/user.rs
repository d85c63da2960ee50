//! User management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use authvault_core::error::AppError;
use authvault_core::types::PageRequest;
use authvault_database::DatabasePool;
use authvault_database::repositories::UserRepository;
use authvault_entity::user::{CreateUser, User};
use tracing::info;

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user
    Create {
        /// Display name
        name: String,
        /// Avatar URL
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List users
    List {
        /// Maximum rows to return
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Rows to skip
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show a user by id or name
    Show {
        /// User ID or name
        user: String,
    },
    /// Delete a user together with their sessions, tokens, posts and bookmarks
    Delete {
        /// User ID or name
        user: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Name
    name: String,
    /// Avatar
    image_url: String,
    /// Created at
    created_at: String,
    /// Updated at
    updated_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.user_id.to_string(),
            name: u.user_name.clone(),
            image_url: u.image_url.clone().unwrap_or_else(|| "-".to_string()),
            created_at: output::timestamp(u.created_at),
            updated_at: output::timestamp(u.updated_at),
        }
    }
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    db: &DatabasePool,
    format: OutputFormat,
) -> Result<(), AppError> {
    let user_repo = UserRepository::new(db.pool().clone());

    match &args.command {
        UserCommand::Create { name, image_url } => {
            let user = user_repo
                .create(&CreateUser {
                    user_name: name.clone(),
                    image_url: image_url.clone(),
                })
                .await?;
            output::print_item(&UserRow::from(&user), format);
        }
        UserCommand::List { limit, offset } => {
            let users = user_repo.list(PageRequest::new(*limit, *offset)).await?;
            let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
        }
        UserCommand::Show { user } => {
            let user = resolve(&user_repo, user).await?;
            output::print_item(&UserRow::from(&user), format);
        }
        UserCommand::Delete { user, force } => {
            let user = resolve(&user_repo, user).await?;
            let prompt = format!("Delete user '{}' and everything they own?", user.user_name);
            if !output::confirm(&prompt, *force)? {
                return Ok(());
            }
            if user_repo.delete(user.user_id).await? {
                info!(user_id = %user.user_id, "User deleted from CLI");
                output::print_success(&format!("User '{}' deleted", user.user_name));
            } else {
                output::print_warning(&format!("User '{}' was already gone", user.user_name));
            }
        }
    }

    Ok(())
}

/// Look a user up by UUID first, then by exact name.
async fn resolve(repo: &UserRepository, key: &str) -> Result<User, AppError> {
    let found = match uuid::Uuid::parse_str(key.trim()) {
        Ok(id) => repo.find_by_id(id).await?,
        Err(_) => repo.find_by_name(key.trim()).await?,
    };
    found.ok_or_else(|| AppError::not_found(format!("User '{key}' not found")))
}
