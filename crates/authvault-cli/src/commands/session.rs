//! Session management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use super::{Services, parse_uuid};
use crate::output::{self, OutputFormat};
use authvault_core::error::AppError;
use authvault_entity::session::AuthSession;
use tracing::info;

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Start a session and issue its first refresh token
    Open {
        /// User ID
        user_id: String,
        /// Key thumbprint to bind immediately
        #[arg(long)]
        jkt: Option<String>,
    },
    /// Show a session
    Show {
        /// Session ID
        id: String,
    },
    /// List a user's sessions
    List {
        /// User ID
        user_id: String,
        /// Include revoked sessions
        #[arg(long)]
        all: bool,
    },
    /// Bind a key thumbprint to a session
    Bind {
        /// Session ID
        id: String,
        /// Key thumbprint
        jkt: String,
    },
    /// Record activity on a session
    Touch {
        /// Session ID
        id: String,
    },
    /// Revoke a session
    Revoke {
        /// Session ID
        id: String,
    },
    /// Revoke every active session of a user
    RevokeAll {
        /// User ID
        user_id: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    id: String,
    /// User ID
    user_id: String,
    /// Key thumbprint
    jkt: String,
    /// Created
    created_at: String,
    /// Last used
    last_used_at: String,
    /// Revoked
    revoked_at: String,
}

impl From<&AuthSession> for SessionRow {
    fn from(s: &AuthSession) -> Self {
        Self {
            id: s.id.to_string(),
            user_id: s.user_id.to_string(),
            jkt: s.dpop_jkt.clone().unwrap_or_else(|| "-".to_string()),
            created_at: output::timestamp(s.created_at),
            last_used_at: output::optional_timestamp(s.last_used_at),
            revoked_at: output::optional_timestamp(s.revoked_at),
        }
    }
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let sessions = &services.sessions;

    match &args.command {
        SessionCommand::Open { user_id, jkt } => {
            let (session, issued) = sessions
                .open(parse_uuid(user_id)?, jkt.as_deref())
                .await?;
            output::print_item(&SessionRow::from(&session), format);
            output::print_kv("Refresh token", &issued.opaque);
            output::print_kv("Expires", &output::timestamp(issued.record.expires_at));
        }
        SessionCommand::Show { id } => {
            let session = sessions.get(parse_uuid(id)?).await?;
            output::print_item(&SessionRow::from(&session), format);
        }
        SessionCommand::List { user_id, all } => {
            let list = sessions.list_for_user(parse_uuid(user_id)?, *all).await?;
            let rows: Vec<SessionRow> = list.iter().map(SessionRow::from).collect();
            output::print_list(&rows, format);
        }
        SessionCommand::Bind { id, jkt } => {
            sessions.bind_key_thumbprint(parse_uuid(id)?, jkt).await?;
            output::print_success(&format!("Session {id} bound"));
        }
        SessionCommand::Touch { id } => {
            sessions.touch(parse_uuid(id)?).await?;
            output::print_success(&format!("Session {id} touched"));
        }
        SessionCommand::Revoke { id } => {
            sessions.revoke(parse_uuid(id)?).await?;
            info!(session_id = %id, "Session revoked from CLI");
            output::print_success(&format!("Session {id} revoked"));
        }
        SessionCommand::RevokeAll { user_id, force } => {
            let user = parse_uuid(user_id)?;
            if !output::confirm(&format!("Revoke ALL sessions of user {user}?"), *force)? {
                return Ok(());
            }
            let count = sessions.revoke_all_for_user(user).await?;
            info!(user_id = %user, count, "All sessions revoked from CLI");
            output::print_success(&format!("Revoked {count} sessions"));
        }
    }

    Ok(())
}
