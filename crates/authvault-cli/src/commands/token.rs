//! Refresh-token CLI commands.
//!
//! Tokens are passed as arguments for operator use only; the raw value is
//! printed once on issue and rotate and never stored.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use super::{Services, parse_uuid};
use crate::output::{self, OutputFormat};
use authvault_auth::TokenStatus;
use authvault_core::error::{AppError, ErrorKind};
use authvault_entity::token::RefreshToken;
use tracing::{info, warn};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a new current token for a session
    Issue {
        /// Session ID
        session_id: String,
        /// Lifetime in seconds, defaults to the configured TTL
        #[arg(long)]
        ttl: Option<i64>,
    },
    /// Exchange a token for its successor
    Rotate {
        /// Opaque refresh token
        token: String,
    },
    /// Revoke a token
    Revoke {
        /// Opaque refresh token
        token: String,
    },
    /// Report whether a token is current and valid
    Check {
        /// Opaque refresh token
        token: String,
    },
    /// Show a token's stored state
    Inspect {
        /// Opaque refresh token
        token: String,
    },
    /// Show a session's rotation chain
    Chain {
        /// Session ID
        session_id: String,
    },
}

/// Token display row
#[derive(Debug, Serialize, Tabled)]
struct TokenRow {
    /// Token ID
    id: String,
    /// Session ID
    session_id: String,
    /// Issued
    issued_at: String,
    /// Expires
    expires_at: String,
    /// Used
    used_at: String,
    /// Revoked
    revoked_at: String,
    /// Replaced by
    replaced_by: String,
}

impl From<&RefreshToken> for TokenRow {
    fn from(t: &RefreshToken) -> Self {
        Self {
            id: t.id.to_string(),
            session_id: t.session_id.to_string(),
            issued_at: output::timestamp(t.issued_at),
            expires_at: output::timestamp(t.expires_at),
            used_at: output::optional_timestamp(t.used_at),
            revoked_at: output::optional_timestamp(t.revoked_at),
            replaced_by: t
                .replaced_by
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Token state display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Token ID
    id: String,
    /// Session ID
    session_id: String,
    /// State
    state: String,
    /// Session revoked
    session_revoked: bool,
    /// Usable
    usable: bool,
}

impl From<&TokenStatus> for StatusRow {
    fn from(s: &TokenStatus) -> Self {
        Self {
            id: s.token.id.to_string(),
            session_id: s.token.session_id.to_string(),
            state: s.state.to_string(),
            session_revoked: s.session_revoked,
            usable: s.is_usable(),
        }
    }
}

/// Execute token commands
pub async fn execute(
    args: &TokenArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let tokens = &services.tokens;

    match &args.command {
        TokenCommand::Issue { session_id, ttl } => {
            let session_id = parse_uuid(session_id)?;
            let issued = match ttl {
                Some(seconds) => tokens.issue(session_id, ttl_from_seconds(*seconds)?).await?,
                None => tokens.issue_default(session_id).await?,
            };
            info!(session_id = %session_id, token_id = %issued.record.id, "Token issued from CLI");
            output::print_item(&TokenRow::from(&issued.record), format);
            output::print_kv("Refresh token", &issued.opaque);
        }
        TokenCommand::Rotate { token } => match tokens.rotate(token).await {
            Ok(rotated) => {
                output::print_item(&TokenRow::from(&rotated.record), format);
                output::print_kv("Refresh token", &rotated.opaque);
                output::print_kv("User", &rotated.user_id.to_string());
                output::print_kv("Key thumbprint", rotated.dpop_jkt.as_deref().unwrap_or("-"));
            }
            Err(e) if e.is(ErrorKind::ReplayDetected) => {
                warn!("Replay detected on CLI rotation");
                output::print_warning("Token reuse detected; the session has been revoked.");
                return Err(e);
            }
            Err(e) => return Err(e),
        },
        TokenCommand::Revoke { token } => {
            tokens.revoke(token).await?;
            info!("Token revoked from CLI");
            output::print_success("Token revoked");
        }
        TokenCommand::Check { token } => {
            let valid = tokens.is_current_and_valid(token).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "valid": valid })),
                OutputFormat::Table => println!("{}", if valid { "valid" } else { "invalid" }),
            }
        }
        TokenCommand::Inspect { token } => {
            let status = tokens.inspect(token).await?;
            output::print_item(&StatusRow::from(&status), format);
        }
        TokenCommand::Chain { session_id } => {
            let chain = tokens.chain(parse_uuid(session_id)?).await?;
            let rows: Vec<TokenRow> = chain.iter().map(TokenRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

/// Convert a `--ttl` argument without overflowing.
fn ttl_from_seconds(seconds: i64) -> Result<chrono::Duration, AppError> {
    chrono::Duration::try_seconds(seconds)
        .ok_or_else(|| AppError::validation(format!("TTL of {seconds}s is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_from_seconds() {
        assert_eq!(ttl_from_seconds(90).unwrap(), chrono::Duration::seconds(90));
        let err = ttl_from_seconds(i64::MAX).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
