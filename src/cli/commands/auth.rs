use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_error, output_navigation, output_success};
use crate::cli::{open_console, OutputFormat};
use crate::error::SessionError;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Store a bearer credential and load the user profile")]
    Login {
        #[arg(long, help = "Bearer token issued by the ERP")]
        token: String,
    },

    #[command(about = "Clear the stored credential and cached identity")]
    Logout,

    #[command(about = "Show whether a credential is stored")]
    Status,

    #[command(about = "Load and show the current user from the identity endpoints")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { token } => {
            let console = open_console("")?;
            let navigation = console.login(token.trim()).await;
            output_navigation(&output_format, &navigation)
        }
        AuthCommands::Logout => {
            let console = open_console("")?;
            console.session.clear_session();
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Status => {
            let console = open_console("")?;
            let authenticated = console.session.is_authenticated();
            let profile = console.session.profile();
            let message = match (authenticated, &profile) {
                (true, Some(profile)) => format!("Signed in as {}", profile.label()),
                (true, None) => "Signed in (profile not loaded)".to_string(),
                (false, _) => "Not signed in".to_string(),
            };
            output_success(
                &output_format,
                &message,
                Some(json!({ "authenticated": authenticated, "profile": profile })),
            )
        }
        AuthCommands::Whoami => {
            let console = open_console("")?;
            match console.hydrate().await {
                Ok(profile) => output_success(
                    &output_format,
                    &profile.label(),
                    Some(json!({ "profile": profile })),
                ),
                Err(SessionError::NoCredential) => {
                    output_error(&output_format, "Not signed in", None)
                }
                Err(SessionError::Hydration(e)) => {
                    output_error(&output_format, &e.message, Some(e.status))
                }
                Err(e) => output_error(&output_format, &e.to_string(), None),
            }
        }
    }
}
