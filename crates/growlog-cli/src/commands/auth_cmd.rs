use crate::auth::{auth_client, clear_stored_session, load_stored_session};
use crate::cli::AuthCommands;
use crate::commands::common::CliContext;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, context: &CliContext) -> Result<(), CliError> {
    let profile_name = context.profile_name.as_str();

    match command {
        AuthCommands::Login { email, password } => {
            let remote = context.remote.as_ref().ok_or_else(|| {
                CliError::Config(format!(
                    "Profile '{profile_name}' has no Supabase project. Run `growlog config init --profile {profile_name}` first."
                ))
            })?;
            let client = auth_client(profile_name, remote)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let session = client
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{profile_name}' as {email_label}");
            Ok(())
        }
        AuthCommands::Status => {
            let session = if let Some(remote) = &context.remote {
                auth_client(profile_name, remote)
                    .map_err(|error| CliError::Auth(error.to_string()))?
                    .restore_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?
            } else {
                load_stored_session(profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name, email_label, session.user.id, session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let stored_session = load_stored_session(profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            if let (Some(remote), Some(session)) = (&context.remote, stored_session) {
                let client = auth_client(profile_name, remote)
                    .map_err(|error| CliError::Auth(error.to_string()))?;
                if let Err(error) = client.sign_out(&session.access_token).await {
                    tracing::warn!("Remote sign-out failed, clearing local session: {}", error);
                }
            }
            clear_stored_session(profile_name).map_err(|error| CliError::Auth(error.to_string()))?;

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
