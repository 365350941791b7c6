//! Profile CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{label, success};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{FallbackHint, Profile, ProfilePatch};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Fetch a profile from the board and mirror it locally
    Show {
        /// User ID (defaults to the configured user)
        id: Option<String>,
        /// Email to use if the user has no profile row yet
        #[arg(long)]
        email: Option<String>,
        /// Display name to use if the user has no profile row yet
        #[arg(long)]
        name: Option<String>,
    },
    /// Update the local profile record
    Update {
        /// User ID (defaults to the configured user)
        id: Option<String>,
        /// New full name
        #[arg(short, long)]
        name: Option<String>,
        /// New avatar URL
        #[arg(short, long)]
        avatar: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct ProfileOutput {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub updated_at: String,
}

impl From<&Profile> for ProfileOutput {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.to_string(),
            display_name: profile.display_name(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            role: profile.role.as_str().to_string(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for ProfileOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", label("Name"), self.display_name),
            format!("{} {}", label("ID"), self.id),
            format!("{} {}", label("Role"), self.role),
        ];
        if let Some(email) = &self.email {
            lines.push(format!("{} {}", label("Email"), email));
        }
        if let Some(avatar) = &self.avatar_url {
            lines.push(format!("{} {}", label("Avatar"), avatar));
        }
        lines.push(format!("{} {}", label("Updated"), self.updated_at));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileActionOutput {
    pub success: bool,
    pub message: String,
    pub profile: ProfileOutput,
}

impl CommandOutput for ProfileActionOutput {
    fn to_human(&self) -> String {
        format!("{}\n{}", success(&self.message), self.profile.to_human())
    }
}

pub async fn execute(args: ProfileArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let store = ctx.profile_store();
    let service = ctx.profile_service(store.clone());

    match args.command {
        ProfileCommands::Show { id, email, name } => {
            let id = match id {
                Some(id) => id,
                None => ctx.current_user()?.to_string(),
            };
            let hint = FallbackHint {
                email,
                display_name: name,
            };

            let profile = service.fetch(&id, &hint).await?;
            store.upsert(&profile).await?;

            output(&ProfileOutput::from(&profile), json_mode);
        }
        ProfileCommands::Update { id, name, avatar } => {
            let id = match id {
                Some(id) => id,
                None => ctx.current_user()?.to_string(),
            };
            if name.is_none() && avatar.is_none() {
                anyhow::bail!("Nothing to update. Pass --name and/or --avatar");
            }
            let patch = ProfilePatch {
                full_name: name,
                avatar_url: avatar,
            };

            let profile = service.update(&id, &patch).await?;

            output(
                &ProfileActionOutput {
                    success: true,
                    message: format!("Profile {} updated", profile.id),
                    profile: ProfileOutput::from(&profile),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
