//! Idea CLI commands, including edit lock handling.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::display::{badge_text, label, list_table, render_list, success};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{FallbackHint, Idea, IdeaPatch, LockBadge, MatrixPosition, UserId};
use crate::domain::ports::PersistenceStore;
use crate::services::{EditAttempt, EditLockCoordinator, LockView};

#[derive(Args, Debug)]
pub struct IdeaArgs {
    #[command(subcommand)]
    pub command: IdeaCommands,
}

#[derive(Subcommand, Debug)]
pub enum IdeaCommands {
    /// Add an idea to a project's matrix
    Add {
        /// Project ID
        project: String,
        /// Idea title
        content: String,
        /// Effort axis (0-100)
        #[arg(short, long, default_value = "50")]
        x: f64,
        /// Impact axis (0-100)
        #[arg(short, long, default_value = "50")]
        y: f64,
        /// Longer description
        #[arg(short, long)]
        details: Option<String>,
    },
    /// List a project's ideas with their lock badges
    List {
        /// Project ID
        project: String,
    },
    /// Show idea details
    Show {
        /// Idea ID
        id: String,
        /// Read through the remote endpoint instead of the local database
        #[arg(long)]
        remote: bool,
    },
    /// Take the edit lock on an idea
    EditStart {
        /// Idea ID
        id: String,
    },
    /// Release your edit lock on an idea
    EditEnd {
        /// Idea ID
        id: String,
    },
    /// Change an idea's fields
    Update {
        /// Idea ID
        id: String,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        details: Option<String>,
        #[arg(short, long)]
        x: Option<f64>,
        #[arg(short, long)]
        y: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub struct IdeaOutput {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub details: Option<String>,
    pub x: f64,
    pub y: f64,
    pub created_by: String,
    pub editing_by: Option<String>,
    pub editing_at: Option<String>,
    pub badge: LockBadge,
}

impl IdeaOutput {
    fn new(idea: &Idea, badge: LockBadge) -> Self {
        Self {
            id: idea.id.to_string(),
            project_id: idea.project_id.to_string(),
            content: idea.content.clone(),
            details: idea.details.clone(),
            x: idea.position.x,
            y: idea.position.y,
            created_by: idea.created_by.to_string(),
            editing_by: idea.edit_lock.holder().map(UserId::to_string),
            editing_at: idea.edit_lock.acquired_at().map(|at| at.to_rfc3339()),
            badge,
        }
    }
}

impl CommandOutput for IdeaOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", label("Idea"), self.content),
            format!("{} {}", label("ID"), self.id),
            format!("{} {}", label("Project"), self.project_id),
            format!("{} ({:.1}, {:.1})", label("Position"), self.x, self.y),
            format!("{} {}", label("Created by"), self.created_by),
        ];
        if let Some(details) = &self.details {
            lines.push(format!("{} {}", label("Details"), details));
        }
        if let (Some(holder), Some(since)) = (&self.editing_by, &self.editing_at) {
            let badge = badge_text(&self.badge);
            if badge.is_empty() {
                lines.push(format!("{} {} since {} (expired)", label("Lock"), holder, since));
            } else {
                lines.push(format!("{} {} {} since {}", label("Lock"), badge, holder, since));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct IdeaListOutput {
    pub ideas: Vec<IdeaOutput>,
    pub total: usize,
}

impl CommandOutput for IdeaListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "idea", "x", "y", "lock"]);
        for idea in &self.ideas {
            table.add_row(vec![
                Cell::new(&idea.id[..8]),
                Cell::new(truncate(&idea.content, 40)),
                Cell::new(format!("{:.0}", idea.x)),
                Cell::new(format!("{:.0}", idea.y)),
                Cell::new(badge_text(&idea.badge)),
            ]);
        }
        render_list("idea", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct IdeaActionOutput {
    pub success: bool,
    pub message: String,
    pub idea: Option<IdeaOutput>,
}

impl CommandOutput for IdeaActionOutput {
    fn to_human(&self) -> String {
        match &self.idea {
            Some(idea) => format!("{}\n{}", success(&self.message), idea.to_human()),
            None => success(&self.message),
        }
    }
}

fn refused(holder: &UserId, since: DateTime<Utc>) -> anyhow::Error {
    anyhow!(
        "Idea is being edited by {holder} since {}",
        since.format("%H:%M:%S UTC")
    )
}

async fn load_idea(store: &dyn PersistenceStore<Idea>, id: &str) -> Result<Idea> {
    store
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("Idea not found: {id}"))
}

fn parse_project(project: &str) -> Result<Uuid> {
    Uuid::parse_str(project).with_context(|| format!("Invalid project ID: {project}"))
}

fn to_output(coordinator: &EditLockCoordinator, idea: &Idea, user: &UserId) -> IdeaOutput {
    IdeaOutput::new(idea, coordinator.badge(&idea.edit_lock, user, Utc::now()))
}

pub async fn execute(args: IdeaArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let store = ctx.idea_store();
    let coordinator = ctx.coordinator();
    let user = ctx.current_user()?;

    match args.command {
        IdeaCommands::Add { project, content, x, y, details } => {
            let position = MatrixPosition::new(x, y)?;
            let mut idea = Idea::new(parse_project(&project)?, content, position, user.clone());
            idea.details = details;

            store.insert(&idea).await?;

            output(
                &IdeaActionOutput {
                    success: true,
                    message: format!("Idea created: {}", idea.id),
                    idea: Some(to_output(&coordinator, &idea, &user)),
                },
                json_mode,
            );
        }
        IdeaCommands::List { project } => {
            let ideas = store.list_by_project(parse_project(&project)?).await?;
            let out = IdeaListOutput {
                total: ideas.len(),
                ideas: ideas.iter().map(|i| to_output(&coordinator, i, &user)).collect(),
            };
            output(&out, json_mode);
        }
        IdeaCommands::Show { id, remote } => {
            let idea = if remote {
                ctx.idea_service(store.clone())
                    .fetch(&id, &FallbackHint::default())
                    .await?
            } else {
                load_idea(store.as_ref(), &id).await?
            };
            output(&to_output(&coordinator, &idea, &user), json_mode);
        }
        IdeaCommands::EditStart { id } => {
            let idea = load_idea(store.as_ref(), &id).await?;
            match coordinator
                .begin_edit(store.as_ref(), &idea, &user, Utc::now())
                .await?
            {
                EditAttempt::Started(idea) => output(
                    &IdeaActionOutput {
                        success: true,
                        message: format!("Editing {}", idea.id),
                        idea: Some(to_output(&coordinator, &idea, &user)),
                    },
                    json_mode,
                ),
                EditAttempt::Refused { holder, since } => return Err(refused(&holder, since)),
            }
        }
        IdeaCommands::EditEnd { id } => {
            let idea = load_idea(store.as_ref(), &id).await?;
            let released = coordinator.end_edit(store.as_ref(), &idea, &user).await?;
            let message = match &released {
                Some(_) => format!("Released edit lock on {id}"),
                None => format!("You do not hold the edit lock on {id}"),
            };
            output(
                &IdeaActionOutput {
                    success: released.is_some(),
                    message,
                    idea: released.as_ref().map(|i| to_output(&coordinator, i, &user)),
                },
                json_mode,
            );
        }
        IdeaCommands::Update { id, content, details, x, y } => {
            let idea = load_idea(store.as_ref(), &id).await?;
            if let LockView::LockedByOther { holder, since } =
                coordinator.view(&idea.edit_lock, &user, Utc::now())
            {
                return Err(refused(&holder, since));
            }

            let position = match (x, y) {
                (None, None) => None,
                (x, y) => Some(MatrixPosition {
                    x: x.unwrap_or(idea.position.x),
                    y: y.unwrap_or(idea.position.y),
                }),
            };
            let patch = IdeaPatch {
                content,
                details,
                position,
                edit_lock: None,
            };
            if patch == IdeaPatch::default() {
                bail!("Nothing to update. Pass --content, --details, --x or --y");
            }

            let updated = ctx.idea_service(store.clone()).update(&id, &patch).await?;

            output(
                &IdeaActionOutput {
                    success: true,
                    message: format!("Idea {} updated", updated.id),
                    idea: Some(to_output(&coordinator, &updated, &user)),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
