//! Author import.
//!
//! WordPress author logins map onto manager users. Imported users carry no
//! usable password; access requires an out-of-band reset.

use std::collections::HashMap;

use indicatif::ProgressBar;
use tracing::info;

use crate::store::{StoreError, UserId, UserProfile, UserStore};
use crate::wxr::{AuthorNode, WxrDocument};

/// Login that rollback must never delete, no matter what the document
/// says.
pub const PROTECTED_LOGIN: &str = "admin";

/// Result of the user stage.
#[derive(Debug, Default)]
pub struct UserOutcome {
    /// Author login → user id, for every author that saved.
    pub map: HashMap<String, UserId>,
    pub created: usize,
    pub reused: usize,
    /// Non-fatal per-node failures.
    pub errors: Vec<String>,
}

/// Import all authors, returning the login → user-id map for the post
/// stage. A failed author is simply absent from the map; downstream falls
/// back to the default author.
pub async fn import(doc: &WxrDocument, users: &dyn UserStore) -> UserOutcome {
    info!("Importing {} users", doc.authors.len());
    let mut outcome = UserOutcome::default();

    let bar = ProgressBar::new(doc.authors.len() as u64);
    for author in &doc.authors {
        match import_author(users, author).await {
            Ok((id, reused)) => {
                outcome.map.insert(author.login.clone(), id);
                if reused {
                    outcome.reused += 1;
                } else {
                    outcome.created += 1;
                }
            }
            Err(e) => {
                outcome
                    .errors
                    .push(format!("Error importing user {}: {e}", author.login));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    info!(
        "Users imported ({} created, {} reused)",
        outcome.created, outcome.reused
    );
    outcome
}

async fn import_author(
    users: &dyn UserStore,
    author: &AuthorNode,
) -> Result<(UserId, bool), StoreError> {
    if let Some(existing) = users.find_user(&author.login).await? {
        return Ok((existing.id, true));
    }

    let user = users.create_user(&author.login).await?;
    users
        .create_profile(UserProfile {
            user_id: user.id,
            fullname: author.display_name.clone(),
            email: author.email.clone(),
            role: 0,
            blocked: false,
        })
        .await?;

    Ok((user.id, false))
}

/// Delete every author from the document by login, except the protected
/// superuser.
pub async fn rollback(doc: &WxrDocument, users: &dyn UserStore) -> super::RollbackStage {
    info!("Deleting users");
    let mut stage = super::RollbackStage::default();

    for author in &doc.authors {
        if author.login == PROTECTED_LOGIN {
            continue;
        }
        match users.delete_user(&author.login).await {
            Ok(()) => stage.deleted += 1,
            Err(e) => stage
                .errors
                .push(format!("Error deleting user {}: {e}", author.login)),
        }
    }

    stage
}
