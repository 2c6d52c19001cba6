//! HTTP handlers behind [`crate::server::create_router`].

pub mod dashboard;
pub mod session;
pub mod settings;
pub mod templates;
pub mod triage;

use crate::platform::types::RepoRef;

fn repo_ref(owner: String, name: String) -> RepoRef {
    RepoRef { owner, name }
}
