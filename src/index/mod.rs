//! Per-run indices of organization members and repositories.
//!
//! Several operations walk the same member or repository lists. The lists
//! are fetched once per run, on first use, and shared read-only afterwards.

use crate::scheduler::{FailureReport, FanOutScheduler, FetchBatch, FetchRequest};
use crate::types::{Context, Endpoint, Entity, Repository};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::info;

/// The indices an operation can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    /// Organization members.
    Members,
    /// Organization repositories.
    Repos,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Members => write!(f, "member_index"),
            IndexKind::Repos => write!(f, "repo_index"),
        }
    }
}

/// Organization to ordered, de-duplicated member logins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberIndex {
    entries: Vec<(String, Vec<String>)>,
}

impl MemberIndex {
    /// Fetches the members of every organization as one batch.
    ///
    /// An organization whose member list cannot be read maps to no members.
    pub async fn load(
        scheduler: &FanOutScheduler,
        organizations: &[String],
    ) -> (Self, Vec<FailureReport>) {
        info!(organizations = organizations.len(), "Loading organization members");
        let batch: FetchBatch = organizations
            .iter()
            .map(|org| {
                FetchRequest::new(
                    Endpoint::OrgMembers { org: org.clone() },
                    Context::organization(org.as_str()),
                )
            })
            .collect();

        let result = scheduler.run(batch).await;
        let failures = result.failures();
        let entries = organizations
            .iter()
            .cloned()
            .zip(result.into_outcomes())
            .map(|(org, outcome)| (org, unique_logins(outcome.entities())))
            .collect();

        (Self { entries }, failures)
    }

    /// Builds an index from known entries.
    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Gets the members of an organization.
    pub fn members(&self, org: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == org)
            .map(|(_, logins)| logins.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over `(organization, members)` in organization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(org, logins)| (org.as_str(), logins.as_slice()))
    }

    /// Union of members of every organization.
    pub fn all_logins(&self) -> HashSet<String> {
        self.entries
            .iter()
            .flat_map(|(_, logins)| logins.iter().cloned())
            .collect()
    }

    /// Total number of `(organization, member)` pairs.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, logins)| logins.len()).sum()
    }

    /// Returns true if no organization has members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn unique_logins(entities: &[Entity]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut logins = Vec::new();
    for login in entities.iter().filter_map(|e| e.get_str("login")) {
        if seen.insert(login) {
            logins.push(login.to_string());
        }
    }
    logins
}

/// Organization to repository descriptors.
///
/// Descriptors are the tagged repository objects, so the repository table
/// can project any column from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoIndex {
    entries: Vec<(String, Vec<Entity>)>,
}

impl RepoIndex {
    /// Fetches the repositories of every organization as one batch.
    pub async fn load(
        scheduler: &FanOutScheduler,
        organizations: &[String],
    ) -> (Self, Vec<FailureReport>) {
        info!(organizations = organizations.len(), "Loading organization repositories");
        let batch: FetchBatch = organizations
            .iter()
            .map(|org| {
                FetchRequest::new(
                    Endpoint::OrgRepos { org: org.clone() },
                    Context::organization(org.as_str()),
                )
            })
            .collect();

        let result = scheduler.run(batch).await;
        let failures = result.failures();
        let entries = organizations
            .iter()
            .cloned()
            .zip(result.into_outcomes())
            .map(|(org, outcome)| (org, outcome.into_entities()))
            .collect();

        (Self { entries }, failures)
    }

    /// Gets the repository objects of an organization.
    pub fn entities(&self, org: &str) -> &[Entity] {
        self.entries
            .iter()
            .find(|(name, _)| name == org)
            .map(|(_, repos)| repos.as_slice())
            .unwrap_or(&[])
    }

    /// Gets the typed repositories of an organization.
    pub fn repositories(&self, org: &str) -> Vec<Repository> {
        self.entities(org)
            .iter()
            .filter_map(|e| e.decode().ok())
            .collect()
    }

    /// Iterates over `(organization, repositories)` in organization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Entity])> {
        self.entries
            .iter()
            .map(|(org, repos)| (org.as_str(), repos.as_slice()))
    }

    /// Total number of repositories.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, repos)| repos.len()).sum()
    }

    /// Returns true if no organization has repositories.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily loaded indices for one run.
///
/// With reuse enabled each index is fetched at most once, however many
/// operations ask for it. With reuse disabled every consumer fetches anew,
/// except that an index preloaded through [`Indices::get_or_load`] is handed
/// to the first consumer instead of being fetched again.
pub struct Indices {
    scheduler: FanOutScheduler,
    organizations: Vec<String>,
    reuse: bool,
    members: OnceCell<Arc<MemberIndex>>,
    repos: OnceCell<Arc<RepoIndex>>,
    preloaded_members: Mutex<Option<Arc<MemberIndex>>>,
    preloaded_repos: Mutex<Option<Arc<RepoIndex>>>,
    failures: Mutex<Vec<FailureReport>>,
    loads: AtomicUsize,
}

impl Indices {
    /// Creates unloaded indices.
    pub fn new(scheduler: FanOutScheduler, organizations: Vec<String>, reuse: bool) -> Self {
        Self {
            scheduler,
            organizations,
            reuse,
            members: OnceCell::new(),
            repos: OnceCell::new(),
            preloaded_members: Mutex::new(None),
            preloaded_repos: Mutex::new(None),
            failures: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Gets the member index, loading it if needed.
    pub async fn members(&self) -> Arc<MemberIndex> {
        if !self.reuse {
            if let Some(index) = take(&self.preloaded_members) {
                return index;
            }
            return self.load_members().await;
        }
        self.members
            .get_or_init(|| self.load_members())
            .await
            .clone()
    }

    /// Gets the repository index, loading it if needed.
    pub async fn repos(&self) -> Arc<RepoIndex> {
        if !self.reuse {
            if let Some(index) = take(&self.preloaded_repos) {
                return index;
            }
            return self.load_repos().await;
        }
        self.repos.get_or_init(|| self.load_repos()).await.clone()
    }

    /// Loads one index ahead of its consumers.
    ///
    /// Without reuse the loaded index is parked for the next consumer; a
    /// second preload of the same kind is a no-op while one is parked.
    pub async fn get_or_load(&self, kind: IndexKind) {
        match (kind, self.reuse) {
            (IndexKind::Members, true) => drop(self.members().await),
            (IndexKind::Repos, true) => drop(self.repos().await),
            (IndexKind::Members, false) => {
                if !is_parked(&self.preloaded_members) {
                    let index = self.load_members().await;
                    park(&self.preloaded_members, index);
                }
            }
            (IndexKind::Repos, false) => {
                if !is_parked(&self.preloaded_repos) {
                    let index = self.load_repos().await;
                    park(&self.preloaded_repos, index);
                }
            }
        }
    }

    /// Returns true if the index is cached or parked for its next consumer.
    pub fn is_loaded(&self, kind: IndexKind) -> bool {
        match kind {
            IndexKind::Members => {
                self.members.initialized() || is_parked(&self.preloaded_members)
            }
            IndexKind::Repos => self.repos.initialized() || is_parked(&self.preloaded_repos),
        }
    }

    /// Number of index fetches performed so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Drains failures recorded while loading.
    pub fn take_failures(&self) -> Vec<FailureReport> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Organizations the indices cover.
    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    async fn load_members(&self) -> Arc<MemberIndex> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let (index, failures) = MemberIndex::load(&self.scheduler, &self.organizations).await;
        self.record(failures);
        Arc::new(index)
    }

    async fn load_repos(&self) -> Arc<RepoIndex> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let (index, failures) = RepoIndex::load(&self.scheduler, &self.organizations).await;
        self.record(failures);
        Arc::new(index)
    }

    fn record(&self, failures: Vec<FailureReport>) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(failures);
    }
}

fn take<T>(slot: &Mutex<Option<Arc<T>>>) -> Option<Arc<T>> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

fn park<T>(slot: &Mutex<Option<Arc<T>>>, index: Arc<T>) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(index);
}

fn is_parked<T>(slot: &Mutex<Option<Arc<T>>>) -> bool {
    slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
}
