//! Data types for the GitHub endpoints the scraper reads.
//!
//! Responses are kept as [`Entity`] maps so tables can project any column,
//! but every item is first checked against the typed record for its
//! endpoint. An item that does not fit the record is a decode error.

mod endpoint;
mod entity;

pub use endpoint::{Endpoint, FetchMode};
pub use entity::{Context, Entity, FieldRef, ORGANIZATION, REPOSITORY, USER};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GitHub account as listed by members, followers and following endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Username (login).
    pub login: String,
    /// Account type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Repository contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    /// Contributor login.
    pub login: String,
    /// Number of contributions.
    #[serde(default)]
    pub contributions: Option<u64>,
    /// Profile URL.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Repository descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    #[serde(default)]
    pub full_name: Option<String>,
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: Option<bool>,
    /// Primary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Repository description.
    #[serde(default)]
    pub description: Option<String>,
    /// Stargazer count.
    #[serde(default)]
    pub stargazers_count: Option<u64>,
    /// Fork count.
    #[serde(default)]
    pub forks_count: Option<u64>,
}

impl Repository {
    /// Node key for graphs: the full name when present, else the name.
    pub fn key(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

/// Public profile of a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Username (login).
    pub login: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Account type.
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    /// Company.
    #[serde(default)]
    pub company: Option<String>,
    /// Blog URL.
    #[serde(default)]
    pub blog: Option<String>,
    /// Location.
    #[serde(default)]
    pub location: Option<String>,
}

/// Organization a user belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization login.
    pub login: String,
}

/// Expected record shape of an endpoint's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityShape {
    /// [`Account`].
    Account,
    /// [`Contributor`].
    Contributor,
    /// [`Repository`].
    Repository,
    /// [`UserProfile`].
    UserProfile,
    /// [`Organization`].
    Organization,
}

impl EntityShape {
    /// Checks that a JSON item deserializes into this shape's record.
    pub fn validate(&self, item: &Value) -> Result<(), serde_json::Error> {
        match self {
            Self::Account => Account::deserialize(item).map(drop),
            Self::Contributor => Contributor::deserialize(item).map(drop),
            Self::Repository => Repository::deserialize(item).map(drop),
            Self::UserProfile => UserProfile::deserialize(item).map(drop),
            Self::Organization => Organization::deserialize(item).map(drop),
        }
    }

    /// Human readable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Contributor => "contributor",
            Self::Repository => "repository",
            Self::UserProfile => "user profile",
            Self::Organization => "organization",
        }
    }
}
