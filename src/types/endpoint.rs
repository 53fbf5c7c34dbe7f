use super::EntityShape;
use std::fmt;

/// How an endpoint returns its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// JSON arrays, walked page by page until an empty page.
    Paginated,
    /// One JSON object, fetched with a single request.
    SingleObject,
}

/// GitHub REST endpoints the scraper reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/orgs/{org}/members`
    OrgMembers {
        /// Organization login.
        org: String,
    },
    /// `/orgs/{org}/repos`
    OrgRepos {
        /// Organization login.
        org: String,
    },
    /// `/repos/{owner}/{repo}/contributors`
    RepoContributors {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
    },
    /// `/users/{user}`
    User {
        /// User login.
        user: String,
    },
    /// `/users/{user}/repos`
    UserRepos {
        /// User login.
        user: String,
    },
    /// `/users/{user}/starred`
    UserStarred {
        /// User login.
        user: String,
    },
    /// `/users/{user}/followers`
    UserFollowers {
        /// User login.
        user: String,
    },
    /// `/users/{user}/following`
    UserFollowing {
        /// User login.
        user: String,
    },
    /// `/users/{user}/orgs`
    UserOrgs {
        /// User login.
        user: String,
    },
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(&self) -> String {
        match self {
            Self::OrgMembers { org } => format!("/orgs/{}/members", org),
            Self::OrgRepos { org } => format!("/orgs/{}/repos", org),
            Self::RepoContributors { owner, repo } => {
                format!("/repos/{}/{}/contributors", owner, repo)
            }
            Self::User { user } => format!("/users/{}", user),
            Self::UserRepos { user } => format!("/users/{}/repos", user),
            Self::UserStarred { user } => format!("/users/{}/starred", user),
            Self::UserFollowers { user } => format!("/users/{}/followers", user),
            Self::UserFollowing { user } => format!("/users/{}/following", user),
            Self::UserOrgs { user } => format!("/users/{}/orgs", user),
        }
    }

    /// Pagination mode of the endpoint.
    pub fn mode(&self) -> FetchMode {
        match self {
            Self::User { .. } => FetchMode::SingleObject,
            _ => FetchMode::Paginated,
        }
    }

    /// Record shape of the endpoint's items.
    pub fn shape(&self) -> EntityShape {
        match self {
            Self::OrgMembers { .. } | Self::UserFollowers { .. } | Self::UserFollowing { .. } => {
                EntityShape::Account
            }
            Self::RepoContributors { .. } => EntityShape::Contributor,
            Self::OrgRepos { .. } | Self::UserRepos { .. } | Self::UserStarred { .. } => {
                EntityShape::Repository
            }
            Self::User { .. } => EntityShape::UserProfile,
            Self::UserOrgs { .. } => EntityShape::Organization,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
