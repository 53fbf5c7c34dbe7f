//! Credentials for GitHub API basic authentication.

use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;

/// Username and personal access token sent as HTTP basic auth.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    token: SecretString,
}

impl Credentials {
    /// Creates credentials, rejecting empty values.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> ScrapeResult<Self> {
        let username = username.into();
        let token = token.into();
        if username.trim().is_empty() || token.trim().is_empty() {
            return Err(ScrapeError::new(
                ScrapeErrorKind::MissingCredentials,
                "GitHub user name and API token must both be set",
            ));
        }
        Ok(Self {
            username,
            token: SecretString::new(token),
        })
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Gets the token.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        let exposed = self.token.expose_secret();
        if exposed.starts_with("ghp_") {
            "ghp_***"
        } else if exposed.starts_with("github_pat_") {
            "github_pat_***"
        } else {
            "***"
        }
    }
}

/// Source of credentials for a run.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolves the credentials.
    async fn credentials(&self) -> ScrapeResult<Credentials>;
}

/// Static credential provider using fixed credentials.
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    /// Creates a new static credential provider.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> ScrapeResult<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Environment variable credential provider.
pub struct EnvCredentialProvider {
    user_var: String,
    token_var: String,
}

impl EnvCredentialProvider {
    /// Reads `GITHUB_USER` and `GITHUB_TOKEN`.
    pub fn from_github_env() -> Self {
        Self::from_env_vars("GITHUB_USER", "GITHUB_TOKEN")
    }

    /// Reads custom environment variables.
    pub fn from_env_vars(user_var: impl Into<String>, token_var: impl Into<String>) -> Self {
        Self {
            user_var: user_var.into(),
            token_var: token_var.into(),
        }
    }

    fn read(var: &str) -> ScrapeResult<String> {
        std::env::var(var).map_err(|_| {
            ScrapeError::new(
                ScrapeErrorKind::MissingCredentials,
                format!("Environment variable {} not set", var),
            )
        })
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn credentials(&self) -> ScrapeResult<Credentials> {
        Credentials::new(Self::read(&self.user_var)?, Self::read(&self.token_var)?)
    }
}

#[derive(Debug, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    api_token: String,
}

/// Reads `user_name` and `api_token` from a JSON file.
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    /// Creates a provider for the given `config.json`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn missing(&self) -> ScrapeError {
        ScrapeError::new(
            ScrapeErrorKind::MissingCredentials,
            format!(
                "Failed to read GitHub user name and/or API token; add them to {}",
                self.path.display()
            ),
        )
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn credentials(&self) -> ScrapeResult<Credentials> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.missing().with_cause(e))?;
        let file: CredentialFile =
            serde_json::from_str(&raw).map_err(|e| self.missing().with_cause(e))?;
        Credentials::new(file.user_name, file.api_token).map_err(|_| self.missing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_token_prefix() {
        let creds = Credentials::new("octocat", "ghp_xxxxxxxxxxxx").unwrap();
        assert_eq!(creds.token_prefix(), "ghp_***");
        let creds = Credentials::new("octocat", "plain").unwrap();
        assert_eq!(creds.token_prefix(), "***");
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = Credentials::new("", "ghp_x").unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::MissingCredentials);
        assert!(Credentials::new("octocat", "  ").is_err());
    }

    #[tokio::test]
    async fn test_static_credential_provider() {
        let provider = StaticCredentialProvider::new(Credentials::new("octocat", "t").unwrap());
        assert_eq!(provider.credentials().await.unwrap().username(), "octocat");
    }

    #[tokio::test]
    async fn test_file_credential_provider() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"user_name": "octocat", "api_token": "ghp_abc"}}"#).unwrap();

        let creds = FileCredentialProvider::new(file.path()).credentials().await.unwrap();
        assert_eq!(creds.username(), "octocat");
        assert_eq!(creds.token().expose_secret(), "ghp_abc");
    }

    #[tokio::test]
    async fn test_file_credential_provider_empty_token() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"user_name": "octocat", "api_token": ""}}"#).unwrap();

        let err = FileCredentialProvider::new(file.path()).credentials().await.unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::MissingCredentials);
    }

    #[tokio::test]
    async fn test_file_credential_provider_missing_file() {
        let err = FileCredentialProvider::new("/nonexistent/config.json")
            .credentials()
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
