//! Loading the organization list from disk.

use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Column holding one organization login per row.
pub const ORGANIZATION_COLUMN: &str = "github_org_name";

#[derive(Debug, Deserialize)]
struct OrganizationRow {
    github_org_name: Option<String>,
}

/// Reads organization logins from a CSV file with a `github_org_name` column.
pub fn read_organizations(path: &Path) -> ScrapeResult<Vec<String>> {
    let file = std::fs::File::open(path).map_err(|e| {
        ScrapeError::new(
            ScrapeErrorKind::MissingOrganizations,
            format!("Failed to open {}", path.display()),
        )
        .with_cause(e)
    })?;
    parse_organizations(file)
}

pub(crate) fn parse_organizations<R: Read>(reader: R) -> ScrapeResult<Vec<String>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().map_err(|e| {
        ScrapeError::new(ScrapeErrorKind::MissingOrganizations, "Unreadable organization list")
            .with_cause(e)
    })?;
    if !headers.iter().any(|h| h == ORGANIZATION_COLUMN) {
        return Err(ScrapeError::new(
            ScrapeErrorKind::MissingOrganizations,
            format!("Organization list has no '{}' column", ORGANIZATION_COLUMN),
        ));
    }

    let mut orgs = Vec::new();
    for row in csv_reader.deserialize::<OrganizationRow>() {
        let row = row.map_err(|e| {
            ScrapeError::new(ScrapeErrorKind::MissingOrganizations, "Malformed organization row")
                .with_cause(e)
        })?;
        if let Some(name) = row.github_org_name.map(|n| n.trim().to_string()) {
            if !name.is_empty() && !orgs.contains(&name) {
                orgs.push(name);
            }
        }
    }

    if orgs.is_empty() {
        return Err(ScrapeError::new(
            ScrapeErrorKind::MissingOrganizations,
            format!(
                "No organizations to scrape; add one name per row in the '{}' column",
                ORGANIZATION_COLUMN
            ),
        ));
    }
    Ok(orgs)
}
