use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Company tenant entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// URL-safe identifier derived from the name; doubles as the live
    /// fan-out group name for the tenant.
    pub slug: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// External input for creating a company (no ID, slug computed by the service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCompanyInput {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub email: String,
}

/// Input for fetching a company by slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCompanyInput {
    pub slug: String,
}

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Co"), "acme-co");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Acme -- Industrial  Co. "), "acme-industrial-co");
    }

    #[test]
    fn test_slugify_mixed_case() {
        assert_eq!(slugify("WaterWorks 2000"), "waterworks-2000");
    }
}
