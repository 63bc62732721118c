use crate::company::{slugify, Company, CreateCompanyInput, GetCompanyInput};
use crate::error::{DomainError, DomainResult};
use crate::repository::CompanyRepository;
use crate::validate::validate_struct;
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Request to create a company tenant
#[derive(Debug, Clone, Validate)]
pub struct CreateCompanyRequest {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(email)]
    pub email: String,
}

/// Domain service for company tenant business logic.
///
/// Slug computation happens here, explicitly, before the write: once
/// `create_company` returns, the slug exists and the tenant group name
/// is stable. No implicit save-hooks.
pub struct CompanyService {
    repository: Arc<dyn CompanyRepository>,
}

impl CompanyService {
    pub fn new(repository: Arc<dyn CompanyRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_company(&self, request: CreateCompanyRequest) -> DomainResult<Company> {
        validate_struct(&request)?;

        let slug = slugify(&request.name);
        if slug.is_empty() {
            return Err(DomainError::ValidationError(
                "company name yields an empty slug".to_string(),
            ));
        }

        if self
            .repository
            .get_company(GetCompanyInput { slug: slug.clone() })
            .await?
            .is_some()
        {
            return Err(DomainError::CompanyAlreadyExists(slug));
        }

        let company = self
            .repository
            .create_company(CreateCompanyInput {
                id: xid::new().to_string(),
                name: request.name,
                slug,
                email: request.email,
            })
            .await?;

        debug!(company_id = %company.id, slug = %company.slug, "company created");
        Ok(company)
    }

    pub async fn get_company(&self, slug: &str) -> DomainResult<Company> {
        self.repository
            .get_company(GetCompanyInput {
                slug: slug.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::CompanyNotFound(slug.to_string()))
    }
}
