use crate::credentials::{issue_api_key, IssuedApiKey};
use crate::error::{DomainError, DomainResult};
use crate::repository::{CompanyRepository, UserRepository};
use crate::role::Role;
use crate::user::{CreateUserInput, GetUserInput, User};
use crate::validate::validate_struct;
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Request to create a user principal
#[derive(Debug, Clone, Validate)]
pub struct CreateUserRequest {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: Role,
    #[garde(skip)]
    pub company_id: Option<String>,
    #[garde(skip)]
    pub created_by: Option<String>,
}

/// Output of user creation: the raw API key is returned exactly once.
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: User,
    pub raw_api_key: String,
}

/// Domain service for user principal business logic.
///
/// API key issuance is an explicit step of the create path, ordered
/// before the write so the credential exists once this call returns.
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    company_repository: Arc<dyn CompanyRepository>,
}

impl UserService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        company_repository: Arc<dyn CompanyRepository>,
    ) -> Self {
        Self {
            user_repository,
            company_repository,
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> DomainResult<CreatedUser> {
        validate_struct(&request)?;

        if self
            .user_repository
            .get_user(GetUserInput {
                username: request.username.clone(),
            })
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists(request.username));
        }

        if let Some(company_id) = &request.company_id {
            self.company_repository
                .get_company_by_id(company_id)
                .await?
                .ok_or_else(|| DomainError::CompanyNotFound(company_id.clone()))?;
        }

        let IssuedApiKey { raw_key, digest } = issue_api_key();

        let user = self
            .user_repository
            .create_user(CreateUserInput {
                id: xid::new().to_string(),
                username: request.username,
                email: request.email,
                role: request.role,
                company_id: request.company_id,
                created_by: request.created_by,
                api_key_digest: digest,
            })
            .await?;

        user.validate_company_link()?;

        debug!(user_id = %user.id, username = %user.username, "user created");
        Ok(CreatedUser {
            user,
            raw_api_key: raw_key,
        })
    }

    pub async fn get_user(&self, username: &str) -> DomainResult<User> {
        self.user_repository
            .get_user(GetUserInput {
                username: username.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::Company;
    use crate::repository::{MockCompanyRepository, MockUserRepository};

    fn created(input: CreateUserInput) -> User {
        User {
            id: input.id,
            username: input.username,
            email: input.email,
            role: input.role,
            associated_with_company: input.company_id.is_some(),
            company_id: input.company_id,
            created_by: input.created_by,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_issues_api_key() {
        let mut users = MockUserRepository::new();
        users.expect_get_user().times(1).return_once(|_| Ok(None));
        users
            .expect_create_user()
            .withf(|input: &CreateUserInput| input.api_key_digest.len() == 64)
            .times(1)
            .return_once(|input| Ok(created(input)));

        let service = UserService::new(Arc::new(users), Arc::new(MockCompanyRepository::new()));
        let out = service
            .create_user(CreateUserRequest {
                username: "bob-user".to_string(),
                email: "bob@example.com".to_string(),
                role: Role::Dealer,
                company_id: None,
                created_by: None,
            })
            .await
            .unwrap();
        assert!(!out.raw_api_key.is_empty());
        assert!(!out.user.associated_with_company);
    }

    #[tokio::test]
    async fn test_create_user_unknown_company_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_get_user().times(1).return_once(|_| Ok(None));
        let mut companies = MockCompanyRepository::new();
        companies
            .expect_get_company_by_id()
            .times(1)
            .return_once(|_| Ok(None));

        let service = UserService::new(Arc::new(users), Arc::new(companies));
        let result = service
            .create_user(CreateUserRequest {
                username: "carol".to_string(),
                email: "carol@example.com".to_string(),
                role: Role::Moderator,
                company_id: Some("missing".to_string()),
                created_by: None,
            })
            .await;
        assert!(matches!(result, Err(DomainError::CompanyNotFound(_))));
    }

    #[tokio::test]
    async fn test_company_user_flag_consistent() {
        let mut users = MockUserRepository::new();
        users.expect_get_user().times(1).return_once(|_| Ok(None));
        users
            .expect_create_user()
            .times(1)
            .return_once(|input| Ok(created(input)));
        let mut companies = MockCompanyRepository::new();
        companies
            .expect_get_company_by_id()
            .times(1)
            .return_once(|id: &str| {
                Ok(Some(Company {
                    id: id.to_string(),
                    name: "Acme Co".to_string(),
                    slug: "acme-co".to_string(),
                    email: "ops@acme.example".to_string(),
                    created_at: None,
                    updated_at: None,
                }))
            });

        let service = UserService::new(Arc::new(users), Arc::new(companies));
        let out = service
            .create_user(CreateUserRequest {
                username: "carol".to_string(),
                email: "carol@example.com".to_string(),
                role: Role::Moderator,
                company_id: Some("c-1".to_string()),
                created_by: Some("admin".to_string()),
            })
            .await
            .unwrap();
        assert!(out.user.associated_with_company);
    }
}
