use crate::domain::AdminUser;

#[mockall::automock]
#[async_trait::async_trait]
pub trait AdminPort {
    async fn find_admin_by_email(&self, email: &str) -> Result<AdminUser, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when no user is registered with this email
    #[error("user {0} does not exist")]
    UserDoesNotExist(String),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
