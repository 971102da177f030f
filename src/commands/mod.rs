use std::{future::Future, pin::Pin, sync::Arc};

pub mod account;
pub mod award_points;
pub mod redeem_code;
pub mod redeem_reward;
pub mod sign_in;

/// Future returned by every command
pub type CommandFuture<T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send>>;

/// Entry point for all commands
///
/// Holds no state of its own besides handles to the injected ports, so it can be cloned freely
/// and every request is independent.
pub struct DomainLogic<L, A> {
    ledger: Arc<L>,
    admins: Arc<A>,
}

impl<L, A> DomainLogic<L, A> {
    pub fn new(ledger: Arc<L>, admins: Arc<A>) -> Self {
        Self { ledger, admins }
    }
}

impl<L, A> Clone for DomainLogic<L, A> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            admins: self.admins.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("ledger port error: {0}")]
    Ledger(#[from] crate::ports::ledger::Error),
    #[error("admin port error: {0}")]
    Admin(#[from] crate::ports::admin::Error),

    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The user exists but may not use the dashboard
    #[error("user {0} is not an administrator")]
    NotAnAdmin(String),
}
