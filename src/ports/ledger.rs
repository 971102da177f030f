use uuid::Uuid;

use crate::domain::{Account, RedeemCode, Redemption, Reward};

/// Persisted points ledger
///
/// Every method that mutates a balance is a single atomic unit at the store level. Callers never
/// compute a new balance themselves and write it back.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LedgerPort {
    async fn get_account(&self, account_id: Uuid) -> Result<Account, Error>;

    /// Atomically add `delta_points` to the balance and return the updated account
    async fn add_points(&self, account_id: Uuid, delta_points: i32) -> Result<Account, Error>;

    async fn find_code(&self, code: &str) -> Result<RedeemCode, Error>;

    /// Credit the code's points to the account and mark the code as used
    ///
    /// The unused check is repeated inside the same atomic unit, so two concurrent calls for the
    /// same code cannot both succeed.
    async fn redeem_code(&self, account_id: Uuid, code_id: Uuid) -> Result<Redemption, Error>;

    async fn get_reward(&self, reward_id: Uuid) -> Result<Reward, Error>;

    /// Debit the reward's cost from the account and record the redemption
    ///
    /// The balance is checked against the cost inside the same atomic unit as the debit.
    async fn redeem_reward(&self, account_id: Uuid, reward_id: Uuid)
        -> Result<Redemption, Error>;

    /// Redemptions for an account, newest first
    async fn list_redemptions(&self, account_id: Uuid) -> Result<Vec<Redemption>, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("account {0} does not exist")]
    AccountNotFound(Uuid),

    #[error("code {0:?} does not exist")]
    CodeNotFound(String),

    #[error("reward {0} does not exist")]
    RewardNotFound(Uuid),

    /// The code was consumed by an earlier redemption
    #[error("code {0} has already been used")]
    CodeAlreadyUsed(Uuid),

    /// Balance is lower than the cost of the reward
    #[error("not enough points: {balance} available, {cost} required")]
    InsufficientPoints { balance: u32, cost: u32 },

    /// Trying to remove too many points
    ///
    /// This would result in a negative balance, which is not supported.
    #[error("trying to subtract too many points: {delta_points} from {current_points}")]
    NegativePointsTotal {
        current_points: u32,
        delta_points: i32,
    },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
