use crate::{
    domain::{Account, AdminUser, RedeemCode, Redemption, RedemptionSource, Reward},
    ports::{
        admin::{self, AdminPort},
        ledger::{Error, LedgerPort},
    },
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

/// In-memory ledger
///
/// All tables sit behind a single mutex, so every port call observes and mutates a consistent
/// snapshot. This gives the same all-or-nothing behavior as a database transaction.
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    codes: HashMap<Uuid, RedeemCode>,
    rewards: HashMap<Uuid, Reward>,
    redemptions: Vec<Redemption>,
    admins: HashMap<String, AdminUser>,
}

impl MemoryDatabase {
    pub fn insert_account(&self, account: Account) -> Result<(), Error> {
        self.tables()?.accounts.insert(account.account_id, account);
        Ok(())
    }

    pub fn insert_code(&self, code: RedeemCode) -> Result<(), Error> {
        self.tables()?.codes.insert(code.code_id, code);
        Ok(())
    }

    pub fn insert_reward(&self, reward: Reward) -> Result<(), Error> {
        self.tables()?.rewards.insert(reward.reward_id, reward);
        Ok(())
    }

    pub fn insert_admin(&self, admin: AdminUser) -> Result<(), admin::Error> {
        self.tables()?.admins.insert(admin.email.clone(), admin);
        Ok(())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, ErasedPoisonError> {
        self.tables.lock().map_err(ErasedPoisonError::from)
    }
}

impl Tables {
    fn account_mut(&mut self, account_id: Uuid) -> Result<&mut Account, Error> {
        self.accounts
            .get_mut(&account_id)
            .ok_or(Error::AccountNotFound(account_id))
    }
}

#[async_trait::async_trait]
impl LedgerPort for MemoryDatabase {
    async fn get_account(&self, account_id: Uuid) -> Result<Account, Error> {
        self.tables()?
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(Error::AccountNotFound(account_id))
    }

    async fn add_points(&self, account_id: Uuid, delta_points: i32) -> Result<Account, Error> {
        let mut tables = self.tables()?;
        let account = tables.account_mut(account_id)?;

        let new_points = account.points as i64 + delta_points as i64;
        // Return an error if this would make the number of points negative
        if new_points < 0 {
            return Err(Error::NegativePointsTotal {
                current_points: account.points,
                delta_points,
            });
        }
        account.points = u32::try_from(new_points).map_err(|err| Error::Adapter(Box::new(err)))?;

        Ok(account.clone())
    }

    async fn find_code(&self, code: &str) -> Result<RedeemCode, Error> {
        self.tables()?
            .codes
            .values()
            .find(|stored| stored.code == code)
            .cloned()
            .ok_or_else(|| Error::CodeNotFound(code.to_string()))
    }

    async fn redeem_code(&self, account_id: Uuid, code_id: Uuid) -> Result<Redemption, Error> {
        let mut tables = self.tables()?;

        // Validate everything before the first mutation so a failure leaves no partial effect
        let code = tables
            .codes
            .get(&code_id)
            .cloned()
            .ok_or_else(|| Error::CodeNotFound(code_id.to_string()))?;
        if code.is_used {
            return Err(Error::CodeAlreadyUsed(code_id));
        }
        let account = tables.account_mut(account_id)?;
        let new_points = account
            .points
            .checked_add(code.points)
            .ok_or_else(|| Error::Adapter("point balance overflow".into()))?;

        account.points = new_points;
        if let Some(stored) = tables.codes.get_mut(&code_id) {
            stored.is_used = true;
        }
        let redemption = Redemption::new(
            account_id,
            RedemptionSource::Code { code_id },
            code.points as i64,
        );
        tables.redemptions.push(redemption.clone());

        Ok(redemption)
    }

    async fn get_reward(&self, reward_id: Uuid) -> Result<Reward, Error> {
        self.tables()?
            .rewards
            .get(&reward_id)
            .cloned()
            .ok_or(Error::RewardNotFound(reward_id))
    }

    async fn redeem_reward(
        &self,
        account_id: Uuid,
        reward_id: Uuid,
    ) -> Result<Redemption, Error> {
        let mut tables = self.tables()?;

        let cost = tables
            .rewards
            .get(&reward_id)
            .map(|reward| reward.points_cost)
            .ok_or(Error::RewardNotFound(reward_id))?;
        let account = tables.account_mut(account_id)?;
        if account.points < cost {
            return Err(Error::InsufficientPoints {
                balance: account.points,
                cost,
            });
        }

        account.points -= cost;
        let redemption = Redemption::new(
            account_id,
            RedemptionSource::Reward { reward_id },
            -(cost as i64),
        );
        tables.redemptions.push(redemption.clone());

        Ok(redemption)
    }

    async fn list_redemptions(&self, account_id: Uuid) -> Result<Vec<Redemption>, Error> {
        let tables = self.tables()?;
        if !tables.accounts.contains_key(&account_id) {
            return Err(Error::AccountNotFound(account_id));
        }

        // Records are appended in time order
        let redemptions = tables
            .redemptions
            .iter()
            .rev()
            .filter(|redemption| redemption.account_id == account_id)
            .cloned()
            .collect();

        Ok(redemptions)
    }
}

#[async_trait::async_trait]
impl AdminPort for MemoryDatabase {
    async fn find_admin_by_email(&self, email: &str) -> Result<AdminUser, admin::Error> {
        self.tables()?
            .admins
            .get(email)
            .cloned()
            .ok_or_else(|| admin::Error::UserDoesNotExist(email.to_string()))
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for ErasedPoisonError {
    fn from(err: PoisonError<T>) -> Self {
        Self(err.to_string())
    }
}

impl From<ErasedPoisonError> for Error {
    fn from(err: ErasedPoisonError) -> Self {
        Self::Adapter(Box::new(err))
    }
}

impl From<ErasedPoisonError> for admin::Error {
    fn from(err: ErasedPoisonError) -> Self {
        Self::Adapter(Box::new(err))
    }
}
