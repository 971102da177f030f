use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    FromRow,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    domain::{Account, AdminUser, RedeemCode, Redemption, RedemptionSource, Reward},
    ports::{
        admin::{self, AdminPort},
        ledger::{Error, LedgerPort},
    },
};

/// PostgreSQL ledger
///
/// Balance changes are either single conditional `UPDATE` statements or transactions holding a
/// row lock on the account, so concurrent requests never overwrite each other's updates.
#[derive(Clone, Debug)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!("connecting to database");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    points: i32,
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            account_id: row.id,
            name: row.name,
            email: row.email,
            points: to_points(row.points)?,
        })
    }
}

#[derive(FromRow)]
struct CodeRow {
    id: Uuid,
    code: String,
    points: i32,
    is_used: bool,
}

impl TryFrom<CodeRow> for RedeemCode {
    type Error = Error;

    fn try_from(row: CodeRow) -> Result<Self, Self::Error> {
        Ok(RedeemCode {
            code_id: row.id,
            code: row.code,
            points: to_points(row.points)?,
            is_used: row.is_used,
        })
    }
}

#[derive(FromRow)]
struct RewardRow {
    id: Uuid,
    name: String,
    points_cost: i32,
}

impl TryFrom<RewardRow> for Reward {
    type Error = Error;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        Ok(Reward {
            reward_id: row.id,
            name: row.name,
            points_cost: to_points(row.points_cost)?,
        })
    }
}

#[derive(FromRow)]
struct RedemptionRow {
    id: Uuid,
    user_id: Uuid,
    reward_id: Option<Uuid>,
    code_id: Option<Uuid>,
    points: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = Error;

    fn try_from(row: RedemptionRow) -> Result<Self, Self::Error> {
        let source = match (row.code_id, row.reward_id) {
            (Some(code_id), None) => RedemptionSource::Code { code_id },
            (None, Some(reward_id)) => RedemptionSource::Reward { reward_id },
            _ => {
                return Err(Error::Adapter(
                    format!("redemption {} must reference exactly one code or reward", row.id)
                        .into(),
                ))
            }
        };

        Ok(Redemption {
            redemption_id: row.id,
            account_id: row.user_id,
            source,
            delta_points: row.points as i64,
            created_at: row.created_at,
        })
    }
}

fn to_points(value: i32) -> Result<u32, Error> {
    u32::try_from(value).map_err(|err| Error::Adapter(Box::new(err)))
}

fn to_column(points: u32) -> Result<i32, Error> {
    i32::try_from(points).map_err(|err| Error::Adapter(Box::new(err)))
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Adapter(Box::new(err))
    }
}

impl From<sqlx::Error> for admin::Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Adapter(Box::new(err))
    }
}

const INSERT_REDEMPTION: &str = "INSERT INTO redemptions (id, user_id, reward_id, code_id, points, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6)";

#[async_trait::async_trait]
impl LedgerPort for PostgresDatabase {
    async fn get_account(&self, account_id: Uuid) -> Result<Account, Error> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, name, email, points FROM user_rewear WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::AccountNotFound(account_id))?
        .try_into()
    }

    async fn add_points(&self, account_id: Uuid, delta_points: i32) -> Result<Account, Error> {
        // The increment and the non-negative check happen in one statement
        let updated = sqlx::query_as::<_, AccountRow>(
            "UPDATE user_rewear SET points = points + $2 \
             WHERE id = $1 AND points + $2 >= 0 \
             RETURNING id, name, email, points",
        )
        .bind(account_id)
        .bind(delta_points)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => row.try_into(),
            // Either the account is missing or the update would go below zero
            None => {
                let account = self.get_account(account_id).await?;
                Err(Error::NegativePointsTotal {
                    current_points: account.points,
                    delta_points,
                })
            }
        }
    }

    async fn find_code(&self, code: &str) -> Result<RedeemCode, Error> {
        sqlx::query_as::<_, CodeRow>(
            "SELECT id, code, points, is_used FROM redeem_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::CodeNotFound(code.to_string()))?
        .try_into()
    }

    async fn redeem_code(&self, account_id: Uuid, code_id: Uuid) -> Result<Redemption, Error> {
        let mut tx = self.pool.begin().await?;

        // Flipping `is_used` only when it is still false makes the first committer the winner
        let claimed: Option<(i32,)> = sqlx::query_as(
            "UPDATE redeem_codes SET is_used = TRUE \
             WHERE id = $1 AND is_used = FALSE \
             RETURNING points",
        )
        .bind(code_id)
        .fetch_optional(&mut *tx)
        .await?;
        let points = match claimed {
            Some((points,)) => points,
            None => {
                let exists: Option<(bool,)> =
                    sqlx::query_as("SELECT is_used FROM redeem_codes WHERE id = $1")
                        .bind(code_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match exists {
                    Some(_) => Error::CodeAlreadyUsed(code_id),
                    None => Error::CodeNotFound(code_id.to_string()),
                });
            }
        };

        let credited = sqlx::query("UPDATE user_rewear SET points = points + $2 WHERE id = $1")
            .bind(account_id)
            .bind(points)
            .execute(&mut *tx)
            .await?;
        if credited.rows_affected() == 0 {
            // Dropping the transaction rolls back the code update
            return Err(Error::AccountNotFound(account_id));
        }

        let redemption = Redemption::new(
            account_id,
            RedemptionSource::Code { code_id },
            points as i64,
        );
        sqlx::query(INSERT_REDEMPTION)
            .bind(redemption.redemption_id)
            .bind(account_id)
            .bind(None::<Uuid>)
            .bind(Some(code_id))
            .bind(points)
            .bind(redemption.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(redemption)
    }

    async fn get_reward(&self, reward_id: Uuid) -> Result<Reward, Error> {
        sqlx::query_as::<_, RewardRow>("SELECT id, name, points_cost FROM rewards WHERE id = $1")
            .bind(reward_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::RewardNotFound(reward_id))?
            .try_into()
    }

    async fn redeem_reward(
        &self,
        account_id: Uuid,
        reward_id: Uuid,
    ) -> Result<Redemption, Error> {
        let mut tx = self.pool.begin().await?;

        let reward: Reward = sqlx::query_as::<_, RewardRow>(
            "SELECT id, name, points_cost FROM rewards WHERE id = $1",
        )
        .bind(reward_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::RewardNotFound(reward_id))?
        .try_into()?;

        // Lock the account row until commit so the balance cannot change under us
        let balance: Option<(i32,)> =
            sqlx::query_as("SELECT points FROM user_rewear WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        let balance = to_points(balance.ok_or(Error::AccountNotFound(account_id))?.0)?;
        if balance < reward.points_cost {
            return Err(Error::InsufficientPoints {
                balance,
                cost: reward.points_cost,
            });
        }

        let cost = to_column(reward.points_cost)?;
        sqlx::query("UPDATE user_rewear SET points = points - $2 WHERE id = $1")
            .bind(account_id)
            .bind(cost)
            .execute(&mut *tx)
            .await?;

        let redemption = Redemption::new(
            account_id,
            RedemptionSource::Reward { reward_id },
            -(cost as i64),
        );
        sqlx::query(INSERT_REDEMPTION)
            .bind(redemption.redemption_id)
            .bind(account_id)
            .bind(Some(reward_id))
            .bind(None::<Uuid>)
            .bind(-cost)
            .bind(redemption.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(redemption)
    }

    async fn list_redemptions(&self, account_id: Uuid) -> Result<Vec<Redemption>, Error> {
        // Distinguish an unknown account from one without redemptions
        self.get_account(account_id).await?;

        sqlx::query_as::<_, RedemptionRow>(
            "SELECT id, user_id, reward_id, code_id, points, created_at \
             FROM redemptions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Redemption::try_from)
        .collect()
    }
}

#[derive(FromRow)]
struct AdminRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    is_admin: bool,
}

#[async_trait::async_trait]
impl AdminPort for PostgresDatabase {
    async fn find_admin_by_email(&self, email: &str) -> Result<AdminUser, admin::Error> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, name, email, password, is_admin FROM user_rewear WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| admin::Error::UserDoesNotExist(email.to_string()))?;

        Ok(AdminUser {
            user_id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            is_admin: row.is_admin,
        })
    }
}
