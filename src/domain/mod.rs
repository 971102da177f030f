use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Point balance of a platform user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Unique identifier for the `Account`
    ///
    /// This is the same identifier as the user profile row.
    pub account_id: Uuid,
    pub name: String,
    pub email: String,
    /// Number of accrued points
    pub points: u32,
}

impl Account {
    pub fn new(account_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account_id,
            name: name.into(),
            email: email.into(),
            points: 0,
        }
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    pub fn level(&self) -> Level {
        Level::from_points(self.points)
    }
}

/// Activity level shown on the user list, derived from the point balance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Level {
    pub fn from_points(points: u32) -> Self {
        match points {
            0..=199 => Level::Beginner,
            200..=499 => Level::Intermediate,
            500..=999 => Level::Advanced,
            _ => Level::Expert,
        }
    }
}

/// One-time code exchangeable for points
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedeemCode {
    pub code_id: Uuid,
    /// Code string handed out to users, unique across all codes
    pub code: String,
    /// Points credited when the code is redeemed
    pub points: u32,
    /// Set once the code has been consumed. Never goes back to `false`.
    pub is_used: bool,
}

impl RedeemCode {
    pub fn new(code: impl Into<String>, points: u32) -> Self {
        Self {
            code_id: Uuid::new_v4(),
            code: code.into(),
            points,
            is_used: false,
        }
    }
}

/// Catalog entry purchasable with points
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reward {
    pub reward_id: Uuid,
    pub name: String,
    pub points_cost: u32,
}

impl Reward {
    pub fn new(name: impl Into<String>, points_cost: u32) -> Self {
        Self {
            reward_id: Uuid::new_v4(),
            name: name.into(),
            points_cost,
        }
    }
}

/// What a redemption was made against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedemptionSource {
    Code { code_id: Uuid },
    Reward { reward_id: Uuid },
}

/// Append-only record of a code or reward redemption
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub redemption_id: Uuid,
    pub account_id: Uuid,
    pub source: RedemptionSource,
    /// Difference in points
    ///
    /// Positive for redeemed codes, negative for purchased rewards.
    pub delta_points: i64,
    pub created_at: DateTime<Utc>,
}

impl Redemption {
    pub fn new(account_id: Uuid, source: RedemptionSource, delta_points: i64) -> Self {
        Self {
            redemption_id: Uuid::new_v4(),
            account_id,
            source,
            delta_points,
            created_at: Utc::now(),
        }
    }
}

/// Dashboard user allowed to sign in
#[derive(Clone, Debug)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    /// bcrypt hash of the password, salt included
    pub password_hash: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(0, Level::Beginner)]
    #[case(199, Level::Beginner)]
    #[case(200, Level::Intermediate)]
    #[case(499, Level::Intermediate)]
    #[case(500, Level::Advanced)]
    #[case(999, Level::Advanced)]
    #[case(1000, Level::Expert)]
    #[case(u32::MAX, Level::Expert)]
    fn test_level_from_points(#[case] points: u32, #[case] expected: Level) {
        let account = Account::new(Uuid::new_v4(), "Ada", "ada@example.com").with_points(points);

        assert_that!(account.level()).is_equal_to(expected);
    }

    #[test]
    fn test_new_code_is_unused() {
        let code = RedeemCode::new("WELCOME50", 50);

        assert_that!(code.is_used).is_false();
        assert_that!(code.points).is_equal_to(50);
    }
}
