use std::task::{Context, Poll};

use crate::ports::{
    admin::AdminPort,
    ledger::{self, LedgerPort},
};
use tower::Service;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CommandFuture, DomainLogic, Error};

pub struct RedeemRewardRequest {
    pub account_id: Uuid,
    pub reward_id: Uuid,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RedeemRewardResponse {
    pub account_id: Uuid,
    pub reward_id: Uuid,
    pub redemption_id: Uuid,
    /// Points taken from the account
    pub points_cost: u32,
}

impl<L, A> Service<RedeemRewardRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = RedeemRewardResponse;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RedeemRewardRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move {
            // Fetch necessary data
            let (account, reward) = tokio::try_join!(
                ledger.get_account(req.account_id),
                ledger.get_reward(req.reward_id)
            )?;

            // Early rejection only, the debit below checks again
            if account.points < reward.points_cost {
                warn!(
                    account_id = %account.account_id,
                    reward_id = %reward.reward_id,
                    balance = account.points,
                    cost = reward.points_cost,
                    "not enough points for reward"
                );
                return Err(Error::Ledger(ledger::Error::InsufficientPoints {
                    balance: account.points,
                    cost: reward.points_cost,
                }));
            }

            let redemption = ledger
                .redeem_reward(account.account_id, reward.reward_id)
                .await?;

            info!(
                account_id = %account.account_id,
                reward_id = %reward.reward_id,
                redemption_id = %redemption.redemption_id,
                cost = reward.points_cost,
                "reward redeemed"
            );

            Ok(RedeemRewardResponse {
                account_id: account.account_id,
                reward_id: reward.reward_id,
                redemption_id: redemption.redemption_id,
                points_cost: reward.points_cost,
            })
        })
    }
}
