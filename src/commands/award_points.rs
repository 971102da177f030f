use std::task::{Context, Poll};

use crate::{
    domain::Level,
    ports::{admin::AdminPort, ledger::LedgerPort},
};
use tower::Service;
use tracing::info;
use uuid::Uuid;

use super::{CommandFuture, DomainLogic, Error};

pub struct AwardPointsRequest {
    pub account_id: Uuid,
    /// Points to add. A negative value removes points, down to zero.
    pub delta_points: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct AwardPointsResponse {
    pub account_id: Uuid,
    pub level: Level,
    /// Balance right before this award was applied
    pub old_points: u32,
    /// Balance after this award
    pub new_points: u32,
}

impl<L, A> Service<AwardPointsRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = AwardPointsResponse;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AwardPointsRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move {
            // A single atomic increment, the store computes the new balance
            let account = ledger.add_points(req.account_id, req.delta_points).await?;
            let old_points = (account.points as i64 - req.delta_points as i64) as u32;

            info!(
                account_id = %account.account_id,
                delta_points = req.delta_points,
                new_points = account.points,
                "points awarded"
            );

            Ok(AwardPointsResponse {
                account_id: account.account_id,
                level: account.level(),
                old_points,
                new_points: account.points,
            })
        })
    }
}
