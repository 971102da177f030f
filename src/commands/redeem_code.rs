use std::task::{Context, Poll};

use crate::ports::{
    admin::AdminPort,
    ledger::{self, LedgerPort},
};
use tower::Service;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CommandFuture, DomainLogic, Error};

pub struct RedeemCodeRequest {
    pub account_id: Uuid,
    pub code: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RedeemCodeResponse {
    pub account_id: Uuid,
    pub code_id: Uuid,
    /// Points credited to the account
    pub points: u32,
}

impl<L, A> Service<RedeemCodeRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = RedeemCodeResponse;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RedeemCodeRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move {
            let code = ledger.find_code(&req.code).await?;
            if code.is_used {
                warn!(account_id = %req.account_id, code_id = %code.code_id, "code already used");
                return Err(Error::Ledger(ledger::Error::CodeAlreadyUsed(code.code_id)));
            }

            // The store re-checks the flag, a concurrent redemption may have won in between
            let redemption = ledger.redeem_code(req.account_id, code.code_id).await?;

            info!(
                account_id = %req.account_id,
                code_id = %code.code_id,
                redemption_id = %redemption.redemption_id,
                points = code.points,
                "code redeemed"
            );

            Ok(RedeemCodeResponse {
                account_id: req.account_id,
                code_id: code.code_id,
                points: code.points,
            })
        })
    }
}
