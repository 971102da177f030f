//! Read-only account views for the dashboard

use std::task::{Context, Poll};

use crate::{
    domain::{Account, Redemption},
    ports::{admin::AdminPort, ledger::LedgerPort},
};
use tower::Service;
use uuid::Uuid;

use super::{CommandFuture, DomainLogic, Error};

pub struct GetAccountRequest {
    pub account_id: Uuid,
}

pub struct ListRedemptionsRequest {
    pub account_id: Uuid,
}

impl<L, A> Service<GetAccountRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = Account;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetAccountRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move { Ok(ledger.get_account(req.account_id).await?) })
    }
}

impl<L, A> Service<ListRedemptionsRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = Vec<Redemption>;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ListRedemptionsRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move { Ok(ledger.list_redemptions(req.account_id).await?) })
    }
}
