use std::task::{Context, Poll};

use crate::{
    password::{verify_password, DUMMY_HASH},
    ports::{
        admin::{self, AdminPort},
        ledger::LedgerPort,
    },
};
use tower::Service;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{CommandFuture, DomainLogic, Error};

pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Profile of the signed-in administrator, without credentials
#[derive(Debug, PartialEq, Eq)]
pub struct SignInResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl<L, A> Service<SignInRequest> for DomainLogic<L, A>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    type Response = SignInResponse;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: SignInRequest) -> Self::Future {
        let admins = self.admins.clone();
        Box::pin(async move {
            let user = match admins.find_admin_by_email(&req.email).await {
                Ok(user) => user,
                // Same answer and same bcrypt work as a wrong password, so emails cannot be probed
                Err(admin::Error::UserDoesNotExist(_)) => {
                    let _ = verify_password(&req.password, DUMMY_HASH);
                    warn!("sign-in attempt for unknown email");
                    return Err(Error::InvalidCredentials);
                }
                Err(err) => return Err(err.into()),
            };

            let valid = match verify_password(&req.password, &user.password_hash) {
                Ok(valid) => valid,
                Err(err) => {
                    error!(
                        user_id = %user.user_id,
                        error = %err,
                        "stored password is not a bcrypt hash"
                    );
                    false
                }
            };
            if !valid {
                warn!(user_id = %user.user_id, "sign-in attempt with wrong password");
                return Err(Error::InvalidCredentials);
            }
            if !user.is_admin {
                warn!(user_id = %user.user_id, "sign-in attempt by non-admin user");
                return Err(Error::NotAnAdmin(user.email));
            }

            info!(user_id = %user.user_id, "admin signed in");

            Ok(SignInResponse {
                user_id: user.user_id,
                name: user.name,
                email: user.email,
            })
        })
    }
}
