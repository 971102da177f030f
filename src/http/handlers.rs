use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::ApiError;
use crate::{
    commands::{
        account::{GetAccountRequest, ListRedemptionsRequest},
        award_points::AwardPointsRequest,
        redeem_code::RedeemCodeRequest,
        redeem_reward::RedeemRewardRequest,
        sign_in::SignInRequest,
        DomainLogic,
    },
    domain::{Account, Level, Redemption, RedemptionSource},
    ports::{admin::AdminPort, ledger::LedgerPort},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardPointsBody {
    user_id: Uuid,
    points: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCodeBody {
    user_id: Uuid,
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRewardBody {
    user_id: Uuid,
    reward_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBody {
    id: Uuid,
    name: String,
    email: String,
    points: u32,
    level: Level,
}

impl From<Account> for AccountBody {
    fn from(account: Account) -> Self {
        Self {
            level: account.level(),
            id: account.account_id,
            name: account.name,
            email: account.email,
            points: account.points,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionBody {
    id: Uuid,
    source: RedemptionSource,
    points: i64,
    created_at: DateTime<Utc>,
}

impl From<Redemption> for RedemptionBody {
    fn from(redemption: Redemption) -> Self {
        Self {
            id: redemption.redemption_id,
            source: redemption.source,
            points: redemption.delta_points,
            created_at: redemption.created_at,
        }
    }
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ApiError::MalformedPayload(rejection.body_text()))
}

fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(account_id)| account_id)
        .map_err(|rejection| ApiError::MalformedPayload(rejection.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn award_points<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    body: Result<Json<AwardPointsBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let body = payload(body)?;
    domain
        .oneshot(AwardPointsRequest {
            account_id: body.user_id,
            delta_points: body.points,
        })
        .await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn redeem_code<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    body: Result<Json<RedeemCodeBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let body = payload(body)?;
    let res = domain
        .oneshot(RedeemCodeRequest {
            account_id: body.user_id,
            code: body.code,
        })
        .await?;

    Ok(Json(json!({ "success": true, "points": res.points })))
}

pub async fn redeem_reward<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    body: Result<Json<RedeemRewardBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let body = payload(body)?;
    domain
        .oneshot(RedeemRewardRequest {
            account_id: body.user_id,
            reward_id: body.reward_id,
        })
        .await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn sign_in<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    body: Result<Json<SignInBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let body = payload(body)?;
    let profile = domain
        .oneshot(SignInRequest {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": profile.user_id,
            "name": profile.name,
            "email": profile.email,
        },
    })))
}

pub async fn get_account<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AccountBody>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let account_id = path_id(path)?;
    let account = domain
        .oneshot(GetAccountRequest { account_id })
        .await
        .map_err(ApiError::from_lookup)?;

    Ok(Json(account.into()))
}

pub async fn list_redemptions<L, A>(
    State(domain): State<DomainLogic<L, A>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<RedemptionBody>>, ApiError>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let account_id = path_id(path)?;
    let redemptions = domain
        .oneshot(ListRedemptionsRequest { account_id })
        .await
        .map_err(ApiError::from_lookup)?;

    Ok(Json(redemptions.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use crate::{
        adapters::database::memory::MemoryDatabase,
        commands::DomainLogic,
        domain::{Account, AdminUser, RedeemCode, Reward},
        http::router,
        ports::ledger::LedgerPort,
    };
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use rstest::*;
    use serde_json::{json, Value};
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};
    use uuid::Uuid;

    struct Setup {
        app: Router,
        database: MemoryDatabase,
        account_id: Uuid,
        code: RedeemCode,
        reward: Reward,
    }

    /// Account with 100 points, a code worth 50 and a reward costing 120
    #[fixture]
    fn setup() -> Setup {
        let database = MemoryDatabase::default();
        let account_id = Uuid::new_v4();
        database
            .insert_account(Account::new(account_id, "Ada", "ada@example.com").with_points(100))
            .unwrap();
        let code = RedeemCode::new("SPRING50", 50);
        database.insert_code(code.clone()).unwrap();
        let reward = Reward::new("Denim jacket", 120);
        database.insert_reward(reward.clone()).unwrap();
        database
            .insert_admin(AdminUser {
                user_id: Uuid::new_v4(),
                name: "Grace".to_string(),
                email: "admin@rewear.app".to_string(),
                password_hash: bcrypt::hash("hunter2", 4).unwrap(),
                is_admin: true,
            })
            .unwrap();

        let domain = DomainLogic::new(Arc::new(database.clone()), Arc::new(database.clone()));
        Setup {
            app: router(domain),
            database,
            account_id,
            code,
            reward,
        }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), BoxError> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })?;
        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();

        Ok((status, serde_json::from_slice(&bytes)?))
    }

    async fn post(app: &Router, uri: &str, body: Value) -> Result<(StatusCode, Value), BoxError> {
        send(app, Method::POST, uri, Some(body)).await
    }

    #[rstest]
    #[tokio::test]
    async fn test_award_points(setup: Setup) -> Result<(), BoxError> {
        let res = post(
            &setup.app,
            "/award-points",
            json!({ "userId": setup.account_id, "points": 25 }),
        )
        .await?;

        assert_that!(res).is_equal_to((StatusCode::OK, json!({ "success": true })));
        let account = setup.database.get_account(setup.account_id).await?;
        assert_that!(account.points).is_equal_to(125);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_award_points_unknown_account(setup: Setup) -> Result<(), BoxError> {
        let (status, body) = post(
            &setup.app,
            "/award-points",
            json!({ "userId": Uuid::new_v4(), "points": 25 }),
        )
        .await?;

        assert_that!(status).is_equal_to(StatusCode::INTERNAL_SERVER_ERROR);
        assert_that!(body["error"].as_str())
            .is_some()
            .ends_with("does not exist");

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_reward_unknown_reward(setup: Setup) -> Result<(), BoxError> {
        let reward_id = Uuid::new_v4();

        let res = post(
            &setup.app,
            "/redeem-reward",
            json!({ "userId": setup.account_id, "rewardId": reward_id }),
        )
        .await?;

        assert_that!(res).is_equal_to((
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": format!("reward {reward_id} does not exist") }),
        ));
        let account = setup.database.get_account(setup.account_id).await?;
        assert_that!(account.points).is_equal_to(100);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_code_unknown_account(setup: Setup) -> Result<(), BoxError> {
        let (status, _) = post(
            &setup.app,
            "/redeem-code",
            json!({ "userId": Uuid::new_v4(), "code": setup.code.code }),
        )
        .await?;

        assert_that!(status).is_equal_to(StatusCode::INTERNAL_SERVER_ERROR);
        // The code stays available for the right account
        let code = setup.database.find_code(&setup.code.code).await?;
        assert_that!(code.is_used).is_false();

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_code_twice(setup: Setup) -> Result<(), BoxError> {
        let body = json!({ "userId": setup.account_id, "code": setup.code.code });

        let first = post(&setup.app, "/redeem-code", body.clone()).await?;
        let second = post(&setup.app, "/redeem-code", body).await?;

        assert_that!(first).is_equal_to((StatusCode::OK, json!({ "success": true, "points": 50 })));
        assert_that!(second).is_equal_to((
            StatusCode::BAD_REQUEST,
            json!({ "error": "This code has already been used" }),
        ));
        let account = setup.database.get_account(setup.account_id).await?;
        assert_that!(account.points).is_equal_to(150);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_unknown_code(setup: Setup) -> Result<(), BoxError> {
        let res = post(
            &setup.app,
            "/redeem-code",
            json!({ "userId": setup.account_id, "code": "WINTER99" }),
        )
        .await?;

        assert_that!(res).is_equal_to((
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid or expired code" }),
        ));

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_reward_not_enough_points(setup: Setup) -> Result<(), BoxError> {
        let res = post(
            &setup.app,
            "/redeem-reward",
            json!({ "userId": setup.account_id, "rewardId": setup.reward.reward_id }),
        )
        .await?;

        assert_that!(res)
            .is_equal_to((StatusCode::BAD_REQUEST, json!({ "error": "Not enough points" })));
        let account = setup.database.get_account(setup.account_id).await?;
        assert_that!(account.points).is_equal_to(100);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_reward_after_code(setup: Setup) -> Result<(), BoxError> {
        post(
            &setup.app,
            "/redeem-code",
            json!({ "userId": setup.account_id, "code": setup.code.code }),
        )
        .await?;

        let res = post(
            &setup.app,
            "/redeem-reward",
            json!({ "userId": setup.account_id, "rewardId": setup.reward.reward_id }),
        )
        .await?;

        assert_that!(res).is_equal_to((StatusCode::OK, json!({ "success": true })));
        let (status, history) = send(
            &setup.app,
            Method::GET,
            &format!("/accounts/{}/redemptions", setup.account_id),
            None,
        )
        .await?;
        assert_that!(status).is_equal_to(StatusCode::OK);
        assert_that!(history[0]["points"]).is_equal_to(json!(-120));
        assert_that!(history[0]["source"]["type"]).is_equal_to(json!("reward"));
        assert_that!(history[1]["points"]).is_equal_to(json!(50));

        Ok(())
    }

    #[rstest]
    #[case(json!({ "userId": "not-a-uuid", "points": 1 }))]
    #[case(json!({ "userId": Uuid::nil(), "points": 1.5 }))]
    #[case(json!({ "points": 1 }))]
    #[tokio::test]
    async fn test_malformed_payload(setup: Setup, #[case] body: Value) -> Result<(), BoxError> {
        let (status, body) = post(&setup.app, "/award-points", body).await?;

        assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
        assert_that!(body["error"].as_str())
            .is_some()
            .starts_with("Malformed payload");

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_get_account(setup: Setup) -> Result<(), BoxError> {
        let res = send(
            &setup.app,
            Method::GET,
            &format!("/accounts/{}", setup.account_id),
            None,
        )
        .await?;

        assert_that!(res).is_equal_to((
            StatusCode::OK,
            json!({
                "id": setup.account_id,
                "name": "Ada",
                "email": "ada@example.com",
                "points": 100,
                "level": "Beginner",
            }),
        ));

        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("/redemptions")]
    #[tokio::test]
    async fn test_get_unknown_account(setup: Setup, #[case] suffix: &str) -> Result<(), BoxError> {
        let account_id = Uuid::new_v4();

        let res = send(
            &setup.app,
            Method::GET,
            &format!("/accounts/{account_id}{suffix}"),
            None,
        )
        .await?;

        assert_that!(res).is_equal_to((
            StatusCode::NOT_FOUND,
            json!({ "error": format!("account {account_id} does not exist") }),
        ));

        Ok(())
    }

    #[rstest]
    #[case("hunter2", StatusCode::OK)]
    #[case("hunter3", StatusCode::UNAUTHORIZED)]
    #[tokio::test]
    async fn test_sign_in(
        setup: Setup,
        #[case] password: &str,
        #[case] status: StatusCode,
    ) -> Result<(), BoxError> {
        let res = post(
            &setup.app,
            "/admin/sign-in",
            json!({ "email": "admin@rewear.app", "password": password }),
        )
        .await?;

        assert_that!(res.0).is_equal_to(status);
        // The hash never leaves the service
        assert_that!(res.1.to_string().contains("$2")).is_false();

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_health(setup: Setup) -> Result<(), BoxError> {
        let res = send(&setup.app, Method::GET, "/health", None).await?;

        assert_that!(res).is_equal_to((StatusCode::OK, json!({ "status": "ok" })));

        Ok(())
    }
}
