//! HTTP 服务端：把资料服务暴露为 JSON over HTTP

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{AddressResponse, AddressesResponse, EmptyResponse, ErrorBody, ProfileResponse};
use crate::error::SkipperError;
use crate::service::{Address, Profile, ProfileService};

type SharedService = Arc<dyn ProfileService>;

/// 错误响应：状态码由错误代码决定，响应体为 `{"error": "..."}`
pub struct ApiError(pub SkipperError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.code().http_status();
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SkipperError> for ApiError {
    fn from(err: SkipperError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SkipperError::BadRequest(rejection.body_text()))
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// 构建 HTTP 路由
///
/// | 方法 | 路径 | 操作 |
/// |------|------|------|
/// | POST | `/profiles/` | PostProfile |
/// | GET | `/profiles/{id}` | GetProfile |
/// | PUT | `/profiles/{id}` | PutProfile |
/// | PATCH | `/profiles/{id}` | PatchProfile |
/// | DELETE | `/profiles/{id}` | DeleteProfile |
/// | GET | `/profiles/{id}/addresses/` | GetAddresses |
/// | GET | `/profiles/{id}/addresses/{address_id}` | GetAddress |
/// | POST | `/profiles/{id}/addresses/` | PostAddress |
/// | DELETE | `/profiles/{id}/addresses/{address_id}` | DeleteAddress |
pub fn make_http_handler(service: SharedService) -> Router {
    Router::new()
        .route("/profiles/", axum::routing::post(post_profile))
        .route(
            "/profiles/{id}",
            get(get_profile)
                .put(put_profile)
                .patch(patch_profile)
                .delete(delete_profile),
        )
        .route(
            "/profiles/{id}/addresses/",
            get(get_addresses).post(post_address),
        )
        .route(
            "/profiles/{id}/addresses/{address_id}",
            get(get_address).delete(delete_address),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn post_profile(
    State(svc): State<SharedService>,
    body: Result<Json<Profile>, JsonRejection>,
) -> ApiResult<EmptyResponse> {
    let Json(profile) = body?;
    svc.post_profile(profile).await?;
    Ok(Json(EmptyResponse {}))
}

async fn get_profile(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
) -> ApiResult<ProfileResponse> {
    let profile = svc.get_profile(&id).await?;
    Ok(Json(ProfileResponse { profile }))
}

async fn put_profile(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
    body: Result<Json<Profile>, JsonRejection>,
) -> ApiResult<EmptyResponse> {
    let Json(profile) = body?;
    svc.put_profile(&id, profile).await?;
    Ok(Json(EmptyResponse {}))
}

async fn patch_profile(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
    body: Result<Json<Profile>, JsonRejection>,
) -> ApiResult<EmptyResponse> {
    let Json(profile) = body?;
    svc.patch_profile(&id, profile).await?;
    Ok(Json(EmptyResponse {}))
}

async fn delete_profile(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
) -> ApiResult<EmptyResponse> {
    svc.delete_profile(&id).await?;
    Ok(Json(EmptyResponse {}))
}

async fn get_addresses(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
) -> ApiResult<AddressesResponse> {
    let addresses = svc.get_addresses(&id).await?;
    Ok(Json(AddressesResponse { addresses }))
}

async fn get_address(
    State(svc): State<SharedService>,
    Path((id, address_id)): Path<(String, String)>,
) -> ApiResult<AddressResponse> {
    let address = svc.get_address(&id, &address_id).await?;
    Ok(Json(AddressResponse { address }))
}

async fn post_address(
    State(svc): State<SharedService>,
    Path(id): Path<String>,
    body: Result<Json<Address>, JsonRejection>,
) -> ApiResult<EmptyResponse> {
    let Json(address) = body?;
    svc.post_address(&id, address).await?;
    Ok(Json(EmptyResponse {}))
}

async fn delete_address(
    State(svc): State<SharedService>,
    Path((id, address_id)): Path<(String, String)>,
) -> ApiResult<EmptyResponse> {
    svc.delete_address(&id, &address_id).await?;
    Ok(Json(EmptyResponse {}))
}
