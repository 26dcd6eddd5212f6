// region:    --- Imports
use crate::error::CoreError;
use crate::gateway::{ListingStore, PostgresStore};
use crate::listing::commands::{
    self, ApproveOverrides, BuyNowCommand, PlaceBidCommand, SubmitListingCommand,
};
use crate::notify::{self, MailRelayNotifier, Notice, Notifier};
use crate::payment::RestPaymentClient;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- App State
pub type AppState = (
    Arc<PostgresStore>,
    Arc<RestPaymentClient>,
    Arc<MailRelayNotifier>,
);
// endregion: --- App State

// region:    --- Helpers

/// 코어 오류 -> HTTP 응답
fn error_response(e: CoreError) -> Response {
    let status = match &e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let mut body = serde_json::json!({
        "error": e.to_string(),
        "code": e.code(),
    });
    if let CoreError::BidTooLow { minimum } = &e {
        body["minimum_bid"] = (*minimum).into();
    }
    (status, Json(body)).into_response()
}

/// 쓰기 확정 후 알림을 비동기로 디스패치한다 — 응답을 막지 않는다
fn dispatch_after_commit(notifier: &Arc<MailRelayNotifier>, notices: Vec<Notice>) {
    if notices.is_empty() {
        return;
    }
    let notifier: Arc<dyn Notifier> = Arc::clone(notifier) as Arc<dyn Notifier>;
    tokio::spawn(notify::dispatch_all(notifier, notices));
}
// endregion: --- Helpers

// region:    --- Command Handlers

/// 판매자 리스팅 제출
pub async fn handle_submit_listing(
    State((store, _, _)): State<AppState>,
    Json(cmd): Json<SubmitListingCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 리스팅 제출 요청: {}", "Handler", cmd.registration);
    match commands::submit(&*store, cmd, Utc::now()).await {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 리스팅 승인 (관리자)
pub async fn handle_approve(
    State((store, _, notifier)): State<AppState>,
    Path(listing_id): Path<String>,
    overrides: Option<Json<ApproveOverrides>>,
) -> impl IntoResponse {
    info!("{:<12} --> 승인 요청: {}", "Handler", listing_id);
    let overrides = overrides.map(|Json(o)| o).unwrap_or_default();
    match commands::approve(&*store, &listing_id, overrides, Utc::now()).await {
        Ok((listing, notices)) => {
            dispatch_after_commit(&notifier, notices);
            Json(listing).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 리스팅 거절 (관리자) — 알림 실패는 거절을 실패시키지 않는다
pub async fn handle_reject(
    State((store, _, notifier)): State<AppState>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 거절 요청: {}", "Handler", listing_id);
    match commands::reject(&*store, &listing_id).await {
        Ok((listing, notices)) => {
            dispatch_after_commit(&notifier, notices);
            Json(listing).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 입찰 요청
pub async fn handle_bid(
    State((store, cards, notifier)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 요청: {:?}", "Handler", cmd);
    let bid_amount = cmd.amount;
    match commands::place_bid(&*store, &*cards, cmd, Utc::now()).await {
        Ok((listing, notices)) => {
            dispatch_after_commit(&notifier, notices);
            Json(serde_json::json!({
                "message": "입찰이 접수되었습니다.",
                "current_bid": listing.current_bid,
                "bid_count": listing.bid_count,
                "bid_amount": bid_amount,
                "auction_end": listing.auction_end,
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 즉시 구매 요청
pub async fn handle_buy_now(
    State((store, _, notifier)): State<AppState>,
    Json(cmd): Json<BuyNowCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 즉시 구매 요청: {:?}", "Handler", cmd);
    match commands::buy_now(&*store, cmd, Utc::now()).await {
        Ok((txn, notices)) => {
            dispatch_after_commit(&notifier, notices);
            Json(txn).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 현 경매 종료 후 철회 요청
pub async fn handle_withdraw(
    State((store, _, _)): State<AppState>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 철회 요청: {}", "Handler", listing_id);
    match commands::request_withdraw(&*store, &listing_id).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => error_response(e),
    }
}

/// 재등록 요청
pub async fn handle_relist(
    State((store, _, _)): State<AppState>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 재등록 요청: {}", "Handler", listing_id);
    match commands::relist(&*store, &listing_id, Utc::now()).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => error_response(e),
    }
}

/// 낙찰 대금 청구
pub async fn handle_pay_transaction(
    State((store, cards, _)): State<AppState>,
    Path(txn_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 대금 청구 요청: {}", "Handler", txn_id);
    match commands::collect_payment(&*store, &*cards, &txn_id).await {
        Ok(txn) => Json(txn).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteTransactionBody {
    pub reason: String,
}

/// 트랜잭션 소프트 삭제
pub async fn handle_delete_transaction(
    State((store, _, _)): State<AppState>,
    Path(txn_id): Path<String>,
    Json(body): Json<DeleteTransactionBody>,
) -> impl IntoResponse {
    info!("{:<12} --> 트랜잭션 삭제 요청: {}", "Handler", txn_id);
    match commands::soft_delete_transaction(&*store, &txn_id, &body.reason, Utc::now()).await {
        Ok(()) => Json(serde_json::json!({ "deleted": txn_id })).into_response(),
        Err(e) => error_response(e),
    }
}

/// 롤오버 배치 실행 — 부분 실패는 집계에서 빠질 뿐 전체 실패가 아니다
pub async fn handle_rollover(
    State((store, _, notifier)): State<AppState>,
) -> impl IntoResponse {
    info!("{:<12} --> 롤오버 요청", "Handler");
    match commands::rollover(&*store, Utc::now()).await {
        Ok((report, notices)) => {
            dispatch_after_commit(&notifier, notices);
            Json(report).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 복구 배치 실행
pub async fn handle_repair(State((store, _, _)): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 복구 요청", "Handler");
    match commands::repair(&*store, Utc::now()).await {
        Ok(repaired) => Json(serde_json::json!({ "repaired": repaired })).into_response(),
        Err(e) => error_response(e),
    }
}
// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 모든 리스팅 조회
pub async fn handle_get_listings(State((store, _, _)): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 리스팅 목록 조회", "HandlerQuery");
    match store.all_listings().await {
        Ok(listings) => Json(listings).into_response(),
        Err(e) => error_response(e),
    }
}

/// 리스팅 조회
pub async fn handle_get_listing(
    State((store, _, _)): State<AppState>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 리스팅 조회 id: {}", "HandlerQuery", listing_id);
    match store.get_listing(&listing_id).await {
        Ok(Some(listing)) => Json(listing).into_response(),
        Ok(None) => error_response(CoreError::NotFound(format!("리스팅 {}", listing_id))),
        Err(e) => error_response(e),
    }
}

/// 리스팅 입찰 이력 조회
pub async fn handle_get_listing_bids(
    State((store, _, _)): State<AppState>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 입찰 이력 조회 id: {}",
        "HandlerQuery", listing_id
    );
    match store.bids_for(&listing_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => error_response(e),
    }
}

/// 트랜잭션 조회
pub async fn handle_get_transaction(
    State((store, _, _)): State<AppState>,
    Path(txn_id): Path<String>,
) -> impl IntoResponse {
    info!("{:<12} --> 트랜잭션 조회 id: {}", "HandlerQuery", txn_id);
    match store.get_transaction(&txn_id).await {
        Ok(Some(txn)) => Json(txn).into_response(),
        Ok(None) => error_response(CoreError::NotFound(format!("트랜잭션 {}", txn_id))),
        Err(e) => error_response(e),
    }
}
// endregion: --- Query Handlers
