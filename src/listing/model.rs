// region:    --- Imports
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Listing Status
/// 리스팅 상태
/// 행(row)에는 문자열로 저장하고, 엔진에서는 enum으로 다룬다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Pending,
    Queued,
    Live,
    Sold,
    Ended,
    Withdrawn,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "PENDING",
            ListingStatus::Queued => "QUEUED",
            ListingStatus::Live => "LIVE",
            ListingStatus::Sold => "SOLD",
            ListingStatus::Ended => "ENDED",
            ListingStatus::Withdrawn => "WITHDRAWN",
            ListingStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "PENDING" => Ok(ListingStatus::Pending),
            "QUEUED" => Ok(ListingStatus::Queued),
            "LIVE" => Ok(ListingStatus::Live),
            "SOLD" => Ok(ListingStatus::Sold),
            "ENDED" => Ok(ListingStatus::Ended),
            "WITHDRAWN" => Ok(ListingStatus::Withdrawn),
            "REJECTED" => Ok(ListingStatus::Rejected),
            other => Err(CoreError::InvalidState(format!(
                "알 수 없는 리스팅 상태: {}",
                other
            ))),
        }
    }

    /// 종료 상태 여부 (SOLD/ENDED/WITHDRAWN/REJECTED)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingStatus::Sold
                | ListingStatus::Ended
                | ListingStatus::Withdrawn
                | ListingStatus::Rejected
        )
    }
}
// endregion: --- Listing Status

// region:    --- Models
/// 번호판 리스팅 모델
/// id는 정규화된 등록번호(대문자, 공백 제거) — 번호판 하나당 라이프사이클 하나
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: String,
    pub registration: String,
    pub seller_email: String,
    pub status: String,
    pub starting_price: i64,
    pub reserve_price: i64,
    pub buy_now_price: Option<i64>,
    pub current_bid: i64,
    pub bid_count: i64,
    pub auction_start: Option<DateTime<Utc>>,
    pub auction_end: Option<DateTime<Utc>>,
    pub withdraw_after_current: bool,
    pub interesting_fact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn status(&self) -> Result<ListingStatus, CoreError> {
        ListingStatus::parse(&self.status)
    }
}

/// 입찰 모델 — 한 번 기록되면 수정/삭제되지 않는다
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub listing_id: String,
    pub bidder_email: String,
    pub amount: i64,
    pub bid_time: DateTime<Utc>,
}

/// 판매 정산 트랜잭션 모델
/// id는 `txn-<listing_id>` — 리스팅당 최대 하나 (멱등 생성 키)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleTransaction {
    pub id: String,
    pub listing_id: String,
    pub seller_email: String,
    pub buyer_email: String,
    pub sale_price: i64,
    pub commission_rate: i64,
    pub commission_amount: i64,
    pub seller_payout: i64,
    pub dvla_fee: i64,
    pub payment_status: String,
    pub transaction_status: String,
    pub charge_id: Option<String>,
    pub deleted: bool,
    pub deleted_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 사용자 프로필 — 입찰 경로에서 결제 수단 보유 여부 게이트로 읽는다
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub email: String,
    pub has_payment_method: bool,
    pub payment_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
// endregion: --- Models
