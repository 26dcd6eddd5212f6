// region:    --- Imports
use std::fmt;
// endregion: --- Imports

// region:    --- Core Error
/// 코어 오류 분류
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// 대상 엔티티 없음
    NotFound(String),
    /// 입력 검증 실패
    Validation(String),
    /// 현재 상태에서 허용되지 않는 연산
    InvalidState(String),
    /// 경매가 LIVE 상태가 아님
    AuctionNotLive(String),
    /// 최소 입찰가 미달
    BidTooLow { minimum: i64 },
    /// 결제 수단 미등록
    PaymentMethodRequired,
    /// 정산 금액이 0 이하
    InvalidAmount(i64),
    /// 저장소/결제/알림 등 외부 협력자 오류
    Upstream(String),
}

impl CoreError {
    /// 클라이언트에 노출되는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::AuctionNotLive(_) => "AUCTION_NOT_LIVE",
            CoreError::BidTooLow { .. } => "LOW_BID",
            CoreError::PaymentMethodRequired => "PAYMENT_METHOD_REQUIRED",
            CoreError::InvalidAmount(_) => "INVALID_AMOUNT",
            CoreError::Upstream(_) => "UPSTREAM",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NotFound(what) => write!(f, "대상을 찾을 수 없습니다: {}", what),
            CoreError::Validation(msg) => write!(f, "입력 검증 실패: {}", msg),
            CoreError::InvalidState(msg) => write!(f, "잘못된 상태입니다: {}", msg),
            CoreError::AuctionNotLive(status) => {
                write!(f, "경매가 진행 중이 아닙니다: {}", status)
            }
            CoreError::BidTooLow { minimum } => {
                write!(f, "입찰 금액이 최소 입찰가({})보다 낮습니다", minimum)
            }
            CoreError::PaymentMethodRequired => {
                write!(f, "등록된 결제 수단이 필요합니다")
            }
            CoreError::InvalidAmount(amount) => {
                write!(f, "정산 금액이 올바르지 않습니다: {}", amount)
            }
            CoreError::Upstream(msg) => write!(f, "외부 협력자 오류: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Upstream(e.to_string())
    }
}
// endregion: --- Core Error
