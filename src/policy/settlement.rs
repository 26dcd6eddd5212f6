/// 판매 정산 계산
/// 판매가 -> 수수료율/수수료/판매자 지급액/DVLA 이전 수수료
// region:    --- Imports
use crate::error::CoreError;
// endregion: --- Imports

// region:    --- Settlement
/// DVLA 명의 이전 수수료 (구매자 부담, 판매자 지급액에서 차감하지 않음)
pub const DVLA_TRANSFER_FEE: i64 = 80;

/// 정산 내역
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Settlement {
    pub commission_rate: i64,
    pub commission_amount: i64,
    pub seller_payout: i64,
    pub dvla_fee: i64,
}

/// 판매가 구간별 수수료율 (%)
fn commission_rate(sale_price: i64) -> i64 {
    match sale_price {
        ..=4_999 => 10,
        ..=9_999 => 8,
        ..=24_999 => 7,
        ..=49_999 => 6,
        _ => 5,
    }
}

/// 정산 계산 — 순수 함수, 부수 효과 없음
/// 금액 단위는 파운드(정수). 0 이하이면 InvalidAmount.
pub fn settle(sale_price: i64) -> Result<Settlement, CoreError> {
    if sale_price <= 0 {
        return Err(CoreError::InvalidAmount(sale_price));
    }

    let rate = commission_rate(sale_price);
    // 반올림(half-up) 정수 연산 — 곱셈이 넘치는 극단 금액은 거른다
    let commission_amount = sale_price
        .checked_mul(rate)
        .and_then(|v| v.checked_add(50))
        .map(|v| v / 100)
        .ok_or(CoreError::InvalidAmount(sale_price))?;

    Ok(Settlement {
        commission_rate: rate,
        commission_amount,
        seller_payout: sale_price - commission_amount,
        dvla_fee: DVLA_TRANSFER_FEE,
    })
}
// endregion: --- Settlement

// endregion: --- Tests
