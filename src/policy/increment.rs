/// 입찰 증가 단위 정책
/// 현재 가격 -> 최소 허용 다음 입찰가
// region:    --- Increment Policy

/// 가격 구간별 최소 증가 단위
pub fn increment_for(current_price: i64) -> i64 {
    match current_price {
        ..=99 => 5,
        ..=499 => 10,
        ..=999 => 25,
        ..=4_999 => 50,
        ..=9_999 => 100,
        ..=24_999 => 250,
        ..=49_999 => 500,
        _ => 1_000,
    }
}

/// 최소 허용 입찰가 = 현재 가격 + 증가 단위
pub fn minimum_bid(current_price: i64) -> i64 {
    current_price + increment_for(current_price)
}
// endregion: --- Increment Policy

// endregion: --- Tests
