/// 주간 경매 윈도우 정책
/// 일요일 00:00 UTC를 기준으로 고정 주간 주기를 계산한다.
// region:    --- Imports
use chrono::{DateTime, Datelike, Duration, Utc};
// endregion: --- Imports

// region:    --- Auction Window
/// 윈도우 길이 (일)
const WINDOW_DAYS: i64 = 7;

/// 경매 윈도우 경계
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuctionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// 시각 t를 포함하는 현재 윈도우
/// 임의의 t에 대해 current_window(t).start <= t < current_window(t).end
pub fn current_window(now: DateTime<Utc>) -> AuctionWindow {
    let days_from_sunday = now.weekday().num_days_from_sunday() as i64;
    let sunday = (now - Duration::days(days_from_sunday)).date_naive();
    let start = sunday.and_hms_opt(0, 0, 0).unwrap().and_utc();
    AuctionWindow {
        start,
        end: start + Duration::days(WINDOW_DAYS),
    }
}

/// 현재 윈도우 종료 시점에 정확히 시작하는 다음 윈도우
pub fn next_window(now: DateTime<Utc>) -> AuctionWindow {
    let current = current_window(now);
    AuctionWindow {
        start: current.end,
        end: current.end + Duration::days(WINDOW_DAYS),
    }
}
// endregion: --- Auction Window

// endregion: --- Tests
