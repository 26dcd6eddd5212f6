/// 리스팅 조회
pub const GET_LISTING: &str = "SELECT id, registration, seller_email, status, starting_price, reserve_price, buy_now_price, current_bid, bid_count, auction_start, auction_end, withdraw_after_current, interesting_fact, created_at FROM listings WHERE id = $1";

/// 모든 리스팅 조회
pub const GET_ALL_LISTINGS: &str = "SELECT id, registration, seller_email, status, starting_price, reserve_price, buy_now_price, current_bid, bid_count, auction_start, auction_end, withdraw_after_current, interesting_fact, created_at FROM listings ORDER BY created_at DESC";

/// 개장 대상 조회 (QUEUED & auction_start <= now)
pub const GET_DUE_OPEN: &str = "SELECT id, registration, seller_email, status, starting_price, reserve_price, buy_now_price, current_bid, bid_count, auction_start, auction_end, withdraw_after_current, interesting_fact, created_at FROM listings WHERE status = 'QUEUED' AND auction_start <= $1";

/// 마감 대상 조회 (LIVE & auction_end <= now)
pub const GET_DUE_CLOSE: &str = "SELECT id, registration, seller_email, status, starting_price, reserve_price, buy_now_price, current_bid, bid_count, auction_start, auction_end, withdraw_after_current, interesting_fact, created_at FROM listings WHERE status = 'LIVE' AND auction_end <= $1";

/// 리스팅 생성
pub const INSERT_LISTING: &str = r#"
    INSERT INTO listings (id, registration, seller_email, status, starting_price, reserve_price, buy_now_price, current_bid, bid_count, auction_start, auction_end, withdraw_after_current, interesting_fact, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
"#;

/// 승인: PENDING -> QUEUED (조건부)
pub const MARK_QUEUED: &str = r#"
    UPDATE listings
    SET status = 'QUEUED', starting_price = $1, reserve_price = $2, buy_now_price = $3,
        interesting_fact = $4, current_bid = $1, auction_start = $5, auction_end = $6
    WHERE id = $7 AND status = 'PENDING'
    RETURNING id
"#;

/// 상태 전이 (조건부)
pub const TRANSITION_STATUS: &str =
    "UPDATE listings SET status = $1 WHERE id = $2 AND status = $3 RETURNING id";

/// 낙찰: LIVE -> SOLD, 최종가/종료 시각 확정 (조건부)
pub const MARK_SOLD: &str = r#"
    UPDATE listings SET status = 'SOLD', current_bid = $1, auction_end = $2
    WHERE id = $3 AND status = 'LIVE'
    RETURNING id
"#;

/// LIVE 윈도우 재배정 (조건부)
pub const REASSIGN_WINDOW: &str = r#"
    UPDATE listings SET auction_start = $1, auction_end = $2
    WHERE id = $3 AND status = 'LIVE'
    RETURNING id
"#;

/// 현 경매 종료 후 철회 플래그 설정
pub const SET_WITHDRAW_FLAG: &str =
    "UPDATE listings SET withdraw_after_current = TRUE WHERE id = $1 RETURNING id";

/// 재등록: ENDED/WITHDRAWN -> QUEUED (조건부)
pub const REQUEUE: &str = r#"
    UPDATE listings
    SET status = 'QUEUED', current_bid = starting_price, bid_count = 0,
        withdraw_after_current = FALSE, auction_start = $1, auction_end = $2
    WHERE id = $3 AND status = $4
    RETURNING id
"#;

/// CAS 입찰 반영: 기대한 current_bid일 때만 가격/횟수/종료 시각 갱신
pub const RECORD_BID_UPDATE: &str = r#"
    UPDATE listings
    SET current_bid = $1, bid_count = bid_count + 1, auction_end = $2
    WHERE id = $3 AND status = 'LIVE' AND current_bid = $4
    RETURNING id
"#;

/// 입찰 기록 삽입
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (listing_id, bidder_email, amount, bid_time)
    VALUES ($1, $2, $3, $4)
"#;

/// 최신 입찰 조회
pub const GET_LATEST_BID: &str = r#"
    SELECT id, listing_id, bidder_email, amount, bid_time
    FROM bids
    WHERE listing_id = $1
    ORDER BY bid_time DESC, id DESC
    LIMIT 1
"#;

/// 입찰 이력 조회
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, listing_id, bidder_email, amount, bid_time
    FROM bids
    WHERE listing_id = $1
    ORDER BY bid_time DESC, id DESC
"#;

/// 멱등 트랜잭션 생성 (이미 있으면 아무것도 하지 않음)
pub const INSERT_TRANSACTION: &str = r#"
    INSERT INTO transactions (id, listing_id, seller_email, buyer_email, sale_price, commission_rate, commission_amount, seller_payout, dvla_fee, payment_status, transaction_status, charge_id, deleted, deleted_reason, deleted_at, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
    ON CONFLICT (id) DO NOTHING
    RETURNING id
"#;

/// 트랜잭션 조회
pub const GET_TRANSACTION: &str = "SELECT id, listing_id, seller_email, buyer_email, sale_price, commission_rate, commission_amount, seller_payout, dvla_fee, payment_status, transaction_status, charge_id, deleted, deleted_reason, deleted_at, created_at FROM transactions WHERE id = $1";

/// 결제 완료 처리
pub const MARK_TRANSACTION_PAID: &str = r#"
    UPDATE transactions SET payment_status = 'paid', transaction_status = 'complete', charge_id = $1
    WHERE id = $2 AND deleted = FALSE
    RETURNING id
"#;

/// 트랜잭션 소프트 삭제 (물리 삭제 없음)
pub const SOFT_DELETE_TRANSACTION: &str = r#"
    UPDATE transactions SET deleted = TRUE, deleted_reason = $1, deleted_at = $2
    WHERE id = $3 AND deleted = FALSE
    RETURNING id
"#;

/// 프로필 조회
pub const GET_PROFILE: &str = "SELECT email, has_payment_method, payment_customer_id, created_at FROM profiles WHERE email = $1";
