use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use plate_auction_service::error::CoreError;
use plate_auction_service::gateway::ListingStore;
use plate_auction_service::listing::commands::{
    self, ApproveOverrides, BuyNowCommand, PlaceBidCommand, SubmitListingCommand,
};
use plate_auction_service::listing::model::{Bid, Listing, ListingStatus, Profile, SaleTransaction};
use plate_auction_service::notify::Notice;
use plate_auction_service::payment::{CardGateway, ChargeOutcome};
use plate_auction_service::policy::window::{current_window, AuctionWindow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// region:    --- In-Memory Store
/// 엔진 테스트용 인메모리 저장소 — Postgres 구현체와 같은 조건부 갱신 의미론
#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listings: HashMap<String, Listing>,
    bids: Vec<Bid>,
    next_bid_id: i64,
    transactions: HashMap<String, SaleTransaction>,
    profiles: HashMap<String, Profile>,
}

impl MemoryStore {
    fn new() -> Self {
        Self::default()
    }

    /// 테스트 셋업용 — 상태/윈도우를 직접 밀어 넣는다
    fn force_state(
        &self,
        id: &str,
        status: ListingStatus,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        let listing = inner.listings.get_mut(id).unwrap();
        listing.status = status.as_str().to_string();
        listing.auction_start = start;
        listing.auction_end = end;
    }

    fn add_profile(&self, email: &str, has_payment_method: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.profiles.insert(
            email.to_string(),
            Profile {
                email: email.to_string(),
                has_payment_method,
                payment_customer_id: has_payment_method.then(|| "cus_test".to_string()),
                created_at: Utc::now(),
            },
        );
    }

    fn transaction_count(&self) -> usize {
        self.inner.lock().unwrap().transactions.len()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.listings.contains_key(&listing.id) {
            return Err(CoreError::Validation(format!(
                "이미 등록된 번호판입니다: {}",
                listing.registration
            )));
        }
        inner.listings.insert(listing.id.clone(), listing.clone());
        Ok(())
    }

    async fn get_listing(&self, id: &str) -> Result<Option<Listing>, CoreError> {
        Ok(self.inner.lock().unwrap().listings.get(id).cloned())
    }

    async fn all_listings(&self) -> Result<Vec<Listing>, CoreError> {
        Ok(self.inner.lock().unwrap().listings.values().cloned().collect())
    }

    async fn listings_due_open(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .listings
            .values()
            .filter(|l| l.status == "QUEUED" && l.auction_start.is_some_and(|s| s <= now))
            .cloned()
            .collect())
    }

    async fn listings_due_close(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .listings
            .values()
            .filter(|l| l.status == "LIVE" && l.auction_end.is_some_and(|e| e <= now))
            .cloned()
            .collect())
    }

    async fn mark_queued(
        &self,
        id: &str,
        starting_price: i64,
        reserve_price: i64,
        buy_now_price: Option<i64>,
        interesting_fact: Option<String>,
        window: AuctionWindow,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) if l.status == "PENDING" => {
                l.status = "QUEUED".to_string();
                l.starting_price = starting_price;
                l.reserve_price = reserve_price;
                l.buy_now_price = buy_now_price;
                l.interesting_fact = interesting_fact;
                l.current_bid = starting_price;
                l.auction_start = Some(window.start);
                l.auction_end = Some(window.end);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition(
        &self,
        id: &str,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) if l.status == from.as_str() => {
                l.status = to.as_str().to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_sold(
        &self,
        id: &str,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) if l.status == "LIVE" => {
                l.status = "SOLD".to_string();
                l.current_bid = final_price;
                l.auction_end = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reassign_window(&self, id: &str, window: AuctionWindow) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) if l.status == "LIVE" => {
                l.auction_start = Some(window.start);
                l.auction_end = Some(window.end);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_withdraw_flag(&self, id: &str) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) => {
                l.withdraw_after_current = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn requeue(
        &self,
        id: &str,
        from: ListingStatus,
        window: AuctionWindow,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(id) {
            Some(l) if l.status == from.as_str() => {
                l.status = "QUEUED".to_string();
                l.current_bid = l.starting_price;
                l.bid_count = 0;
                l.withdraw_after_current = false;
                l.auction_start = Some(window.start);
                l.auction_end = Some(window.end);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_bid(
        &self,
        listing_id: &str,
        expected_bid: i64,
        bidder_email: &str,
        amount: i64,
        bid_time: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        let bid_id = inner.next_bid_id + 1;
        match inner.listings.get_mut(listing_id) {
            Some(l) if l.status == "LIVE" && l.current_bid == expected_bid => {
                l.current_bid = amount;
                l.bid_count += 1;
                l.auction_end = Some(new_end);
            }
            _ => return Ok(false),
        }
        inner.next_bid_id = bid_id;
        inner.bids.push(Bid {
            id: bid_id,
            listing_id: listing_id.to_string(),
            bidder_email: bidder_email.to_string(),
            amount,
            bid_time,
        });
        Ok(true)
    }

    async fn latest_bid(&self, listing_id: &str) -> Result<Option<Bid>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .max_by_key(|b| (b.bid_time, b.id))
            .cloned())
    }

    async fn bids_for(&self, listing_id: &str) -> Result<Vec<Bid>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect())
    }

    async fn create_transaction(&self, txn: &SaleTransaction) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.transactions.contains_key(&txn.id) {
            return Ok(false);
        }
        inner.transactions.insert(txn.id.clone(), txn.clone());
        Ok(true)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<SaleTransaction>, CoreError> {
        Ok(self.inner.lock().unwrap().transactions.get(id).cloned())
    }

    async fn mark_transaction_paid(&self, id: &str, charge_id: &str) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.transactions.get_mut(id) {
            Some(t) if !t.deleted => {
                t.payment_status = "paid".to_string();
                t.transaction_status = "complete".to_string();
                t.charge_id = Some(charge_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete_transaction(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.transactions.get_mut(id) {
            Some(t) if !t.deleted => {
                t.deleted = true;
                t.deleted_reason = Some(reason.to_string());
                t.deleted_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, CoreError> {
        Ok(self.inner.lock().unwrap().profiles.get(email).cloned())
    }
}
// endregion: --- In-Memory Store

// region:    --- Fake Card Gateway
/// 테스트용 카드 게이트웨이
struct FakeCards {
    has_card: bool,
    charges: Mutex<Vec<(String, i64)>>,
}

impl FakeCards {
    fn new(has_card: bool) -> Self {
        Self {
            has_card,
            charges: Mutex::new(Vec::new()),
        }
    }

    fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl CardGateway for FakeCards {
    async fn has_usable_payment_method(&self, _email: &str) -> Result<bool, CoreError> {
        Ok(self.has_card)
    }

    async fn charge_saved_card(
        &self,
        email: &str,
        amount_pence: i64,
        _description: &str,
    ) -> Result<ChargeOutcome, CoreError> {
        let mut charges = self.charges.lock().unwrap();
        charges.push((email.to_string(), amount_pence));
        Ok(ChargeOutcome {
            status: "succeeded".to_string(),
            charge_id: format!("ch_test_{}", charges.len()),
        })
    }
}
/// 청구 순간 대상 트랜잭션을 소프트 삭제하는 게이트웨이 —
/// 청구와 결제 기록 사이에 삭제가 끼어드는 경합을 재현한다
struct DeleteOnCharge {
    store: Arc<MemoryStore>,
    txn_id: String,
}

#[async_trait]
impl CardGateway for DeleteOnCharge {
    async fn has_usable_payment_method(&self, _email: &str) -> Result<bool, CoreError> {
        Ok(true)
    }

    async fn charge_saved_card(
        &self,
        _email: &str,
        _amount_pence: i64,
        _description: &str,
    ) -> Result<ChargeOutcome, CoreError> {
        self.store
            .soft_delete_transaction(&self.txn_id, "경합 중 삭제", Utc::now())
            .await?;
        Ok(ChargeOutcome {
            status: "succeeded".to_string(),
            charge_id: "ch_race_1".to_string(),
        })
    }
}
// endregion: --- Fake Card Gateway

// region:    --- Helpers

fn submit_cmd(registration: &str) -> SubmitListingCommand {
    SubmitListingCommand {
        registration: registration.to_string(),
        seller_email: "seller@example.com".to_string(),
        starting_price: 100,
        reserve_price: 500,
        buy_now_price: None,
        interesting_fact: None,
    }
}

/// PENDING 제출 -> 승인 -> LIVE 상태까지 끌어올린 테스트 리스팅
async fn live_listing(store: &MemoryStore, registration: &str, now: DateTime<Utc>) -> String {
    let listing = commands::submit(store, submit_cmd(registration), now)
        .await
        .unwrap();
    commands::approve(store, &listing.id, ApproveOverrides::default(), now)
        .await
        .unwrap();
    store.force_state(
        &listing.id,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::hours(2)),
    );
    listing.id
}

fn bid_cmd(listing_id: &str, bidder: &str, amount: i64) -> PlaceBidCommand {
    PlaceBidCommand {
        listing_id: listing_id.to_string(),
        bidder_email: bidder.to_string(),
        amount,
    }
}
// endregion: --- Helpers

// region:    --- Submission / Moderation Tests

/// 제출 입력 검증
#[tokio::test]
async fn test_submit_validation() {
    let store = MemoryStore::new();
    let now = Utc::now();

    let mut cmd = submit_cmd("AB12 CDE");
    cmd.registration = "   ".to_string();
    assert!(matches!(
        commands::submit(&store, cmd, now).await,
        Err(CoreError::Validation(_))
    ));

    let mut cmd = submit_cmd("AB12 CDE");
    cmd.reserve_price = 50; // 시작가보다 낮은 예약가
    assert!(matches!(
        commands::submit(&store, cmd, now).await,
        Err(CoreError::Validation(_))
    ));

    // 등록번호는 정규화된다
    let listing = commands::submit(&store, submit_cmd("ab12 cde"), now)
        .await
        .unwrap();
    assert_eq!(listing.id, "AB12CDE");
    assert_eq!(listing.status, "PENDING");
    assert_eq!(listing.current_bid, 100);

    // 같은 번호판 중복 제출 불가
    assert!(matches!(
        commands::submit(&store, submit_cmd("AB12CDE"), now).await,
        Err(CoreError::Validation(_))
    ));
}

/// 승인은 PENDING에서만, 다음 주간 윈도우를 배정한다
#[tokio::test]
async fn test_approve_assigns_window() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let listing = commands::submit(&store, submit_cmd("PL4TE"), now)
        .await
        .unwrap();

    let (approved, notices) =
        commands::approve(&store, &listing.id, ApproveOverrides::default(), now)
            .await
            .unwrap();
    assert_eq!(approved.status, "QUEUED");
    let start = approved.auction_start.unwrap();
    let end = approved.auction_end.unwrap();
    assert!(start > now);
    assert_eq!(end - start, Duration::days(7));
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::ListingApproved { .. }));

    // 이미 QUEUED인 리스팅 재승인은 실패 — 알림도 중복되지 않는다
    let second = commands::approve(&store, &listing.id, ApproveOverrides::default(), now).await;
    assert!(matches!(second, Err(CoreError::InvalidState(_))));
}

/// 승인 시 관리자 오버라이드는 저장된 값에 폴백한다
#[tokio::test]
async fn test_approve_overrides_fall_back() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let mut cmd = submit_cmd("OV3R");
    cmd.interesting_fact = Some("1960년대 최초 발급".to_string());
    let listing = commands::submit(&store, cmd, now).await.unwrap();

    let overrides = ApproveOverrides {
        starting_price: Some(200),
        reserve_price: None,
        buy_now_price: Some(5_000),
        interesting_fact: None,
    };
    let (approved, _) = commands::approve(&store, &listing.id, overrides, now)
        .await
        .unwrap();
    assert_eq!(approved.starting_price, 200);
    assert_eq!(approved.reserve_price, 500); // 저장된 값 유지
    assert_eq!(approved.buy_now_price, Some(5_000));
    assert_eq!(approved.current_bid, 200);
    assert_eq!(
        approved.interesting_fact.as_deref(),
        Some("1960년대 최초 발급")
    );
}

/// 거절은 PENDING에서만
#[tokio::test]
async fn test_reject_only_from_pending() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let listing = commands::submit(&store, submit_cmd("RJ3CT"), now)
        .await
        .unwrap();

    let (rejected, notices) = commands::reject(&store, &listing.id).await.unwrap();
    assert_eq!(rejected.status, "REJECTED");
    assert!(matches!(notices[0], Notice::ListingRejected { .. }));

    assert!(matches!(
        commands::reject(&store, &listing.id).await,
        Err(CoreError::InvalidState(_))
    ));
    assert!(matches!(
        commands::reject(&store, "NOPE").await,
        Err(CoreError::NotFound(_))
    ));
}
// endregion: --- Submission / Moderation Tests

// region:    --- Bidding Tests

/// 최소 입찰가 미달 거부 / 충족 수락, 가격·횟수 갱신
#[tokio::test]
async fn test_place_bid_minimum() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();
    let id = live_listing(&store, "B1D", now).await;

    // 시작가 100 -> 최소 입찰가 110
    let low = commands::place_bid(&store, &cards, bid_cmd(&id, "alice@example.com", 105), now).await;
    assert_eq!(low.unwrap_err(), CoreError::BidTooLow { minimum: 110 });

    let (updated, notices) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "alice@example.com", 110), now)
            .await
            .unwrap();
    assert_eq!(updated.current_bid, 110);
    assert_eq!(updated.bid_count, 1);
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::BidReceived { .. }));

    // 다음 최소 입찰가는 110 + 10 = 120
    let (updated, notices) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "bob@example.com", 120), now)
            .await
            .unwrap();
    assert_eq!(updated.current_bid, 120);
    assert_eq!(updated.bid_count, 2);
    // 직전 최고 입찰자에게 상회 입찰 알림
    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::Outbid { bidder_email, .. } if bidder_email == "alice@example.com"
    )));

    // 같은 입찰자가 다시 올리면 상회 입찰 알림은 없다
    let (_, notices) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "bob@example.com", 130), now)
            .await
            .unwrap();
    assert!(!notices.iter().any(|n| matches!(n, Notice::Outbid { .. })));
}

/// 결제 수단 게이트 — 쓰기 전에 걸러진다
#[tokio::test]
async fn test_place_bid_payment_gate() {
    let store = MemoryStore::new();
    let no_cards = FakeCards::new(false);
    let now = Utc::now();
    let id = live_listing(&store, "G4TE", now).await;

    let denied =
        commands::place_bid(&store, &no_cards, bid_cmd(&id, "carol@example.com", 110), now).await;
    assert_eq!(denied.unwrap_err(), CoreError::PaymentMethodRequired);

    // 아무 쓰기도 없었어야 한다
    let listing = store.get_listing(&id).await.unwrap().unwrap();
    assert_eq!(listing.bid_count, 0);

    // 프로필 플래그가 켜져 있으면 게이트웨이 조회 없이 통과
    store.add_profile("carol@example.com", true);
    let (updated, _) =
        commands::place_bid(&store, &no_cards, bid_cmd(&id, "carol@example.com", 110), now)
            .await
            .unwrap();
    assert_eq!(updated.bid_count, 1);
}

/// LIVE가 아닌 모든 상태에서 입찰은 거부된다
#[tokio::test]
async fn test_place_bid_non_live_rejected() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();
    let id = live_listing(&store, "ST4TS", now).await;

    for status in [
        ListingStatus::Queued,
        ListingStatus::Sold,
        ListingStatus::Ended,
        ListingStatus::Withdrawn,
        ListingStatus::Rejected,
    ] {
        store.force_state(
            &id,
            status,
            Some(now - Duration::hours(1)),
            Some(now + Duration::hours(1)),
        );
        let result =
            commands::place_bid(&store, &cards, bid_cmd(&id, "dave@example.com", 10_000), now)
                .await;
        assert!(
            matches!(result, Err(CoreError::AuctionNotLive(_))),
            "{:?} 상태에서 입찰이 허용됨",
            status
        );
    }

    assert!(matches!(
        commands::place_bid(&store, &cards, bid_cmd("NOPE", "dave@example.com", 110), now).await,
        Err(CoreError::NotFound(_))
    ));
}

/// 소프트 클로즈 — 마감 5분 이내 입찰은 종료를 now + 5분으로 민다
#[tokio::test]
async fn test_soft_close_extension() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();

    // 종료까지 3분 -> 연장
    let id = live_listing(&store, "CL0SE", now).await;
    store.force_state(
        &id,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::minutes(3)),
    );
    let (updated, _) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "eve@example.com", 110), now)
            .await
            .unwrap();
    assert_eq!(updated.auction_end.unwrap(), now + Duration::minutes(5));

    // 종료까지 10분 -> 그대로
    let id2 = live_listing(&store, "F4R", now).await;
    store.force_state(
        &id2,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::minutes(10)),
    );
    let (updated, _) =
        commands::place_bid(&store, &cards, bid_cmd(&id2, "eve@example.com", 110), now)
            .await
            .unwrap();
    assert_eq!(updated.auction_end.unwrap(), now + Duration::minutes(10));

    // 연장은 반복 입찰마다 계속 민다
    let later = now + Duration::minutes(4);
    let (updated, _) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "frank@example.com", 125), later)
            .await
            .unwrap();
    assert_eq!(updated.auction_end.unwrap(), later + Duration::minutes(5));
}
// endregion: --- Bidding Tests

// region:    --- Buy Now / Settlement Tests

/// 즉시 구매 — SOLD 전이와 정산 트랜잭션 생성
#[tokio::test]
async fn test_buy_now() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let mut cmd = submit_cmd("BUY1T");
    cmd.buy_now_price = Some(7_500);
    let listing = commands::submit(&store, cmd, now).await.unwrap();
    commands::approve(&store, &listing.id, ApproveOverrides::default(), now)
        .await
        .unwrap();
    store.force_state(
        &listing.id,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::hours(2)),
    );

    let (txn, notices) = commands::buy_now(
        &store,
        BuyNowCommand {
            listing_id: listing.id.clone(),
            buyer_email: "buyer@example.com".to_string(),
        },
        now,
    )
    .await
    .unwrap();

    assert_eq!(txn.id, format!("txn-{}", listing.id));
    assert_eq!(txn.sale_price, 7_500);
    assert_eq!(txn.commission_rate, 8);
    assert_eq!(txn.commission_amount, 600);
    assert_eq!(txn.seller_payout, 6_900);
    assert_eq!(txn.dvla_fee, 80);
    assert_eq!(txn.payment_status, "awaiting_payment");
    assert!(matches!(notices[0], Notice::PlateSold { .. }));

    let sold = store.get_listing(&listing.id).await.unwrap().unwrap();
    assert_eq!(sold.status, "SOLD");
    assert_eq!(sold.current_bid, 7_500);
    assert_eq!(sold.auction_end.unwrap(), now);
}

/// 즉시 구매 가격이 없으면 불가, 종료 후에도 불가
#[tokio::test]
async fn test_buy_now_unavailable() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let id = live_listing(&store, "N0BUY", now).await;

    let cmd = BuyNowCommand {
        listing_id: id.clone(),
        buyer_email: "buyer@example.com".to_string(),
    };
    assert!(matches!(
        commands::buy_now(&store, cmd.clone(), now).await,
        Err(CoreError::InvalidState(_))
    ));

    // 종료 시각이 지난 리스팅
    let mut late = submit_cmd("L4TE");
    late.buy_now_price = Some(1_000);
    let listing = commands::submit(&store, late, now).await.unwrap();
    commands::approve(&store, &listing.id, ApproveOverrides::default(), now)
        .await
        .unwrap();
    store.force_state(
        &listing.id,
        ListingStatus::Live,
        Some(now - Duration::hours(2)),
        Some(now - Duration::minutes(1)),
    );
    let cmd = BuyNowCommand {
        listing_id: listing.id,
        buyer_email: "buyer@example.com".to_string(),
    };
    assert!(matches!(
        commands::buy_now(&store, cmd, now).await,
        Err(CoreError::AuctionNotLive(_))
    ));
}

/// 정산 트랜잭션은 리스팅당 한 번만 생긴다
#[tokio::test]
async fn test_transaction_idempotency() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let id = live_listing(&store, "1DEMP", now).await;

    let (first, notices) =
        commands::create_transaction_from_sale(&store, &id, "buyer@example.com", 600, now)
            .await
            .unwrap();
    assert_eq!(notices.len(), 1);

    // 재호출 — 같은 트랜잭션, 알림 없음
    let (second, notices) =
        commands::create_transaction_from_sale(&store, &id, "buyer@example.com", 600, now)
            .await
            .unwrap();
    assert_eq!(second.id, first.id);
    assert!(notices.is_empty());
    assert_eq!(store.transaction_count(), 1);
}

/// 정산 입력 검증
#[tokio::test]
async fn test_create_transaction_validation() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let id = live_listing(&store, "V4LD", now).await;

    assert!(matches!(
        commands::create_transaction_from_sale(&store, &id, "buyer@example.com", 0, now).await,
        Err(CoreError::InvalidAmount(0))
    ));
    assert!(matches!(
        commands::create_transaction_from_sale(&store, &id, "  ", 600, now).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        commands::create_transaction_from_sale(&store, "NOPE", "buyer@example.com", 600, now).await,
        Err(CoreError::NotFound(_))
    ));
}

/// 낙찰 대금 청구 — 판매가 + DVLA 수수료, 펜스 단위, 중복 청구 없음
#[tokio::test]
async fn test_collect_payment() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();
    let id = live_listing(&store, "P4Y", now).await;

    let (txn, _) = commands::create_transaction_from_sale(&store, &id, "buyer@example.com", 600, now)
        .await
        .unwrap();

    let paid = commands::collect_payment(&store, &cards, &txn.id).await.unwrap();
    assert_eq!(paid.payment_status, "paid");
    assert_eq!(paid.transaction_status, "complete");
    assert!(paid.charge_id.is_some());
    assert_eq!(
        cards.charges.lock().unwrap()[0],
        ("buyer@example.com".to_string(), (600 + 80) * 100)
    );

    // 이미 결제된 건은 재청구하지 않는다
    commands::collect_payment(&store, &cards, &txn.id).await.unwrap();
    assert_eq!(cards.charge_count(), 1);
}

/// 청구 성공 후 기록이 실패하면 조용히 넘어가지 않고 charge_id를 담아 오류를 낸다
#[tokio::test]
async fn test_collect_payment_surfaces_unrecorded_charge() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    let id = live_listing(&store, "R4CE", now).await;
    let (txn, _) =
        commands::create_transaction_from_sale(&*store, &id, "buyer@example.com", 600, now)
            .await
            .unwrap();

    let cards = DeleteOnCharge {
        store: Arc::clone(&store),
        txn_id: txn.id.clone(),
    };
    let err = commands::collect_payment(&*store, &cards, &txn.id)
        .await
        .unwrap_err();
    match err {
        // 대사용 charge_id가 오류 메시지에 남아야 한다
        CoreError::Upstream(msg) => assert!(msg.contains("ch_race_1")),
        other => panic!("Upstream 오류여야 함: {:?}", other),
    }

    // 행은 awaiting_payment 그대로 남는다 — paid로 둔갑하지 않는다
    let after = store.get_transaction(&txn.id).await.unwrap().unwrap();
    assert!(after.deleted);
    assert_eq!(after.payment_status, "awaiting_payment");
    assert!(after.charge_id.is_none());
}

/// 소프트 삭제 — 사유 필수, 물리 삭제 없음
#[tokio::test]
async fn test_soft_delete_transaction() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let id = live_listing(&store, "D3L", now).await;
    let (txn, _) = commands::create_transaction_from_sale(&store, &id, "buyer@example.com", 600, now)
        .await
        .unwrap();

    assert!(matches!(
        commands::soft_delete_transaction(&store, &txn.id, "  ", now).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        commands::soft_delete_transaction(&store, "txn-NOPE", "사유", now).await,
        Err(CoreError::NotFound(_))
    ));

    commands::soft_delete_transaction(&store, &txn.id, "중복 생성 건", now)
        .await
        .unwrap();
    let archived = store.get_transaction(&txn.id).await.unwrap().unwrap();
    assert!(archived.deleted);
    assert_eq!(archived.deleted_reason.as_deref(), Some("중복 생성 건"));
    assert!(archived.deleted_at.is_some());
    assert_eq!(store.transaction_count(), 1); // 행은 남아 있다
}
// endregion: --- Buy Now / Settlement Tests

// region:    --- Batch Tests

/// 롤오버 개장 — 두 번 실행해도 추가 전이는 없다
#[tokio::test]
async fn test_rollover_open_idempotent() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let listing = commands::submit(&store, submit_cmd("R0LL"), now)
        .await
        .unwrap();
    commands::approve(&store, &listing.id, ApproveOverrides::default(), now)
        .await
        .unwrap();

    // 배정된 윈도우 시작 시각으로 시간을 옮긴다
    let start = store
        .get_listing(&listing.id)
        .await
        .unwrap()
        .unwrap()
        .auction_start
        .unwrap();

    let (report, _) = commands::rollover(&store, start).await.unwrap();
    assert_eq!(report.opened, 1);
    assert_eq!(
        store.get_listing(&listing.id).await.unwrap().unwrap().status,
        "LIVE"
    );

    let (report, _) = commands::rollover(&store, start).await.unwrap();
    assert_eq!(report.opened, 0);
    assert_eq!(report.ended + report.sold + report.withdrawn, 0);
}

/// 롤오버 마감 — 예약가 충족이면 SOLD, 미달이면 ENDED, 철회 플래그면 WITHDRAWN
#[tokio::test]
async fn test_rollover_close_paths() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();

    // 예약가 500 충족 (입찰 600)
    let sold_id = live_listing(&store, "S0LD", now).await;
    commands::place_bid(&store, &cards, bid_cmd(&sold_id, "win@example.com", 600), now)
        .await
        .unwrap();

    // 예약가 미달 (입찰 110)
    let ended_id = live_listing(&store, "3NDED", now).await;
    commands::place_bid(&store, &cards, bid_cmd(&ended_id, "low@example.com", 110), now)
        .await
        .unwrap();

    // 철회 플래그
    let withdrawn_id = live_listing(&store, "W1THD", now).await;
    commands::request_withdraw(&store, &withdrawn_id).await.unwrap();

    // 셋 다 종료 시각을 과거로
    let past = now - Duration::minutes(1);
    for id in [&sold_id, &ended_id, &withdrawn_id] {
        store.force_state(
            id,
            ListingStatus::Live,
            Some(now - Duration::hours(2)),
            Some(past),
        );
    }

    let (report, notices) = commands::rollover(&store, now).await.unwrap();
    assert_eq!(report.sold, 1);
    assert_eq!(report.ended, 1);
    assert_eq!(report.withdrawn, 1);

    assert_eq!(
        store.get_listing(&sold_id).await.unwrap().unwrap().status,
        "SOLD"
    );
    assert_eq!(
        store.get_listing(&ended_id).await.unwrap().unwrap().status,
        "ENDED"
    );
    assert_eq!(
        store
            .get_listing(&withdrawn_id)
            .await
            .unwrap()
            .unwrap()
            .status,
        "WITHDRAWN"
    );

    // 낙찰 건만 정산 트랜잭션과 판매 알림이 생긴다
    assert_eq!(store.transaction_count(), 1);
    let txn = store
        .get_transaction(&format!("txn-{}", sold_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.sale_price, 600);
    assert_eq!(txn.buyer_email, "win@example.com");
    assert!(notices.iter().any(|n| matches!(n, Notice::PlateSold { .. })));
}

/// 복구 — 종료 시각이 지난 LIVE 리스팅을 현재 윈도우로 재배정
#[tokio::test]
async fn test_repair_reassigns_window() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let id = live_listing(&store, "F1X", now).await;
    store.force_state(
        &id,
        ListingStatus::Live,
        Some(now - Duration::days(10)),
        Some(now - Duration::days(3)),
    );

    let repaired = commands::repair(&store, now).await.unwrap();
    assert_eq!(repaired, vec![id.clone()]);

    let listing = store.get_listing(&id).await.unwrap().unwrap();
    let window = current_window(now);
    assert_eq!(listing.auction_start.unwrap(), window.start);
    assert_eq!(listing.auction_end.unwrap(), window.end);
    assert_eq!(listing.status, "LIVE");
}

/// 재등록 — ENDED 리스팅이 초기화되어 다시 큐에 들어간다
#[tokio::test]
async fn test_relist_resets_listing() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();
    let id = live_listing(&store, "AG41N", now).await;
    commands::place_bid(&store, &cards, bid_cmd(&id, "bidder@example.com", 110), now)
        .await
        .unwrap();
    commands::request_withdraw(&store, &id).await.unwrap();
    store.force_state(
        &id,
        ListingStatus::Ended,
        Some(now - Duration::days(8)),
        Some(now - Duration::days(1)),
    );

    let relisted = commands::relist(&store, &id, now).await.unwrap();
    assert_eq!(relisted.status, "QUEUED");
    assert_eq!(relisted.current_bid, relisted.starting_price);
    assert_eq!(relisted.bid_count, 0);
    assert!(!relisted.withdraw_after_current);
    assert!(relisted.auction_start.unwrap() > now);

    // LIVE 상태에서는 재등록 불가
    store.force_state(
        &id,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::hours(1)),
    );
    assert!(matches!(
        commands::relist(&store, &id, now).await,
        Err(CoreError::InvalidState(_))
    ));
}

/// 재등록 후 첫 입찰 — 이전 주기 입찰자에게 상회 입찰 알림이 가지 않는다
#[tokio::test]
async fn test_relist_first_bid_no_stale_outbid() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();
    let id = live_listing(&store, "CYCL2", now).await;

    // 1주기: alice가 입찰하고 유찰된다 — 입찰 기록은 남는다
    commands::place_bid(&store, &cards, bid_cmd(&id, "alice@example.com", 110), now)
        .await
        .unwrap();
    store.force_state(
        &id,
        ListingStatus::Ended,
        Some(now - Duration::days(8)),
        Some(now - Duration::days(1)),
    );

    // 재등록 -> 2주기 개장
    commands::relist(&store, &id, now).await.unwrap();
    store.force_state(
        &id,
        ListingStatus::Live,
        Some(now - Duration::hours(1)),
        Some(now + Duration::hours(2)),
    );

    // 2주기 첫 입찰: alice의 1주기 기록이 남아 있어도 알림 대상이 아니다
    let (updated, notices) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "bob@example.com", 110), now)
            .await
            .unwrap();
    assert_eq!(updated.bid_count, 1);
    assert!(!notices.iter().any(|n| matches!(n, Notice::Outbid { .. })));

    // 2주기 두 번째 입찰부터는 이번 주기 최고 입찰자(bob)에게만 간다
    let (_, notices) =
        commands::place_bid(&store, &cards, bid_cmd(&id, "carol@example.com", 120), now)
            .await
            .unwrap();
    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::Outbid { bidder_email, .. } if bidder_email == "bob@example.com"
    )));
}
// endregion: --- Batch Tests

// region:    --- End-to-End Scenario

/// 전체 사이클: 제출 -> 승인 -> 개장 -> 입찰 -> 마감
#[tokio::test]
async fn test_full_auction_cycle() {
    let store = MemoryStore::new();
    let cards = FakeCards::new(true);
    let now = Utc::now();

    // 제출: 시작가 100, 예약가 500
    let listing = commands::submit(&store, submit_cmd("CYCL3"), now)
        .await
        .unwrap();
    assert_eq!(listing.status, "PENDING");

    // 승인 -> QUEUED, 윈도우 배정
    let (approved, _) = commands::approve(&store, &listing.id, ApproveOverrides::default(), now)
        .await
        .unwrap();
    assert_eq!(approved.status, "QUEUED");
    let start = approved.auction_start.unwrap();
    let end = approved.auction_end.unwrap();

    // 개장 롤오버 -> LIVE
    let (report, _) = commands::rollover(&store, start).await.unwrap();
    assert_eq!(report.opened, 1);

    // 최소 입찰가 110: 105는 거부, 110은 수락
    let bid_time = start + Duration::hours(1);
    assert_eq!(
        commands::place_bid(
            &store,
            &cards,
            bid_cmd(&listing.id, "alice@example.com", 105),
            bid_time
        )
        .await
        .unwrap_err(),
        CoreError::BidTooLow { minimum: 110 }
    );
    let (updated, _) = commands::place_bid(
        &store,
        &cards,
        bid_cmd(&listing.id, "alice@example.com", 110),
        bid_time,
    )
    .await
    .unwrap();
    assert_eq!(updated.current_bid, 110);

    // buy_now_price가 없으니 즉시 구매 불가
    assert!(matches!(
        commands::buy_now(
            &store,
            BuyNowCommand {
                listing_id: listing.id.clone(),
                buyer_email: "alice@example.com".to_string(),
            },
            bid_time,
        )
        .await,
        Err(CoreError::InvalidState(_))
    ));

    // 종료 시각 도달 -> 마감 롤오버: 110 < 예약가 500 -> ENDED
    let (report, _) = commands::rollover(&store, end).await.unwrap();
    assert_eq!(report.ended, 1);
    assert_eq!(report.sold, 0);
    let final_listing = store.get_listing(&listing.id).await.unwrap().unwrap();
    assert_eq!(final_listing.status, "ENDED");
    assert_eq!(store.transaction_count(), 0);
}
// endregion: --- End-to-End Scenario
