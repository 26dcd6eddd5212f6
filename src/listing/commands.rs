/// 리스팅 라이프사이클 엔진
/// 1. 판매자 제출 / 관리자 승인·거절
/// 2. 입찰 / 즉시 구매 / 정산 트랜잭션
/// 3. 롤오버 / 복구 배치
// region:    --- Imports
use crate::error::CoreError;
use crate::gateway::ListingStore;
use crate::listing::model::{Listing, ListingStatus, SaleTransaction};
use crate::notify::Notice;
use crate::payment::CardGateway;
use crate::policy::increment::minimum_bid;
use crate::policy::settlement::settle;
use crate::policy::window::{current_window, next_window};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 판매자 리스팅 제출 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitListingCommand {
    pub registration: String,
    pub seller_email: String,
    pub starting_price: i64,
    pub reserve_price: i64,
    pub buy_now_price: Option<i64>,
    pub interesting_fact: Option<String>,
}

/// 승인 시 관리자 오버라이드 (생략하면 저장된 값 사용)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveOverrides {
    pub starting_price: Option<i64>,
    pub reserve_price: Option<i64>,
    pub buy_now_price: Option<i64>,
    pub interesting_fact: Option<String>,
}

/// 입찰 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidCommand {
    pub listing_id: String,
    pub bidder_email: String,
    pub amount: i64,
}

/// 즉시 구매 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowCommand {
    pub listing_id: String,
    pub buyer_email: String,
}

/// 롤오버 결과 집계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloverReport {
    pub opened: usize,
    pub sold: usize,
    pub ended: usize,
    pub withdrawn: usize,
}

// 동시 입찰 충돌 시 최대 재시도 횟수
const MAX_RETRIES: i32 = 100;

// 소프트 클로즈 연장 윈도우 (분)
const SOFT_CLOSE_MINUTES: i64 = 5;
// endregion: --- Commands

// region:    --- Submission / Moderation

/// 판매자 제출 — PENDING 리스팅 생성
pub async fn submit(
    store: &impl ListingStore,
    cmd: SubmitListingCommand,
    now: DateTime<Utc>,
) -> Result<Listing, CoreError> {
    info!("{:<12} --> 리스팅 제출: {:?}", "Command", cmd.registration);

    // 경계에서 엄격 검증 — 엔진 안으로 들어오기 전에 걸러낸다
    let registration: String = cmd
        .registration
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if registration.is_empty() {
        return Err(CoreError::Validation("등록번호가 비어 있습니다".to_string()));
    }
    if cmd.seller_email.trim().is_empty() {
        return Err(CoreError::Validation(
            "판매자 이메일이 비어 있습니다".to_string(),
        ));
    }
    if cmd.starting_price <= 0 {
        return Err(CoreError::Validation(
            "시작가는 0보다 커야 합니다".to_string(),
        ));
    }
    if cmd.reserve_price < cmd.starting_price {
        return Err(CoreError::Validation(
            "예약가는 시작가 이상이어야 합니다".to_string(),
        ));
    }
    if let Some(p) = cmd.buy_now_price {
        if p <= 0 {
            return Err(CoreError::Validation(
                "즉시 구매 가격은 0보다 커야 합니다".to_string(),
            ));
        }
    }

    let listing = Listing {
        id: registration.clone(),
        registration,
        seller_email: cmd.seller_email.trim().to_string(),
        status: ListingStatus::Pending.as_str().to_string(),
        starting_price: cmd.starting_price,
        reserve_price: cmd.reserve_price,
        buy_now_price: cmd.buy_now_price,
        current_bid: cmd.starting_price,
        bid_count: 0,
        auction_start: None,
        auction_end: None,
        withdraw_after_current: false,
        interesting_fact: cmd.interesting_fact,
        created_at: now,
    };

    store.insert_listing(&listing).await?;
    Ok(listing)
}

/// 승인 — PENDING에서만 QUEUED로 전이, 다음 주간 윈도우 배정
pub async fn approve(
    store: &impl ListingStore,
    listing_id: &str,
    overrides: ApproveOverrides,
    now: DateTime<Utc>,
) -> Result<(Listing, Vec<Notice>), CoreError> {
    info!("{:<12} --> 리스팅 승인: {}", "Command", listing_id);

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    if listing.status()? != ListingStatus::Pending {
        return Err(CoreError::InvalidState(format!(
            "PENDING 상태에서만 승인할 수 있습니다 (현재: {})",
            listing.status
        )));
    }

    // 오버라이드가 없으면 저장된 값으로 폴백
    let starting_price = overrides.starting_price.unwrap_or(listing.starting_price);
    let reserve_price = overrides.reserve_price.unwrap_or(listing.reserve_price);
    let buy_now_price = overrides.buy_now_price.or(listing.buy_now_price);
    let interesting_fact = overrides
        .interesting_fact
        .or_else(|| listing.interesting_fact.clone());

    if starting_price <= 0 {
        return Err(CoreError::Validation(
            "시작가는 0보다 커야 합니다".to_string(),
        ));
    }
    if reserve_price < starting_price {
        return Err(CoreError::Validation(
            "예약가는 시작가 이상이어야 합니다".to_string(),
        ));
    }

    let window = next_window(now);
    let queued = store
        .mark_queued(
            listing_id,
            starting_price,
            reserve_price,
            buy_now_price,
            interesting_fact,
            window,
        )
        .await?;
    if !queued {
        // 조회와 승인 사이에 상태가 바뀜
        return Err(CoreError::InvalidState(
            "승인 중 리스팅 상태가 변경되었습니다".to_string(),
        ));
    }

    let updated = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    let notices = vec![Notice::ListingApproved {
        seller_email: updated.seller_email.clone(),
        registration: updated.registration.clone(),
        auction_start: window.start,
        auction_end: window.end,
    }];
    Ok((updated, notices))
}

/// 거절 — PENDING에서만 REJECTED로 전이
pub async fn reject(
    store: &impl ListingStore,
    listing_id: &str,
) -> Result<(Listing, Vec<Notice>), CoreError> {
    info!("{:<12} --> 리스팅 거절: {}", "Command", listing_id);

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    let rejected = store
        .transition(listing_id, ListingStatus::Pending, ListingStatus::Rejected)
        .await?;
    if !rejected {
        return Err(CoreError::InvalidState(format!(
            "PENDING 상태에서만 거절할 수 있습니다 (현재: {})",
            listing.status
        )));
    }

    let updated = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    let notices = vec![Notice::ListingRejected {
        seller_email: updated.seller_email.clone(),
        registration: updated.registration.clone(),
    }];
    Ok((updated, notices))
}
// endregion: --- Submission / Moderation

// region:    --- Bidding

/// 입찰 — LIVE에서만, 결제 수단 게이트를 쓰기 전에 통과해야 한다
pub async fn place_bid(
    store: &impl ListingStore,
    cards: &impl CardGateway,
    cmd: PlaceBidCommand,
    now: DateTime<Utc>,
) -> Result<(Listing, Vec<Notice>), CoreError> {
    info!("{:<12} --> 입찰 요청: {:?}", "Command", cmd);

    if cmd.amount <= 0 {
        return Err(CoreError::Validation(
            "입찰 금액은 0보다 커야 합니다".to_string(),
        ));
    }

    // 결제 수단 게이트 — 어떤 쓰기보다 먼저
    let has_card = match store.get_profile(&cmd.bidder_email).await? {
        Some(profile) if profile.has_payment_method => true,
        // 프로필 플래그가 꺼져 있어도 게이트웨이 쪽에 카드가 있을 수 있다
        _ => cards.has_usable_payment_method(&cmd.bidder_email).await?,
    };
    if !has_card {
        return Err(CoreError::PaymentMethodRequired);
    }

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .get_listing(&cmd.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", cmd.listing_id)))?;

        let status = listing.status()?;
        if status != ListingStatus::Live {
            return Err(CoreError::AuctionNotLive(listing.status.clone()));
        }
        let auction_end = listing.auction_end.ok_or_else(|| {
            CoreError::InvalidState("LIVE 리스팅에 종료 시각이 없습니다".to_string())
        })?;
        if now > auction_end {
            // 롤오버가 아직 마감하지 못한 LIVE 리스팅
            return Err(CoreError::AuctionNotLive(
                ListingStatus::Ended.as_str().to_string(),
            ));
        }

        let minimum = minimum_bid(listing.current_bid);
        if cmd.amount < minimum {
            return Err(CoreError::BidTooLow { minimum });
        }

        // 소프트 클로즈: 마감 임박 입찰이면 종료 시각을 now + 5분으로 민다.
        // 연장만 하고 단축하지 않는다.
        let new_end = if auction_end - now <= Duration::minutes(SOFT_CLOSE_MINUTES) {
            now + Duration::minutes(SOFT_CLOSE_MINUTES)
        } else {
            auction_end
        };

        // 상회 입찰 알림 대상 — 이번 주기의 직전 최고 입찰자.
        // 재등록은 bid_count만 0으로 되돌리고 입찰 기록은 남기므로,
        // bid_count가 0이면 남은 기록이 있어도 알림 대상이 아니다.
        let previous = if listing.bid_count > 0 {
            store.latest_bid(&cmd.listing_id).await?
        } else {
            None
        };

        let recorded = store
            .record_bid(
                &cmd.listing_id,
                listing.current_bid,
                &cmd.bidder_email,
                cmd.amount,
                now,
                new_end,
            )
            .await?;
        if !recorded {
            warn!(
                "{:<12} --> 동시 입찰 충돌, 재시도: {}",
                "Command", cmd.listing_id
            );
            retries += 1;
            continue;
        }

        let mut notices = vec![Notice::BidReceived {
            seller_email: listing.seller_email.clone(),
            registration: listing.registration.clone(),
            amount: cmd.amount,
        }];
        if let Some(prev) = previous {
            if prev.bidder_email != cmd.bidder_email {
                notices.push(Notice::Outbid {
                    bidder_email: prev.bidder_email,
                    registration: listing.registration.clone(),
                    amount: cmd.amount,
                });
            }
        }

        let updated = store
            .get_listing(&cmd.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", cmd.listing_id)))?;
        return Ok((updated, notices));
    }

    Err(CoreError::Upstream(
        "입찰 재시도 한도를 초과했습니다".to_string(),
    ))
}

/// 즉시 구매 — LIVE이고 buy_now_price가 설정된 경우에만
pub async fn buy_now(
    store: &impl ListingStore,
    cmd: BuyNowCommand,
    now: DateTime<Utc>,
) -> Result<(SaleTransaction, Vec<Notice>), CoreError> {
    info!("{:<12} --> 즉시 구매 요청: {:?}", "Command", cmd);

    let listing = store
        .get_listing(&cmd.listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", cmd.listing_id)))?;

    if listing.status()? != ListingStatus::Live {
        return Err(CoreError::AuctionNotLive(listing.status.clone()));
    }
    let price = listing
        .buy_now_price
        .filter(|p| *p > 0)
        .ok_or_else(|| CoreError::InvalidState("즉시 구매 가격이 설정되지 않았습니다".to_string()))?;
    let auction_end = listing.auction_end.ok_or_else(|| {
        CoreError::InvalidState("LIVE 리스팅에 종료 시각이 없습니다".to_string())
    })?;
    if now > auction_end {
        return Err(CoreError::AuctionNotLive(
            ListingStatus::Ended.as_str().to_string(),
        ));
    }

    let sold = store.mark_sold(&cmd.listing_id, price, now).await?;
    if !sold {
        // 확인과 낙찰 사이에 다른 구매/마감이 먼저 들어감
        return Err(CoreError::InvalidState(
            "즉시 구매 처리 중 리스팅 상태가 변경되었습니다".to_string(),
        ));
    }

    create_transaction_from_sale(store, &cmd.listing_id, &cmd.buyer_email, price, now).await
}
// endregion: --- Bidding

// region:    --- Settlement

/// 판매 확정 시 정산 트랜잭션 생성
/// 트랜잭션 id는 `txn-<listing_id>` — 재호출되어도 리스팅당 하나만 만든다
pub async fn create_transaction_from_sale(
    store: &impl ListingStore,
    listing_id: &str,
    buyer_email: &str,
    final_price: i64,
    now: DateTime<Utc>,
) -> Result<(SaleTransaction, Vec<Notice>), CoreError> {
    info!(
        "{:<12} --> 정산 트랜잭션 생성: {} ({})",
        "Command", listing_id, final_price
    );

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    if listing.seller_email.trim().is_empty() {
        return Err(CoreError::Validation(
            "판매자 이메일이 없습니다".to_string(),
        ));
    }
    if buyer_email.trim().is_empty() {
        return Err(CoreError::Validation(
            "구매자 이메일이 없습니다".to_string(),
        ));
    }

    let settlement = settle(final_price)?;

    let txn = SaleTransaction {
        id: format!("txn-{}", listing_id),
        listing_id: listing_id.to_string(),
        seller_email: listing.seller_email.clone(),
        buyer_email: buyer_email.trim().to_string(),
        sale_price: final_price,
        commission_rate: settlement.commission_rate,
        commission_amount: settlement.commission_amount,
        seller_payout: settlement.seller_payout,
        dvla_fee: settlement.dvla_fee,
        payment_status: "awaiting_payment".to_string(),
        transaction_status: "pending".to_string(),
        charge_id: None,
        deleted: false,
        deleted_reason: None,
        deleted_at: None,
        created_at: now,
    };

    let created = store.create_transaction(&txn).await?;
    if !created {
        // 이미 정산됨 — 기존 트랜잭션을 돌려주고 알림은 다시 보내지 않는다
        let existing = store
            .get_transaction(&txn.id)
            .await?
            .ok_or_else(|| CoreError::Upstream("정산 트랜잭션 조회 실패".to_string()))?;
        return Ok((existing, Vec::new()));
    }

    // 리스팅을 SOLD로 확정 (즉시 구매 경로에서는 이미 SOLD)
    if listing.status()? != ListingStatus::Sold {
        let sold = store.mark_sold(listing_id, final_price, now).await?;
        if !sold {
            let refreshed = store
                .get_listing(listing_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;
            if refreshed.status()? != ListingStatus::Sold {
                return Err(CoreError::InvalidState(format!(
                    "SOLD로 전이할 수 없는 상태입니다: {}",
                    refreshed.status
                )));
            }
        }
    }

    let notices = vec![Notice::PlateSold {
        seller_email: listing.seller_email,
        registration: listing.registration,
        sale_price: final_price,
        settlement,
    }];
    Ok((txn, notices))
}

/// 낙찰자 카드 청구 — 판매가 + DVLA 수수료 (펜스 단위)
pub async fn collect_payment(
    store: &impl ListingStore,
    cards: &impl CardGateway,
    txn_id: &str,
) -> Result<SaleTransaction, CoreError> {
    info!("{:<12} --> 낙찰 대금 청구: {}", "Command", txn_id);

    let txn = store
        .get_transaction(txn_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("트랜잭션 {}", txn_id)))?;

    if txn.deleted {
        return Err(CoreError::InvalidState(
            "삭제된 트랜잭션입니다".to_string(),
        ));
    }
    if txn.payment_status == "paid" {
        // 이미 결제됨 — 재청구하지 않는다
        return Ok(txn);
    }

    let amount_pence = (txn.sale_price + txn.dvla_fee) * 100;
    let outcome = cards
        .charge_saved_card(
            &txn.buyer_email,
            amount_pence,
            &format!("번호판 {} 낙찰 대금", txn.listing_id),
        )
        .await?;
    if outcome.status != "succeeded" {
        return Err(CoreError::Upstream(format!(
            "결제 실패: {}",
            outcome.status
        )));
    }

    let marked = store.mark_transaction_paid(txn_id, &outcome.charge_id).await?;
    if !marked {
        // 청구는 성공했는데 그 사이 트랜잭션이 삭제됨 — 수동 대사가 필요하다
        return Err(CoreError::Upstream(format!(
            "결제 기록 실패: 청구 {}는 성공했으나 트랜잭션 {}에 반영되지 않았습니다",
            outcome.charge_id, txn_id
        )));
    }
    store
        .get_transaction(txn_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("트랜잭션 {}", txn_id)))
}

/// 트랜잭션 소프트 삭제 — 사유 필수, 물리 삭제 없음
pub async fn soft_delete_transaction(
    store: &impl ListingStore,
    txn_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    if reason.trim().is_empty() {
        return Err(CoreError::Validation(
            "삭제 사유는 비워둘 수 없습니다".to_string(),
        ));
    }

    store
        .get_transaction(txn_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("트랜잭션 {}", txn_id)))?;

    // 이미 삭제된 경우는 멱등 처리
    store
        .soft_delete_transaction(txn_id, reason.trim(), now)
        .await?;
    Ok(())
}
// endregion: --- Settlement

// region:    --- Withdraw / Relist

/// 현 경매 종료 후 철회 요청 — 플래그만 세우고 상태는 바꾸지 않는다.
/// 플래그는 롤오버 마감 경계에서 소비된다.
pub async fn request_withdraw(
    store: &impl ListingStore,
    listing_id: &str,
) -> Result<Listing, CoreError> {
    info!("{:<12} --> 철회 요청: {}", "Command", listing_id);

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    if listing.status()?.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "이미 종료된 리스팅입니다: {}",
            listing.status
        )));
    }

    store.set_withdraw_flag(listing_id).await?;
    store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))
}

/// 재등록 — ENDED/WITHDRAWN 리스팅을 다음 윈도우로 다시 큐에 넣는다
pub async fn relist(
    store: &impl ListingStore,
    listing_id: &str,
    now: DateTime<Utc>,
) -> Result<Listing, CoreError> {
    info!("{:<12} --> 재등록 요청: {}", "Command", listing_id);

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))?;

    let status = listing.status()?;
    if status != ListingStatus::Ended && status != ListingStatus::Withdrawn {
        return Err(CoreError::InvalidState(format!(
            "ENDED/WITHDRAWN 상태에서만 재등록할 수 있습니다 (현재: {})",
            listing.status
        )));
    }

    let requeued = store.requeue(listing_id, status, next_window(now)).await?;
    if !requeued {
        return Err(CoreError::InvalidState(
            "재등록 중 리스팅 상태가 변경되었습니다".to_string(),
        ));
    }

    store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("리스팅 {}", listing_id)))
}
// endregion: --- Withdraw / Relist

// region:    --- Batch Operations

/// 롤오버 배치
/// QUEUED이고 시작 시각이 지난 리스팅 -> LIVE,
/// LIVE이고 종료 시각이 지난 리스팅 -> WITHDRAWN(플래그) / SOLD(예약가 충족) / ENDED.
/// 항목별 실패는 로그만 남기고 배치는 계속한다. 모든 전이가 상태 조건부라
/// 중복 실행/동시 실행은 추가 전이를 만들지 않는다.
pub async fn rollover(
    store: &impl ListingStore,
    now: DateTime<Utc>,
) -> Result<(RolloverReport, Vec<Notice>), CoreError> {
    let mut report = RolloverReport::default();
    let mut notices = Vec::new();

    // QUEUED -> LIVE
    for listing in store.listings_due_open(now).await? {
        match store
            .transition(&listing.id, ListingStatus::Queued, ListingStatus::Live)
            .await
        {
            Ok(true) => report.opened += 1,
            Ok(false) => {} // 이미 다른 실행이 전이함
            Err(e) => {
                error!(
                    "{:<12} --> 개장 전이 실패 (건너뜀): {} - {}",
                    "Rollover", listing.id, e
                );
            }
        }
    }

    // LIVE -> WITHDRAWN / SOLD / ENDED
    for listing in store.listings_due_close(now).await? {
        match close_listing(store, &listing, now).await {
            Ok(Some(Closed::Withdrawn)) => report.withdrawn += 1,
            Ok(Some(Closed::Sold(mut sold_notices))) => {
                report.sold += 1;
                notices.append(&mut sold_notices);
            }
            Ok(Some(Closed::Ended)) => report.ended += 1,
            Ok(None) => {} // 이미 다른 실행이 마감함
            Err(e) => {
                error!(
                    "{:<12} --> 마감 전이 실패 (건너뜀): {} - {}",
                    "Rollover", listing.id, e
                );
            }
        }
    }

    info!(
        "{:<12} --> 롤오버 완료: opened={}, sold={}, ended={}, withdrawn={}",
        "Rollover", report.opened, report.sold, report.ended, report.withdrawn
    );
    Ok((report, notices))
}

enum Closed {
    Withdrawn,
    Sold(Vec<Notice>),
    Ended,
}

/// 종료 시각이 지난 LIVE 리스팅 하나를 마감한다
async fn close_listing(
    store: &impl ListingStore,
    listing: &Listing,
    now: DateTime<Utc>,
) -> Result<Option<Closed>, CoreError> {
    // 철회 플래그가 SOLD/ENDED보다 우선한다
    if listing.withdraw_after_current {
        let done = store
            .transition(&listing.id, ListingStatus::Live, ListingStatus::Withdrawn)
            .await?;
        return Ok(done.then_some(Closed::Withdrawn));
    }

    // 입찰이 있고 예약가를 충족하면 낙찰
    if listing.bid_count > 0 && listing.current_bid >= listing.reserve_price {
        let winner = store
            .latest_bid(&listing.id)
            .await?
            .ok_or_else(|| CoreError::InvalidState("입찰 기록이 없습니다".to_string()))?;
        let (_, sold_notices) = create_transaction_from_sale(
            store,
            &listing.id,
            &winner.bidder_email,
            listing.current_bid,
            now,
        )
        .await?;
        return Ok(Some(Closed::Sold(sold_notices)));
    }

    let done = store
        .transition(&listing.id, ListingStatus::Live, ListingStatus::Ended)
        .await?;
    Ok(done.then_some(Closed::Ended))
}

/// 복구 배치 — 종료 시각이 이미 지난 LIVE 리스팅을 현재 윈도우로 재배정.
/// 신뢰할 수 있는 스케줄러가 없는 환경에서의 보정 조치다.
/// 롤오버 마감 경로와 경합하므로 스케줄러가 아닌 관리자 호출로만 실행한다.
pub async fn repair(
    store: &impl ListingStore,
    now: DateTime<Utc>,
) -> Result<Vec<String>, CoreError> {
    let mut repaired = Vec::new();
    let window = current_window(now);

    for listing in store.listings_due_close(now).await? {
        match store.reassign_window(&listing.id, window).await {
            Ok(true) => repaired.push(listing.id),
            Ok(false) => {}
            Err(e) => {
                error!(
                    "{:<12} --> 윈도우 재배정 실패 (건너뜀): {} - {}",
                    "Repair", listing.id, e
                );
            }
        }
    }

    info!("{:<12} --> 복구 완료: {}건", "Repair", repaired.len());
    Ok(repaired)
}
// endregion: --- Batch Operations
