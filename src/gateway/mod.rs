/// 영속성 게이트웨이
/// 엔진은 ListingStore 트레이트만 바라본다. 모든 상태 전이는
/// 조건부 업데이트(기대 상태/가격 일치 시에만 반영)로 수행된다.
// region:    --- Imports
use crate::error::CoreError;
use crate::listing::model::{Bid, Listing, ListingStatus, Profile, SaleTransaction};
use crate::policy::window::AuctionWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;

pub mod queries;
// endregion: --- Imports

// region:    --- Listing Store Trait
/// 리스팅 저장소 트레이트
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError>;
    async fn get_listing(&self, id: &str) -> Result<Option<Listing>, CoreError>;
    async fn all_listings(&self) -> Result<Vec<Listing>, CoreError>;

    /// QUEUED 상태이면서 auction_start가 지난 리스팅
    async fn listings_due_open(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError>;
    /// LIVE 상태이면서 auction_end가 지난 리스팅
    async fn listings_due_close(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError>;

    /// 승인: PENDING일 때만 QUEUED로 전이하고 가격/설명/윈도우를 확정한다
    async fn mark_queued(
        &self,
        id: &str,
        starting_price: i64,
        reserve_price: i64,
        buy_now_price: Option<i64>,
        interesting_fact: Option<String>,
        window: AuctionWindow,
    ) -> Result<bool, CoreError>;

    /// 기대 상태에서만 성공하는 상태 전이
    async fn transition(
        &self,
        id: &str,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<bool, CoreError>;

    /// LIVE일 때만 SOLD로 전이하고 최종가와 종료 시각을 확정한다
    async fn mark_sold(
        &self,
        id: &str,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError>;

    /// LIVE 리스팅의 경매 윈도우 재배정
    async fn reassign_window(&self, id: &str, window: AuctionWindow) -> Result<bool, CoreError>;

    /// 현 경매 종료 후 철회 플래그 설정
    async fn set_withdraw_flag(&self, id: &str) -> Result<bool, CoreError>;

    /// 재등록: ENDED 또는 WITHDRAWN에서만 QUEUED로 복귀
    async fn requeue(
        &self,
        id: &str,
        from: ListingStatus,
        window: AuctionWindow,
    ) -> Result<bool, CoreError>;

    /// CAS 입찰 반영: current_bid가 기대값과 같을 때만
    /// 입찰 기록 삽입 + 가격/횟수/종료 시각 갱신을 한 트랜잭션으로 수행.
    /// 기대값 불일치(동시 입찰에 밀림)면 false.
    async fn record_bid(
        &self,
        listing_id: &str,
        expected_bid: i64,
        bidder_email: &str,
        amount: i64,
        bid_time: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<bool, CoreError>;

    async fn latest_bid(&self, listing_id: &str) -> Result<Option<Bid>, CoreError>;
    async fn bids_for(&self, listing_id: &str) -> Result<Vec<Bid>, CoreError>;

    /// 멱등 트랜잭션 생성. 같은 id가 이미 있으면 false (생성하지 않음)
    async fn create_transaction(&self, txn: &SaleTransaction) -> Result<bool, CoreError>;
    async fn get_transaction(&self, id: &str) -> Result<Option<SaleTransaction>, CoreError>;
    async fn mark_transaction_paid(&self, id: &str, charge_id: &str) -> Result<bool, CoreError>;
    /// 소프트 삭제 — 물리 삭제는 하지 않는다
    async fn soft_delete_transaction(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError>;

    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, CoreError>;
}
// endregion: --- Listing Store Trait

// region:    --- Postgres Store
/// Postgres 구현체
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    /// 저장소 생성 (프로세스 시작 시 한 번 만들어 참조로 주입한다)
    pub async fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to create pool");
        Self {
            pool: Arc::new(pool),
        }
    }

    /// 스키마 초기화
    /// RESET_DB=1일 때만 기존 테이블을 버린다 (로컬/테스트 환경용)
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        if std::env::var("RESET_DB").as_deref() == Ok("1") {
            // 00-recreate-db.sql 실행
            let recreate_db_sql = include_str!("../sql/00-recreate-db.sql");
            self.execute_multi_query(recreate_db_sql).await?;
        }

        // 01-create-schema.sql 실행
        let create_schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;

        info!("{:<12} --> 스키마 초기화 완료", "Gateway");
        Ok(())
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PostgresStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError> {
        sqlx::query(queries::INSERT_LISTING)
            .bind(&listing.id)
            .bind(&listing.registration)
            .bind(&listing.seller_email)
            .bind(&listing.status)
            .bind(listing.starting_price)
            .bind(listing.reserve_price)
            .bind(listing.buy_now_price)
            .bind(listing.current_bid)
            .bind(listing.bid_count)
            .bind(listing.auction_start)
            .bind(listing.auction_end)
            .bind(listing.withdraw_after_current)
            .bind(&listing.interesting_fact)
            .bind(listing.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => CoreError::Validation(
                    format!("이미 등록된 번호판입니다: {}", listing.registration),
                ),
                _ => CoreError::from(e),
            })?;
        Ok(())
    }

    async fn get_listing(&self, id: &str) -> Result<Option<Listing>, CoreError> {
        let listing = sqlx::query_as::<_, Listing>(queries::GET_LISTING)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(listing)
    }

    async fn all_listings(&self) -> Result<Vec<Listing>, CoreError> {
        let listings = sqlx::query_as::<_, Listing>(queries::GET_ALL_LISTINGS)
            .fetch_all(&*self.pool)
            .await?;
        Ok(listings)
    }

    async fn listings_due_open(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        let listings = sqlx::query_as::<_, Listing>(queries::GET_DUE_OPEN)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?;
        Ok(listings)
    }

    async fn listings_due_close(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        let listings = sqlx::query_as::<_, Listing>(queries::GET_DUE_CLOSE)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?;
        Ok(listings)
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
        let updated = sqlx::query_scalar::<_, String>(queries::MARK_QUEUED)
            .bind(starting_price)
            .bind(reserve_price)
            .bind(buy_now_price)
            .bind(interesting_fact)
            .bind(window.start)
            .bind(window.end)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn transition(
        &self,
        id: &str,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::TRANSITION_STATUS)
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn mark_sold(
        &self,
        id: &str,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::MARK_SOLD)
            .bind(final_price)
            .bind(now)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn reassign_window(&self, id: &str, window: AuctionWindow) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::REASSIGN_WINDOW)
            .bind(window.start)
            .bind(window.end)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn set_withdraw_flag(&self, id: &str) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::SET_WITHDRAW_FLAG)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn requeue(
        &self,
        id: &str,
        from: ListingStatus,
        window: AuctionWindow,
    ) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::REQUEUE)
            .bind(window.start)
            .bind(window.end)
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
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
        // 리스팅 갱신과 입찰 삽입을 한 트랜잭션으로 묶는다
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        let updated = sqlx::query_scalar::<_, String>(queries::RECORD_BID_UPDATE)
            .bind(amount)
            .bind(new_end)
            .bind(listing_id)
            .bind(expected_bid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(CoreError::from)?;

        if updated.is_none() {
            // 기대한 current_bid가 아님 — 동시 입찰에 밀렸다
            tx.rollback().await.map_err(CoreError::from)?;
            return Ok(false);
        }

        sqlx::query(queries::INSERT_BID)
            .bind(listing_id)
            .bind(bidder_email)
            .bind(amount)
            .bind(bid_time)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;

        tx.commit().await.map_err(CoreError::from)?;
        Ok(true)
    }

    async fn latest_bid(&self, listing_id: &str) -> Result<Option<Bid>, CoreError> {
        let bid = sqlx::query_as::<_, Bid>(queries::GET_LATEST_BID)
            .bind(listing_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(bid)
    }

    async fn bids_for(&self, listing_id: &str) -> Result<Vec<Bid>, CoreError> {
        let bids = sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
            .bind(listing_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(bids)
    }

    async fn create_transaction(&self, txn: &SaleTransaction) -> Result<bool, CoreError> {
        let inserted = sqlx::query_scalar::<_, String>(queries::INSERT_TRANSACTION)
            .bind(&txn.id)
            .bind(&txn.listing_id)
            .bind(&txn.seller_email)
            .bind(&txn.buyer_email)
            .bind(txn.sale_price)
            .bind(txn.commission_rate)
            .bind(txn.commission_amount)
            .bind(txn.seller_payout)
            .bind(txn.dvla_fee)
            .bind(&txn.payment_status)
            .bind(&txn.transaction_status)
            .bind(&txn.charge_id)
            .bind(txn.deleted)
            .bind(&txn.deleted_reason)
            .bind(txn.deleted_at)
            .bind(txn.created_at)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(inserted.is_some())
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<SaleTransaction>, CoreError> {
        let txn = sqlx::query_as::<_, SaleTransaction>(queries::GET_TRANSACTION)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(txn)
    }

    async fn mark_transaction_paid(&self, id: &str, charge_id: &str) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::MARK_TRANSACTION_PAID)
            .bind(charge_id)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn soft_delete_transaction(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let updated = sqlx::query_scalar::<_, String>(queries::SOFT_DELETE_TRANSACTION)
            .bind(reason)
            .bind(now)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, CoreError> {
        let profile = sqlx::query_as::<_, Profile>(queries::GET_PROFILE)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(profile)
    }
}
// endregion: --- Postgres Store
