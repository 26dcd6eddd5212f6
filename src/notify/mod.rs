/// 알림 디스패처
/// 엔진의 상태 전이는 보낼 알림 목록(Vec<Notice>)을 반환하고,
/// 호출자는 쓰기가 확정된 뒤에 디스패치한다. 전송 실패는 로그만 남기고
/// 상태 전이에는 영향을 주지 않는다.
// region:    --- Imports
use crate::error::CoreError;
use crate::policy::settlement::Settlement;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Notices
/// 아웃바운드 알림 (템플릿 종류 + 데이터)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// 리스팅 승인 — 판매자에게
    ListingApproved {
        seller_email: String,
        registration: String,
        auction_start: DateTime<Utc>,
        auction_end: DateTime<Utc>,
    },
    /// 리스팅 거절 — 판매자에게
    ListingRejected {
        seller_email: String,
        registration: String,
    },
    /// 새 입찰 접수 — 판매자에게
    BidReceived {
        seller_email: String,
        registration: String,
        amount: i64,
    },
    /// 상회 입찰 발생 — 직전 최고 입찰자에게
    Outbid {
        bidder_email: String,
        registration: String,
        amount: i64,
    },
    /// 판매 완료 및 정산 내역 — 판매자에게
    PlateSold {
        seller_email: String,
        registration: String,
        sale_price: i64,
        settlement: Settlement,
    },
}

impl Notice {
    /// 메일 템플릿 키
    pub fn template(&self) -> &'static str {
        match self {
            Notice::ListingApproved { .. } => "listing_approved",
            Notice::ListingRejected { .. } => "listing_rejected",
            Notice::BidReceived { .. } => "bid_received",
            Notice::Outbid { .. } => "outbid",
            Notice::PlateSold { .. } => "plate_sold",
        }
    }

    /// 수신자 주소
    pub fn recipient(&self) -> &str {
        match self {
            Notice::ListingApproved { seller_email, .. } => seller_email,
            Notice::ListingRejected { seller_email, .. } => seller_email,
            Notice::BidReceived { seller_email, .. } => seller_email,
            Notice::Outbid { bidder_email, .. } => bidder_email,
            Notice::PlateSold { seller_email, .. } => seller_email,
        }
    }
}
// endregion: --- Notices

// region:    --- Notifier
/// 알림 전송 트레이트
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), CoreError>;
}

/// 메일 릴레이 구현체 — 릴레이 엔드포인트로 템플릿/수신자/데이터를 POST
pub struct MailRelayNotifier {
    client: reqwest::Client,
    relay_url: String,
}

impl MailRelayNotifier {
    pub fn new() -> Self {
        let relay_url =
            std::env::var("MAIL_RELAY_URL").unwrap_or_else(|_| "http://localhost:2525".to_string());
        Self {
            client: reqwest::Client::new(),
            relay_url,
        }
    }
}

impl Default for MailRelayNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), CoreError> {
        info!(
            "{:<12} --> 메일 전송: template={}, to={}",
            "Notify",
            notice.template(),
            notice.recipient()
        );
        self.client
            .post(format!("{}/send", self.relay_url))
            .json(&serde_json::json!({
                "template": notice.template(),
                "to": notice.recipient(),
                "data": notice,
            }))
            .send()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| CoreError::Upstream(e.to_string()))?;
        Ok(())
    }
}
// endregion: --- Notifier

// region:    --- Dispatch
/// 알림 목록 디스패치 — 각 건은 독립적으로 실패할 수 있고,
/// 실패해도 다음 건을 계속 보낸다
pub async fn dispatch_all(notifier: Arc<dyn Notifier>, notices: Vec<Notice>) {
    for notice in notices {
        if let Err(e) = notifier.send(&notice).await {
            warn!(
                "{:<12} --> 알림 전송 실패 (무시): template={}, to={}, err={}",
                "Notify",
                notice.template(),
                notice.recipient(),
                e
            );
        }
    }
}
// endregion: --- Dispatch
