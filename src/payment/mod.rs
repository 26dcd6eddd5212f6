/// 결제 게이트웨이
/// 카드 등록 여부 확인과 저장 카드 청구만 노출한다.
/// 실제 카드 결제 처리는 외부 결제 API가 담당한다.
// region:    --- Imports
use crate::error::CoreError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
// endregion: --- Imports

// region:    --- Card Gateway Trait
/// 청구 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub status: String,
    pub charge_id: String,
}

/// 카드 게이트웨이 트레이트
#[async_trait]
pub trait CardGateway: Send + Sync {
    /// 사용 가능한 결제 수단 보유 여부
    async fn has_usable_payment_method(&self, email: &str) -> Result<bool, CoreError>;

    /// 저장된 카드로 청구 (금액 단위: 펜스)
    async fn charge_saved_card(
        &self,
        email: &str,
        amount_pence: i64,
        description: &str,
    ) -> Result<ChargeOutcome, CoreError>;
}
// endregion: --- Card Gateway Trait

// region:    --- REST Payment Client
/// 결제 API REST 클라이언트
pub struct RestPaymentClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PaymentMethodResponse {
    has_payment_method: bool,
}

#[derive(Deserialize)]
struct ChargeResponse {
    status: String,
    charge_id: String,
}

impl RestPaymentClient {
    pub fn new() -> Self {
        let base_url =
            std::env::var("PAYMENT_API_URL").unwrap_or_else(|_| "http://localhost:4242".to_string());
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl Default for RestPaymentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardGateway for RestPaymentClient {
    async fn has_usable_payment_method(&self, email: &str) -> Result<bool, CoreError> {
        info!("{:<12} --> 결제 수단 조회: {}", "Payment", email);
        let url = format!("{}/customers/{}/payment-methods", self.base_url, email);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let body: PaymentMethodResponse = resp
            .error_for_status()
            .map_err(|e| CoreError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;
        Ok(body.has_payment_method)
    }

    async fn charge_saved_card(
        &self,
        email: &str,
        amount_pence: i64,
        description: &str,
    ) -> Result<ChargeOutcome, CoreError> {
        info!(
            "{:<12} --> 저장 카드 청구: {} ({}p)",
            "Payment", email, amount_pence
        );
        let url = format!("{}/charges", self.base_url);
        let body: ChargeResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "customer_email": email,
                "amount": amount_pence,
                "currency": "gbp",
                "description": description,
            }))
            .send()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| CoreError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        Ok(ChargeOutcome {
            status: body.status,
            charge_id: body.charge_id,
        })
    }
}
// endregion: --- REST Payment Client
