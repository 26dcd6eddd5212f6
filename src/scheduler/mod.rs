/// 롤오버 스케줄러
/// 주기적으로 QUEUED -> LIVE, LIVE -> 마감 전이를 수행한다.
/// 모든 전이가 상태 조건부라 실행이 겹쳐도 추가 전이는 일어나지 않는다.
// region:    --- Imports
use crate::gateway::PostgresStore;
use crate::listing::commands;
use crate::notify::{self, Notifier};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Rollover Scheduler
/// 롤오버 스케줄러
pub struct RolloverScheduler {
    store: Arc<PostgresStore>,
    notifier: Arc<dyn Notifier>,
}

impl RolloverScheduler {
    pub fn new(store: Arc<PostgresStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// 스케줄러 시작
    pub async fn start(&self) {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let period = std::env::var("ROLLOVER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(period));
            loop {
                interval.tick().await;
                match commands::rollover(&*store, Utc::now()).await {
                    Ok((report, notices)) => {
                        debug!(
                            "{:<12} --> 롤오버 실행: opened={}, sold={}, ended={}, withdrawn={}",
                            "Scheduler",
                            report.opened,
                            report.sold,
                            report.ended,
                            report.withdrawn
                        );
                        // 쓰기 확정 후 알림 디스패치 — 실패해도 전이는 유지된다
                        notify::dispatch_all(Arc::clone(&notifier), notices).await;
                    }
                    Err(e) => {
                        error!("{:<12} --> 롤오버 실행 중 오류 발생: {:?}", "Scheduler", e);
                    }
                }
            }
        });
    }
}
// endregion: --- Rollover Scheduler
