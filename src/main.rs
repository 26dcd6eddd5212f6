// region:    --- Imports
use crate::gateway::PostgresStore;
use crate::notify::{MailRelayNotifier, Notifier};
use crate::payment::RestPaymentClient;
use crate::scheduler::RolloverScheduler;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod error;
mod gateway;
mod handlers;
mod listing;
mod notify;
mod payment;
mod policy;
mod scheduler;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 영속성 게이트웨이 생성 — 프로세스 시작 시 한 번 만들어 주입한다
    let store = Arc::new(PostgresStore::new().await);

    // 스키마 초기화
    if let Err(e) = store.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 외부 협력자 클라이언트 생성
    let payment_client = Arc::new(RestPaymentClient::new());
    let notifier = Arc::new(MailRelayNotifier::new());

    // 롤오버 스케줄러 시작
    let scheduler = RolloverScheduler::new(
        Arc::clone(&store),
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );
    scheduler.start().await;

    // 관리 화면을 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route(
            "/listings",
            post(handlers::handle_submit_listing).get(handlers::handle_get_listings),
        )
        .route("/listings/:id", get(handlers::handle_get_listing))
        .route("/listings/:id/bids", get(handlers::handle_get_listing_bids))
        .route("/listings/:id/approve", post(handlers::handle_approve))
        .route("/listings/:id/reject", post(handlers::handle_reject))
        .route("/listings/:id/withdraw", post(handlers::handle_withdraw))
        .route("/listings/:id/relist", post(handlers::handle_relist))
        .route("/bid", post(handlers::handle_bid))
        .route("/buy-now", post(handlers::handle_buy_now))
        .route("/transactions/:id", get(handlers::handle_get_transaction))
        .route(
            "/transactions/:id/pay",
            post(handlers::handle_pay_transaction),
        )
        .route(
            "/transactions/:id/delete",
            post(handlers::handle_delete_transaction),
        )
        .route("/admin/rollover", post(handlers::handle_rollover))
        .route("/admin/repair", post(handlers::handle_repair))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state((store, payment_client, notifier));

    // 리스너 생성(3000번 포트)
    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr().unwrap()
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
