use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use common::clock::SystemClock;
use common::config::ClubConfig;
use common::database::{DatabaseConfig, init_pool};

use attendance::realtime::SyncListener;
use attendance::reconciler::AttendanceReconciler;
use attendance::resolver::SessionResolver;
use attendance::routes;
use attendance::state::AppState;
use attendance::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting attendance service");

    // Club schedule configuration
    let club_config = ClubConfig::from_env()?;
    info!(
        "Club meets on {:?} at {} ({})",
        club_config.club_weekday, club_config.session_start, club_config.timezone_name
    );

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Store, change feed, and core components
    let store = Arc::new(PgStore::new(pool));
    let _change_listener = store.spawn_change_listener();

    let clock = Arc::new(SystemClock);
    let resolver = Arc::new(SessionResolver::new(
        store.clone(),
        clock.clone(),
        club_config,
    ));
    let reconciler = Arc::new(AttendanceReconciler::new(store.clone(), clock));

    let view = AppState::initial_view();
    let sync = SyncListener::new(store.clone(), view.clone()).spawn();

    let app_state = AppState::new(
        store.clone(),
        store,
        resolver,
        reconciler,
        view,
        sync.live(),
    );

    // Resolve today's session up front so the view is live immediately
    match app_state.active_session().await {
        Ok(session) => info!(
            "Active session {} for {}",
            session.id, session.session_date
        ),
        Err(e) => warn!("Could not resolve session at startup: {}", e),
    }

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3002").await?;
    info!("Attendance service listening on 0.0.0.0:3002");

    axum::serve(listener, app).await?;

    Ok(())
}
