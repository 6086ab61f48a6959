mod config;
mod domain;
mod infrastructure;
mod presentation;
mod telemetry;
mod usecase;

use axum::{Router, routing::get};
use sea_orm::{ConnectOptions, Database};
use tokio::net::TcpListener;

use crate::{
    config::Config,
    domain::{repositories::user_store::UserStore, services::event_publisher::EventPublisher},
    infrastructure::{
        in_memory_event_bus::InMemoryEventBus, in_memory_user_store::InMemoryUserStore,
        sea_orm_user_store::SeaOrmUserStore, uuid_id_generator::UuidIdGenerator,
    },
    presentation::{
        handlers::user_handler::create_user_router,
        subscribers::registration_subscriber::RegistrationSubscriber,
    },
    usecase::{
        process_registration_usecase::ProcessRegistrationUsecase,
        register_user_usecase::RegisterUserUsecase,
    },
};

// name of the in-process topic when none is configured; nothing is published to it
const UNCONFIGURED_TOPIC: &str = "unconfigured";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);

    match config.database_url.clone() {
        Some(url) => {
            let mut opt = ConnectOptions::new(url);
            opt.max_connections(10)
                .min_connections(1)
                .sqlx_logging(true);

            let db = Database::connect(opt).await?;
            let store = SeaOrmUserStore::new(db, config.users_table.clone());
            if let Err(e) = store.ensure_schema().await {
                tracing::warn!(error = %e, "Users table is not ready");
            }
            serve(config, store).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, users are kept in memory");
            serve(config, InMemoryUserStore::new()).await
        }
    }
}

async fn serve<S: UserStore + 'static>(
    config: Config,
    user_store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let topic = match config.registration_topic.clone() {
        Some(topic) => topic,
        None => {
            tracing::warn!("USER_REGISTRATION_TOPIC is not set, registrations will be rejected");
            UNCONFIGURED_TOPIC.to_string()
        }
    };

    let (bus, subscription) = InMemoryEventBus::channel(topic, config.max_deliveries);
    let subscriber = RegistrationSubscriber::new(
        ProcessRegistrationUsecase::new(user_store, UuidIdGenerator::new()),
        subscription,
        config.max_batch_size,
    );
    let consumer = tokio::spawn(subscriber.run());

    let register_user_usecase = RegisterUserUsecase::new(bus, config.registration_topic.clone());
    let app = create_app(register_user_usecase);

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "Listening for registration requests");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the router held the last publisher, so the consumer drains and stops
    let subscription = consumer.await?;
    tracing::info!(
        dead_letters = subscription.dead_letters().len(),
        "Shut down"
    );

    Ok(())
}

fn create_app<P: EventPublisher + 'static>(register_user_usecase: RegisterUserUsecase<P>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/users", create_user_router(register_user_usecase))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
