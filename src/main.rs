mod auth_token;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod session;

use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use mongodb::Client;
use std::time::Duration;
use tokio::time;

use auth_token::AuthTokenService;
use config::AppConfig;
use db::models::Admin;
use db::MongoDbContext;
use error::Result;
use middleware::{auth_middleware, rate_limit_middleware, RateLimiter};
use session::SessionManager;

/// On first run: if no admin exists, create one from the environment.
async fn ensure_admin(db: &MongoDbContext, config: &AppConfig) -> Result<()> {
    if db.admins().count().await? > 0 {
        return Ok(());
    }

    let admin = if let Some(hash) = &config.admin_password_hash {
        Admin::with_hash(config.admin_username.clone(), hash.clone())
    } else if let Some(password) = &config.admin_password {
        Admin::new(config.admin_username.clone(), password)?
    } else {
        log::warn!(
            "No admin credentials provided! Set ADMIN_PASSWORD or ADMIN_PASSWORD_HASH env var."
        );
        return Ok(());
    };

    db.admins().insert(&admin).await?;
    log::info!("Admin user '{}' created", config.admin_username);
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if it exists (for development)
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting Bright Horizon tuition server...");

    let config = AppConfig::load_from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    log::info!("Connecting to MongoDB at {}...", config.mongo_uri);
    let client = Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to MongoDB");

    let db_context = MongoDbContext::new(client, &config.database_name);

    log::info!("Initializing database indexes...");
    db_context
        .init_indexes()
        .await
        .expect("Failed to initialize database indexes");

    ensure_admin(&db_context, &config)
        .await
        .expect("Failed to bootstrap admin account");

    let session_manager = SessionManager::new(config.session_expiry_hours);
    let rate_limiter = RateLimiter::new();
    let auth_tokens = AuthTokenService::new(
        config.secret_key.clone().into_bytes(),
        Duration::from_secs(config.session_expiry_hours * 3600),
    )
    .expect("SECRET_KEY is unusable for token signing");

    log::info!(
        "Session expiry set to {} hours",
        config.session_expiry_hours
    );

    // Spawn background cleanup tasks
    let session_manager_clone = session_manager.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = session_manager_clone.cleanup_expired();
            if removed > 0 {
                log::info!("Background cleanup: removed {} expired sessions", removed);
            }
        }
    });

    let rate_limiter_clone = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(300)); // Every 5 minutes
        loop {
            interval.tick().await;
            rate_limiter_clone.cleanup_old_entries();
            log::debug!("Background cleanup: cleaned rate limiter entries");
        }
    });

    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    log::info!("Starting HTTP server at {}:{}...", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(web::Data::new(db_context.clone()))
            .app_data(web::Data::new(session_manager.clone()))
            .app_data(web::Data::new(rate_limiter.clone()))
            .app_data(web::Data::new(auth_tokens.clone()))
            // Middleware
            .wrap(actix_middleware::Logger::default())
            .wrap(actix_middleware::Compress::default())
            // Public routes (no authentication required)
            .service(
                web::scope("")
                    .service(handlers::health_check)
                    .service(
                        web::scope("")
                            .wrap(actix_middleware::from_fn(rate_limit_middleware))
                            .service(handlers::login),
                    ),
            )
            // Protected routes (authentication required)
            .service(
                web::scope("")
                    .wrap(actix_middleware::from_fn(auth_middleware))
                    .service(handlers::logout)
                    .service(handlers::list_students)
                    .service(handlers::create_student)
                    .service(handlers::get_student)
                    .service(handlers::update_student)
                    .service(handlers::delete_student)
                    .service(handlers::list_fees)
                    .service(handlers::create_fee)
                    .service(handlers::get_fee)
                    .service(handlers::update_fee)
                    .service(handlers::delete_fee)
                    .service(handlers::stats_overview)
                    .service(handlers::stats_classes)
                    .service(handlers::stats_unpaid)
                    .service(handlers::stats_summary)
                    .service(handlers::list_logs),
            )
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
