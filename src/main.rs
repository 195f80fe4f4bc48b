use std::{future::IntoFuture, process, sync::Arc};

use recipebox::{
    application::{
        error::AppError,
        ingredients::IngredientCatalogService,
        recipes::{ExpansionSettings, RecipeCatalogService},
    },
    cache::CatalogCaches,
    config,
    hub::{Hub, HubConfig},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use sqlx::PgPool;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_database(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(target = "recipebox::migrate", "database migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_database(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let caches = Arc::new(CatalogCaches::new());
    let ingredients = Arc::new(IngredientCatalogService::new(
        repositories.clone(),
        repositories.clone(),
        caches.clone(),
    ));
    let recipes = Arc::new(RecipeCatalogService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        caches,
        ExpansionSettings::from(&settings.aggregation),
    ));

    let (hub, hub_workers) = Hub::new(HubConfig::from(&settings.realtime));
    let hub_handle = tokio::spawn(hub_workers.run());

    let state = ApiState {
        ingredients,
        recipes,
        hub,
        health: repositories,
    };

    let result = serve_http(&settings, state).await;

    hub_handle.abort();
    let _ = hub_handle.await;

    result
}

async fn connect_database(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::from)?;
    Ok(pool)
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state, &settings.cors);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "recipebox::http",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = {
        let shutdown = Arc::clone(&shutdown);
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.notified().await })
    };
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        _ = shutdown_signal() => {}
    }

    info!(
        target = "recipebox::http",
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested, draining connections"
    );
    shutdown.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "recipebox::http",
                "graceful shutdown window elapsed, closing remaining connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(InfraError::from(err).into()),
        Err(err) => Err(InfraError::server(err.to_string()).into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
