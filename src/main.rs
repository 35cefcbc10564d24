use std::{process, sync::Arc};

use cloudflare_purge::{
    config::{self, HostSettings, PurgeArgs},
    domain::{CorrelationId, PurgeRequest, PurgeScope},
    error::AppError,
    host::{CollectionConfig, GlobalConfig, HostConfig},
    infra::{
        error::InfraError,
        http::{self, ServerState, SessionAuthenticator},
        telemetry,
    },
    purge::{CloudflareExecutor, CloudflarePurgePlugin, PurgeConfig, PurgeExecutor, PluginError},
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Purge(args) => run_purge(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let plugin = CloudflarePurgePlugin::from_options(settings.purge.clone())?;
    let host = plugin.apply(host_from_settings(&settings.host));
    host.run_init().await?;

    info!(
        collections = host.collections.len(),
        globals = host.globals.len(),
        endpoints = host.endpoints.len(),
        purge_enabled = plugin.config().enabled,
        "Host configured"
    );

    let state = ServerState {
        host: Arc::new(host),
        auth: SessionAuthenticator::from_settings(&settings.auth),
        admin: plugin.admin_control(),
    };
    let router = http::build_router(state);

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "Listening");

    http::serve(listener, router, settings.server.graceful_shutdown).await?;
    Ok(())
}

async fn run_purge(settings: config::Settings, args: PurgeArgs) -> Result<(), AppError> {
    let config = PurgeConfig::resolve(settings.purge)?;
    let executor = CloudflareExecutor::new(config.api_base.clone()).map_err(PluginError::from)?;

    let scope = PurgeScope::from_parts(Some(args.urls), args.everything);
    if scope.is_empty() {
        return Err(AppError::validation("no URLs given; pass URLs or --everything"));
    }

    let request = PurgeRequest::new(scope, CorrelationId::generate());
    let result = executor
        .execute(&request, config.credentials.as_ref(), config.log_options())
        .await?;
    if result.is_skipped() {
        return Err(AppError::validation(format!(
            "Cloudflare credentials are not configured (id: {})",
            result.correlation_id
        )));
    }

    let summary = json!({
        "success": result.succeeded,
        "correlationId": result.correlation_id,
        "status": result.http_status,
        "purgeEverything": request.scope().is_everything(),
        "filesPurged": request.scope().file_count(),
        "executionTime": format!("{}ms", result.elapsed_ms()),
    });
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn host_from_settings(settings: &HostSettings) -> HostConfig {
    HostConfig {
        collections: settings
            .collections
            .iter()
            .map(|target| CollectionConfig::new(&target.slug).with_drafts(target.drafts))
            .collect(),
        globals: settings
            .globals
            .iter()
            .map(|target| GlobalConfig::new(&target.slug).with_drafts(target.drafts))
            .collect(),
        ..HostConfig::default()
    }
}
