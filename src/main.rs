mod capabilities;
mod cli;
mod config;
mod host_context;
mod logging;
mod monitor;
mod notify;
mod system;

use std::future::Future;
use std::process::ExitCode;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::Duration;

use crate::capabilities::Capabilities;
use crate::cli::Cli;
use crate::config::{Config, ConfigError, LoggingConfig, load_config};
use crate::host_context::{HostContextCollector, hostname};
use crate::monitor::{
    DecisionPolicy, JsonFileStore, Scheduler, SchedulerSettings, ServiceStatus, SystemctlProbe,
};
use crate::notify::ActiveNotifier;

const EXIT_UNHEALTHY: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.dry_run {
        config.monitor.dry_run = true;
    }
    Ok(config)
}

fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => log::info!("shutdown_signal_received signal=SIGINT"),
            _ = terminate.recv() => log::info!("shutdown_signal_received signal=SIGTERM"),
        }
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let resolved = resolve_config(&cli);

    let level = match (&resolved, cli.debug) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    let logging = resolved
        .as_ref()
        .map_or_else(|_| LoggingConfig::default(), |config| config.logging.clone());
    logging::init_logging(&level, &logging);

    let config = match resolved {
        Ok(config) => config,
        Err(error) => {
            log::error!("config_invalid error={}", error);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if cli.config.is_none() {
        log::warn!("config_file_absent source=environment_and_defaults");
    }

    let monitor = &config.monitor;
    log::info!(
        "svcwatch_starting version={} service={} mode={} dry_run={} interval_secs={} cooldown_secs={}",
        env!("CARGO_PKG_VERSION"),
        monitor.service_name,
        if cli.once { "once" } else { "continuous" },
        monitor.dry_run,
        monitor.check_interval_secs,
        monitor.alert_cooldown_secs
    );

    let capabilities = Capabilities::detect(&config.notify.email.sendmail_path);
    capabilities.log_warnings(config.notify.email.enabled && !monitor.dry_run);

    let notifier = match ActiveNotifier::from_config(&config.notify, monitor.dry_run) {
        Ok(notifier) => notifier,
        Err(error) => {
            log::error!("config_invalid error={}", error);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    log::info!(
        "notification_channels channels={:?} dry_run={}",
        notifier.channel_names(),
        notifier.is_dry_run()
    );

    let settings = SchedulerSettings {
        service: monitor.service_name.clone(),
        check_interval: Duration::from_secs(monitor.check_interval_secs),
        probe_timeout: Duration::from_secs(monitor.probe_timeout_secs),
        notify_timeout: Duration::from_secs(config.notify.delivery_budget_secs()),
        policy: DecisionPolicy {
            unknown_escalation_after: monitor.unknown_escalation_after,
            ..DecisionPolicy::with_cooldown(monitor.alert_cooldown_secs)
        },
    };
    let collector = HostContextCollector::new(
        config.notify.include_metrics,
        config.notify.log_lines,
        monitor.probe_timeout_secs,
    );
    let mut scheduler = Scheduler::new(
        settings,
        SystemctlProbe::new(monitor.probe_timeout_secs),
        JsonFileStore::new(&monitor.state_file),
        notifier,
        collector,
        hostname(),
    );

    if cli.once {
        return match scheduler.run_once().await {
            ServiceStatus::Up => ExitCode::SUCCESS,
            status => {
                log::warn!(
                    "service_unhealthy service={} status={}",
                    monitor.service_name,
                    status
                );
                ExitCode::from(EXIT_UNHEALTHY)
            }
        };
    }

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(error) => {
            log::error!("signal_handler_failed error={}", error);
            return ExitCode::FAILURE;
        }
    };
    scheduler.run_until(shutdown).await;
    ExitCode::SUCCESS
}
