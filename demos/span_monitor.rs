// ABOUTME: Long-running manager client example that watches GSM spans and PBX events
// ABOUTME: Shows event subscription, periodic span polling and clean shutdown on timeout or disconnect

//! # Span Monitor
//!
//! Logs in once, then for the configured run duration:
//!
//! * Polls `gsm show spans` and logs every span whose status changed
//! * Logs every event the PBX pushes
//! * Stops early when the PBX closes the connection
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example span_monitor -- --username admin --secret secret
//!
//! # Poll every 10 seconds for an hour
//! cargo run --example span_monitor -- \
//!   --username admin --secret secret \
//!   --poll-interval 10 --run-duration 3600
//! ```

use argh::FromArgs;
use ami_gsm::client::{
    AmiConnection, ClientBuilder, ClientConfig, Credentials, GsmGateway, Span,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, sleep};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Long-running manager client watching GSM spans
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the manager username
    #[argh(option, short = 'u')]
    username: Option<String>,

    /// the manager secret
    #[argh(option, short = 's')]
    secret: Option<String>,

    /// the hostname of IP address of the PBX (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the manager port of the PBX (default: 5038)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// span polling interval in seconds (default: 30)
    #[argh(option)]
    poll_interval: Option<u64>,

    /// per-command timeout in seconds (default: 15)
    #[argh(option)]
    command_timeout: Option<u64>,

    /// how long to run the client in seconds (default: 300, i.e., 5 minutes)
    #[argh(option)]
    run_duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(5038);
    let credentials = Credentials::new(
        cli_args.username.unwrap_or_default(),
        cli_args.secret.unwrap_or_default(),
    );
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let poll_interval = Duration::from_secs(cli_args.poll_interval.unwrap_or(30));

    let mut config = ClientConfig::default();
    if let Some(timeout) = cli_args.command_timeout {
        config = config.with_command_timeout(Duration::from_secs(timeout));
    }

    info!("Starting span monitor");
    info!("Connecting to {host}:{port}");
    info!("Will run for {} seconds", run_duration.as_secs());

    let client = ClientBuilder::authenticated(format!("{host}:{port}"), credentials, config)
        .await
        .map_err(|e| {
            error!("Connection/login failed: {e}");
            Box::<dyn Error>::from(e.to_string())
        })?;

    info!("Connected and logged in");

    let mut events = client.subscribe();
    let mut poll_timer = interval(poll_interval);
    let mut known: BTreeMap<String, Span> = BTreeMap::new();

    let start_time = std::time::Instant::now();
    let mut event_count = 0u64;

    loop {
        tokio::select! {
            _ = sleep(run_duration.saturating_sub(start_time.elapsed())) => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            _ = poll_timer.tick() => {
                if !client.is_connected() {
                    error!("Connection to PBX lost");
                    break;
                }

                match client.gsm_show_spans().await {
                    Ok(spans) => {
                        for (id, span) in &spans {
                            if known.get(id) != Some(span) {
                                info!(
                                    span = %id,
                                    power = %span.power_status,
                                    provisioned = %span.provisioned,
                                    card = %span.card_status,
                                    active = span.is_active,
                                    "Span status"
                                );
                            }
                        }
                        for id in known.keys().filter(|id| !spans.contains_key(*id)) {
                            warn!(span = %id, "Span disappeared");
                        }
                        known = spans;
                    }
                    Err(e) => warn!("Span poll failed: {e}"),
                }
            }

            received = events.recv() => {
                match received {
                    Ok(event) => {
                        event_count += 1;
                        debug!(raw = %event.raw, "Event received");
                        info!(kind = %event.kind, "PBX event");
                    }
                    Err(RecvError::Lagged(missed)) => warn!(missed, "Event subscriber fell behind"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Shutting down client");

    if let Err(e) = client.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    info!("  Spans known at exit: {}", known.len());
    info!("  Events received: {}", event_count);

    let uptime = start_time.elapsed();
    info!("Client ran for {:.1} seconds", uptime.as_secs_f64());

    Ok(())
}
