//! Greenhouse command-line dashboard
//!
//! Connects to a controller over WebSocket or MQTT, runs the pipeline and
//! logs every display update until interrupted.

use clap::{Parser, ValueEnum};
use env_logger::Env;
use greenhouse_connectors::{
    BackoffPolicy, DataProvider, MqttConfig, MqttProvider, WebSocketConfig, WebSocketProvider,
};
use greenhouse_core::constants::{
    DEFAULT_COALESCE_INTERVAL_MS, DEFAULT_HISTORY_INTERVAL_MS, DEFAULT_MAX_BUFFER,
    DEFAULT_MAX_EVENTS, DEFAULT_MAX_GAP_MS, DEFAULT_PROCESS_INTERVAL_MS, DEPLOYED_CO2_ALPHA,
    DEPLOYED_HUMIDITY_ALPHA, DEPLOYED_TEMPERATURE_ALPHA,
};
use greenhouse_core::{MemoryStore, RecordStore};
use greenhouse_engine::{ChannelAlphas, DisplayView, Engine, EngineConfig};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Transport {
    /// JSON frames over a WebSocket
    Ws,
    /// JSON payloads on an MQTT topic
    Mqtt,
}

/// Greenhouse telemetry pipeline
#[derive(Debug, Parser)]
#[command(name = "greenhouse", version = greenhouse_core::VERSION, about, long_about = None)]
struct Cli {
    /// Transport to the controller
    #[arg(long, value_enum, default_value = "ws")]
    transport: Transport,

    /// WebSocket base URL
    #[arg(long, default_value = "ws://localhost:8080")]
    url: String,

    /// WebSocket path appended to the URL
    #[arg(long, default_value = "/")]
    path: String,

    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    mqtt_host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    mqtt_port: u16,

    /// MQTT topic carrying telemetry
    #[arg(long, default_value = "greenhouse/telemetry")]
    mqtt_topic: String,

    /// MQTT client identifier
    #[arg(long, default_value = "greenhouse-dashboard")]
    mqtt_client_id: String,

    /// Process tick in milliseconds
    #[arg(long, default_value_t = DEFAULT_PROCESS_INTERVAL_MS)]
    process_ms: u64,

    /// Coalesce tick in milliseconds
    #[arg(long, default_value_t = DEFAULT_COALESCE_INTERVAL_MS)]
    coalesce_ms: u64,

    /// History tick in milliseconds
    #[arg(long, default_value_t = DEFAULT_HISTORY_INTERVAL_MS)]
    history_ms: u64,

    /// Largest tolerated spacing between samples in milliseconds
    #[arg(long, default_value_t = DEFAULT_MAX_GAP_MS)]
    max_gap_ms: u64,

    /// Ingestion buffer bound, 0 for unbounded
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER)]
    max_buffer: usize,

    /// Bound on the event lists
    #[arg(long, default_value_t = DEFAULT_MAX_EVENTS)]
    max_events: usize,

    /// EWMA factor for temperature
    #[arg(long, default_value_t = DEPLOYED_TEMPERATURE_ALPHA)]
    alpha_temperature: f64,

    /// EWMA factor for humidity
    #[arg(long, default_value_t = DEPLOYED_HUMIDITY_ALPHA)]
    alpha_humidity: f64,

    /// EWMA factor for CO2
    #[arg(long, default_value_t = DEPLOYED_CO2_ALPHA)]
    alpha_co2: f64,

    /// Longest reconnect delay in milliseconds
    #[arg(long, default_value_t = 8_000)]
    max_backoff_ms: u64,

    /// Print each display update as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .process_interval_ms(self.process_ms)
            .coalesce_interval_ms(self.coalesce_ms)
            .history_interval_ms(self.history_ms)
            .max_gap_ms(self.max_gap_ms)
            .max_buffer((self.max_buffer > 0).then_some(self.max_buffer))
            .max_events(self.max_events)
            .alphas(ChannelAlphas {
                temperature: self.alpha_temperature,
                humidity: self.alpha_humidity,
                co2: self.alpha_co2,
            })
    }

    fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::default().max_ms(self.max_backoff_ms)
    }
}

fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(level));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.transport {
        Transport::Ws => {
            let config = WebSocketConfig::new(cli.url.clone())
                .path(cli.path.clone())
                .backoff(cli.backoff());
            run(&cli, WebSocketProvider::new(config)?).await
        }
        Transport::Mqtt => {
            let config = MqttConfig::new(cli.mqtt_host.clone(), cli.mqtt_port)
                .client_id(cli.mqtt_client_id.clone())
                .topic(cli.mqtt_topic.clone())
                .backoff(cli.backoff());
            run(&cli, MqttProvider::new(config)?).await
        }
    }
}

async fn run<P>(cli: &Cli, provider: P) -> Result<(), Box<dyn std::error::Error>>
where
    P: DataProvider + 'static,
{
    let engine = Engine::spawn(cli.engine_config(), provider, MemoryStore::new())?;
    let mut views = engine.view();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, shutting down");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                show(&view, cli.json)?;
            }
        }
    }

    let (view, store) = engine.shutdown().await?;
    log::info!(
        "stored {} records, {} anomaly events, final state {}",
        store.len(),
        view.events.len(),
        view.connection_state
    );
    for record in store.recent(5).unwrap_or_default() {
        log::debug!(
            "recent: {} {:.1}°C {:.1}% {:.0}ppm",
            record.timestamp,
            record.temperature,
            record.humidity,
            record.co2
        );
    }
    Ok(())
}

fn show(view: &DisplayView, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(view)?);
        return Ok(());
    }

    match &view.coalesced_latest {
        Some(sample) => log::info!(
            "[{}] {:.1}°C {:.1}% {:.0}ppm at {} | events {} | reconnects {} | history {}",
            view.connection_state,
            sample.temperature,
            sample.humidity,
            sample.co2,
            sample.timestamp,
            view.events.len(),
            view.reconnect_count,
            view.history.len()
        ),
        None => log::info!(
            "[{}] waiting for data | reconnects {}",
            view.connection_state,
            view.reconnect_count
        ),
    }
    if let Some(event) = view.events.first() {
        log::debug!("latest anomaly: {}", event.message);
    }
    Ok(())
}
