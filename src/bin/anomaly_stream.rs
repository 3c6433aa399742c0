//! Streams simulated MQTT sensor messages through the detector.
//!
//! A few rooms report temperatures around 23 °C; once the model has seen enough of them one
//! room reports 95 °C. Every message is encoded, scored and logged, and the scorer's metrics
//! are printed at the end.
//!
//! Pass a JSON config path as the first argument to override the defaults. The log level is
//! taken from `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use htm_anomaly::{
    encoders::{Encoder, MqttEncoder},
    DetectorConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const ROOMS: [&str; 3] = ["room1", "room2", "room3"];
const TRAINING_MESSAGES: usize = 300;

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            DetectorConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => DetectorConfig::default(),
    };

    let mut encoder = MqttEncoder::new(config.spatial_pooler.input_size, 100.0)?;
    let mut scorer = config.build()?;
    scorer.set_threshold(0.6);

    info!(
        inputs = encoder.width(),
        columns = config.spatial_pooler.column_count,
        cells_per_column = config.temporal_memory.cells_per_column,
        threshold = scorer.threshold(),
        "detector ready"
    );

    let mut rng = StdRng::seed_from_u64(7);
    let mut messages: Vec<(String, String)> = (0..TRAINING_MESSAGES)
        .map(|i| {
            let room = ROOMS[i % ROOMS.len()];
            let value = 23.0 + rng.random_range(-0.5..0.5);
            (
                format!("sensor/temperature/{room}"),
                format!(r#"{{"value": {value:.1}, "unit": "celsius"}}"#),
            )
        })
        .collect();
    messages.push((
        "sensor/temperature/room2".to_owned(),
        r#"{"value": 95.0, "unit": "celsius"}"#.to_owned(),
    ));

    for (i, (topic, payload)) in messages.iter().enumerate() {
        let input = encoder.encode_message_with_topic(topic, payload);
        let score = scorer.compute_anomaly(&input, true);

        if scorer.is_anomalous(score) && i >= TRAINING_MESSAGES / 2 {
            warn!(seq = i + 1, topic = %topic, payload = %payload, score, "anomaly");
        } else if i + 1 == messages.len() || (i + 1) % 50 == 0 {
            info!(seq = i + 1, topic = %topic, score, "scored");
        }
    }

    let metrics = scorer.metrics();
    info!(
        throughput = metrics.throughput,
        average_anomaly = metrics.average_anomaly,
        anomaly_rate = metrics.anomaly_rate,
        history_size = metrics.history_size,
        fields = encoder.field_count(),
        "done"
    );
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
