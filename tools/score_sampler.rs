//! Patient Score Sampler
//!
//! Generates synthetic patient records and scores them in-process against
//! the configured model artifacts. Useful for eyeballing how a freshly
//! exported forest spreads its probabilities across risk tiers.
//!
//! Usage: `score_sampler [count] [high_risk_rate]`

use anyhow::Context;
use cancer_risk_inference::{
    config::AppConfig, metrics::ServiceMetrics, models::inference::InferenceEngine,
    types::RiskTier, PatientRecord,
};
use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

/// Patient generator for sampling
struct PatientGenerator {
    rng: rand::rngs::ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a typical patient
    fn generate_typical(&mut self) -> PatientRecord {
        PatientRecord {
            age: self.rng.gen_range(20..60),
            gender: self.rng.gen_range(0..=1),
            bmi: self.rng.gen_range(18.5..27.0),
            smoking: i64::from(self.rng.gen_bool(0.15)),
            genetic_risk: self.rng.gen_range(0..=1),
            physical_activity: self.rng.gen_range(3.0..10.0),
            alcohol_intake: self.rng.gen_range(0.0..2.5),
            cancer_history: 0,
        }
    }

    /// Generate a patient with several risk factors present
    fn generate_high_risk(&mut self) -> PatientRecord {
        PatientRecord {
            age: self.rng.gen_range(55..80),
            gender: self.rng.gen_range(0..=1),
            bmi: self.rng.gen_range(28.0..40.0), // Obese range
            smoking: 1,
            genetic_risk: 2,
            physical_activity: self.rng.gen_range(0.0..2.0),
            alcohol_intake: self.rng.gen_range(3.0..5.0),
            cancer_history: i64::from(self.rng.gen_bool(0.6)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("score_sampler=info".parse()?)
                .add_directive("cancer_risk_inference=warn".parse()?),
        )
        .init();

    info!("Starting Patient Score Sampler");

    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let high_risk_rate: f64 = args
        .get(2)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| rate.is_finite())
        .unwrap_or(0.2)
        .clamp(0.0, 1.0);

    let config = AppConfig::load()?;
    let engine = InferenceEngine::new(&config).context("Failed to load model artifacts")?;
    info!(
        count = count,
        high_risk_rate = high_risk_rate,
        variant = %engine.variant(),
        trees = engine.tree_count(),
        "Configuration loaded"
    );

    let metrics = ServiceMetrics::new();
    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();
    let mut typical_count = 0;
    let mut high_risk_count = 0;

    for i in 0..count {
        let record = if rng.gen_bool(high_risk_rate) {
            high_risk_count += 1;
            generator.generate_high_risk()
        } else {
            typical_count += 1;
            generator.generate_typical()
        };

        let raw = serde_json::to_value(record)?;
        let start = Instant::now();
        match engine.infer(&raw) {
            Ok(prediction) => {
                let tier =
                    RiskTier::from_probability(prediction.result.probability, &config.detection.risk_tiers);
                metrics.record_prediction(start.elapsed(), &prediction.result, tier);

                if i == 0 || (i + 1) % 25 == 0 {
                    info!(
                        "Sample patient {} ({} / p={:.3}):\n{}",
                        i + 1,
                        tier.as_str(),
                        prediction.result.probability,
                        serde_json::to_string_pretty(&raw)?
                    );
                }
            }
            Err(e) => {
                metrics.record_validation_failure();
                warn!(error = %e, "Generated record was rejected");
            }
        }
    }

    info!(
        "Completed! Scored {} patients ({} typical, {} high-risk)",
        count, typical_count, high_risk_count
    );
    metrics.print_summary();

    Ok(())
}
