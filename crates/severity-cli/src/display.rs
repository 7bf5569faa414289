//! Terminal cards for prediction results and service reports.

use severity_core::{
    BatchOutcome, ExplorationResponse, FieldError, HealthStatus, ModelMetrics, PredictionResult,
    RetrainAck, StreamEventKind, StreamMessage, Tier, format_percentage, format_percentage_with,
};

const TOP_FEATURES: usize = 10;

// ── Prediction ──

/// Print a prediction as a card: outcome, distribution, advisories, metadata.
pub fn print_prediction_card(result: &PredictionResult) {
    let tier = Tier::from(result.predicted_severity);

    println!("=== Prediction Result ===");
    println!(
        "  {:<22} {} [{} / {}]",
        "predicted severity",
        result.predicted_severity,
        tier,
        tier.color()
    );
    println!(
        "  {:<22} {} {}",
        "confidence",
        format_percentage(result.confidence_score),
        bar(result.confidence_score)
    );
    println!();

    println!("Probability Breakdown");
    for (severity, p) in &result.probabilities {
        println!("  {:<22} {}", severity.as_str(), format_percentage(*p));
    }
    println!();

    print_list(
        "Risk Factors Identified",
        &result.risk_factors,
        "No significant risk factors identified",
    );
    print_list(
        "Safety Recommendations",
        &result.recommendations,
        "No specific recommendations at this time",
    );

    println!("Metadata");
    println!("  {:<22} {}", "prediction id", result.prediction_id);
    println!("  {:<22} {}", "model version", result.model_version);
    match result.created_at() {
        Some(ts) => println!("  {:<22} {}", "timestamp", ts.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  {:<22} {}", "timestamp", result.timestamp),
    }
}

/// One-line form used for batch rows and streamed events.
pub fn prediction_line(result: &PredictionResult) -> String {
    format!(
        "{:<38} {:<9} {:<7} {:>6}",
        result.prediction_id,
        result.predicted_severity.as_str(),
        Tier::from(result.predicted_severity).as_str(),
        format_percentage(result.confidence_score)
    )
}

pub fn print_batch(outcome: &BatchOutcome) {
    println!("=== Batch {} ===", outcome.batch_id);
    println!(
        "  {} predictions in {:.3}s",
        outcome.total_count, outcome.processing_time_seconds
    );
    println!();
    for (idx, result) in outcome.results.iter().enumerate() {
        println!("  [{idx:>3}] {}", prediction_line(result));
    }
}

fn print_list(header: &str, items: &[String], empty: &str) {
    println!("{header}");
    if items.is_empty() {
        println!("  {empty}");
    }
    for item in items {
        println!("  - {item}");
    }
    println!();
}

fn bar(fraction: f64) -> String {
    const WIDTH: usize = 20;
    let filled = (fraction.clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH - filled))
}

// ── Validation ──

pub fn print_field_errors(errors: &[FieldError]) {
    eprintln!("Scenario rejected:");
    for e in errors {
        eprintln!("  {:<30} {}", e.field, e.message);
    }
}

// ── Service reports ──

pub fn print_metrics(metrics: &ModelMetrics) {
    println!("=== Model {} ===", metrics.model_version);
    println!(
        "  {:<22} {}",
        "accuracy",
        format_percentage(metrics.accuracy)
    );
    match metrics.last_updated_at() {
        Some(ts) => println!("  {:<22} {}", "last updated", ts.format("%Y-%m-%d %H:%M UTC")),
        None => println!("  {:<22} {}", "last updated", metrics.last_updated),
    }
    println!();

    println!("Per-class");
    println!(
        "  {:<14} {:>10} {:>10} {:>10}",
        "class", "precision", "recall", "f1"
    );
    for (class, precision) in &metrics.precision {
        let cell = |m: &std::collections::BTreeMap<String, f64>| {
            m.get(class)
                .map(|v| format_percentage(*v))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<14} {:>10} {:>10} {:>10}",
            class,
            format_percentage(*precision),
            cell(&metrics.recall),
            cell(&metrics.f1_score)
        );
    }
    println!();

    if !metrics.confusion_matrix.is_empty() {
        println!("Confusion Matrix");
        for row in &metrics.confusion_matrix {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>6}")).collect();
            println!("  {}", cells.join(""));
        }
        println!();
    }

    let top = metrics.top_features(TOP_FEATURES);
    if !top.is_empty() {
        println!("Feature Importance");
        for (name, weight) in top {
            println!("  {:<30} {}", name, format_percentage_with(weight, 2));
        }
    }
}

pub fn print_health(health: &HealthStatus) {
    let marker = if health.is_healthy() { "ok" } else { "DEGRADED" };
    println!("=== Service Health: {marker} ===");
    println!("  {:<22} {}", "status", health.status);
    println!("  {:<22} {}", "ml service", health.ml_service);
    println!("  {:<22} {}", "version", health.version);
    println!("  {:<22} {}", "timestamp", health.timestamp);
}

pub fn print_retrain(ack: &RetrainAck) {
    println!("{} ({})", ack.message, ack.status);
}

pub fn print_exploration(resp: &ExplorationResponse) {
    println!("Statistics");
    for (key, value) in &resp.statistics {
        println!("  {:<22} {}", key, value);
    }
    println!();
    print_list("Insights", &resp.insights, "No insights reported");
}

/// Render a pushed stream message as one line.
pub fn stream_line(message: &StreamMessage) -> String {
    match message.kind {
        StreamEventKind::Prediction => match message.prediction() {
            Some(Ok(result)) => format!("prediction    {}", prediction_line(&result)),
            Some(Err(e)) => format!("prediction    <unreadable: {e}>"),
            None => "prediction    <no data>".to_string(),
        },
        StreamEventKind::Error => format!(
            "error         {}",
            message.message.as_deref().unwrap_or("unspecified error")
        ),
        kind => format!(
            "{:<13} {}",
            kind.as_str(),
            message
                .data
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default()
        ),
    }
}
