//! Human-readable reports.

use colored::Colorize;
use guard_anonymize::{PipelineTrace, PlaceholderTable};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Risk")]
    risk: u8,
    #[tabled(rename = "Masked as")]
    masked_as: String,
}

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Weight")]
    base: u8,
    #[tabled(rename = "Adjusted")]
    adjusted: u8,
    #[tabled(rename = "Features")]
    features: String,
}

#[derive(Tabled)]
struct PlaceholderRow {
    #[tabled(rename = "Entity type")]
    entity_type: String,
    #[tabled(rename = "Placeholder")]
    placeholder: String,
}

/// Prints the original and masked text, counts and the substitution log.
pub fn print_analysis(trace: &PipelineTrace) {
    let result = &trace.result;
    let stats = trace.stats();

    println!("{}", "De-identification result".bold().underline());
    println!("{}: {}", "Original".bold(), result.original_text);
    println!("{}: {}", "Masked".bold(), result.masked_text.green());
    println!(
        "{}: {}/{} entities masked (threshold {}, {} ms)",
        "Stats".bold(),
        result.masked_entity_count,
        result.total_entity_count,
        trace.threshold,
        stats.processing_time_ms,
    );

    let source = result.model_source.to_string();
    if result.model_source.is_degraded() {
        println!("{}: {}", "Annotator".bold(), source.yellow());
    } else {
        println!("{}: {}", "Annotator".bold(), source);
    }

    if result.audit_log.is_empty() {
        println!();
        super::success("No high-risk entities to mask");
        return;
    }

    println!("{}: {:.1}", "Average risk".bold(), stats.avg_risk);
    println!();

    let rows = result
        .audit_log
        .iter()
        .enumerate()
        .map(|(i, entry)| AuditRow {
            index: i + 1,
            token: entry.token.clone(),
            label: entry.entity_label.to_string(),
            risk: entry.risk_weight.value(),
            masked_as: entry.placeholder.clone(),
        });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Prints per-entity weights before and after contextual adjustment.
pub fn print_stages(trace: &PipelineTrace) {
    println!("{}", "Risk weights".bold().underline());

    if let Some(context) = &trace.context {
        println!(
            "Context: combination ×{:.1}, keywords ×{:.1} {:?}",
            context.combination_multiplier, context.keyword_multiplier, context.keywords_found,
        );
    } else {
        println!("Context: {}", "disabled".dimmed());
    }

    let rows: Vec<StageRow> = trace
        .base_weights
        .iter()
        .zip(&trace.final_weights)
        .filter(|(base, _)| !base.is_outside())
        .map(|(base, adjusted)| StageRow {
            token: base.token.clone(),
            label: base.entity_label.to_string(),
            category: base.category.to_string(),
            base: base.weight.value(),
            adjusted: adjusted.weight.value(),
            features: base.dependency_feature_key.clone().unwrap_or_default(),
        })
        .collect();

    if rows.is_empty() {
        println!("{}", "No entities found.".dimmed());
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    println!();
}

/// Prints the entity type → placeholder mapping.
pub fn print_placeholders(placeholders: &PlaceholderTable) {
    let rows = placeholders
        .entries()
        .into_iter()
        .map(|(entity_type, placeholder)| PlaceholderRow {
            entity_type: entity_type.to_string(),
            placeholder: placeholder.to_string(),
        });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("Any other type: {}", placeholders.fallback());
}
