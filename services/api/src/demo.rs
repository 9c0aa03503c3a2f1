use crate::infra::{engine_config, parse_chaining_mode, parse_conflict_strategy};
use clap::Args;
use loan_expert::config::AppConfig;
use loan_expert::dataset::{ApplicantDataset, DatasetFile};
use loan_expert::error::AppError;
use loan_expert::inference::{
    ApplicantSubmission, BatchEvaluation, ChainOutcome, ChainingMode, ConflictStrategy,
    EvaluationResult, RuleBaseStatistics, RuleEngine, RuleSummary, Statistics, Trace,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

const REFERENCE_APPLICANTS: &str = include_str!("../../../data/applicants.json");

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct EngineArgs {
    /// Chaining mode: forward, backward or both (defaults to LOAN_CHAINING_MODE)
    #[arg(long, value_parser = parse_chaining_mode)]
    pub(crate) mode: Option<ChainingMode>,
    /// Conflict strategy: priority_specificity or specificity_priority
    #[arg(long, value_parser = parse_conflict_strategy)]
    pub(crate) strategy: Option<ConflictStrategy>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Identifier echoed back in the result
    #[arg(long = "id", default_value = "CLI")]
    pub(crate) applicant_id: String,
    #[arg(long)]
    pub(crate) income: u64,
    #[arg(long)]
    pub(crate) credit_score: u16,
    /// Employed, Self-Employed, Unemployed or Retired
    #[arg(long)]
    pub(crate) employment_status: String,
    /// Years in the current employment
    #[arg(long)]
    pub(crate) employment_duration: f64,
    #[arg(long)]
    pub(crate) age: u8,
    #[arg(long, default_value_t = 0)]
    pub(crate) dependents: u32,
    /// None, Low, Medium or High
    #[arg(long, default_value = "None")]
    pub(crate) existing_debt: String,
    /// Print the forward and backward reasoning traces
    #[arg(long)]
    pub(crate) traces: bool,
    /// Print the full result as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// JSON (`{"applicants": [...]}` or a bare array) or CSV file
    pub(crate) path: PathBuf,
    /// Read the file as CSV regardless of its extension
    #[arg(long)]
    pub(crate) csv: bool,
    /// Print every reasoning trace
    #[arg(long)]
    pub(crate) traces: bool,
    /// Print results, errors and statistics as JSON
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RulesArgs {
    /// Print the catalogue as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the per-chain traces and show decisions only
    #[arg(long)]
    pub(crate) brief: bool,
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
}

#[derive(Serialize)]
struct BatchReport<'a> {
    results: Vec<&'a EvaluationResult>,
    errors: Vec<ItemError>,
    statistics: &'a Statistics,
}

#[derive(Serialize)]
struct ItemError {
    index: usize,
    applicant_id: Option<String>,
    error: String,
}

fn build_engine(args: &EngineArgs) -> Result<RuleEngine, AppError> {
    let base = AppConfig::load()?.engine;
    Ok(RuleEngine::new(engine_config(base, args.mode, args.strategy)))
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let engine = build_engine(&args.engine)?;
    let submission = ApplicantSubmission {
        applicant_id: Some(args.applicant_id),
        income: Some(Value::from(args.income)),
        credit_score: Some(Value::from(args.credit_score)),
        employment_status: Some(Value::from(args.employment_status)),
        employment_duration: Some(Value::from(args.employment_duration)),
        age: Some(Value::from(args.age)),
        dependents: Some(Value::from(args.dependents)),
        existing_debt: Some(Value::from(args.existing_debt)),
    };

    let result = engine.evaluate(&submission)?;
    if args.json {
        println!("{}", to_json(&result)?);
    } else {
        print!("{}", format_result(&result, args.traces));
    }
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let engine = build_engine(&args.engine)?;
    let dataset = if args.csv {
        ApplicantDataset::from_csv_path(&args.path)?
    } else {
        DatasetFile::new(args.path.clone()).load()?
    };

    let batch = engine.evaluate_all(dataset.applicants());
    if args.json {
        println!("{}", to_json(&batch_report(&batch, dataset.applicants()))?);
        return Ok(());
    }

    println!(
        "Evaluated {} applicant(s) from {}",
        dataset.len(),
        args.path.display()
    );
    if args.traces {
        for result in batch.successes() {
            print!("\n{}", format_result(result, true));
        }
        println!();
    }
    print!("{}", format_batch(&batch, dataset.applicants()));
    Ok(())
}

pub(crate) fn run_rules(args: RulesArgs) -> Result<(), AppError> {
    let engine = RuleEngine::standard();
    let rules = engine.list_rules();
    let statistics = engine.rule_statistics();

    if args.json {
        let payload = serde_json::json!({ "rules": rules, "statistics": statistics });
        println!("{}", to_json(&payload)?);
    } else {
        print!("{}", format_rules(&rules, &statistics));
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = build_engine(&args.engine)?;
    let dataset = reference_dataset()?;

    println!("Loan approval expert system demo");
    println!(
        "Chaining mode {:?} | conflict strategy {}",
        engine.config().chaining_mode,
        engine.config().conflict_strategy.label()
    );

    let batch = engine.evaluate_all(dataset.applicants());
    for result in batch.successes() {
        print!("\n{}", format_result(result, !args.brief));
    }

    let disagreements: Vec<&EvaluationResult> = batch
        .successes()
        .filter(|result| chains_disagree(result))
        .collect();
    if !disagreements.is_empty() {
        println!("\nChains disagreed on:");
        for result in disagreements {
            println!("  - {}: {}", result.applicant_id, result.reasoning);
        }
    }

    println!();
    print!("{}", format_batch(&batch, dataset.applicants()));
    Ok(())
}

fn reference_dataset() -> Result<ApplicantDataset, AppError> {
    Ok(ApplicantDataset::from_json_reader(
        REFERENCE_APPLICANTS.as_bytes(),
    )?)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}

fn chains_disagree(result: &EvaluationResult) -> bool {
    match (&result.forward_chaining, &result.backward_chaining) {
        (Some(forward), Some(backward)) => forward.decision != backward.decision,
        _ => false,
    }
}

fn batch_report<'a>(
    batch: &'a BatchEvaluation,
    submissions: &[ApplicantSubmission],
) -> BatchReport<'a> {
    BatchReport {
        results: batch.successes().collect(),
        errors: batch
            .failures()
            .map(|(index, err)| ItemError {
                index,
                applicant_id: submissions
                    .get(index)
                    .and_then(|submission| submission.applicant_id.clone()),
                error: err.to_string(),
            })
            .collect(),
        statistics: &batch.statistics,
    }
}

pub(crate) fn format_result(result: &EvaluationResult, traces: bool) -> String {
    let applicant = &result.applicant_data;
    let mut out = String::new();
    let _ = writeln!(out, "Applicant {}", result.applicant_id);
    let _ = writeln!(
        out,
        "  Income {} | Credit {} | {} {:.1}y | Age {} | Dependents {} | Debt {}",
        applicant.income,
        applicant.credit_score,
        applicant.employment_status.label(),
        applicant.employment_duration,
        applicant.age,
        applicant.dependents,
        applicant.existing_debt.label()
    );
    let _ = writeln!(
        out,
        "  Forward chaining:  {}",
        format_chain(result.forward_chaining.as_ref())
    );
    let _ = writeln!(
        out,
        "  Backward chaining: {}",
        format_chain(result.backward_chaining.as_ref())
    );
    let _ = writeln!(out, "  Final decision: {}", result.final_decision);
    let _ = writeln!(out, "  Reasoning: {}", result.reasoning);

    if traces {
        if let Some(forward) = &result.forward_chaining {
            out.push_str(&format_trace("Forward chaining", &forward.trace));
        }
        if let Some(backward) = &result.backward_chaining {
            out.push_str(&format_trace("Backward chaining", &backward.trace));
        }
    }
    out
}

fn format_chain(outcome: Option<&ChainOutcome>) -> String {
    match outcome {
        None => "not run".to_string(),
        Some(outcome) => match &outcome.decided_by {
            Some(rule_id) => format!("{} (rule {rule_id})", outcome.decision),
            None => format!("{} (default)", outcome.decision),
        },
    }
}

pub(crate) fn format_trace(title: &str, trace: &Trace) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {title} trace: {} entries, {} rule(s) fired, {} conflict(s) resolved",
        trace.total_entries(),
        trace.rules_fired(),
        trace.conflicts_resolved()
    );
    for entry in trace.entries() {
        let _ = writeln!(out, "    [{}] {}", entry.level().label(), entry.message());
    }
    if trace.truncated_entries() > 0 {
        let _ = writeln!(
            out,
            "    ... {} entries truncated",
            trace.truncated_entries()
        );
    }
    out
}

pub(crate) fn format_batch(batch: &BatchEvaluation, submissions: &[ApplicantSubmission]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {}", "Applicant", "Decision");
    for (index, result) in batch.results.iter().enumerate() {
        match result {
            Ok(result) => {
                let _ = writeln!(out, "{:<10} {}", result.applicant_id.to_string(), result.final_decision);
            }
            Err(err) => {
                let label = submissions
                    .get(index)
                    .and_then(|submission| submission.applicant_id.clone())
                    .unwrap_or_else(|| format!("#{index}"));
                let _ = writeln!(out, "{label:<10} error: {err}");
            }
        }
    }

    let statistics = &batch.statistics;
    let _ = writeln!(out, "\nEvaluated {} applicant(s)", statistics.total_applicants);
    for (decision, count) in &statistics.decisions {
        let _ = writeln!(out, "  {decision}: {count}");
    }
    out
}

pub(crate) fn format_rules(rules: &[RuleSummary], statistics: &RuleBaseStatistics) -> String {
    let mut out = String::new();
    for rule in rules {
        let _ = writeln!(
            out,
            "{:<4} {:<6} spec {}  {}",
            rule.rule_id.to_string(),
            rule.priority_level,
            rule.specificity,
            rule.description
        );
        let _ = writeln!(out, "     IF {} THEN {}", rule.condition, rule.consequent);
    }
    let _ = writeln!(
        out,
        "\n{} rules ({} high, {} medium, {} low), average specificity {:.2}",
        statistics.total_rules,
        statistics.high_priority_rules,
        statistics.medium_priority_rules,
        statistics.low_priority_rules,
        statistics.average_specificity
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_expert::inference::{Decision, EngineConfig};

    fn serial_engine() -> RuleEngine {
        RuleEngine::new(EngineConfig {
            parallel_batch: false,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn bundled_reference_applicants_parse() {
        let dataset = reference_dataset().expect("bundled dataset parses");
        assert_eq!(dataset.len(), 8);
    }

    #[test]
    fn result_rendering_names_both_chains_and_the_final_label() {
        let dataset = reference_dataset().expect("bundled dataset parses");
        let result = serial_engine()
            .evaluate(&dataset.applicants()[0])
            .expect("A1 evaluates");

        let text = format_result(&result, false);
        assert!(text.starts_with("Applicant A1\n"));
        assert!(text.contains("Forward chaining:  Approve Loan (rule R1)"));
        assert!(text.contains("Final decision: Approve Loan"));
        assert!(!text.contains("[DECISION]"));

        let traced = format_result(&result, true);
        assert!(traced.contains("Forward chaining trace:"));
        assert!(traced.contains("Backward chaining trace:"));
        assert!(traced.contains("[DECISION]"));
    }

    #[test]
    fn batch_rendering_lists_errors_in_place() {
        let dataset = reference_dataset().expect("bundled dataset parses");
        let mut submissions = dataset.applicants()[..2].to_vec();
        submissions.push(ApplicantSubmission {
            applicant_id: Some("BROKEN".to_string()),
            ..ApplicantSubmission::default()
        });

        let batch = serial_engine().evaluate_all(&submissions);
        let text = format_batch(&batch, &submissions);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("A1"));
        assert!(lines[3].starts_with("BROKEN     error: invalid applicant"));
        assert!(text.contains("Evaluated 2 applicant(s)"));
        assert!(text.contains(&format!("  {}: 1", Decision::Approve)));

        let report = batch_report(&batch, &submissions);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.errors[0].index, 2);
        assert_eq!(report.errors[0].applicant_id.as_deref(), Some("BROKEN"));
    }

    #[test]
    fn rule_table_covers_the_whole_catalogue() {
        let engine = RuleEngine::standard();
        let text = format_rules(&engine.list_rules(), &engine.rule_statistics());
        assert!(text.starts_with("R1   High"));
        assert_eq!(text.matches(" IF ").count(), 8);
        assert!(text.contains("8 rules (4 high, 1 medium, 3 low), average specificity 1.88"));
    }
}
