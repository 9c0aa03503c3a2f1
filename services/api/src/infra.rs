use loan_expert::config::AppConfig;
use loan_expert::dataset::DatasetFile;
use loan_expert::inference::{
    ChainingMode, ConflictStrategy, EngineConfig, LoanEvaluationService, RuleEngine,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type DatasetService = LoanEvaluationService<DatasetFile>;

/// Engine plus the configured on-disk dataset.
pub(crate) fn build_service(config: &AppConfig) -> Arc<DatasetService> {
    Arc::new(LoanEvaluationService::new(
        RuleEngine::new(config.engine),
        Arc::new(DatasetFile::new(config.dataset.path.clone())),
    ))
}

/// Apply command-line overrides on top of the environment settings.
pub(crate) fn engine_config(
    base: EngineConfig,
    chaining_mode: Option<ChainingMode>,
    conflict_strategy: Option<ConflictStrategy>,
) -> EngineConfig {
    EngineConfig {
        chaining_mode: chaining_mode.unwrap_or(base.chaining_mode),
        conflict_strategy: conflict_strategy.unwrap_or(base.conflict_strategy),
        ..base
    }
}

pub(crate) fn parse_chaining_mode(raw: &str) -> Result<ChainingMode, String> {
    ChainingMode::parse(raw).ok_or_else(|| format!("'{raw}' is not one of forward, backward, both"))
}

pub(crate) fn parse_conflict_strategy(raw: &str) -> Result<ConflictStrategy, String> {
    ConflictStrategy::parse(raw).ok_or_else(|| {
        format!("'{raw}' is not one of priority_specificity, specificity_priority")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_was_given() {
        let base = EngineConfig {
            trace_capacity: 10,
            ..EngineConfig::default()
        };
        let config = engine_config(base, Some(ChainingMode::Forward), None);
        assert_eq!(config.chaining_mode, ChainingMode::Forward);
        assert_eq!(config.conflict_strategy, ConflictStrategy::PrioritySpecificity);
        assert_eq!(config.trace_capacity, 10);
    }

    #[test]
    fn value_parsers_explain_bad_input() {
        assert_eq!(parse_chaining_mode("both"), Ok(ChainingMode::Both));
        assert!(parse_chaining_mode("diagonal")
            .unwrap_err()
            .contains("forward, backward, both"));
        assert_eq!(
            parse_conflict_strategy("specificity"),
            Ok(ConflictStrategy::SpecificityPriority)
        );
    }
}
