use biaslens_core::AnalysisType;
use biaslens_engine::{
    BiasAnalyzer, EngineConfig, EntailmentLoader, EntailmentProvider, FALLBACK_PROVIDER,
};
use biaslens_nli_candle::{CandleNliLoader, ModelSource, NliModelConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn model_tests_enabled() -> bool {
    std::env::var("BIASLENS_RUN_MODEL_TESTS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn missing_local_config() -> NliModelConfig {
    serde_yaml::from_str(
        r#"
source:
  type: local
  path: "./models/nli-does-not-exist"
architecture: deberta-v2
device: cpu
"#,
    )
    .expect("Failed to parse model config")
}

#[test]
fn test_missing_local_model_reports_path() {
    let loader = CandleNliLoader::new(missing_local_config());
    assert_eq!(loader.describe(), "local:./models/nli-does-not-exist");

    let err = match loader.load() {
        Ok(_) => panic!("Expected model loading to fail for missing local path"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("Model path does not exist"));
}

#[test]
fn test_missing_model_falls_back_to_keywords() {
    let analyzer = BiasAnalyzer::builder()
        .loader(CandleNliLoader::new(missing_local_config()))
        .build()
        .unwrap();

    let result = analyzer.analyze("Native English speaker required.", true);
    assert_eq!(result.analysis_type, AnalysisType::KeywordFallback);
    assert!(!result.nlp_used);
    assert_eq!(result.classification.provider, FALLBACK_PROVIDER);
    assert!(result
        .classification
        .error
        .as_deref()
        .is_some_and(|e| e.contains("Model path does not exist")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_default_model_classifies_age_bias() {
    if !model_tests_enabled() {
        eprintln!("skipping: set BIASLENS_RUN_MODEL_TESTS=1 to run");
        return;
    }

    let analyzer = Arc::new(
        BiasAnalyzer::builder()
            .config(EngineConfig::default())
            .loader(CandleNliLoader::new(NliModelConfig::default()))
            .build()
            .unwrap(),
    );

    let result = analyzer
        .analyze_async(
            "We want young, energetic candidates who are digital natives.".to_string(),
            true,
        )
        .await;

    assert_eq!(result.analysis_type, AnalysisType::Full);
    assert!(result.nlp_used);
    assert_eq!(
        result.classification.labels.len(),
        analyzer.config().classification.labels.len()
    );
    assert_eq!(result.classification.labels[0], "age-bias");
}

#[test]
fn test_local_model_loads_when_present() {
    if !model_tests_enabled() {
        eprintln!("skipping: set BIASLENS_RUN_MODEL_TESTS=1 to run");
        return;
    }
    let Ok(path) = std::env::var("BIASLENS_LOCAL_NLI_MODEL") else {
        eprintln!("skipping: BIASLENS_LOCAL_NLI_MODEL not set");
        return;
    };

    let config = NliModelConfig {
        source: ModelSource::Local {
            path: PathBuf::from(path),
        },
        ..NliModelConfig::default()
    };
    let provider = CandleNliLoader::new(config).load().unwrap();
    let probs = provider
        .entailment_probs(
            "Only U.S. citizens will be considered.",
            &[
                "This job description excludes international students.".to_string(),
                "This job description is neutral and inclusive.".to_string(),
            ],
        )
        .unwrap();
    assert_eq!(probs.len(), 2);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
}
