//! Single-shot inference: derive, classify, decode

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::features::{derive, RawRecord};
use crate::model::{Classifier, LabelCodec, MlpClassifier, ModelMetadata};
use crate::{ArtifactConfig, Config, DefaultBackend, ExoplanetError, Result};

/// Decoded prediction for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    /// Label -> probability, only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f32>>,
}

/// What gets printed: either a prediction or an error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Success(PredictionResult),
    Failure { error: String },
}

impl Outcome {
    pub fn from_result(result: Result<PredictionResult>) -> Self {
        match result {
            Ok(prediction) => Outcome::Success(prediction),
            Err(e) => Outcome::failure(&e),
        }
    }

    pub fn failure(error: &ExoplanetError) -> Self {
        Outcome::Failure {
            error: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    pub fn to_json(&self, pretty: bool) -> String {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

/// Run the pipeline for one record against already loaded artifacts
pub fn infer(
    raw: &RawRecord,
    classifier: &dyn Classifier,
    codec: &LabelCodec,
    include_probabilities: bool,
) -> Result<PredictionResult> {
    let features = derive(raw);
    log::debug!("Derived features: {:?}", features);

    let class_id = classifier.predict(&features)?;
    let prediction = codec.decode(class_id)?.to_string();

    let probabilities = if include_probabilities {
        let probs = classifier.predict_proba(&features)?;
        Some(
            codec
                .classes()
                .iter()
                .cloned()
                .zip(probs)
                .collect::<BTreeMap<_, _>>(),
        )
    } else {
        None
    };

    Ok(PredictionResult {
        prediction,
        probabilities,
    })
}

/// Loaded classifier and label codec, immutable once built
pub struct Artifacts {
    classifier: Box<dyn Classifier>,
    codec: LabelCodec,
}

impl Artifacts {
    /// Pair a classifier with its codec; both must agree on the class count
    pub fn new(classifier: Box<dyn Classifier>, codec: LabelCodec) -> Result<Self> {
        if classifier.n_classes() != codec.len() {
            return Err(ExoplanetError::ArtifactUnavailable {
                path: "label codec".to_string(),
                reason: format!(
                    "codec has {} labels but classifier predicts {} classes",
                    codec.len(),
                    classifier.n_classes()
                ),
            });
        }
        Ok(Artifacts { classifier, codec })
    }

    /// Load both artifacts from disk
    pub fn load(config: &ArtifactConfig) -> Result<Self> {
        let classifier =
            MlpClassifier::<DefaultBackend>::load(&config.model_path(), Default::default())?;
        let codec = LabelCodec::load(&config.encoder_path())?;
        Self::new(Box::new(classifier), codec)
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Network shape and scaler of the loaded classifier, if it has any
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.classifier.metadata()
    }

    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }
}

/// Reusable predictor holding loaded artifacts
pub struct Predictor {
    artifacts: Artifacts,
    include_probabilities: bool,
}

impl Predictor {
    pub fn new(artifacts: Artifacts, include_probabilities: bool) -> Self {
        Predictor {
            artifacts,
            include_probabilities,
        }
    }

    /// Load artifacts named by the config
    pub fn load(config: &Config) -> Result<Self> {
        let artifacts = Artifacts::load(&config.artifacts)?;
        Ok(Self::new(artifacts, config.output.include_probabilities))
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionResult> {
        infer(
            raw,
            self.artifacts.classifier(),
            self.artifacts.codec(),
            self.include_probabilities,
        )
    }

    /// Like [`Predictor::predict`], folding any error into the output object
    pub fn respond(&self, raw: &RawRecord) -> Outcome {
        Outcome::from_result(self.predict(raw))
    }
}

/// Answer one JSON record per input line, writing one JSON object per line
///
/// Blank lines are skipped. A line that is not UTF-8 or not a JSON object gets
/// an error object and processing continues. When `predictor` failed to load,
/// every line receives that load error. Returns the number of lines answered.
pub fn run_batch<R: BufRead, W: Write>(
    predictor: &Result<Predictor>,
    input: R,
    mut out: W,
) -> Result<usize> {
    let mut count = 0usize;

    for line in input.split(b'\n') {
        let bytes = line?;
        let parsed = String::from_utf8(bytes)
            .map_err(|e| ExoplanetError::MalformedInput(e.to_string()));
        if matches!(&parsed, Ok(text) if text.trim().is_empty()) {
            continue;
        }

        let outcome = match (predictor, parsed.and_then(|text| RawRecord::from_json_str(&text))) {
            (Err(e), _) => Outcome::failure(e),
            (Ok(_), Err(e)) => Outcome::failure(&e),
            (Ok(p), Ok(raw)) => p.respond(&raw),
        };
        writeln!(out, "{}", outcome.to_json(false))?;
        out.flush()?;
        count += 1;
    }

    Ok(count)
}

/// Load artifacts and predict a single record
///
/// Artifact failures stop the pipeline before any feature derivation.
pub fn run_once(raw: &RawRecord, config: &Config) -> Outcome {
    match Predictor::load(config) {
        Ok(predictor) => predictor.respond(raw),
        Err(e) => {
            log::warn!("{}", e);
            Outcome::failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureVector, FEATURE_COLUMNS};
    use crate::model::{ExoplanetMlp, FeatureScaler, MlpConfig, ModelMetadata};
    use std::cell::RefCell;

    /// Returns fixed probabilities and records the vectors it was given
    struct FixedClassifier {
        probs: Vec<f32>,
        seen: RefCell<Vec<FeatureVector>>,
    }

    impl FixedClassifier {
        fn new(probs: Vec<f32>) -> Self {
            FixedClassifier {
                probs,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn n_classes(&self) -> usize {
            self.probs.len()
        }

        fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>> {
            self.seen.borrow_mut().push(*features);
            Ok(self.probs.clone())
        }
    }

    fn codec() -> LabelCodec {
        LabelCodec::new(["CANDIDATE", "CONFIRMED", "FALSE POSITIVE"])
    }

    fn reference_record() -> RawRecord {
        RawRecord::from_json_str(
            r#"{"orb_period": 10, "planet_radius": 2, "planet_mass": 5, "st_teff": 5700,
                "st_rad": 1, "st_mass": 1, "sy_dist": 100}"#,
        )
        .unwrap()
    }

    fn write_artifacts(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.artifacts.dir = dir.to_str().unwrap().to_string();

        let device = Default::default();
        let mlp_config = MlpConfig::default();
        let model = ExoplanetMlp::<DefaultBackend>::new(&device, &mlp_config);
        let metadata = ModelMetadata::new(mlp_config, FeatureScaler::identity(FeatureVector::DIM));
        MlpClassifier::new(model, metadata, device)
            .save(&config.artifacts.model_path())
            .unwrap();
        codec().save(&config.artifacts.encoder_path()).unwrap();

        config
    }

    #[test]
    fn test_infer_decodes_label() {
        let clf = FixedClassifier::new(vec![0.1, 0.7, 0.2]);
        let result = infer(&reference_record(), &clf, &codec(), false).unwrap();

        assert_eq!(result.prediction, "CONFIRMED");
        assert!(result.probabilities.is_none());
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"prediction":"CONFIRMED"}"#
        );
    }

    #[test]
    fn test_infer_with_probabilities() {
        let clf = FixedClassifier::new(vec![0.2, 0.1, 0.7]);
        let result = infer(&reference_record(), &clf, &codec(), true).unwrap();

        assert_eq!(result.prediction, "FALSE POSITIVE");
        let probs = result.probabilities.unwrap();
        assert_eq!(probs.len(), 3);
        assert_eq!(probs["CANDIDATE"], 0.2);
        assert_eq!(probs["FALSE POSITIVE"], 0.7);
    }

    #[test]
    fn test_classifier_receives_canonical_vector() {
        let clf = FixedClassifier::new(vec![1.0, 0.0, 0.0]);
        infer(&reference_record(), &clf, &codec(), false).unwrap();

        let seen = clf.seen.borrow();
        let features = seen[0];
        assert_eq!(features.iter().count(), FEATURE_COLUMNS.len());
        assert_eq!(features.orb_period, 10.0);
        assert!((features.planet_density - 0.625).abs() < 1e-6);
        assert!((features.flux_received - 57.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_record_still_predicts() {
        let clf = FixedClassifier::new(vec![0.9, 0.05, 0.05]);
        let result = infer(&RawRecord::default(), &clf, &codec(), false).unwrap();
        assert_eq!(result.prediction, "CANDIDATE");
    }

    #[test]
    fn test_unknown_class_id() {
        let clf = FixedClassifier::new(vec![0.1, 0.1, 0.1, 0.7]);
        let err = infer(&reference_record(), &clf, &codec(), false).unwrap_err();
        assert!(matches!(err, ExoplanetError::UnknownClass(3)));
    }

    #[test]
    fn test_artifacts_class_count_mismatch() {
        let clf = FixedClassifier::new(vec![0.5, 0.5]);
        let result = Artifacts::new(Box::new(clf), codec());
        assert!(matches!(
            result,
            Err(ExoplanetError::ArtifactUnavailable { .. })
        ));
    }

    #[test]
    fn test_outcome_json_shapes() {
        let ok = Outcome::Success(PredictionResult {
            prediction: "CANDIDATE".to_string(),
            probabilities: None,
        });
        assert_eq!(ok.to_json(false), r#"{"prediction":"CANDIDATE"}"#);
        assert!(!ok.is_error());

        let err = Outcome::failure(&ExoplanetError::MalformedInput("bad".to_string()));
        assert_eq!(err.to_json(false), r#"{"error":"Malformed input: bad"}"#);
        assert!(err.is_error());
    }

    #[test]
    fn test_run_once_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.artifacts.dir = dir.path().join("absent").to_str().unwrap().to_string();

        let outcome = run_once(&reference_record(), &config);
        match outcome {
            Outcome::Failure { error } => assert!(error.contains("Artifact unavailable")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_run_once_missing_codec() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        std::fs::remove_file(config.artifacts.encoder_path()).unwrap();

        let outcome = run_once(&reference_record(), &config);
        assert!(outcome.is_error());
    }

    #[test]
    fn test_end_to_end_with_saved_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_artifacts(dir.path());
        config.output.include_probabilities = true;

        let result = match run_once(&reference_record(), &config) {
            Outcome::Success(result) => result,
            other => panic!("expected success, got {:?}", other),
        };

        assert!(codec().encode(&result.prediction).is_some());
        let probs = result.probabilities.unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.values().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_predictor_is_reusable() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        let predictor = Predictor::load(&config).unwrap();

        let first = predictor.predict(&reference_record()).unwrap();
        let _ = predictor.predict(&RawRecord::default()).unwrap();
        let again = predictor.predict(&reference_record()).unwrap();
        assert_eq!(first, again);
    }
    fn fixed_predictor(probs: Vec<f32>) -> Result<Predictor> {
        let artifacts = Artifacts::new(Box::new(FixedClassifier::new(probs)), codec())?;
        Ok(Predictor::new(artifacts, false))
    }

    #[test]
    fn test_negative_distance_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        let predictor = Predictor::load(&config).unwrap();

        let raw =
            RawRecord::from_json_str(r#"{"st_teff": 5700, "st_rad": 1, "sy_dist": -5}"#).unwrap();
        let artifacts = predictor.artifacts();
        let err = infer(&raw, artifacts.classifier(), artifacts.codec(), false).unwrap_err();
        assert!(matches!(err, ExoplanetError::Inference(_)));

        match predictor.respond(&raw) {
            Outcome::Failure { error } => assert!(error.contains("non-finite")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_probabilities_never_decode() {
        let clf = FixedClassifier::new(vec![f32::NAN, f32::NAN, f32::NAN]);
        let err = infer(&reference_record(), &clf, &codec(), false).unwrap_err();
        assert!(matches!(err, ExoplanetError::Inference(_)));
    }

    #[test]
    fn test_error_message_is_escaped() {
        let outcome = Outcome::failure(&ExoplanetError::MalformedInput(
            r#"unexpected "quote" \ here"#.to_string(),
        ));
        let parsed: serde_json::Value = serde_json::from_str(&outcome.to_json(false)).unwrap();
        assert!(parsed["error"].as_str().unwrap().contains(r#""quote""#));
    }

    #[test]
    fn test_artifacts_expose_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        let artifacts = Artifacts::load(&config.artifacts).unwrap();

        let metadata = artifacts.metadata().unwrap();
        assert_eq!(metadata.config.hidden_dims, vec![64, 32]);
        assert_eq!(metadata.config.n_classes, 3);

        let fixed = Artifacts::new(Box::new(FixedClassifier::new(vec![1.0, 0.0, 0.0])), codec())
            .unwrap();
        assert!(fixed.metadata().is_none());
    }

    #[test]
    fn test_batch_survives_invalid_utf8() {
        let predictor = fixed_predictor(vec![0.1, 0.8, 0.1]);
        let input: &[u8] = b"{\"orb_period\":1}\n\xff\xfe\n\n{\"orb_period\":2}\n";
        let mut out = Vec::new();

        let count = run_batch(&predictor, input, &mut out).unwrap();
        assert_eq!(count, 3);

        let lines: Vec<Outcome> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].is_error());
        match &lines[1] {
            Outcome::Failure { error } => assert!(error.contains("Malformed input")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!lines[2].is_error());
    }

    #[test]
    fn test_batch_malformed_json_line() {
        let predictor = fixed_predictor(vec![0.1, 0.8, 0.1]);
        let input: &[u8] = b"not json\n{\"st_teff\": 5700}";
        let mut out = Vec::new();

        assert_eq!(run_batch(&predictor, input, &mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with(r#"{"error":"#));
        assert_eq!(lines[1], r#"{"prediction":"CONFIRMED"}"#);
    }

    #[test]
    fn test_batch_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.artifacts.dir = dir.path().join("absent").to_str().unwrap().to_string();
        let predictor = Predictor::load(&config);

        let input: &[u8] = b"{}\n{\"orb_period\": 3}\n";
        let mut out = Vec::new();
        assert_eq!(run_batch(&predictor, input, &mut out).unwrap(), 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text
            .lines()
            .all(|l| l.contains("Artifact unavailable")));
    }
}
