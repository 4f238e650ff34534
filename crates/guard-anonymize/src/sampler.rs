//! Dependency-based rarity estimation for indirect identifiers.
//!
//! A [`DependencyRiskSampler`] fits a [`GaussianCopula`] once over synthetic
//! institution × condition × date assignments and keeps a canonical set of
//! sampled indicator rows. Queries name a subset of indicator columns; the
//! rarer the matching combination among the stored rows, the higher the risk.

use crate::config::SamplerConfig;
use crate::copula::GaussianCopula;
use crate::{AnonymizeError, AnonymizeResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Sparse assignment of indicator columns to 0/1 values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureQuery(BTreeMap<String, u8>);

impl FeatureQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column assignment.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: u8) -> Self {
        self.0.insert(column.into(), value);
        self
    }

    /// Iterates over column assignments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns the number of constrained columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no column is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the human-readable key recorded on risk weights.
    #[must_use]
    pub fn feature_key(&self) -> String {
        self.0.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Estimates how identifying a combination of indicator values is.
pub trait RiskEstimator: Send + Sync {
    /// Returns the known indicator columns.
    fn columns(&self) -> &[String];

    /// Returns a risk in `[0, 1]`; 1 means no stored row matches.
    ///
    /// Naming an unknown column is a caller error and is reported, never
    /// answered with a guessed probability.
    fn estimate_risk(&self, query: &FeatureQuery) -> AnonymizeResult<f64>;
}

/// A categorical attribute with a small fixed domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalAttribute {
    /// Attribute name, used as the column prefix.
    pub name: String,
    /// Attribute values.
    pub values: Vec<String>,
}

impl CategoricalAttribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// Returns the one-hot column name for a value.
    #[must_use]
    pub fn column(&self, value: &str) -> String {
        format!("{}_{}", self.name, value)
    }

    /// Returns all one-hot column names.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.values.iter().map(|v| self.column(v)).collect()
    }

    /// Returns a query selecting one value and excluding the rest.
    #[must_use]
    pub fn one_hot(&self, value: &str) -> FeatureQuery {
        self.values.iter().fold(FeatureQuery::new(), |q, v| {
            q.with(self.column(v), u8::from(v == value))
        })
    }
}

/// The built-in institution, condition and date attributes.
#[must_use]
pub fn builtin_attributes() -> Vec<CategoricalAttribute> {
    vec![
        CategoricalAttribute::new("institution", &["서울대병원", "삼성서울", "연세의료원"]),
        CategoricalAttribute::new("condition", &["간암", "백혈병", "고혈압"]),
        CategoricalAttribute::new("date", &["2023년", "2022년", "2021년"]),
    ]
}

/// Copula-backed rarity estimator with a frozen sample set.
#[derive(Debug, Clone)]
pub struct DependencyRiskSampler {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    samples: Vec<Vec<u8>>,
}

impl DependencyRiskSampler {
    /// Fits the sampler over the built-in attributes.
    pub fn fit_builtin(config: &SamplerConfig) -> AnonymizeResult<Self> {
        Self::fit(&builtin_attributes(), config)
    }

    /// Draws uniform baseline assignments, fits the copula and stores a canonical sample set.
    pub fn fit(attributes: &[CategoricalAttribute], config: &SamplerConfig) -> AnonymizeResult<Self> {
        config.validate()?;
        if attributes.iter().any(|a| a.values.is_empty()) {
            return Err(AnonymizeError::SamplerFit(
                "attribute with an empty domain".into(),
            ));
        }

        let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
        let columns: Vec<String> = attributes.iter().flat_map(CategoricalAttribute::columns).collect();

        let baseline: Vec<Vec<f64>> = (0..config.baseline_draws)
            .map(|_| {
                let mut row = Vec::with_capacity(columns.len());
                for attribute in attributes {
                    let pick = rng.gen_range(0..attribute.values.len());
                    row.extend((0..attribute.values.len()).map(|i| if i == pick { 1.0 } else { 0.0 }));
                }
                row
            })
            .collect();

        let copula = GaussianCopula::fit(columns.clone(), &baseline)?;
        let samples = copula.sample(config.sample_count, &mut rng);

        tracing::info!(
            columns = columns.len(),
            baseline = config.baseline_draws,
            samples = samples.len(),
            seed = config.seed,
            "dependency sampler fitted"
        );

        Self::from_samples(columns, samples)
    }

    /// Builds a sampler from an existing sample set.
    pub fn from_samples(columns: Vec<String>, samples: Vec<Vec<u8>>) -> AnonymizeResult<Self> {
        if let Some(bad) = samples.iter().position(|r| r.len() != columns.len()) {
            return Err(AnonymizeError::SamplerFit(format!(
                "sample row {bad} has {} values, expected {}",
                samples[bad].len(),
                columns.len()
            )));
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Ok(Self {
            columns,
            index,
            samples,
        })
    }

    /// Returns the stored sample rows.
    #[must_use]
    pub fn samples(&self) -> &[Vec<u8>] {
        &self.samples
    }

    fn resolve(&self, query: &FeatureQuery) -> AnonymizeResult<Vec<(usize, u8)>> {
        query
            .iter()
            .map(|(name, value)| {
                if value > 1 {
                    return Err(AnonymizeError::InvalidFeatureValue {
                        feature: name.to_string(),
                        value,
                    });
                }
                self.index
                    .get(name)
                    .map(|&i| (i, value))
                    .ok_or_else(|| AnonymizeError::UnknownFeature(name.to_string()))
            })
            .collect()
    }
}

impl RiskEstimator for DependencyRiskSampler {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn estimate_risk(&self, query: &FeatureQuery) -> AnonymizeResult<f64> {
        let constraints = self.resolve(query)?;
        if self.samples.is_empty() {
            return Ok(1.0);
        }

        let matches = self
            .samples
            .iter()
            .filter(|row| constraints.iter().all(|&(i, v)| row[i] == v))
            .count();

        Ok(1.0 - matches as f64 / self.samples.len() as f64)
    }
}

/// Fixed-answer estimator for tests and offline use.
///
/// Validates column names like the fitted sampler but answers from a table.
#[derive(Debug, Clone)]
pub struct FixedRiskEstimator {
    columns: Vec<String>,
    default_risk: f64,
    answers: HashMap<FeatureQuery, f64>,
}

impl FixedRiskEstimator {
    /// Creates an estimator answering `default_risk` for every valid query.
    pub fn new(columns: Vec<String>, default_risk: f64) -> Self {
        Self {
            columns,
            default_risk: default_risk.clamp(0.0, 1.0),
            answers: HashMap::new(),
        }
    }

    /// Creates an estimator over the built-in attribute columns.
    #[must_use]
    pub fn builtin(default_risk: f64) -> Self {
        let columns = builtin_attributes()
            .iter()
            .flat_map(CategoricalAttribute::columns)
            .collect();
        Self::new(columns, default_risk)
    }

    /// Sets the answer for a specific query.
    #[must_use]
    pub fn with_answer(mut self, query: FeatureQuery, risk: f64) -> Self {
        self.answers.insert(query, risk.clamp(0.0, 1.0));
        self
    }
}

impl RiskEstimator for FixedRiskEstimator {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn estimate_risk(&self, query: &FeatureQuery) -> AnonymizeResult<f64> {
        for (name, value) in query.iter() {
            if value > 1 {
                return Err(AnonymizeError::InvalidFeatureValue {
                    feature: name.to_string(),
                    value,
                });
            }
            if !self.columns.iter().any(|c| c == name) {
                return Err(AnonymizeError::UnknownFeature(name.to_string()));
            }
        }
        Ok(self.answers.get(query).copied().unwrap_or(self.default_risk))
    }
}

/// Static token → feature query lookup.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    entries: HashMap<String, FeatureQuery>,
}

impl FeatureTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in table of known institutions, diseases and years.
    #[must_use]
    pub fn builtin() -> Self {
        let attrs = builtin_attributes();
        let (institution, condition, date) = (&attrs[0], &attrs[1], &attrs[2]);

        let mut table = Self::new();
        table.insert("서울대병원", institution.one_hot("서울대병원"));
        table.insert("삼성서울병원", institution.one_hot("삼성서울"));
        table.insert("간암", condition.one_hot("간암"));
        table.insert("백혈병", condition.one_hot("백혈병"));
        table.insert("2023년", date.one_hot("2023년"));
        // 2024년 has no bucket of its own and shares 2022년's.
        table.insert("2024년", date.one_hot("2022년"));
        table
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, token: impl Into<String>, query: FeatureQuery) {
        self.entries.insert(token.into(), query);
    }

    /// Looks up a token.
    ///
    /// Exact matches win. Failing that, the longest key the token starts with
    /// is used, so `서울대병원에서` resolves to `서울대병원`; a plain key lookup
    /// would leave particle-suffixed tokens unmapped.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&FeatureQuery> {
        if let Some(query) = self.entries.get(token) {
            return Some(query);
        }
        self.entries
            .iter()
            .filter(|(key, _)| !key.is_empty() && token.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, query)| query)
    }

    /// Checks every entry against an estimator's columns.
    pub fn validate_against(&self, estimator: &dyn RiskEstimator) -> AnonymizeResult<()> {
        let columns = estimator.columns();
        for query in self.entries.values() {
            for (name, _) in query.iter() {
                if !columns.iter().any(|c| c == name) {
                    return Err(AnonymizeError::UnknownFeature(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> DependencyRiskSampler {
        DependencyRiskSampler::fit_builtin(&SamplerConfig::default()).unwrap()
    }

    #[test]
    fn test_fit_builds_sample_set() {
        let sampler = fitted();
        assert_eq!(sampler.columns().len(), 9);
        assert_eq!(sampler.samples().len(), 1000);
        assert!(sampler.samples().iter().flatten().all(|&v| v <= 1));
    }

    #[test]
    fn test_known_token_risk_in_range_and_repeatable() {
        let sampler = fitted();
        let table = FeatureTable::builtin();
        let query = table.lookup("간암").unwrap();

        let first = sampler.estimate_risk(query).unwrap();
        let second = sampler.estimate_risk(query).unwrap();

        assert!((0.0..=1.0).contains(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_seed_same_samples() {
        assert_eq!(fitted().samples(), fitted().samples());

        let other = DependencyRiskSampler::fit_builtin(&SamplerConfig::default().with_seed(43)).unwrap();
        assert_ne!(fitted().samples(), other.samples());
    }

    #[test]
    fn test_fit_draws_from_chacha20_stream() {
        let config = SamplerConfig::default().with_seed(9);
        let attributes = builtin_attributes();
        let columns: Vec<String> = attributes.iter().flat_map(CategoricalAttribute::columns).collect();

        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let baseline: Vec<Vec<f64>> = (0..config.baseline_draws)
            .map(|_| {
                let mut row = Vec::new();
                for attribute in &attributes {
                    let pick = rng.gen_range(0..attribute.values.len());
                    row.extend((0..attribute.values.len()).map(|i| if i == pick { 1.0 } else { 0.0 }));
                }
                row
            })
            .collect();
        let expected = GaussianCopula::fit(columns, &baseline)
            .unwrap()
            .sample(config.sample_count, &mut rng);

        let sampler = DependencyRiskSampler::fit(&attributes, &config).unwrap();
        assert_eq!(sampler.samples(), expected.as_slice());
    }

    #[test]
    fn test_unknown_column_fails() {
        let sampler = fitted();
        let query = FeatureQuery::new().with("institution_unknown", 1);
        let err = sampler.estimate_risk(&query).unwrap_err();
        assert!(matches!(err, AnonymizeError::UnknownFeature(name) if name == "institution_unknown"));
    }

    #[test]
    fn test_invalid_value_fails() {
        let sampler = fitted();
        let query = FeatureQuery::new().with("condition_간암", 2);
        assert!(matches!(
            sampler.estimate_risk(&query),
            Err(AnonymizeError::InvalidFeatureValue { value: 2, .. })
        ));
    }

    #[test]
    fn test_match_fraction() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let samples = vec![vec![1, 0], vec![1, 1], vec![0, 1], vec![0, 0]];
        let sampler = DependencyRiskSampler::from_samples(columns, samples).unwrap();

        let risk = sampler.estimate_risk(&FeatureQuery::new().with("a", 1)).unwrap();
        assert!((risk - 0.5).abs() < 1e-12);

        let risk = sampler
            .estimate_risk(&FeatureQuery::new().with("a", 1).with("b", 1))
            .unwrap();
        assert!((risk - 0.75).abs() < 1e-12);

        // Empty query is unconstrained.
        assert_eq!(sampler.estimate_risk(&FeatureQuery::new()).unwrap(), 0.0);
    }

    #[test]
    fn test_no_match_is_max_risk() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let sampler = DependencyRiskSampler::from_samples(columns, vec![vec![0, 0]]).unwrap();
        let risk = sampler
            .estimate_risk(&FeatureQuery::new().with("a", 1).with("b", 1))
            .unwrap();
        assert_eq!(risk, 1.0);
    }

    #[test]
    fn test_from_samples_rejects_ragged_rows() {
        let columns = vec!["a".to_string()];
        assert!(DependencyRiskSampler::from_samples(columns, vec![vec![0, 1]]).is_err());
    }

    #[test]
    fn test_feature_table_lookup() {
        let table = FeatureTable::builtin();
        assert!(table.lookup("서울대병원").is_some());
        assert_eq!(table.lookup("서울대병원에서"), table.lookup("서울대병원"));
        assert!(table.lookup("강남세브란스").is_none());

        let key = table.lookup("간암").unwrap().feature_key();
        assert_eq!(key, "condition_간암, condition_고혈압, condition_백혈병");
    }

    #[test]
    fn test_feature_table_exact_key_beats_stem() {
        let mut table = FeatureTable::new();
        table.insert("병원", FeatureQuery::new().with("institution_a", 1));
        table.insert("병원에서", FeatureQuery::new().with("institution_b", 1));

        assert_eq!(table.lookup("병원에서").unwrap().feature_key(), "institution_b");
        assert_eq!(table.lookup("병원에").unwrap().feature_key(), "institution_a");
        assert!(table.lookup("의원").is_none());
    }

    #[test]
    fn test_feature_table_validates_against_estimator() {
        let table = FeatureTable::builtin();
        assert!(table.validate_against(&FixedRiskEstimator::builtin(0.5)).is_ok());

        let narrow = FixedRiskEstimator::new(vec!["institution_서울대병원".into()], 0.5);
        assert!(table.validate_against(&narrow).is_err());
    }

    #[test]
    fn test_fixed_estimator_answers() {
        let query = FeatureQuery::new().with("date_2023년", 1);
        let estimator = FixedRiskEstimator::builtin(0.2).with_answer(query.clone(), 0.9);

        assert_eq!(estimator.estimate_risk(&query).unwrap(), 0.9);
        assert_eq!(
            estimator
                .estimate_risk(&FeatureQuery::new().with("date_2022년", 1))
                .unwrap(),
            0.2
        );
        assert!(estimator
            .estimate_risk(&FeatureQuery::new().with("nope", 1))
            .is_err());
    }
}
