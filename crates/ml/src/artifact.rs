//! Immutable model artifacts and the store that holds them.
//!
//! On disk an artifact is a directory named after its version:
//!
//! ```text
//! <root>/<version>/model.json      logistic coefficients + intercept
//! <root>/<version>/scaler.json     feature means / stds
//! <root>/<version>/features.txt    feature schema, one name per line
//! <root>/<version>/metadata.json   version, metrics, sample counts
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courtside_models::{CourtsideError, FeatureSchema, FeatureVector, ModelPrediction, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Estimator, LogisticPipeline, LogisticWeights, StandardScaler};

const MODEL_FILE: &str = "model.json";
const SCALER_FILE: &str = "scaler.json";
const FEATURES_FILE: &str = "features.txt";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactMetadata {
    pub version: String,
    pub schema_version: String,
    pub trained_at: DateTime<Utc>,
    pub accuracy: f64,
    pub roc_auc: f64,
    #[serde(default)]
    pub best_params: serde_json::Value,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// A fitted estimator bundled with the schema it was trained on.
/// Never mutated after construction; a retrain produces a new one.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    version: String,
    estimator: Arc<dyn Estimator>,
    feature_schema: FeatureSchema,
    trained_at: DateTime<Utc>,
    baseline_accuracy: f64,
    roc_auc: Option<f64>,
}

impl ModelArtifact {
    pub fn new(
        version: impl Into<String>,
        estimator: Arc<dyn Estimator>,
        feature_schema: FeatureSchema,
        trained_at: DateTime<Utc>,
        baseline_accuracy: f64,
    ) -> Result<Self> {
        let version = version.into();
        if estimator.n_features() != feature_schema.len() {
            return Err(CourtsideError::ArtifactCorrupt {
                version,
                reason: format!(
                    "estimator expects {} features but schema lists {}",
                    estimator.n_features(),
                    feature_schema.len()
                ),
            });
        }
        Ok(Self {
            version,
            estimator,
            feature_schema,
            trained_at,
            baseline_accuracy,
            roc_auc: None,
        })
    }

    pub fn with_roc_auc(mut self, roc_auc: f64) -> Self {
        self.roc_auc = Some(roc_auc);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn feature_schema(&self) -> &FeatureSchema {
        &self.feature_schema
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn baseline_accuracy(&self) -> f64 {
        self.baseline_accuracy
    }

    pub fn roc_auc(&self) -> Option<f64> {
        self.roc_auc
    }

    pub fn model_name(&self) -> &str {
        self.estimator.model_name()
    }

    /// Validates the vector against this artifact's schema, then scores it.
    pub fn predict(&self, features: &FeatureVector) -> Result<ModelPrediction> {
        self.feature_schema.validate(features)?;
        let home_win = self.estimator.predict_home_win(features.as_slice());
        ModelPrediction::from_home_probability(home_win, self.version.clone())
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn load(&self, version: &str) -> Result<ModelArtifact>;

    async fn save(
        &self,
        metadata: &ArtifactMetadata,
        schema: &FeatureSchema,
        pipeline: &LogisticPipeline,
    ) -> Result<()>;

    async fn exists(&self, version: &str) -> Result<bool>;

    async fn list_versions(&self) -> Result<Vec<String>>;
}

fn check_version_name(version: &str) -> Result<()> {
    let valid = !version.is_empty()
        && !version.starts_with('.')
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CourtsideError::ArtifactNotFound {
            version: version.to_string(),
        })
    }
}

fn build_artifact(
    metadata: &ArtifactMetadata,
    schema: FeatureSchema,
    pipeline: LogisticPipeline,
) -> Result<ModelArtifact> {
    if !pipeline.is_consistent() {
        return Err(CourtsideError::ArtifactCorrupt {
            version: metadata.version.clone(),
            reason: "scaler and coefficient dimensions disagree".to_string(),
        });
    }
    Ok(ModelArtifact::new(
        metadata.version.clone(),
        Arc::new(pipeline),
        schema,
        metadata.trained_at,
        metadata.accuracy,
    )?
    .with_roc_auc(metadata.roc_auc))
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_part(dir: &Path, file: &str, version: &str) -> Result<String> {
        tokio::fs::read_to_string(dir.join(file))
            .await
            .map_err(|e| CourtsideError::ArtifactCorrupt {
                version: version.to_string(),
                reason: format!("cannot read {file}: {e}"),
            })
    }

    fn parse_part<T: for<'de> Deserialize<'de>>(raw: &str, file: &str, version: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| CourtsideError::ArtifactCorrupt {
            version: version.to_string(),
            reason: format!("cannot parse {file}: {e}"),
        })
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn load(&self, version: &str) -> Result<ModelArtifact> {
        check_version_name(version)?;
        let dir = self.root.join(version);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CourtsideError::ArtifactCorrupt {
                    version: version.to_string(),
                    reason: "artifact path is not a directory".to_string(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CourtsideError::ArtifactNotFound {
                    version: version.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        let weights: LogisticWeights =
            Self::parse_part(&Self::read_part(&dir, MODEL_FILE, version).await?, MODEL_FILE, version)?;
        let scaler: StandardScaler =
            Self::parse_part(&Self::read_part(&dir, SCALER_FILE, version).await?, SCALER_FILE, version)?;
        let metadata: ArtifactMetadata = Self::parse_part(
            &Self::read_part(&dir, METADATA_FILE, version).await?,
            METADATA_FILE,
            version,
        )?;
        let fields: Vec<String> = Self::read_part(&dir, FEATURES_FILE, version)
            .await?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if metadata.version != version {
            return Err(CourtsideError::ArtifactCorrupt {
                version: version.to_string(),
                reason: format!("metadata names version {}", metadata.version),
            });
        }

        let schema = FeatureSchema::new(metadata.schema_version.clone(), fields);
        let artifact = build_artifact(&metadata, schema, LogisticPipeline::new(scaler, weights))?;
        debug!(version, features = artifact.feature_schema().len(), "Artifact read from disk");
        Ok(artifact)
    }

    async fn save(
        &self,
        metadata: &ArtifactMetadata,
        schema: &FeatureSchema,
        pipeline: &LogisticPipeline,
    ) -> Result<()> {
        check_version_name(&metadata.version)?;
        let final_dir = self.root.join(&metadata.version);
        if tokio::fs::try_exists(&final_dir).await? {
            return Err(CourtsideError::InvalidInput(format!(
                "artifact {} already exists",
                metadata.version
            )));
        }

        // Written to a staging directory and renamed, so a reader never sees
        // a half-written artifact.
        let staging = self
            .root
            .join(format!(".{}.{}.tmp", metadata.version, Uuid::new_v4()));
        tokio::fs::create_dir_all(&staging).await?;

        let result = async {
            tokio::fs::write(
                staging.join(MODEL_FILE),
                serde_json::to_vec_pretty(&pipeline.weights)?,
            )
            .await?;
            tokio::fs::write(
                staging.join(SCALER_FILE),
                serde_json::to_vec_pretty(&pipeline.scaler)?,
            )
            .await?;
            tokio::fs::write(staging.join(FEATURES_FILE), schema.fields.join("\n")).await?;
            tokio::fs::write(
                staging.join(METADATA_FILE),
                serde_json::to_vec_pretty(metadata)?,
            )
            .await?;
            tokio::fs::rename(&staging, &final_dir).await?;
            Ok::<_, CourtsideError>(())
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_dir_all(&staging).await;
        } else {
            info!(version = %metadata.version, path = %final_dir.display(), "Saved model artifact");
        }
        result
    }

    async fn exists(&self, version: &str) -> Result<bool> {
        if check_version_name(version).is_err() {
            return Ok(false);
        }
        Ok(tokio::fs::try_exists(self.root.join(version)).await?)
    }

    async fn list_versions(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(versions),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') && entry.file_type().await?.is_dir() {
                versions.push(name);
            }
        }
        versions.sort();
        Ok(versions)
    }
}

/// Artifact store held in memory. Used by tests and offline tooling.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: DashMap<String, ModelArtifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made artifact, e.g. one wrapping a stub estimator.
    pub fn insert(&self, artifact: ModelArtifact) {
        self.artifacts.insert(artifact.version().to_string(), artifact);
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn load(&self, version: &str) -> Result<ModelArtifact> {
        self.artifacts
            .get(version)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CourtsideError::ArtifactNotFound {
                version: version.to_string(),
            })
    }

    async fn save(
        &self,
        metadata: &ArtifactMetadata,
        schema: &FeatureSchema,
        pipeline: &LogisticPipeline,
    ) -> Result<()> {
        if self.artifacts.contains_key(&metadata.version) {
            return Err(CourtsideError::InvalidInput(format!(
                "artifact {} already exists",
                metadata.version
            )));
        }
        let artifact = build_artifact(metadata, schema.clone(), pipeline.clone())?;
        self.insert(artifact);
        Ok(())
    }

    async fn exists(&self, version: &str) -> Result<bool> {
        Ok(self.artifacts.contains_key(version))
    }

    async fn list_versions(&self) -> Result<Vec<String>> {
        let mut versions: Vec<String> = self.artifacts.iter().map(|e| e.key().clone()).collect();
        versions.sort();
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("courtside-artifacts-{}", Uuid::new_v4()))
    }

    fn pipeline() -> LogisticPipeline {
        LogisticPipeline::new(
            StandardScaler {
                means: vec![0.5, 100.0],
                stds: vec![0.1, 5.0],
            },
            LogisticWeights {
                coefficients: vec![0.8, 0.3],
                intercept: 0.1,
            },
        )
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new("v1", vec!["home_win_pct".into(), "home_avg_points".into()])
    }

    fn metadata(version: &str) -> ArtifactMetadata {
        ArtifactMetadata {
            version: version.to_string(),
            schema_version: "v1".to_string(),
            trained_at: Utc::now(),
            accuracy: 0.64,
            roc_auc: 0.69,
            best_params: serde_json::json!({"alpha": 0.01}),
            training_samples: 800,
            test_samples: 200,
        }
    }

    #[tokio::test]
    async fn test_fs_save_and_load() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);

        store.save(&metadata("v1"), &schema(), &pipeline()).await.unwrap();
        let artifact = store.load("v1").await.unwrap();

        assert_eq!(artifact.version(), "v1");
        assert_eq!(artifact.feature_schema(), &schema());
        assert_eq!(artifact.baseline_accuracy(), 0.64);
        assert_eq!(artifact.roc_auc(), Some(0.69));
        assert_eq!(store.list_versions().await.unwrap(), vec!["v1".to_string()]);

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_fs_artifacts_are_immutable() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);

        store.save(&metadata("v1"), &schema(), &pipeline()).await.unwrap();
        let again = store.save(&metadata("v1"), &schema(), &pipeline()).await;
        assert!(again.is_err());

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_fs_missing_version() {
        let store = FsArtifactStore::new(temp_root());
        let err = store.load("v404").await.unwrap_err();
        assert!(matches!(err, CourtsideError::ArtifactNotFound { .. }));

        let err = store.load("../etc").await.unwrap_err();
        assert!(matches!(err, CourtsideError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fs_corrupt_artifact() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);
        store.save(&metadata("v1"), &schema(), &pipeline()).await.unwrap();

        tokio::fs::write(root.join("v1").join(MODEL_FILE), b"{not json")
            .await
            .unwrap();
        let err = store.load("v1").await.unwrap_err();
        assert!(matches!(err, CourtsideError::ArtifactCorrupt { .. }));

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_fs_schema_length_disagreement_is_corrupt() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);
        store.save(&metadata("v1"), &schema(), &pipeline()).await.unwrap();

        tokio::fs::write(root.join("v1").join(FEATURES_FILE), "home_win_pct")
            .await
            .unwrap();
        let err = store.load("v1").await.unwrap_err();
        assert!(matches!(err, CourtsideError::ArtifactCorrupt { .. }));

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_artifact_predict_validates_schema() {
        let store = InMemoryArtifactStore::new();
        store.save(&metadata("v1"), &schema(), &pipeline()).await.unwrap();
        let artifact = store.load("v1").await.unwrap();

        let good = FeatureVector {
            schema_version: "v1".into(),
            names: schema().fields,
            values: vec![0.55, 112.5],
        };
        let prediction = artifact.predict(&good).unwrap();
        assert_eq!(prediction.model_version, "v1");
        assert!((prediction.home_win_probability + prediction.away_win_probability - 1.0).abs() < 1e-6);

        let bad = FeatureVector {
            schema_version: "v1".into(),
            names: vec!["home_win_pct".into()],
            values: vec![0.55],
        };
        assert!(matches!(
            artifact.predict(&bad),
            Err(CourtsideError::SchemaMismatch { .. })
        ));
    }
}
