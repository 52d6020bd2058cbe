//! Model artifact loading and management

use crate::classifier::Classifier;
use crate::models::{ArtifactClassifier, ModelArtifact};
use moodwave_core::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Model file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl ModelFormat {
    /// Detect the format of a model file
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            other => Err(Error::model_load(
                path,
                format!("unsupported model file extension {:?}", other),
            )),
        }
    }

    /// Parse an artifact document in this format
    pub fn parse(self, content: &str) -> std::result::Result<ModelArtifact, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Load one artifact from disk and wrap it as a named classifier
pub fn load_model(name: impl Into<String>, path: impl AsRef<Path>) -> Result<ArtifactClassifier> {
    let path = path.as_ref();
    let format = ModelFormat::from_path(path)?;

    let content =
        std::fs::read_to_string(path).map_err(|e| Error::model_load(path, e.to_string()))?;
    let artifact = format
        .parse(&content)
        .map_err(|reason| Error::model_load(path, reason))?;
    artifact
        .validate()
        .map_err(|reason| Error::model_load(path, reason))?;

    debug!(
        path = %path.display(),
        kind = artifact.kind(),
        n_features = ?artifact.n_features(),
        "Loaded model artifact"
    );

    ArtifactClassifier::new(name, artifact)
}

/// Named, loaded classifiers in registration order
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Classifier>>,
    order: Vec<String>,
}

impl ModelRegistry {
    /// Create an empty model registry
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a classifier under a name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, model: Arc<dyn Classifier>) {
        let name = name.into();
        if self.models.insert(name.clone(), model).is_none() {
            self.order.push(name);
        }
    }

    /// Get a model by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Classifier>> {
        self.models.get(name).cloned()
    }

    /// Load a model file and register it
    pub fn load_and_register(&mut self, name: impl Into<String>, path: PathBuf) -> Result<()> {
        let name = name.into();
        let model = load_model(name.clone(), &path)?;
        self.register(name, Arc::new(model));
        Ok(())
    }

    /// Check if a model is registered
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model names, in registration order
    pub fn model_names(&self) -> &[String] {
        &self.order
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, content: &str) -> PathBuf {
        let path = dir.path().join(file);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ModelFormat::from_path(Path::new("a/knn.json")).unwrap(),
            ModelFormat::Json
        );
        assert_eq!(
            ModelFormat::from_path(Path::new("svm.yml")).unwrap(),
            ModelFormat::Yaml
        );
        assert!(ModelFormat::from_path(Path::new("model.pkl")).is_err());
    }

    #[test]
    fn test_load_json_and_yaml_models() {
        let dir = TempDir::new().unwrap();
        let json = write(
            &dir,
            "lr.json",
            r#"{"kind": "logistic", "n_features": 2, "coefficients": [1.0, 1.0], "intercept": 0.0}"#,
        );
        let yaml = write(&dir, "base.yaml", "kind: constant\nprobability: 0.25\n");

        let lr = load_model("lr", &json).unwrap();
        assert_eq!(lr.n_features(), Some(2));

        let base = load_model("base", &yaml).unwrap();
        let proba = base.predict_proba(array![[1.0, 2.0]].view()).unwrap();
        assert_eq!(proba[[0, 1]], 0.25);
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = TempDir::new().unwrap();
        let broken = write(&dir, "broken.json", "{not json");

        match load_model("broken", &broken) {
            Err(Error::ModelLoad { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected ModelLoad, got {:?}", other.map(|_| ())),
        }

        let invalid = write(
            &dir,
            "invalid.json",
            r#"{"kind": "logistic", "n_features": 3, "coefficients": [1.0], "intercept": 0.0}"#,
        );
        assert!(matches!(
            load_model("invalid", &invalid),
            Err(Error::ModelLoad { .. })
        ));

        assert!(matches!(
            load_model("missing", dir.path().join("missing.json")),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_model_registry() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "c.json", r#"{"kind": "constant", "probability": 0.5}"#);

        let mut registry = ModelRegistry::new();
        assert!(registry.is_empty());

        registry.load_and_register("c", path.clone()).unwrap();
        registry.load_and_register("c", path).unwrap();

        assert!(registry.has_model("c"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("c").unwrap().name(), "c");
    }
}
