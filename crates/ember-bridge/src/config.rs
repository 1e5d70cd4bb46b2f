//! Bridge configuration
//!
//! Names every managed class and descriptor the facade calls. The defaults
//! match Spark's Java API and the companion `Helper` class; the class names
//! can be overridden from the environment for deployments that relocate the
//! helper or shade Spark. A full configuration can also be read from a JSON
//! file named by `EMBER_CONFIG`; fields missing from the file keep their
//! defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a JSON configuration file
pub const CONFIG_FILE_VAR: &str = "EMBER_CONFIG";

/// Environment variable overriding the helper class name
pub const HELPER_CLASS_VAR: &str = "EMBER_HELPER_CLASS";

/// Environment variable overriding the configuration class name
pub const CONF_CLASS_VAR: &str = "EMBER_CONF_CLASS";

/// Environment variable overriding the context class name
pub const CONTEXT_CLASS_VAR: &str = "EMBER_CONTEXT_CLASS";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid configuration
    #[error("invalid bridge configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A method name together with its descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBinding {
    /// Method name
    pub name: String,
    /// Descriptor string, e.g. `(Ljava/lang/String;)V`
    pub signature: String,
}

impl MethodBinding {
    /// Create a binding
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }
}

/// Classes and descriptors of the distributed engine's API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkBindings {
    /// Configuration class
    pub conf_class: String,
    /// Configuration constructor descriptor
    pub conf_constructor: String,
    /// App-name setter on the configuration class (returns the configuration)
    pub set_app_name: MethodBinding,

    /// Context class
    pub context_class: String,
    /// Context constructor descriptor (takes a configuration)
    pub context_constructor: String,

    /// Helper class exposing the static collection operations
    pub helper_class: String,
    /// `parallelize(context, int[]) -> collection`
    pub parallelize: MethodBinding,
    /// `map(collection, byte[]) -> collection`
    pub map: MethodBinding,
    /// `collect(collection) -> int[]`
    pub collect: MethodBinding,
}

impl Default for SparkBindings {
    fn default() -> Self {
        Self {
            conf_class: "org/apache/spark/SparkConf".to_string(),
            conf_constructor: "()V".to_string(),
            set_app_name: MethodBinding::new(
                "setAppName",
                "(Ljava/lang/String;)Lorg/apache/spark/SparkConf;",
            ),
            context_class: "org/apache/spark/api/java/JavaSparkContext".to_string(),
            context_constructor: "(Lorg/apache/spark/SparkConf;)V".to_string(),
            helper_class: "Helper".to_string(),
            parallelize: MethodBinding::new(
                "parallelize",
                "(Lorg/apache/spark/api/java/JavaSparkContext;[I)Lorg/apache/spark/api/java/JavaRDD;",
            ),
            map: MethodBinding::new(
                "map",
                "(Lorg/apache/spark/api/java/JavaRDD;[B)Lorg/apache/spark/api/java/JavaRDD;",
            ),
            collect: MethodBinding::new("collect", "(Lorg/apache/spark/api/java/JavaRDD;)[I"),
        }
    }
}

/// Configuration for a [`SparkBridge`](crate::SparkBridge)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Managed API the facade calls into
    pub spark: SparkBindings,
}

impl BridgeConfig {
    /// Defaults, with class names overridden from `EMBER_*_CLASS` variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|var| env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), but starts from the file named by
    /// `EMBER_CONFIG` when that variable is set
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let base = match env::var_os(CONFIG_FILE_VAR) {
            Some(path) if !path.is_empty() => Self::load(path)?,
            _ => Self::default(),
        };
        Ok(base.with_overrides(|var| env::var(var).ok()))
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::debug!(
            target: crate::LOG_TARGET,
            "loaded bridge configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Apply class-name overrides from an arbitrary lookup.
    ///
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        if let Some(helper) = get(HELPER_CLASS_VAR) {
            self.spark.helper_class = helper;
        }
        if let Some(conf) = get(CONF_CLASS_VAR) {
            self.spark.conf_class = conf;
        }
        if let Some(context) = get(CONTEXT_CLASS_VAR) {
            self.spark.context_class = context;
        }
        self
    }

    /// Use a different helper class
    pub fn with_helper_class(mut self, name: impl Into<String>) -> Self {
        self.spark.helper_class = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_engine_api() {
        let config = BridgeConfig::default();
        assert_eq!(config.spark.conf_class, "org/apache/spark/SparkConf");
        assert_eq!(config.spark.helper_class, "Helper");
        assert_eq!(config.spark.collect.signature, "(Lorg/apache/spark/api/java/JavaRDD;)[I");
        assert!(config.spark.parallelize.signature.contains("[I)"));
        assert!(config.spark.map.signature.contains("[B)"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (HELPER_CLASS_VAR, "com/acme/SparkHelper"),
            (CONF_CLASS_VAR, "   "),
        ]
        .into_iter()
        .collect();

        let config =
            BridgeConfig::default().with_overrides(|var| vars.get(var).map(|v| v.to_string()));
        assert_eq!(config.spark.helper_class, "com/acme/SparkHelper");
        // blank values do not override
        assert_eq!(config.spark.conf_class, "org/apache/spark/SparkConf");
        assert_eq!(
            config.spark.context_class,
            "org/apache/spark/api/java/JavaSparkContext"
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(
            r#"{ "spark": { "helper_class": "com/acme/SparkHelper",
                            "map": { "name": "mapBytes", "signature": "(Lx;[B)Lx;" } } }"#,
        )
        .unwrap();
        assert_eq!(config.spark.helper_class, "com/acme/SparkHelper");
        assert_eq!(config.spark.map, MethodBinding::new("mapBytes", "(Lx;[B)Lx;"));
        assert_eq!(config.spark.collect, SparkBindings::default().collect);
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = BridgeConfig::default().with_helper_class("Other");
        assert_eq!(BridgeConfig::from_json(&config.to_json()).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        let err = BridgeConfig::from_json(r#"{ "spark": { "helper_class": 7 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid bridge configuration"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BridgeConfig::load("/nonexistent/ember.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, Path::new("/nonexistent/ember.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_file() {
        let path = env::temp_dir().join(format!("ember-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "spark": { "context_class": "shaded/Ctx" } }"#).unwrap();
        let config = BridgeConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.spark.context_class, "shaded/Ctx");
        assert_eq!(config.spark.helper_class, "Helper");
    }

    #[test]
    fn test_with_helper_class() {
        let config = BridgeConfig::default().with_helper_class("Other");
        assert_eq!(config.spark.helper_class, "Other");
    }
}
