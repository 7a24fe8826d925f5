//! Reference mapping table and rendering-library symbol registry.
//!
//! The [`ServiceMap`] translates human/LLM-facing service names into the
//! fully qualified symbols of the rendering library. It is loaded once at
//! process start and never mutated afterwards; a malformed table is a
//! fatal startup error, never a per-request one.
//!
//! The [`SymbolRegistry`] answers "does symbol X exist in module Y" as a
//! capability lookup against a compile-time table of known symbols, so
//! resolution never depends on runtime reflection into the rendering
//! library.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::domain::{DiagenError, Result};

/// Default mapping table shipped with the crate.
const DEFAULT_MAPPING: &str = include_str!("../assets/diag_mapping.json");

/// Read-only registry: symbolic service name → fully qualified symbol.
///
/// Whole-word detection patterns are compiled once at load time, keyed
/// longest-first, so per-invocation resolution is pure matching.
#[derive(Debug, Clone)]
pub struct ServiceMap {
    entries: BTreeMap<String, String>,
    detectors: Vec<(String, Regex)>,
}

impl ServiceMap {
    /// Parse a mapping table from JSON text.
    ///
    /// The table must be a JSON object whose values are non-empty strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| DiagenError::MappingTable(e.to_string()))?;
        for (key, value) in &entries {
            if key.trim().is_empty() || value.trim().is_empty() {
                return Err(DiagenError::MappingTable(format!(
                    "empty key or value in entry {key:?} -> {value:?}"
                )));
            }
        }

        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let detectors = keys
            .into_iter()
            .map(|key| {
                let pattern = format!(r"\b{}\b", regex::escape(key));
                let re = Regex::new(&pattern)
                    .expect("escaped service name is a valid pattern");
                (key.clone(), re)
            })
            .collect();

        Ok(Self { entries, detectors })
    }

    /// Load a mapping table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DiagenError::MappingTable(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&json)
    }

    /// The mapping table bundled with the crate.
    pub fn builtin() -> Self {
        Self::from_json_str(DEFAULT_MAPPING).expect("bundled mapping table is valid JSON")
    }

    /// Look up the fully qualified symbol for a service name.
    pub fn get(&self, service: &str) -> Option<&str> {
        self.entries.get(service).map(String::as_str)
    }

    /// All service names, longest first.
    ///
    /// Longest-first ordering lets the resolver match a specific name
    /// before a shorter name that is a substring of another token.
    pub fn keys_longest_first(&self) -> Vec<&str> {
        self.detectors.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Service names paired with their compiled whole-word detection
    /// patterns, longest key first.
    pub fn detectors(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.detectors.iter().map(|(key, re)| (key.as_str(), re))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Known symbols per rendering-library module.
///
/// Acts as the capability check for resolved imports: a (module, symbol)
/// pair the registry does not list is treated as unresolvable.
const KNOWN_SYMBOLS: &[(&str, &[&str])] = &[
    ("diagrams", &["Diagram", "Cluster", "Edge", "Node"]),
    (
        "diagrams.aws.analytics",
        &["Analytics", "Athena", "EMR", "Glue", "Kinesis", "Quicksight"],
    ),
    (
        "diagrams.aws.compute",
        &[
            "Batch",
            "EC2",
            "ECS",
            "EKS",
            "ElasticBeanstalk",
            "Fargate",
            "Lambda",
            "Lightsail",
        ],
    ),
    (
        "diagrams.aws.database",
        &[
            "Aurora",
            "Dynamodb",
            "ElastiCache",
            "Neptune",
            "RDS",
            "Redshift",
            "Timestream",
        ],
    ),
    (
        "diagrams.aws.integration",
        &["Appsync", "Eventbridge", "MQ", "SNS", "SQS", "StepFunctions"],
    ),
    (
        "diagrams.aws.management",
        &[
            "Cloudformation",
            "Cloudtrail",
            "Cloudwatch",
            "Config",
            "SystemsManager",
        ],
    ),
    (
        "diagrams.aws.ml",
        &["Comprehend", "Personalize", "Rekognition", "Sagemaker"],
    ),
    (
        "diagrams.aws.network",
        &[
            "APIGateway",
            "CDN",
            "DirectConnect",
            "ELB",
            "NLB",
            "Route53",
            "VPC",
        ],
    ),
    (
        "diagrams.aws.security",
        &["Cognito", "IAM", "KMS", "Secretsmanager", "Shield", "WAF"],
    ),
    ("diagrams.aws.storage", &["Backup", "EFS", "FSx", "S3"]),
];

/// Compile-time-built table of valid rendering-library symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry;

impl SymbolRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Whether `module` is a known rendering-library module.
    pub fn has_module(&self, module: &str) -> bool {
        KNOWN_SYMBOLS.iter().any(|(m, _)| *m == module)
    }

    /// Whether `symbol` exists in `module`.
    pub fn contains(&self, module: &str, symbol: &str) -> bool {
        KNOWN_SYMBOLS
            .iter()
            .find(|(m, _)| *m == module)
            .map(|(_, symbols)| symbols.contains(&symbol))
            .unwrap_or(false)
    }
}
