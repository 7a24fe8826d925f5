//! Import resolver: detects mapping-table service names in a normalized
//! script and prepends the import block they require.
//!
//! Detection is whole-word and scans keys longest-first, so a specific
//! branded name wins over a shorter name embedded in an unrelated token.
//! A detected key whose target cannot be resolved (short symbol path, or
//! a symbol the registry does not know) is skipped rather than failed;
//! the model's own reference then surfaces as an execution error.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::domain::{NormalizedScript, ResolvedScript};
use crate::mapping::{ServiceMap, SymbolRegistry};

/// Import for the diagram-construction namespace itself, prepended ahead
/// of the service imports.
const BASE_IMPORT: &str = "from diagrams import Diagram";

/// Minimum dotted-segment count for a resolvable fully qualified symbol
/// (e.g. `diagrams.aws.database.Dynamodb`).
const MIN_SYMBOL_SEGMENTS: usize = 4;

/// Resolve service references in `script` and prepend the import block.
pub fn resolve_imports(
    script: &NormalizedScript,
    map: &ServiceMap,
    registry: &SymbolRegistry,
) -> ResolvedScript {
    let mut imports: BTreeSet<String> = BTreeSet::new();

    for (service, re) in map.detectors() {
        if !re.is_match(&script.code) {
            continue;
        }

        let target = match map.get(service) {
            Some(target) => target,
            None => continue,
        };
        debug!(event = "resolve.detected", service = %service, target = %target);

        let segments: Vec<&str> = target.split('.').collect();
        if segments.len() < MIN_SYMBOL_SEGMENTS {
            warn!(event = "resolve.skipped", service = %service, target = %target,
                  reason = "symbol path too short");
            continue;
        }

        let module = segments[..segments.len() - 1].join(".");
        let class_name = segments[segments.len() - 1];

        if !registry.contains(&module, class_name) {
            warn!(event = "resolve.skipped", service = %service, target = %target,
                  reason = "unknown symbol");
            continue;
        }

        // Alias the import whenever the service name differs from the
        // class name, so the script's own references keep working.
        let statement = if service != class_name {
            format!("from {module} import {class_name} as {service}")
        } else {
            format!("from {module} import {class_name}")
        };
        imports.insert(statement);
    }

    if imports.is_empty() {
        debug!(event = "resolve.no_imports");
        return ResolvedScript {
            code: script.code.clone(),
        };
    }

    let mut block: Vec<&str> = vec![BASE_IMPORT];
    block.extend(imports.iter().map(String::as_str));

    ResolvedScript {
        code: format!("{}\n\n{}", block.join("\n"), script.code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(code: &str) -> NormalizedScript {
        NormalizedScript {
            code: code.to_string(),
            artifact_name: None,
        }
    }

    fn resolve(code: &str) -> String {
        resolve_imports(
            &normalized(code),
            &ServiceMap::builtin(),
            &SymbolRegistry::new(),
        )
        .code
    }

    #[test]
    fn test_aliased_import_for_differing_name() {
        let code = resolve("with Diagram('T', show=False):\n    db = DynamoDB('tbl')\n");
        assert!(code.contains("from diagrams.aws.database import Dynamodb as DynamoDB"));
    }

    #[test]
    fn test_plain_import_for_matching_name() {
        let code = resolve("with Diagram('T', show=False):\n    b = S3('bucket')\n");
        assert!(code.contains("from diagrams.aws.storage import S3\n"));
        assert!(!code.contains("S3 as S3"));
    }

    #[test]
    fn test_import_emitted_exactly_once() {
        let code =
            resolve("a = Lambda('a')\nb = Lambda('b')\nc = Lambda('c')\n");
        let count = code
            .matches("from diagrams.aws.compute import Lambda")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_no_substring_match_inside_longer_token() {
        let code = resolve("bucket = MyS3Wrapper('x')\n");
        assert!(!code.contains("from diagrams.aws.storage import S3"));
    }

    #[test]
    fn test_base_import_prepended_first() {
        let code = resolve("q = SQS('queue')\n");
        assert!(code.starts_with("from diagrams import Diagram\n"));
    }

    #[test]
    fn test_no_detection_leaves_code_untouched() {
        let code = resolve("x = 1\n");
        assert_eq!(code, "x = 1\n");
    }

    #[test]
    fn test_unresolvable_key_silently_skipped() {
        let map = ServiceMap::from_json_str(
            r#"{"Phantom": "diagrams.aws.database.NoSuchClass",
                "Shallow": "diagrams.Diagram",
                "SQS": "diagrams.aws.integration.SQS"}"#,
        )
        .unwrap();
        let script = normalized("a = Phantom('x')\nb = Shallow('y')\nc = SQS('z')\n");
        let code = resolve_imports(&script, &map, &SymbolRegistry::new()).code;
        assert!(!code.contains("import NoSuchClass"));
        assert!(!code.contains("as Phantom"));
        assert!(!code.contains("import Diagram as Shallow"));
        assert!(code.contains("from diagrams.aws.integration import SQS"));
    }

    #[test]
    fn test_imports_sorted_and_deduplicated() {
        let code = resolve("s = SNS('t')\nq = SQS('q')\nl = Lambda('f')\n");
        let sns = code.find("import SNS").unwrap();
        let sqs = code.find("import SQS").unwrap();
        let lambda = code.find("import Lambda").unwrap();
        assert!(lambda < sns, "compute sorts before integration");
        assert!(sns < sqs);
    }
}
