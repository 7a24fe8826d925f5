//! Security validator: denylist/allowlist gate for resolved scripts.
//!
//! Two checks, both of which must pass: no denylisted construct anywhere
//! in the text, and every import statement confined to the trusted
//! rendering namespace. Rejection is terminal for the attempt; there is
//! no partial execution or salvage of otherwise-valid lines.
//!
//! Known limitation: pattern matching over source text is inherently
//! bypassable. A stronger gate would parse the script and admit only a
//! narrow declarative subset; until then this validator is one layer in
//! front of the process sandbox, not a substitute for it.

use regex::Regex;
use tracing::warn;

/// Dangerous call and operator patterns rejected anywhere in the script.
const DENYLIST_PATTERNS: &[&str] = &[
    r"(?i)\bos\.system\b",
    r"(?i)\bsubprocess\.call\b",
    r"(?i)\bsubprocess\.Popen\b",
    r"(?i)\beval\b",
    r"(?i)\bexec\b",
    r"(?i)\b__import__\b",
    r"(?i)\bopen\s*\(",
    r"(?i)\bfile\s*\(",
    r"(?i)\binput\s*\(",
    r"(?i)\braw_input\s*\(",
];

/// Import forms naming the trusted rendering namespace.
const ALLOWED_IMPORT_PATTERNS: &[&str] = &[
    r"(?i)from diagrams import",
    r"(?i)from diagrams\.",
    r"(?i)import diagrams",
];

/// Why a script was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionCause {
    /// A denylisted construct matched; carries the offending pattern.
    DeniedPattern(String),
    /// An import statement outside the trusted namespace; carries the line.
    UntrustedImport(String),
}

impl std::fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionCause::DeniedPattern(pattern) => {
                write!(f, "dangerous pattern: {pattern}")
            }
            RejectionCause::UntrustedImport(line) => {
                write!(f, "unsafe import: {line}")
            }
        }
    }
}

/// Outcome of validation. A rejected script never reaches the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptVerdict {
    Accepted,
    Rejected(RejectionCause),
}

impl ScriptVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScriptVerdict::Accepted)
    }
}

/// Denylist/allowlist gate with patterns compiled once per process.
#[derive(Debug)]
pub struct SecurityValidator {
    denylist: Vec<Regex>,
    allowlist: Vec<Regex>,
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityValidator {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("built-in security pattern is valid"))
                .collect()
        };
        Self {
            denylist: compile(DENYLIST_PATTERNS),
            allowlist: compile(ALLOWED_IMPORT_PATTERNS),
        }
    }

    /// Validate a resolved script. Both gates must pass.
    pub fn validate(&self, code: &str) -> ScriptVerdict {
        for re in &self.denylist {
            if re.is_match(code) {
                warn!(event = "validate.denied", pattern = re.as_str());
                return ScriptVerdict::Rejected(RejectionCause::DeniedPattern(
                    re.as_str().to_string(),
                ));
            }
        }

        for line in code.lines() {
            let line = line.trim();
            if !line.starts_with("import ") && !line.starts_with("from ") {
                continue;
            }
            let allowed = self.allowlist.iter().any(|re| re.is_match(line));
            if !allowed {
                warn!(event = "validate.untrusted_import", line = %line);
                return ScriptVerdict::Rejected(RejectionCause::UntrustedImport(
                    line.to_string(),
                ));
            }
        }

        ScriptVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SecurityValidator {
        SecurityValidator::new()
    }

    #[test]
    fn test_accepts_trusted_rendering_imports() {
        let code = "from diagrams import Diagram\n\
                    from diagrams.aws.storage import S3\n\
                    import diagrams\n\
                    with Diagram('A', show=False):\n    b = S3('bucket')\n";
        assert!(validator().validate(code).is_accepted());
    }

    #[test]
    fn test_rejects_denylisted_pattern_despite_trusted_imports() {
        let code = "from diagrams import Diagram\n\
                    eval('1+1')\n";
        match validator().validate(code) {
            ScriptVerdict::Rejected(RejectionCause::DeniedPattern(p)) => {
                assert!(p.contains("eval"));
            }
            other => panic!("expected DeniedPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_import_outside_trusted_namespace() {
        let code = "from diagrams import Diagram\nimport os\n";
        match validator().validate(code) {
            ScriptVerdict::Rejected(RejectionCause::UntrustedImport(line)) => {
                assert_eq!(line, "import os");
            }
            other => panic!("expected UntrustedImport, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_each_dangerous_construct() {
        for snippet in [
            "os.system('ls')",
            "subprocess.call(['ls'])",
            "subprocess.Popen(['ls'])",
            "exec(payload)",
            "__import__('os')",
            "open('/etc/passwd')",
            "open ('/etc/passwd')",
            "input()",
            "raw_input()",
        ] {
            assert!(
                !validator().validate(snippet).is_accepted(),
                "expected rejection for {snippet:?}"
            );
        }
    }

    #[test]
    fn test_word_boundary_does_not_overmatch() {
        // `evaluate` and `executor` contain `eval`/`exec` as prefixes but
        // are not the denylisted identifiers.
        let code = "evaluate_cost = 1\nexecutor_count = 2\n";
        assert!(validator().validate(code).is_accepted());
    }

    #[test]
    fn test_rejection_cause_display() {
        let cause = RejectionCause::UntrustedImport("import socket".to_string());
        assert!(cause.to_string().contains("import socket"));
    }
}
