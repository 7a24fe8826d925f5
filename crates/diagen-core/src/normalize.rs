//! Code normalizer: strips generation artifacts from raw model output and
//! derives the expected artifact filename.
//!
//! The normalizer has no error path. When the text contains no diagram
//! construction statement the artifact name is simply `None`; deciding
//! whether that is a failure is deferred to the executor.

use crate::domain::NormalizedScript;

/// Opening statement of a diagram construction block.
const BLOCK_OPENER: &str = "with Diagram(";

/// Normalize raw generated text.
///
/// Line-level cleanup: lone `.` lines, end-of-text sentinels, notebook
/// cell markers, and bare fence lines are cleared. The construction block
/// starts at the `with Diagram(` statement and ends at the first blank
/// line; outside of it, top-level `diag.` calls are dropped. Finally any
/// remaining fence or triple-quote markers are removed from the joined
/// text.
pub fn normalize(raw: &str) -> NormalizedScript {
    let mut updated_lines: Vec<String> = Vec::new();
    let mut artifact_name: Option<String> = None;
    let mut inside_block = false;

    for raw_line in raw.lines() {
        let mut line = raw_line.to_string();

        if line == "." || line == "```" || line.contains("endoftext") || line.contains("# In[") {
            line.clear();
        }

        if line.contains(BLOCK_OPENER) {
            line = line.replace('/', "_");

            let after_opener = line.split(BLOCK_OPENER).nth(1).unwrap_or("");
            let title = after_opener
                .split(',')
                .next()
                .unwrap_or("")
                .trim_matches('\'')
                .trim_matches('"');
            artifact_name = Some(derive_artifact_name(title));

            // An explicit filename parameter overrides the derived name.
            if let Some(param) = line.split("filename=").nth(1) {
                let explicit = param
                    .split(')')
                    .next()
                    .unwrap_or("")
                    .trim_matches('\'')
                    .trim_matches('"');
                artifact_name = Some(format!("{explicit}.png"));
            }

            inside_block = true;
        }

        if inside_block && line.trim().is_empty() {
            inside_block = false;
        }

        if inside_block || !line.trim_start().starts_with("diag.") {
            updated_lines.push(line);
        }
    }

    let code = updated_lines
        .join("\n")
        .replace("```python", "")
        .replace("```", "")
        .replace("\"\"\"", "");

    NormalizedScript {
        code,
        artifact_name,
    }
}

/// Lowercase the declared title, replace whitespace with underscores,
/// strip quote/slash/colon characters, and append the image extension.
fn derive_artifact_name(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' => '_',
            _ => c,
        })
        .filter(|c| !matches!(c, ')' | '"' | '\'' | ':'))
        .collect();
    format!("{slug}.png")
}
