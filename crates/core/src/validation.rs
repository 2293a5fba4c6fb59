/// Structural pre-compilation checks for generated Solidity source
///
/// This is a cheap smoke test, not a parser. Every check runs on every call
/// so a single pass reports all problems at once.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CONTRACT_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcontract\s+([A-Za-z_][A-Za-z0-9_]*)").expect("contract declaration pattern"));

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// True when `problems` is empty
    pub valid: bool,

    /// Human-readable problems, in check order
    pub problems: Vec<String>,
}

impl SourceReport {
    fn from_problems(problems: Vec<String>) -> Self {
        Self {
            valid: problems.is_empty(),
            problems,
        }
    }
}

/// A single structural rule
struct SourceCheck {
    problem: &'static str,
    passes: fn(&str) -> bool,
}

const CHECKS: &[SourceCheck] = &[
    SourceCheck {
        problem: "Missing license or pragma solidity directive",
        passes: |source| source.contains("SPDX-License-Identifier") || source.contains("pragma solidity"),
    },
    SourceCheck {
        problem: "No contract definition found",
        passes: |source| source.contains("contract "),
    },
    SourceCheck {
        problem: "Unbalanced braces",
        passes: |source| balanced(source, '{', '}'),
    },
    SourceCheck {
        problem: "Unbalanced parentheses",
        passes: |source| balanced(source, '(', ')'),
    },
    SourceCheck {
        problem: "Invalid contract declaration",
        passes: |source| source.lines().any(|line| CONTRACT_DECLARATION.is_match(line)),
    },
];

fn balanced(source: &str, open: char, close: char) -> bool {
    let opened = source.chars().filter(|c| *c == open).count();
    let closed = source.chars().filter(|c| *c == close).count();
    opened == closed
}

/// Run every structural check over `source`
pub fn validate_source(source: &str) -> SourceReport {
    let problems = CHECKS
        .iter()
        .filter(|check| !(check.passes)(source))
        .map(|check| check.problem.to_string())
        .collect();

    SourceReport::from_problems(problems)
}

/// Name of the first contract declared in `source`
pub fn extract_contract_name(source: &str) -> Option<String> {
    CONTRACT_DECLARATION
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Every declared contract name, in source order
pub fn declared_contracts(source: &str) -> Vec<String> {
    CONTRACT_DECLARATION
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

contract Minimal {
    function ping() public pure returns (uint256) {
        return 1;
    }
}
"#;

    #[test]
    fn test_minimal_contract_is_valid() {
        let report = validate_source(MINIMAL);
        assert!(report.valid);
        assert!(report.problems.is_empty());
    }

    #[test]
    fn test_unbalanced_braces_reported_independently() {
        let source = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\ncontract Broken { function f() public { }\n";
        let report = validate_source(source);

        assert!(!report.valid);
        assert_eq!(report.problems, vec!["Unbalanced braces".to_string()]);
    }

    #[test]
    fn test_all_problems_reported_in_one_pass() {
        let report = validate_source("function f( {");
        assert_eq!(
            report.problems,
            vec![
                "Missing license or pragma solidity directive",
                "No contract definition found",
                "Unbalanced braces",
                "Unbalanced parentheses",
                "Invalid contract declaration",
            ]
        );
    }

    #[test]
    fn test_contract_keyword_without_identifier_is_invalid_declaration() {
        let report = validate_source("pragma solidity ^0.8.20;\n// a contract  \n");
        assert!(!report.valid);
        assert_eq!(report.problems, vec!["Invalid contract declaration".to_string()]);
    }

    #[test]
    fn test_extract_contract_names() {
        let source = "contract Base {}\ncontract Widget is Base {}\n";
        assert_eq!(extract_contract_name(source).as_deref(), Some("Base"));
        assert_eq!(declared_contracts(source), vec!["Base".to_string(), "Widget".to_string()]);
        assert_eq!(extract_contract_name(MINIMAL).as_deref(), Some("Minimal"));
    }
}
