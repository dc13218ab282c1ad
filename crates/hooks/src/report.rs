//! Outcome aggregation and report rendering

use crate::types::{HookStatus, Outcome};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// All hooks passed or were skipped.
pub const EXIT_PASS: i32 = 0;
/// A hook failed, or files were modified under `fail_on_modified`.
pub const EXIT_FAILED: i32 = 1;
/// A hook could not be carried out (environment or execution error).
pub const EXIT_ERRORED: i32 = 3;
/// The run was interrupted.
pub const EXIT_CANCELLED: i32 = 130;

/// Width of the name column in text reports.
const LINE_WIDTH: usize = 79;

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Nothing failed
    Pass,
    /// Something failed, errored, was cancelled or modified files
    Fail,
}

/// How outcomes fold into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPolicy {
    /// Files rewritten by hooks fail the run
    pub fail_on_modified: bool,
    /// The run was interrupted
    pub cancelled: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            fail_on_modified: true,
            cancelled: false,
        }
    }
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Hooks that passed
    pub passed: usize,
    /// Hooks that failed
    pub failed: usize,
    /// Hooks that errored
    pub errored: usize,
    /// Hooks that were skipped
    pub skipped: usize,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcomes in declaration order
    pub outcomes: Vec<Outcome>,
    /// Overall verdict
    pub verdict: Verdict,
    /// Whether any hook rewrote files
    pub modified: bool,
    /// Whether the run was interrupted
    pub cancelled: bool,
    /// Process exit code for the run
    pub exit_code: i32,
    /// Per-status totals
    pub counts: StatusCounts,
}

impl RunReport {
    /// Fold outcomes into a report.
    ///
    /// `expected` holds the declaration index of every planned hook; there
    /// must be exactly one outcome for each and no other. Outcomes may
    /// arrive in any order and are reported in declaration order.
    pub fn aggregate(
        mut outcomes: Vec<Outcome>,
        expected: &[usize],
        policy: AggregationPolicy,
    ) -> Result<Self> {
        let planned: BTreeSet<usize> = expected.iter().copied().collect();
        let mut seen = BTreeSet::new();
        for outcome in &outcomes {
            if !planned.contains(&outcome.index) {
                return Err(Error::aggregation(format!(
                    "outcome for unplanned hook #{} ('{}')",
                    outcome.index, outcome.id
                )));
            }
            if !seen.insert(outcome.index) {
                return Err(Error::aggregation(format!(
                    "duplicate outcome for hook #{} ('{}')",
                    outcome.index, outcome.id
                )));
            }
        }
        if let Some(missing) = planned.difference(&seen).next() {
            return Err(Error::aggregation(format!(
                "no outcome recorded for hook #{missing}"
            )));
        }

        outcomes.sort_by_key(|o| o.index);

        let mut counts = StatusCounts::default();
        for outcome in &outcomes {
            match outcome.status {
                HookStatus::Passed => counts.passed += 1,
                HookStatus::Failed => counts.failed += 1,
                HookStatus::Errored => counts.errored += 1,
                HookStatus::Skipped => counts.skipped += 1,
            }
        }
        let modified = outcomes.iter().any(|o| o.files_modified);

        let exit_code = if policy.cancelled {
            EXIT_CANCELLED
        } else if counts.errored > 0 {
            EXIT_ERRORED
        } else if counts.failed > 0 || (modified && policy.fail_on_modified) {
            EXIT_FAILED
        } else {
            EXIT_PASS
        };
        let verdict = if exit_code == EXIT_PASS {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Ok(Self {
            outcomes,
            verdict,
            modified,
            cancelled: policy.cancelled,
            exit_code,
            counts,
        })
    }

    /// Whether the run passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization(format!("Failed to encode report: {e}")))
    }

    /// Human-readable report: one line per hook in declaration order,
    /// details for anything that did not pass (or is verbose), and a summary.
    #[must_use]
    pub fn render_text(&self, colors: bool, verbose: bool) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            render_outcome(&mut out, outcome, colors, verbose);
        }

        let summary = format!(
            "{} passed, {} failed, {} errored, {} skipped",
            self.counts.passed, self.counts.failed, self.counts.errored, self.counts.skipped
        );
        let _ = writeln!(out, "{summary}");
        if self.cancelled {
            let _ = writeln!(out, "{}", paint("Run cancelled", "31", colors));
        }
        if self.modified {
            let _ = writeln!(
                out,
                "Files were modified by hooks; review and stage the changes"
            );
        }
        out
    }
}

fn render_outcome(out: &mut String, outcome: &Outcome, colors: bool, verbose: bool) {
    let (label, color) = match outcome.status {
        HookStatus::Passed => ("Passed", "32"),
        HookStatus::Failed => ("Failed", "31"),
        HookStatus::Errored => ("Errored", "31"),
        HookStatus::Skipped => ("Skipped", "33"),
    };
    let note = match (&outcome.status, &outcome.reason) {
        (HookStatus::Skipped, Some(reason)) => format!("({reason})"),
        _ => String::new(),
    };

    let used = outcome.name.chars().count() + note.chars().count() + label.len();
    let dots = ".".repeat(LINE_WIDTH.saturating_sub(used).max(3));
    let _ = writeln!(
        out,
        "{}{dots}{note}{}",
        outcome.name,
        paint(label, color, colors)
    );

    let show_details = outcome.status.is_failure() || outcome.files_modified;
    let show_output = show_details || verbose || outcome.verbose;
    if outcome.status == HookStatus::Skipped || !show_output {
        return;
    }

    let _ = writeln!(out, "- hook id: {}", outcome.id);
    let _ = writeln!(out, "- duration: {:.2}s", outcome.duration_ms as f64 / 1000.0);
    if outcome.status == HookStatus::Failed
        && let Some(code) = outcome.exit_code
    {
        let _ = writeln!(out, "- exit code: {code}");
    }
    if let Some(reason) = &outcome.reason {
        let _ = writeln!(out, "- reason: {reason}");
    }
    if outcome.files_modified {
        let _ = writeln!(out, "- files were modified by this hook");
    }

    for captured in [&outcome.stdout, &outcome.stderr] {
        let trimmed = captured.trim_end();
        if !trimmed.is_empty() {
            let _ = writeln!(out, "\n{trimmed}");
        }
    }
    out.push('\n');
}

fn paint(text: &str, code: &str, colors: bool) -> String {
    if colors {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, id: &str, status: HookStatus) -> Outcome {
        let mut outcome = match status {
            HookStatus::Skipped => Outcome::skipped(index, id, id, "no files to check"),
            HookStatus::Errored => Outcome::errored(index, id, id, "timed out after 5s"),
            _ => Outcome::skipped(index, id, id, ""),
        };
        outcome.status = status;
        if matches!(status, HookStatus::Passed | HookStatus::Failed) {
            outcome.reason = None;
            outcome.exit_code = Some(i32::from(status == HookStatus::Failed));
            outcome.batches = 1;
        }
        outcome
    }

    fn aggregate(outcomes: Vec<Outcome>) -> RunReport {
        let expected: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        RunReport::aggregate(outcomes, &expected, AggregationPolicy::default()).unwrap()
    }

    #[test]
    fn test_outcomes_are_reported_in_declaration_order() {
        let report = aggregate(vec![
            outcome(2, "c", HookStatus::Passed),
            outcome(0, "a", HookStatus::Passed),
            outcome(1, "b", HookStatus::Passed),
        ]);
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_only_passed_and_skipped_pass() {
        let report = aggregate(vec![
            outcome(0, "a", HookStatus::Passed),
            outcome(1, "b", HookStatus::Skipped),
        ]);
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.exit_code, EXIT_PASS);
        assert_eq!(report.counts.skipped, 1);
    }

    #[test]
    fn test_failure_and_error_exit_codes() {
        let failed = aggregate(vec![
            outcome(0, "a", HookStatus::Passed),
            outcome(1, "b", HookStatus::Failed),
        ]);
        assert_eq!(failed.verdict, Verdict::Fail);
        assert_eq!(failed.exit_code, EXIT_FAILED);

        let errored = aggregate(vec![
            outcome(0, "a", HookStatus::Failed),
            outcome(1, "b", HookStatus::Errored),
        ]);
        assert_eq!(errored.verdict, Verdict::Fail);
        assert_eq!(errored.exit_code, EXIT_ERRORED);
    }

    #[test]
    fn test_cancelled_run_fails_with_130() {
        let report = RunReport::aggregate(
            vec![outcome(0, "a", HookStatus::Passed)],
            &[0],
            AggregationPolicy {
                fail_on_modified: true,
                cancelled: true,
            },
        )
        .unwrap();
        assert_eq!(report.exit_code, EXIT_CANCELLED);
        assert!(report.cancelled);
        assert!(!report.passed());
    }

    #[test]
    fn test_modified_files_policy() {
        let mut fixed = outcome(0, "fmt", HookStatus::Passed);
        fixed.files_modified = true;

        let strict = aggregate(vec![fixed.clone()]);
        assert!(strict.modified);
        assert_eq!(strict.exit_code, EXIT_FAILED);

        let lenient = RunReport::aggregate(
            vec![fixed],
            &[0],
            AggregationPolicy {
                fail_on_modified: false,
                cancelled: false,
            },
        )
        .unwrap();
        assert!(lenient.modified);
        assert_eq!(lenient.verdict, Verdict::Pass);
    }

    #[test]
    fn test_missing_duplicate_and_unplanned_outcomes_are_errors() {
        let policy = AggregationPolicy::default();

        let missing =
            RunReport::aggregate(vec![outcome(0, "a", HookStatus::Passed)], &[0, 1], policy);
        assert!(matches!(missing, Err(Error::Aggregation { .. })));

        let duplicate = RunReport::aggregate(
            vec![
                outcome(0, "a", HookStatus::Passed),
                outcome(0, "a", HookStatus::Failed),
            ],
            &[0],
            policy,
        );
        assert!(matches!(duplicate, Err(Error::Aggregation { .. })));

        let unplanned =
            RunReport::aggregate(vec![outcome(5, "x", HookStatus::Passed)], &[0], policy);
        assert!(matches!(unplanned, Err(Error::Aggregation { .. })));
    }

    #[test]
    fn test_text_rendering_distinguishes_skipped() {
        let mut failing = outcome(2, "lint", HookStatus::Failed);
        failing.stdout = "src/a.py:1: E501\n".to_string();
        let report = aggregate(vec![
            outcome(0, "check-yaml", HookStatus::Passed),
            outcome(1, "mypy", HookStatus::Skipped),
            failing,
        ]);

        let text = report.render_text(false, false);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("check-yaml..."));
        assert!(lines[0].ends_with("Passed"));
        assert!(lines[1].ends_with("(no files to check)Skipped"));
        assert!(lines[2].starts_with("lint..."));
        assert!(lines[2].ends_with("Failed"));
        assert!(text.contains("- exit code: 1"));
        assert!(text.contains("src/a.py:1: E501"));
        assert!(text.contains("1 passed, 1 failed, 0 errored, 1 skipped"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn test_errored_hook_shows_reason() {
        let report = aggregate(vec![outcome(0, "slow", HookStatus::Errored)]);
        let text = report.render_text(false, false);
        assert!(text.contains("- reason: timed out after 5s"));
    }

    #[test]
    fn test_json_rendering() {
        let report = aggregate(vec![outcome(0, "a", HookStatus::Skipped)]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["verdict"], "pass");
        assert_eq!(value["outcomes"][0]["status"], "skipped");
        assert_eq!(value["outcomes"][0]["reason"], "no files to check");
        assert_eq!(value["exit_code"], 0);
    }
}
