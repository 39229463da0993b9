//! The subset of GitHub's `check_run` webhook payload this worker reads.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub check_run: Option<CheckRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRun {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub check_suite: Option<CheckSuite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckSuite {
    pub id: u64,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
}

/// A completed, failed check run on the watched branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub suite_id: u64,
    pub head_sha: String,
    pub name: String,
    pub details_url: String,
}

impl FailedJob {
    /// Set member recorded for this job. The URL is wrapped in `<>` so Discord
    /// does not unfurl it.
    pub fn ledger_entry(&self) -> String {
        format!("{}: <{}>", self.name, self.details_url)
    }
}

impl CheckRunEvent {
    pub fn failure_on(&self, branch: &str) -> Option<FailedJob> {
        let run = self.check_run.as_ref()?;
        let suite = run.check_suite.as_ref()?;
        if suite.head_branch.as_deref() != Some(branch)
            || self.action.as_deref() != Some("completed")
            || run.conclusion.as_deref() != Some("failure")
        {
            return None;
        }
        Some(FailedJob {
            suite_id: suite.id,
            head_sha: suite.head_sha.clone().unwrap_or_default(),
            name: run.name.clone().unwrap_or_else(|| "unnamed job".into()),
            details_url: run.details_url.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(action: &str, conclusion: &str, branch: &str) -> CheckRunEvent {
        serde_json::from_value(json!({
            "action": action,
            "check_run": {
                "name": "build (linux)",
                "conclusion": conclusion,
                "details_url": "https://github.com/o/r/runs/1",
                "check_suite": { "id": 42, "head_sha": "abc123", "head_branch": branch }
            }
        }))
        .unwrap()
    }

    #[test]
    fn only_completed_failures_on_the_branch_count() {
        let job = event("completed", "failure", "master").failure_on("master").unwrap();
        assert_eq!(job.suite_id, 42);
        assert_eq!(job.ledger_entry(), "build (linux): <https://github.com/o/r/runs/1>");

        assert!(event("created", "failure", "master").failure_on("master").is_none());
        assert!(event("completed", "success", "master").failure_on("master").is_none());
        assert!(event("completed", "failure", "feature").failure_on("master").is_none());
    }

    #[test]
    fn missing_sections_are_not_failures() {
        let bare: CheckRunEvent = serde_json::from_value(json!({"action": "completed"})).unwrap();
        assert!(bare.failure_on("master").is_none());
    }
}
