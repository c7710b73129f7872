//! Per-step results of an ingestion run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// One unit of work performed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Connect,
    Engine,
    Schema { name: String },
    Load { path: PathBuf, target: String },
    Script { path: PathBuf },
}

impl Step {
    /// Whether a failure of this step ends the run.
    pub fn criticality(&self) -> Criticality {
        match self {
            Self::Connect | Self::Engine => Criticality::Fatal,
            Self::Schema { .. } | Self::Load { .. } | Self::Script { .. } => Criticality::Continue,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Engine => f.write_str("engine"),
            Self::Schema { name } => write!(f, "schema {name}"),
            Self::Load { target, .. } => write!(f, "load {target}"),
            Self::Script { path } => write!(f, "script {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Fatal,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Not attempted because an earlier step halted the run.
    Skipped,
}

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
    pub error: Option<String>,
    /// Free-form detail such as the number of rows written.
    pub detail: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Every step of a run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    /// Set when a failed step stopped the remaining ones.
    pub halted: bool,
}

impl RunReport {
    pub fn push(&mut self, report: StepReport) {
        self.steps.push(report);
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.outcome == Outcome::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.count(Outcome::Failed) == 0 && !self.halted
    }

    /// Log a one-line summary plus one line per failed step.
    pub fn log_summary(&self) {
        let elapsed: Duration = self.steps.iter().map(|s| s.elapsed).sum();
        for failure in self.failures() {
            tracing::warn!(
                step = %failure.step,
                error = failure.error.as_deref().unwrap_or(""),
                "Step failed"
            );
        }
        tracing::info!(
            succeeded = self.count(Outcome::Succeeded),
            failed = self.count(Outcome::Failed),
            skipped = self.count(Outcome::Skipped),
            halted = self.halted,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ingestion run finished"
        );
        match serde_json::to_string(self) {
            Ok(json) => tracing::debug!(report = %json, "Run report"),
            Err(e) => tracing::debug!(error = %e, "Could not serialize run report"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step: Step, outcome: Outcome) -> StepReport {
        StepReport {
            step,
            outcome,
            error: (outcome == Outcome::Failed).then(|| "boom".to_owned()),
            detail: None,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn only_connection_steps_are_fatal() {
        assert_eq!(Step::Connect.criticality(), Criticality::Fatal);
        assert_eq!(Step::Engine.criticality(), Criticality::Fatal);
        assert_eq!(
            Step::Script {
                path: "GEOPROCESOS.sql".into()
            }
            .criticality(),
            Criticality::Continue
        );
    }

    #[test]
    fn counts_by_outcome() {
        let mut report = RunReport::default();
        report.push(step(Step::Connect, Outcome::Succeeded));
        report.push(step(
            Step::Schema {
                name: "entradas".into(),
            },
            Outcome::Failed,
        ));
        report.push(step(
            Step::Script {
                path: "GEOPROCESOS.sql".into(),
            },
            Outcome::Skipped,
        ));

        assert_eq!(report.count(Outcome::Succeeded), 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.count(Outcome::Skipped), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn serializes_with_tagged_steps() {
        let mut report = RunReport::default();
        report.push(step(
            Step::Load {
                path: "PRC/PRC13106.shp".into(),
                target: "entradas.PRC13106".into(),
            },
            Outcome::Succeeded,
        ));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["step"]["kind"], "load");
        assert_eq!(json["steps"][0]["step"]["target"], "entradas.PRC13106");
        assert_eq!(json["steps"][0]["outcome"], "succeeded");
        assert_eq!(json["steps"][0]["elapsed_ms"], 12);
        assert_eq!(json["halted"], false);
    }
}
