use std::fmt::Display;
use std::path::PathBuf;

use crate::error::Error;

/// Terminal state of one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status
{
    Extracted,
    NotFound,
    Ambiguous,
    Failed,
}

impl Display for Status
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self {
            Status::Extracted => f.write_str("extracted"),
            Status::NotFound => f.write_str("not found"),
            Status::Ambiguous => f.write_str("ambiguous"),
            Status::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug)]
pub enum LayerOutcome
{
    Written(PathBuf),
    NotFound,
    Ambiguous,
    Failed(Error),
}

#[derive(Debug)]
pub struct LayerReport
{
    pub digest: String,
    pub outcome: LayerOutcome,
}

#[derive(Debug)]
pub struct ReferenceReport
{
    pub reference: String,
    pub status: Status,
    /// Set when the reference failed before any layer was scanned
    pub error: Option<Error>,
    pub layers: Vec<LayerReport>,
}

impl ReferenceReport
{
    pub fn failed(reference: &str, error: Error) -> Self
    {
        ReferenceReport {
            reference: reference.to_string(),
            status: Status::Failed,
            error: Some(error),
            layers: Vec::new(),
        }
    }

    /// Any failed layer fails the reference, then a written file wins over
    /// ambiguity, which wins over nothing found.
    pub fn from_layers(reference: &str, layers: Vec<LayerReport>) -> Self
    {
        let has = |pred: fn(&LayerOutcome) -> bool| layers.iter().any(|l| pred(&l.outcome));

        let status = if has(|o| matches!(o, LayerOutcome::Failed(_))) {
            Status::Failed
        } else if has(|o| matches!(o, LayerOutcome::Written(_))) {
            Status::Extracted
        } else if has(|o| matches!(o, LayerOutcome::Ambiguous)) {
            Status::Ambiguous
        } else {
            Status::NotFound
        };

        ReferenceReport {
            reference: reference.to_string(),
            status,
            error: None,
            layers,
        }
    }

    pub fn written(&self) -> impl Iterator<Item = &PathBuf>
    {
        self.layers.iter().filter_map(|l| match &l.outcome {
            LayerOutcome::Written(path) => Some(path),
            _ => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct Summary
{
    pub extracted: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    pub failed: usize,
    reports: Vec<ReferenceReport>,
}

impl Summary
{
    pub fn from_reports(reports: Vec<ReferenceReport>) -> Self
    {
        let mut summary = Summary::default();

        for report in &reports {
            match report.status {
                Status::Extracted => summary.extracted += 1,
                Status::NotFound => summary.not_found += 1,
                Status::Ambiguous => summary.ambiguous += 1,
                Status::Failed => summary.failed += 1,
            }
        }

        summary.reports = reports;
        summary
    }

    /// Reports in the order the references were given.
    pub fn reports(&self) -> &[ReferenceReport]
    {
        &self.reports
    }

    pub fn has_failures(&self) -> bool
    {
        self.failed > 0
    }
}

impl Display for Summary
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(
            f,
            "Processed {} references: {} extracted, {} not found, {} ambiguous, {} failed",
            self.reports.len(),
            self.extracted,
            self.not_found,
            self.ambiguous,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use mc_registry::Error as RegistryError;

    fn layer(outcome: LayerOutcome) -> LayerReport
    {
        LayerReport { digest: "sha256:1".to_string(), outcome }
    }

    #[test]
    fn reference_status()
    {
        let written = || layer(LayerOutcome::Written(PathBuf::from("output/x/CARD.md")));
        let failed = || layer(LayerOutcome::Failed(Error::Fetch(RegistryError::StatusError(500))));

        assert_eq!(ReferenceReport::from_layers("r", vec![]).status, Status::NotFound);
        assert_eq!(ReferenceReport::from_layers("r", vec![layer(LayerOutcome::NotFound)]).status, Status::NotFound);
        assert_eq!(
            ReferenceReport::from_layers("r", vec![layer(LayerOutcome::NotFound), layer(LayerOutcome::Ambiguous)]).status,
            Status::Ambiguous
        );
        assert_eq!(ReferenceReport::from_layers("r", vec![layer(LayerOutcome::Ambiguous), written()]).status, Status::Extracted);
        assert_eq!(ReferenceReport::from_layers("r", vec![written(), failed()]).status, Status::Failed);
    }

    #[test]
    fn counts()
    {
        let summary = Summary::from_reports(vec![
            ReferenceReport::from_layers("a", vec![layer(LayerOutcome::Written(PathBuf::from("a")))]),
            ReferenceReport::from_layers("b", vec![]),
            ReferenceReport::failed("c", Error::Resolution(RegistryError::StatusError(401))),
            ReferenceReport::from_layers("d", vec![layer(LayerOutcome::Ambiguous)]),
            ReferenceReport::from_layers("e", vec![]),
        ]);

        assert_eq!((summary.extracted, summary.not_found, summary.ambiguous, summary.failed), (1, 2, 1, 1));
        assert!(summary.has_failures());
        assert_eq!(
            summary.to_string(),
            "Processed 5 references: 1 extracted, 2 not found, 1 ambiguous, 1 failed"
        );
        assert_eq!(summary.reports()[2].reference, "c");
    }
}
