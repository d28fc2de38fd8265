//! In-process analyzers for unit tests

use super::{AnalyzerFinding, PhiAnalyzer};
use crate::domain::DetectorError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Flags every occurrence of a fixed set of needles
#[derive(Default)]
pub(crate) struct StaticAnalyzer {
    needles: Vec<(String, String, f32)>,
}

impl StaticAnalyzer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, needle: &str, entity_type: &str, score: f32) -> Self {
        self.needles
            .push((needle.to_string(), entity_type.to_string(), score));
        self
    }
}

#[async_trait]
impl PhiAnalyzer for StaticAnalyzer {
    async fn analyze_text(&self, text: &str) -> Result<Vec<AnalyzerFinding>, DetectorError> {
        let mut findings = Vec::new();
        for (needle, entity_type, score) in &self.needles {
            for (start, _) in text.match_indices(needle.as_str()) {
                findings.push(AnalyzerFinding {
                    entity_type: entity_type.clone(),
                    start,
                    end: start + needle.len(),
                    score: *score,
                });
            }
        }
        Ok(findings)
    }

    fn name(&self) -> &str {
        "static"
    }
}

enum Step {
    Fail(DetectorError),
    Return(Vec<AnalyzerFinding>),
    Hang,
}

/// Plays back a fixed sequence of outcomes; the last one repeats
pub(crate) struct ScriptedAnalyzer {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedAnalyzer {
    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub(crate) fn returning(findings: Vec<AnalyzerFinding>) -> Self {
        Self::from_steps(vec![Step::Return(findings)])
    }

    pub(crate) fn failing(err: DetectorError) -> Self {
        Self::from_steps(vec![Step::Fail(err)])
    }

    pub(crate) fn failing_times(times: usize, err: DetectorError) -> Self {
        Self::from_steps((0..times).map(|_| Step::Fail(err.clone())).collect())
    }

    pub(crate) fn hanging() -> Self {
        Self::from_steps(vec![Step::Hang])
    }

    pub(crate) fn then_returning(self, findings: Vec<AnalyzerFinding>) -> Self {
        self.steps.lock().unwrap().push_back(Step::Return(findings));
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            return steps.pop_front().unwrap();
        }
        match steps.front() {
            Some(Step::Fail(e)) => Step::Fail(e.clone()),
            Some(Step::Return(f)) => Step::Return(f.clone()),
            Some(Step::Hang) | None => Step::Hang,
        }
    }
}

#[async_trait]
impl PhiAnalyzer for ScriptedAnalyzer {
    async fn analyze_text(&self, _text: &str) -> Result<Vec<AnalyzerFinding>, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match step {
            Step::Fail(e) => Err(e),
            Step::Return(findings) => Ok(findings),
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
