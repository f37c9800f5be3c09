//! Built-in analyses.
//!
//! Every analysis here only accumulates sums per bucket while agents are
//! visited, so the visiting order never changes the result.

use super::AgentAnalysis;
use crate::error::AnalysisError;
use crate::record::AgentRecord;
use serde::{Deserialize, Serialize};

/// Kind of a built-in analysis, as named in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Number of existing agents.
    Num,
    /// Sum of a field over existing agents.
    Sum,
    /// Mean of a field over existing agents.
    Mean,
    /// Population standard deviation of a field over existing agents.
    StdDev,
}

impl AnalysisKind {
    /// Whether this kind reads an agent field.
    pub fn needs_field(&self) -> bool {
        !matches!(self, AnalysisKind::Num)
    }
}

/// Build a boxed built-in analysis.
///
/// `field` is ignored by [`AnalysisKind::Num`].
pub fn build_analysis(
    kind: AnalysisKind,
    name: &str,
    field: &str,
    write_results: bool,
) -> Box<dyn AgentAnalysis> {
    match kind {
        AnalysisKind::Num => Box::new(AgentNum::new(name).with_write_results(write_results)),
        AnalysisKind::Sum => {
            Box::new(AgentSum::new(name, field).with_write_results(write_results))
        }
        AnalysisKind::Mean => {
            Box::new(AgentMean::new(name, field).with_write_results(write_results))
        }
        AnalysisKind::StdDev => {
            Box::new(AgentStdDev::new(name, field).with_write_results(write_results))
        }
    }
}

/// Per-bucket accumulators shared by the built-in analyses.
#[derive(Debug, Clone, Default)]
struct Buckets {
    results: Vec<f64>,
    sums: Vec<f64>,
    squares: Vec<f64>,
    counts: Vec<usize>,
}

impl Buckets {
    fn resize(&mut self, n: usize) {
        self.results.resize(n, 0.0);
        self.sums.resize(n, 0.0);
        self.squares.resize(n, 0.0);
        self.counts.resize(n, 0);
    }

    fn reset(&mut self) {
        self.results.iter_mut().for_each(|v| *v = 0.0);
        self.sums.iter_mut().for_each(|v| *v = 0.0);
        self.squares.iter_mut().for_each(|v| *v = 0.0);
        self.counts.iter_mut().for_each(|v| *v = 0);
    }

    fn len(&self) -> usize {
        self.results.len()
    }

    fn result(&self, bucket: usize) -> f64 {
        self.results.get(bucket).copied().unwrap_or(0.0)
    }

    /// Adds `field` of every bucket where `agent` exists.
    fn accumulate(
        &mut self,
        analysis: &str,
        agent: &AgentRecord,
        field: &str,
    ) -> Result<(), AnalysisError> {
        for bucket in 0..self.len() {
            if !agent.exists(bucket) {
                continue;
            }
            let value = agent
                .value(field, bucket)
                .ok_or_else(|| AnalysisError::MissingField {
                    analysis: analysis.to_string(),
                    agent: agent.id.clone(),
                    field: field.to_string(),
                    bucket,
                })?;
            self.sums[bucket] += value;
            self.squares[bucket] += value * value;
            self.counts[bucket] += 1;
        }
        Ok(())
    }
}

/// Number of agents alive per bucket.
#[derive(Debug, Clone)]
pub struct AgentNum {
    name: String,
    write_results: bool,
    buckets: Buckets,
}

impl AgentNum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            write_results: true,
            buckets: Buckets::default(),
        }
    }

    pub fn with_write_results(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }
}

impl AgentAnalysis for AgentNum {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_results(&self) -> bool {
        self.write_results
    }

    fn set_num_time_steps(&mut self, num_buckets: usize) {
        self.buckets.resize(num_buckets);
    }

    fn pre_process(&mut self) -> Result<(), AnalysisError> {
        self.buckets.reset();
        Ok(())
    }

    fn compute_agent(&mut self, agent: &AgentRecord) -> Result<(), AnalysisError> {
        for bucket in 0..self.buckets.len() {
            if agent.exists(bucket) {
                self.buckets.results[bucket] += 1.0;
            }
        }
        Ok(())
    }

    fn result(&self, bucket: usize) -> f64 {
        self.buckets.result(bucket)
    }
}

/// Sum of a field over the agents alive in each bucket.
#[derive(Debug, Clone)]
pub struct AgentSum {
    name: String,
    field: String,
    write_results: bool,
    buckets: Buckets,
}

impl AgentSum {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            write_results: true,
            buckets: Buckets::default(),
        }
    }

    pub fn with_write_results(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }
}

impl AgentAnalysis for AgentSum {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_results(&self) -> bool {
        self.write_results
    }

    fn set_num_time_steps(&mut self, num_buckets: usize) {
        self.buckets.resize(num_buckets);
    }

    fn pre_process(&mut self) -> Result<(), AnalysisError> {
        self.buckets.reset();
        Ok(())
    }

    fn compute_agent(&mut self, agent: &AgentRecord) -> Result<(), AnalysisError> {
        self.buckets.accumulate(&self.name, agent, &self.field)
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        let Buckets { results, sums, .. } = &mut self.buckets;
        results.copy_from_slice(&sums[..]);
        Ok(())
    }

    fn result(&self, bucket: usize) -> f64 {
        self.buckets.result(bucket)
    }
}

/// Mean of a field over the agents alive in each bucket.
///
/// Buckets without any living agent report `0`.
#[derive(Debug, Clone)]
pub struct AgentMean {
    name: String,
    field: String,
    write_results: bool,
    buckets: Buckets,
}

impl AgentMean {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            write_results: true,
            buckets: Buckets::default(),
        }
    }

    pub fn with_write_results(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }
}

impl AgentAnalysis for AgentMean {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_results(&self) -> bool {
        self.write_results
    }

    fn set_num_time_steps(&mut self, num_buckets: usize) {
        self.buckets.resize(num_buckets);
    }

    fn pre_process(&mut self) -> Result<(), AnalysisError> {
        self.buckets.reset();
        Ok(())
    }

    fn compute_agent(&mut self, agent: &AgentRecord) -> Result<(), AnalysisError> {
        self.buckets.accumulate(&self.name, agent, &self.field)
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        let b = &mut self.buckets;
        for i in 0..b.results.len() {
            b.results[i] = if b.counts[i] > 0 {
                b.sums[i] / b.counts[i] as f64
            } else {
                0.0
            };
        }
        Ok(())
    }

    fn result(&self, bucket: usize) -> f64 {
        self.buckets.result(bucket)
    }
}

/// Population standard deviation of a field over the agents alive in each bucket.
#[derive(Debug, Clone)]
pub struct AgentStdDev {
    name: String,
    field: String,
    write_results: bool,
    buckets: Buckets,
}

impl AgentStdDev {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            write_results: true,
            buckets: Buckets::default(),
        }
    }

    pub fn with_write_results(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }
}

impl AgentAnalysis for AgentStdDev {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_results(&self) -> bool {
        self.write_results
    }

    fn set_num_time_steps(&mut self, num_buckets: usize) {
        self.buckets.resize(num_buckets);
    }

    fn pre_process(&mut self) -> Result<(), AnalysisError> {
        self.buckets.reset();
        Ok(())
    }

    fn compute_agent(&mut self, agent: &AgentRecord) -> Result<(), AnalysisError> {
        self.buckets.accumulate(&self.name, agent, &self.field)
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        let b = &mut self.buckets;
        for i in 0..b.results.len() {
            if b.counts[i] == 0 {
                b.results[i] = 0.0;
                continue;
            }
            let n = b.counts[i] as f64;
            let mean = b.sums[i] / n;
            // rounding can push the variance slightly below zero
            let variance = (b.squares[i] / n - mean * mean).max(0.0);
            b.results[i] = variance.sqrt();
        }
        Ok(())
    }

    fn result(&self, bucket: usize) -> f64 {
        self.buckets.result(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, exists: Vec<f64>, age: Vec<f64>) -> AgentRecord {
        AgentRecord::new(id)
            .with_field("exists", exists)
            .with_field("age", age)
    }

    fn run(analysis: &mut dyn AgentAnalysis, agents: &[AgentRecord], buckets: usize) {
        analysis.set_num_time_steps(buckets);
        analysis.pre_process().unwrap();
        for a in agents {
            analysis.compute_agent(a).unwrap();
        }
        analysis.post_process().unwrap();
    }

    fn population() -> Vec<AgentRecord> {
        vec![
            agent("a", vec![1.0, 1.0, 1.0], vec![2.0, 4.0, 6.0]),
            agent("b", vec![1.0, 1.0, 0.0], vec![4.0, 8.0, 0.0]),
            agent("c", vec![0.0, 1.0, 0.0], vec![0.0, 6.0, 0.0]),
        ]
    }

    #[test]
    fn test_agent_num() {
        let mut num = AgentNum::new("num");
        run(&mut num, &population(), 3);

        assert_eq!(num.result(0), 2.0);
        assert_eq!(num.result(1), 3.0);
        assert_eq!(num.result(2), 1.0);
    }

    #[test]
    fn test_agent_sum_and_mean() {
        let mut sum = AgentSum::new("total_age", "age");
        let mut mean = AgentMean::new("avg_age", "age");
        run(&mut sum, &population(), 3);
        run(&mut mean, &population(), 3);

        assert_eq!(sum.result(0), 6.0);
        assert_eq!(sum.result(1), 18.0);
        assert_eq!(sum.result(2), 6.0);

        assert_eq!(mean.result(0), 3.0);
        assert_eq!(mean.result(1), 6.0);
        assert_eq!(mean.result(2), 6.0);
    }

    #[test]
    fn test_agent_std_dev() {
        let mut std_dev = AgentStdDev::new("sd_age", "age");
        run(&mut std_dev, &population(), 3);

        assert!((std_dev.result(0) - 1.0).abs() < 1e-9);
        assert!((std_dev.result(1) - (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(std_dev.result(2), 0.0);
    }

    #[test]
    fn test_order_independent() {
        let mut forward = AgentMean::new("m", "age");
        let mut backward = AgentMean::new("m", "age");
        let mut agents = population();
        run(&mut forward, &agents, 3);
        agents.reverse();
        run(&mut backward, &agents, 3);

        for bucket in 0..3 {
            assert_eq!(forward.result(bucket), backward.result(bucket));
        }
    }

    #[test]
    fn test_rerun_resets_buffers() {
        let mut num = AgentNum::new("num");
        run(&mut num, &population(), 3);
        run(&mut num, &population(), 3);
        assert_eq!(num.result(1), 3.0);
    }

    #[test]
    fn test_empty_bucket_mean_is_zero() {
        let mut mean = AgentMean::new("m", "age");
        let dead = vec![agent("x", vec![0.0, 0.0], vec![1.0, 1.0])];
        run(&mut mean, &dead, 2);
        assert_eq!(mean.result(0), 0.0);
    }

    #[test]
    fn test_missing_field_fails() {
        let mut sum = AgentSum::new("s", "weight");
        sum.set_num_time_steps(3);
        sum.pre_process().unwrap();
        let err = sum.compute_agent(&population()[0]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingField { bucket: 0, .. }));
    }

    #[test]
    fn test_out_of_range_bucket() {
        let mut num = AgentNum::new("num");
        run(&mut num, &population(), 3);
        assert_eq!(num.result(10), 0.0);
    }

    #[test]
    fn test_build_analysis() {
        let a = build_analysis(AnalysisKind::Mean, "avgAge", "age", false);
        assert_eq!(a.name(), "avgAge");
        assert!(!a.write_results());
        assert!(AnalysisKind::StdDev.needs_field());
        assert!(!AnalysisKind::Num.needs_field());
    }
}
