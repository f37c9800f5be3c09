//! Simulation records consumed by the statistics engine.
//!
//! The engine only sees a run through [`SimulationRecordSource`]. The
//! in-memory [`SimulationRecord`] implements it and can be loaded from the
//! JSON dump written next to each run.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Field holding the per-bucket existence flag of an agent.
pub const EXISTS_FIELD: &str = "exists";

/// Read-only view over one recorded simulation run.
pub trait SimulationRecordSource {
    /// Number of raw simulation steps.
    fn num_steps(&self) -> usize;

    /// Stride, in raw steps, between two recorded samples.
    fn final_resolution(&self) -> usize;

    /// Names of every recorded agent type.
    fn agent_types(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Agents of one type, or `None` if the type was never recorded.
    fn agents_of(&self, agent_type: &str) -> Option<Box<dyn Iterator<Item = &AgentRecord> + '_>>;
}

/// Recorded field values of a single agent, indexed by bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Agent identifier, unique within its type.
    pub id: String,
    /// Field name to one value per bucket.
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl AgentRecord {
    /// Creates an agent with no recorded fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.fields.insert(name.into(), values);
        self
    }

    /// Value of `field` at `bucket`, if recorded.
    pub fn value(&self, field: &str, bucket: usize) -> Option<f64> {
        self.fields.get(field).and_then(|v| v.get(bucket)).copied()
    }

    /// Whether the agent is alive at `bucket`.
    ///
    /// Agents without an `exists` field are considered alive for the whole run.
    pub fn exists(&self, bucket: usize) -> bool {
        match self.fields.get(EXISTS_FIELD) {
            Some(values) => values.get(bucket).is_some_and(|v| *v != 0.0),
            None => true,
        }
    }
}

/// In-memory simulation record.
#[derive(Debug, Clone, Default)]
pub struct SimulationRecord {
    num_steps: usize,
    final_resolution: usize,
    types: BTreeMap<String, BTreeMap<String, AgentRecord>>,
}

/// On-disk layout of a record dump.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    num_steps: usize,
    final_resolution: usize,
    #[serde(default)]
    agents: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<f64>>>>,
}

impl SimulationRecord {
    /// Creates an empty record.
    pub fn new(num_steps: usize, final_resolution: usize) -> Self {
        Self {
            num_steps,
            final_resolution,
            types: BTreeMap::new(),
        }
    }

    /// Adds an agent under `agent_type`, replacing any agent with the same id.
    pub fn add_agent(&mut self, agent_type: impl Into<String>, agent: AgentRecord) {
        self.types
            .entry(agent_type.into())
            .or_default()
            .insert(agent.id.clone(), agent);
    }

    /// Total number of agents over all types.
    pub fn num_agents(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    /// Parses a record from its JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: RawRecord = serde_json::from_str(json)?;
        let mut record = Self::new(raw.num_steps, raw.final_resolution);
        for (agent_type, agents) in raw.agents {
            for (id, fields) in agents {
                record.add_agent(agent_type.clone(), AgentRecord { id, fields });
            }
        }
        Ok(record)
    }

    /// Loads a record from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let content = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
            source,
            path: path.to_path_buf(),
        })?;

        Self::from_json(&content).map_err(|source| RecordError::Parse {
            source,
            path: path.to_path_buf(),
        })
    }
}

impl SimulationRecordSource for SimulationRecord {
    fn num_steps(&self) -> usize {
        self.num_steps
    }

    fn final_resolution(&self) -> usize {
        self.final_resolution
    }

    fn agent_types(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.types.keys().map(String::as_str))
    }

    fn agents_of(&self, agent_type: &str) -> Option<Box<dyn Iterator<Item = &AgentRecord> + '_>> {
        let agents = self.types.get(agent_type)?;
        let iter: Box<dyn Iterator<Item = &AgentRecord> + '_> = Box::new(agents.values());
        Some(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_exists() {
        let always = AgentRecord::new("a");
        assert!(always.exists(0));
        assert!(always.exists(100));

        let flagged = AgentRecord::new("b").with_field(EXISTS_FIELD, vec![1.0, 0.0]);
        assert!(flagged.exists(0));
        assert!(!flagged.exists(1));
        assert!(!flagged.exists(2));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "numSteps": 10,
            "finalResolution": 5,
            "agents": {
                "Human": {
                    "Human_0": { "age": [1.0, 2.0, 3.0] },
                    "Human_1": { "age": [4.0, 5.0, 6.0], "exists": [1, 1, 0] }
                },
                "Deer": {
                    "Deer_0": { "weight": [50, 51, 52] }
                }
            }
        }"#;

        let record = SimulationRecord::from_json(json).unwrap();
        assert_eq!(record.num_steps(), 10);
        assert_eq!(record.final_resolution(), 5);
        assert_eq!(record.num_agents(), 3);

        let types: Vec<_> = record.agent_types().collect();
        assert_eq!(types, vec!["Deer", "Human"]);

        let humans: Vec<_> = record.agents_of("Human").unwrap().collect();
        assert_eq!(humans.len(), 2);
        assert_eq!(humans[1].value("age", 1), Some(5.0));
        assert!(!humans[1].exists(2));

        assert!(record.agents_of("Wolf").is_none());
    }

    #[test]
    fn test_malformed_json() {
        assert!(SimulationRecord::from_json("{\"numSteps\": 3}").is_err());
    }
}
