// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Step-by-step record of a search, for an external visualizer.

use crate::error::Result;
use crate::graph::NodeId;
use crate::module::Decision;
use crate::target::Target;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchTrace {
    pub heuristic: String,
    pub metrics: Vec<String>,
    pub steps: Vec<TraceStep>,
}

/// One expansion: the plan selected, its score, and what it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub step: u64,
    pub plan: u64,
    pub node: NodeId,
    pub target: Target,
    pub score: Vec<i64>,
    pub candidates: Vec<TraceCandidate>,
    /// Placement failures, rendered.
    pub pruned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceCandidate {
    pub decision: Decision,
    /// Id of the plan the decision produced.
    pub plan: u64,
    pub finished: bool,
}

impl SearchTrace {
    pub fn new(heuristic: &str, metrics: impl IntoIterator<Item = String>) -> Self {
        Self {
            heuristic: heuristic.to_string(),
            metrics: metrics.into_iter().collect(),
            steps: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_shape() {
        let mut trace = SearchTrace::new("min-stages", vec!["stages".to_string()]);
        trace.steps.push(TraceStep {
            step: 0,
            plan: 4,
            node: NodeId(2),
            target: Target::Switch,
            score: vec![-1],
            candidates: vec![TraceCandidate {
                decision: Decision {
                    plan: 4,
                    node: NodeId(2),
                    target: Target::Switch,
                    kind: ModuleKind::TableLookup,
                    params: BTreeMap::from([("stage".to_string(), 0)]),
                },
                plan: 5,
                finished: false,
            }],
            pruned: Vec::new(),
        });

        let json: serde_json::Value = serde_json::from_str(&trace.to_json().unwrap()).unwrap();
        assert_eq!(json["heuristic"], "min-stages");
        let candidate = &json["steps"][0]["candidates"][0];
        assert_eq!(candidate["decision"]["kind"], "table-lookup");
        assert_eq!(candidate["decision"]["params"]["stage"], 0);
        assert_eq!(candidate["plan"], 5);
    }
}
