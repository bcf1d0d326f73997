//! Plan validation and ordering.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use super::{NodeId, PlanNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
    #[error("node {0} is declared twice")]
    DuplicateNode(String),
    #[error("{node} depends on {missing}, which is not part of the plan")]
    UnknownPrerequisite { node: String, missing: String },
    #[error("dependency cycle between {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error("{node} declares step '{label}' twice")]
    DuplicateStep { node: String, label: String },
    #[error("{node} reads {read} without declaring it as a prerequisite")]
    UndeclaredDependency { node: String, read: String },
    #[error("{node} reads {read} before it has an address")]
    Unresolved { node: String, read: String },
}

/// Execution order as indices into `nodes`.
///
/// Kahn's algorithm; among nodes that are ready at the same time the one
/// declared first runs first, so a plan declared in dependency order runs
/// in declaration order.
pub fn topological_order(nodes: &[PlanNode]) -> Result<Vec<usize>, PlanError> {
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
    for (position, node) in nodes.iter().enumerate() {
        if index.insert(node.id(), position).is_some() {
            return Err(PlanError::DuplicateNode(node.id().to_string()));
        }
        let mut labels = BTreeSet::new();
        for step in node.steps() {
            if !labels.insert(step.label.as_str()) {
                return Err(PlanError::DuplicateStep {
                    node: node.id().to_string(),
                    label: step.label.clone(),
                });
            }
        }
    }

    let mut indegree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (position, node) in nodes.iter().enumerate() {
        for prerequisite in node.after() {
            let Some(&from) = index.get(prerequisite) else {
                return Err(PlanError::UnknownPrerequisite {
                    node: node.id().to_string(),
                    missing: prerequisite.to_string(),
                });
            };
            dependents[from].push(position);
            indegree[position] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| Reverse(position))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(Reverse(position)) = ready.pop() {
        order.push(position);
        for &dependent in &dependents[position] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(position, _)| nodes[position].id().to_string())
            .collect();
        return Err(PlanError::Cycle(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::DeployStrategy;
    use crate::plan::{Component, ComponentSpec, StepSpec, Task, TaskSpec, no_args};

    fn node(component: Component, after: &[Component]) -> PlanNode {
        ComponentSpec::deploy(component, DeployStrategy::Direct, no_args())
            .after(after.iter().copied())
            .into()
    }

    fn ids(nodes: &[PlanNode], order: &[usize]) -> Vec<&'static str> {
        order.iter().map(|i| nodes[*i].id().id()).collect()
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let nodes = vec![
            node(Component::Usc, &[]),
            node(Component::Chi, &[]),
            node(Component::UscEthLp, &[Component::Usc]),
        ];
        let order = topological_order(&nodes).unwrap();
        assert_eq!(ids(&nodes, &order), vec!["USC", "CHI", "USC_ETH_LP"]);
    }

    #[test]
    fn prerequisites_declared_later_still_run_first() {
        let nodes = vec![
            node(Component::VeChi, &[Component::ChiLocking]),
            node(Component::Treasury, &[]),
            node(Component::ChiLocking, &[]),
        ];
        let order = topological_order(&nodes).unwrap();
        assert_eq!(ids(&nodes, &order), vec!["Treasury", "ChiLocking", "veCHI"]);
    }

    #[test]
    fn unknown_prerequisite_is_rejected() {
        let nodes = vec![node(Component::VeChi, &[Component::ChiLocking])];
        assert!(matches!(
            topological_order(&nodes),
            Err(PlanError::UnknownPrerequisite { .. })
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let nodes = vec![
            node(Component::Usc, &[Component::Chi]),
            node(Component::Chi, &[Component::Usc]),
            node(Component::Treasury, &[]),
        ];
        let err = topological_order(&nodes).unwrap_err();
        assert_eq!(
            err,
            PlanError::Cycle(vec!["USC".to_string(), "CHI".to_string()])
        );
    }

    #[test]
    fn duplicate_nodes_and_steps_are_rejected() {
        let nodes = vec![node(Component::Usc, &[]), node(Component::Usc, &[])];
        assert!(matches!(
            topological_order(&nodes),
            Err(PlanError::DuplicateNode(_))
        ));

        let task: PlanNode = TaskSpec::new(Task::FinalDistribution)
            .step(StepSpec::call(Component::Chi, "mint", no_args()))
            .step(StepSpec::call(Component::Chi, "mint", no_args()))
            .into();
        assert!(matches!(
            topological_order(&[task]),
            Err(PlanError::DuplicateStep { .. })
        ));
    }
}
