//! Declarative deployment plan.
//!
//! A plan is a list of nodes. A component node produces one registry entry:
//! it deploys (or reuses) a contract and then runs its wiring calls. A task
//! node has no address of its own and only runs calls that span components.
//! Every node names its prerequisites explicitly; the execution order is the
//! topological order of that graph.

pub mod graph;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::chain::{BlockInfo, DeployStrategy};
use crate::config::ExternalAddresses;
use crate::types::{Address, TokenAmount, Value};

pub use graph::{PlanError, topological_order};

macro_rules! components {
    ($($variant:ident => $id:literal, $contract:literal;)+) => {
        /// Every protocol component that gets a registry entry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Component {
            $($variant,)+
        }

        impl Component {
            pub const ALL: &'static [Component] = &[$(Component::$variant,)+];

            /// Registry key.
            pub fn id(self) -> &'static str {
                match self {
                    $(Component::$variant => $id,)+
                }
            }

            /// Artifact name of the deployed contract.
            pub fn contract(self) -> &'static str {
                match self {
                    $(Component::$variant => $contract,)+
                }
            }
        }

        impl FromStr for Component {
            type Err = PlanError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok(Component::$variant),)+
                    other => Err(PlanError::UnknownComponent(other.to_string())),
                }
            }
        }
    };
}

components! {
    Usc => "USC", "USC";
    Chi => "CHI", "CHI";
    UscEthLp => "USC_ETH_LP", "UniswapV2Pair";
    ChiEthLp => "CHI_ETH_LP", "UniswapV2Pair";
    EthUsdOracle => "ETH_USD_oracle", "ChainlinkOracle";
    StEthUsdOracle => "stETH_USD_oracle", "ChainlinkOracle";
    UscUsdOracle => "USC_USD_oracle", "UniswapV2TwapOracle";
    ChiUsdOracle => "CHI_USD_oracle", "UniswapV2TwapOracle";
    PriceFeedAggregator => "PriceFeedAggregator", "PriceFeedAggregator";
    ChiStaking => "ChiStaking", "ChiStaking";
    ChiLocking => "ChiLocking", "ChiLocking";
    UscEthLpStaking => "USC_ETH_LP_Staking", "LPStaking";
    ChiEthLpStaking => "CHI_ETH_LP_Staking", "LPStaking";
    ChiVesting => "ChiVesting", "ChiVesting";
    UscStaking => "USCStaking", "USCStaking";
    ReserveHolder => "ReserveHolder", "ReserveHolder";
    RewardController => "RewardController", "RewardController";
    UscEthLpRewards => "USC_ETH_LP_rewards", "LPRewards";
    ChiEthLpRewards => "CHI_ETH_LP_rewards", "LPRewards";
    Ochi => "OCHI", "OCHI";
    TimeWeightedBonding => "TimeWeightedBonding", "TimeWeightedBonding";
    Ido => "IDO", "IDO";
    Arbitrage => "Arbitrage", "Arbitrage";
    VeChi => "veCHI", "veCHI";
    DataProvider => "DataProvider", "DataProvider";
    TestpageHelper => "TestpageHelper", "TestpageHelper";
    Treasury => "Treasury", "Treasury";
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Plan nodes that run calls but own no address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    SeedLiquidity,
    GrantDeployerMinter,
    GrantArbitrageRoles,
    FinalDistribution,
}

impl Task {
    pub fn id(self) -> &'static str {
        match self {
            Task::SeedLiquidity => "SeedLiquidity",
            Task::GrantDeployerMinter => "GrantDeployerMinter",
            Task::GrantArbitrageRoles => "GrantArbitrageRoles",
            Task::FinalDistribution => "FinalDistribution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Component(Component),
    Task(Task),
}

impl NodeId {
    pub fn id(self) -> &'static str {
        match self {
            NodeId::Component(component) => component.id(),
            NodeId::Task(task) => task.id(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl From<Component> for NodeId {
    fn from(value: Component) -> Self {
        NodeId::Component(value)
    }
}

impl From<Task> for NodeId {
    fn from(value: Task) -> Self {
        NodeId::Task(value)
    }
}

/// What a node may read while building its arguments.
pub struct Inputs<'a> {
    node: NodeId,
    prerequisites: &'a [NodeId],
    resolved: &'a BTreeMap<Component, Address>,
    deployer: &'a Address,
    external: &'a ExternalAddresses,
    block: BlockInfo,
}

impl<'a> Inputs<'a> {
    pub fn new(
        node: NodeId,
        prerequisites: &'a [NodeId],
        resolved: &'a BTreeMap<Component, Address>,
        deployer: &'a Address,
        external: &'a ExternalAddresses,
        block: BlockInfo,
    ) -> Self {
        Self {
            node,
            prerequisites,
            resolved,
            deployer,
            external,
            block,
        }
    }

    /// Address of a component this node depends on (or of the node itself).
    ///
    /// Reading a component that is not a declared prerequisite is a plan
    /// error even when its address happens to be known already.
    pub fn address(&self, component: Component) -> Result<Address, PlanError> {
        let node = NodeId::Component(component);
        if node != self.node && !self.prerequisites.contains(&node) {
            return Err(PlanError::UndeclaredDependency {
                node: self.node.id().to_string(),
                read: component.id().to_string(),
            });
        }
        self.resolved
            .get(&component)
            .cloned()
            .ok_or_else(|| PlanError::Unresolved {
                node: self.node.id().to_string(),
                read: component.id().to_string(),
            })
    }

    pub fn deployer(&self) -> &Address {
        self.deployer
    }

    pub fn external(&self) -> &ExternalAddresses {
        self.external
    }

    /// Timestamp of the latest block when the node started executing.
    pub fn now(&self) -> u64 {
        self.block.timestamp
    }
}

pub type ArgsFn = Box<dyn Fn(&Inputs<'_>) -> anyhow::Result<Vec<Value>>>;

/// Wrap an argument builder.
pub fn args<F>(f: F) -> ArgsFn
where
    F: Fn(&Inputs<'_>) -> anyhow::Result<Vec<Value>> + 'static,
{
    Box::new(f)
}

pub fn no_args() -> ArgsFn {
    Box::new(|_| Ok(Vec::new()))
}

/// How a component comes into existence.
pub enum Provision {
    Deploy {
        strategy: DeployStrategy,
        args: ArgsFn,
    },
    /// Created through `factory.createPair(token, WETH)`, address read back
    /// with `getPair`.
    FactoryPair { token: Component },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Component(Component),
    UniswapRouter,
}

impl From<Component> for CallTarget {
    fn from(value: Component) -> Self {
        CallTarget::Component(value)
    }
}

/// Whether a call may be sent again after an unobserved confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Setting the same value twice leaves the same state.
    Idempotent,
    /// Sending twice changes state twice (mints, liquidity).
    Once,
}

/// One journaled call.
pub struct StepSpec {
    pub label: String,
    pub target: CallTarget,
    pub method: &'static str,
    pub args: ArgsFn,
    pub value: Option<TokenAmount>,
    pub replay: Replay,
}

impl StepSpec {
    pub fn call(target: impl Into<CallTarget>, method: &'static str, args: ArgsFn) -> Self {
        Self {
            label: method.to_string(),
            target: target.into(),
            method,
            args,
            value: None,
            replay: Replay::Idempotent,
        }
    }

    /// Distinguish repeated calls of the same method within a node.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn once(mut self) -> Self {
        self.replay = Replay::Once;
        self
    }

    pub fn with_value(mut self, value: TokenAmount) -> Self {
        self.value = Some(value);
        self
    }

    /// Journal key of this step under its node.
    pub fn step_id(&self, node: NodeId) -> String {
        format!("{}/{}", node.id(), self.label)
    }
}

pub struct ComponentSpec {
    pub component: Component,
    pub after: Vec<NodeId>,
    pub provision: Provision,
    pub wiring: Vec<StepSpec>,
}

impl ComponentSpec {
    pub fn deploy(component: Component, strategy: DeployStrategy, args: ArgsFn) -> Self {
        Self {
            component,
            after: Vec::new(),
            provision: Provision::Deploy { strategy, args },
            wiring: Vec::new(),
        }
    }

    pub fn factory_pair(component: Component, token: Component) -> Self {
        Self {
            component,
            after: vec![NodeId::Component(token)],
            provision: Provision::FactoryPair { token },
            wiring: Vec::new(),
        }
    }

    pub fn after<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        for node in nodes {
            let node = node.into();
            if !self.after.contains(&node) {
                self.after.push(node);
            }
        }
        self
    }

    pub fn wire(mut self, step: StepSpec) -> Self {
        self.wiring.push(step);
        self
    }
}

pub struct TaskSpec {
    pub task: Task,
    pub after: Vec<NodeId>,
    pub steps: Vec<StepSpec>,
}

impl TaskSpec {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            after: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn after<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        for node in nodes {
            let node = node.into();
            if !self.after.contains(&node) {
                self.after.push(node);
            }
        }
        self
    }

    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }
}

pub enum PlanNode {
    Component(ComponentSpec),
    Task(TaskSpec),
}

impl PlanNode {
    pub fn id(&self) -> NodeId {
        match self {
            PlanNode::Component(spec) => NodeId::Component(spec.component),
            PlanNode::Task(spec) => NodeId::Task(spec.task),
        }
    }

    pub fn after(&self) -> &[NodeId] {
        match self {
            PlanNode::Component(spec) => &spec.after,
            PlanNode::Task(spec) => &spec.after,
        }
    }

    pub fn steps(&self) -> &[StepSpec] {
        match self {
            PlanNode::Component(spec) => &spec.wiring,
            PlanNode::Task(spec) => &spec.steps,
        }
    }
}

impl From<ComponentSpec> for PlanNode {
    fn from(value: ComponentSpec) -> Self {
        PlanNode::Component(value)
    }
}

impl From<TaskSpec> for PlanNode {
    fn from(value: TaskSpec) -> Self {
        PlanNode::Task(value)
    }
}

/// Nodes in declaration order.
#[derive(Default)]
pub struct DeploymentPlan {
    nodes: Vec<PlanNode>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Into<PlanNode>) {
        self.nodes.push(node.into());
    }

    pub fn extend<I, N>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<PlanNode>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn components(&self) -> impl Iterator<Item = Component> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            PlanNode::Component(spec) => Some(spec.component),
            PlanNode::Task(_) => None,
        })
    }

    /// Validate the graph and return the nodes in execution order.
    pub fn ordered(&self) -> Result<Vec<&PlanNode>, PlanError> {
        let order = topological_order(&self.nodes)?;
        Ok(order.into_iter().map(|index| &self.nodes[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_fixture() -> (BTreeMap<Component, Address>, Address, ExternalAddresses) {
        let mut resolved = BTreeMap::new();
        resolved.insert(Component::Usc, Address::from_bytes([1; 20]));
        resolved.insert(Component::Chi, Address::from_bytes([2; 20]));
        (resolved, Address::from_bytes([9; 20]), ExternalAddresses::default())
    }

    #[test]
    fn component_ids_round_trip() {
        for component in Component::ALL {
            assert_eq!(component.id().parse::<Component>().unwrap(), *component);
        }
        assert!("Nope".parse::<Component>().is_err());
        assert_eq!(Component::ALL.len(), 27);
    }

    #[test]
    fn inputs_allow_declared_prerequisites_only() {
        let (resolved, deployer, external) = inputs_fixture();
        let prerequisites = [NodeId::Component(Component::Usc)];
        let block = BlockInfo {
            number: 1,
            timestamp: 100,
        };
        let inputs = Inputs::new(
            NodeId::Component(Component::UscEthLp),
            &prerequisites,
            &resolved,
            &deployer,
            &external,
            block,
        );

        assert_eq!(
            inputs.address(Component::Usc).unwrap(),
            Address::from_bytes([1; 20])
        );
        assert!(matches!(
            inputs.address(Component::Chi),
            Err(PlanError::UndeclaredDependency { .. })
        ));
        assert_eq!(inputs.now(), 100);
    }

    #[test]
    fn inputs_report_unresolved_prerequisite() {
        let (resolved, deployer, external) = inputs_fixture();
        let prerequisites = [NodeId::Component(Component::Ochi)];
        let block = BlockInfo {
            number: 1,
            timestamp: 0,
        };
        let inputs = Inputs::new(
            Task::FinalDistribution.into(),
            &prerequisites,
            &resolved,
            &deployer,
            &external,
            block,
        );
        assert!(matches!(
            inputs.address(Component::Ochi),
            Err(PlanError::Unresolved { .. })
        ));
    }

    #[test]
    fn step_ids_are_scoped_by_node() {
        let step = StepSpec::call(Component::Chi, "mint", no_args()).labeled("mint:IDO");
        assert_eq!(step.step_id(Component::Ido.into()), "IDO/mint:IDO");
        assert_eq!(step.replay, Replay::Idempotent);
        assert_eq!(step.once().replay, Replay::Once);
    }
}
