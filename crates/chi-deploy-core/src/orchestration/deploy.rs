//! Resumable execution of a deployment plan.

use std::collections::BTreeMap;

use anyhow::Context;

use super::report::{DeploymentReport, NodeOutcome, NodeReport};
use crate::chain::{
    BlockTag, Call, ChainClient, ChainError, DeployRequest, DeployStrategy, query, send_and_confirm,
};
use crate::config::ExternalAddresses;
use crate::plan::{
    ArgsFn, CallTarget, Component, ComponentSpec, DeploymentPlan, Inputs, NodeId, PlanNode, Provision,
    Replay, StepSpec, TaskSpec,
};
use crate::registry::{ComponentRecord, Registry, StepState};
use crate::types::{Address, NetworkId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    #[error(
        "{component} on {network} has a deployment from an earlier run that was never recorded; \
         look it up on chain, then run `chi-deploy resolve` with its address (or without one if it never landed)"
    )]
    InterruptedDeployment {
        network: NetworkId,
        component: String,
    },
    #[error(
        "step {step} on {network} was sent but its confirmation was never observed; \
         check it on chain, then run `chi-deploy resolve --step` with --done or --retry"
    )]
    InterruptedStep { network: NetworkId, step: String },
    #[error("factory returned no pool for {component} after creating it")]
    MissingPair { component: String },
}

/// Runs a plan against one network.
///
/// Every decision to skip work comes from the registry: a component with a
/// recorded address is never deployed again, and a confirmed step is never
/// sent again.
pub struct Orchestrator<'a> {
    network: NetworkId,
    registry: &'a mut dyn Registry,
    chain: &'a mut dyn ChainClient,
    external: &'a ExternalAddresses,
    transactions: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        network: NetworkId,
        registry: &'a mut dyn Registry,
        chain: &'a mut dyn ChainClient,
        external: &'a ExternalAddresses,
    ) -> Self {
        Self {
            network,
            registry,
            chain,
            external,
            transactions: 0,
        }
    }

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    /// Execute every node of `plan` in dependency order.
    ///
    /// Stops at the first failure. Everything confirmed up to that point is
    /// already in the registry, so running again continues from there.
    pub fn run(&mut self, plan: &DeploymentPlan) -> anyhow::Result<DeploymentReport> {
        let order = plan.ordered()?;
        let deployer = self.chain.deployer();
        let mut resolved: BTreeMap<Component, Address> = BTreeMap::new();
        let mut report = DeploymentReport::new(self.network.clone());

        tracing::info!(network = %self.network, nodes = order.len(), %deployer, "starting deployment");

        for node in order {
            let node_report = match node {
                PlanNode::Component(spec) => self
                    .component(spec, &mut resolved, &deployer)
                    .with_context(|| format!("Failed to deploy {}", spec.component))?,
                PlanNode::Task(spec) => self
                    .task(spec, &resolved, &deployer)
                    .with_context(|| format!("Failed to run {}", spec.task.id()))?,
            };
            report.nodes.push(node_report);
        }

        report.transactions = self.transactions;
        tracing::info!(
            network = %self.network,
            transactions = report.transactions,
            "deployment complete"
        );
        Ok(report)
    }

    fn component(
        &mut self,
        spec: &ComponentSpec,
        resolved: &mut BTreeMap<Component, Address>,
        deployer: &Address,
    ) -> anyhow::Result<NodeReport> {
        let component = spec.component;
        let id = component.id();

        let (address, outcome) = match self.registry.lookup(&self.network, id)? {
            Some(ComponentRecord::Ready(address)) => {
                self.chain.attach(component.contract(), &address)?;
                tracing::debug!(component = id, %address, "already deployed, skipping");
                resolved.insert(component, address);
                return Ok(NodeReport {
                    node: id.to_string(),
                    outcome: NodeOutcome::Reused,
                    steps_sent: 0,
                    steps_skipped: spec.wiring.len(),
                });
            }
            Some(ComponentRecord::Deployed(address)) => {
                self.chain.attach(component.contract(), &address)?;
                tracing::warn!(component = id, %address, "resuming wiring of a partially configured component");
                (address, NodeOutcome::Resumed)
            }
            Some(ComponentRecord::Deploying) => match &spec.provision {
                // Pools are discoverable through the factory, so an
                // interrupted creation can be recovered without the operator.
                Provision::FactoryPair { token } => {
                    tracing::warn!(component = id, "recovering interrupted pool creation");
                    let address = self.provision_pair(spec, *token, resolved, deployer)?;
                    (address, NodeOutcome::Deployed)
                }
                Provision::Deploy { .. } => {
                    return Err(DeployError::InterruptedDeployment {
                        network: self.network.clone(),
                        component: id.to_string(),
                    }
                    .into());
                }
            },
            None => {
                let address = match &spec.provision {
                    Provision::Deploy { strategy, args } => {
                        self.deploy(spec, *strategy, args, resolved, deployer)?
                    }
                    Provision::FactoryPair { token } => {
                        self.provision_pair(spec, *token, resolved, deployer)?
                    }
                };
                (address, NodeOutcome::Deployed)
            }
        };

        resolved.insert(component, address);
        let (sent, skipped) =
            self.run_steps(component.into(), &spec.after, &spec.wiring, resolved, deployer)?;
        self.registry.mark_ready(&self.network, id)?;

        Ok(NodeReport {
            node: id.to_string(),
            outcome,
            steps_sent: sent,
            steps_skipped: skipped,
        })
    }

    fn task(
        &mut self,
        spec: &TaskSpec,
        resolved: &BTreeMap<Component, Address>,
        deployer: &Address,
    ) -> anyhow::Result<NodeReport> {
        let (sent, skipped) =
            self.run_steps(spec.task.into(), &spec.after, &spec.steps, resolved, deployer)?;
        let outcome = if sent > 0 {
            NodeOutcome::Executed
        } else {
            tracing::debug!(task = spec.task.id(), "all steps already confirmed");
            NodeOutcome::Skipped
        };
        Ok(NodeReport {
            node: spec.task.id().to_string(),
            outcome,
            steps_sent: sent,
            steps_skipped: skipped,
        })
    }

    /// Write the intent, deploy, wait, record.
    ///
    /// A deployment the network refused leaves no intent behind, so the next
    /// run simply tries again.
    fn deploy(
        &mut self,
        spec: &ComponentSpec,
        strategy: DeployStrategy,
        args: &ArgsFn,
        resolved: &BTreeMap<Component, Address>,
        deployer: &Address,
    ) -> anyhow::Result<Address> {
        let component = spec.component;
        let id = component.id();

        let block = self.chain.block(BlockTag::Latest)?;
        let inputs = Inputs::new(
            component.into(),
            &spec.after,
            resolved,
            deployer,
            self.external,
            block,
        );
        let args = args(&inputs)
            .with_context(|| format!("Failed to build constructor arguments for {id}"))?;

        self.registry.begin(&self.network, id)?;
        tracing::info!(
            component = id,
            contract = component.contract(),
            ?strategy,
            "deploying"
        );
        let request = DeployRequest {
            contract: component.contract().to_string(),
            args,
            strategy,
        };
        let pending = match self.chain.deploy(&request) {
            Ok(pending) => pending,
            Err(err) if err.is_rejection() => {
                self.registry.clear_intent(&self.network, id)?;
                tracing::warn!(component = id, error = %err, "deployment rejected, intent cleared");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        self.transactions += 1;
        self.chain.wait(&pending.tx)?;
        self.registry.record(&self.network, id, &pending.address)?;
        Ok(pending.address)
    }

    /// Create the token/WETH pool unless the factory already has one, then
    /// record the pool address.
    fn provision_pair(
        &mut self,
        spec: &ComponentSpec,
        token: Component,
        resolved: &BTreeMap<Component, Address>,
        deployer: &Address,
    ) -> anyhow::Result<Address> {
        let id = spec.component.id();
        let block = self.chain.block(BlockTag::Latest)?;
        let inputs = Inputs::new(
            spec.component.into(),
            &spec.after,
            resolved,
            deployer,
            self.external,
            block,
        );
        let token_address = inputs.address(token)?;

        let mut pair = self.get_pair(&token_address)?;
        if pair.is_zero() {
            self.registry.begin(&self.network, id)?;
            tracing::info!(component = id, token = %token_address, "creating pool");
            let factory = self.external.uniswap_v2_factory.clone();
            let create = Call::transaction(
                "createPair",
                vec![token_address.clone().into(), self.external.weth.clone().into()],
            );
            if let Err(err) = self.submit(&factory, &create) {
                if err.is_rejection() {
                    self.registry.clear_intent(&self.network, id)?;
                }
                return Err(err.into());
            }
            pair = self.get_pair(&token_address)?;
            if pair.is_zero() {
                return Err(DeployError::MissingPair {
                    component: id.to_string(),
                }
                .into());
            }
        } else {
            tracing::warn!(component = id, %pair, "pool already exists, adopting it");
        }

        self.registry.record(&self.network, id, &pair)?;
        Ok(pair)
    }

    fn get_pair(&mut self, token: &Address) -> anyhow::Result<Address> {
        let call = Call::view(
            "getPair",
            vec![token.clone().into(), self.external.weth.clone().into()],
        );
        let value = query(&mut *self.chain, &self.external.uniswap_v2_factory, &call)?;
        value.as_address().cloned().ok_or_else(|| {
            ChainError::UnexpectedOutcome {
                method: call.method.clone(),
            }
            .into()
        })
    }

    /// Run journaled calls in order. Returns `(sent, skipped)`.
    fn run_steps(
        &mut self,
        node: NodeId,
        after: &[NodeId],
        steps: &[StepSpec],
        resolved: &BTreeMap<Component, Address>,
        deployer: &Address,
    ) -> anyhow::Result<(usize, usize)> {
        let (mut sent, mut skipped) = (0, 0);

        for step in steps {
            let step_id = step.step_id(node);
            match self.registry.step_state(&self.network, &step_id)? {
                Some(StepState::Done) => {
                    tracing::debug!(step = %step_id, "already confirmed, skipping");
                    skipped += 1;
                    continue;
                }
                Some(StepState::Started) if step.replay == Replay::Once => {
                    return Err(DeployError::InterruptedStep {
                        network: self.network.clone(),
                        step: step_id,
                    }
                    .into());
                }
                Some(StepState::Started) => {
                    tracing::warn!(step = %step_id, "sending again, confirmation of the last attempt was not observed");
                }
                None => {}
            }

            let block = self.chain.block(BlockTag::Latest)?;
            let inputs = Inputs::new(node, after, resolved, deployer, self.external, block);
            let target = match step.target {
                CallTarget::Component(component) => inputs.address(component)?,
                CallTarget::UniswapRouter => self.external.uniswap_v2_router.clone(),
            };
            let args = (step.args)(&inputs)
                .with_context(|| format!("Failed to build arguments for {step_id}"))?;
            let mut call = Call::transaction(step.method, args);
            if let Some(value) = step.value {
                call = call.with_value(value);
            }

            if step.replay == Replay::Once {
                self.registry.begin_step(&self.network, &step_id)?;
            }
            tracing::info!(step = %step_id, %target, method = step.method, "sending");
            if let Err(err) = self.submit(&target, &call) {
                if step.replay == Replay::Once && err.is_rejection() {
                    self.registry.clear_step(&self.network, &step_id)?;
                }
                return Err(anyhow::Error::new(err).context(format!("Step {step_id} failed")));
            }
            self.registry.complete_step(&self.network, &step_id)?;
            sent += 1;
        }

        Ok((sent, skipped))
    }

    /// Send a transaction and block until it is confirmed.
    fn submit(&mut self, target: &Address, call: &Call) -> Result<(), ChainError> {
        send_and_confirm(&mut *self.chain, target, call)?;
        self.transactions += 1;
        Ok(())
    }
}
