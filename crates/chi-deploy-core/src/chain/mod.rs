//! Chain client boundary.
//!
//! The orchestrator only needs to submit deployments and calls, wait for
//! confirmation, read blocks, and attach to contracts that already exist.
//! Signing, broadcasting and confirmation polling are the client's business.

pub mod simulated;

use serde::{Deserialize, Serialize};

use crate::types::{Address, TokenAmount, Value};

pub use simulated::{Fault, FaultPoint, SimulatedChain, TxKind, TxRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStrategy {
    /// Plain constructor deployment.
    Direct,
    /// Upgradeable proxy; `args` go to the initializer.
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Artifact name of the contract.
    pub contract: String,
    pub args: Vec<Value>,
    pub strategy: DeployStrategy,
}

/// Hash of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(pub String);

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub address: Address,
    pub tx: TxHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx: TxHandle,
    pub block_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// State-changing; yields a transaction to wait for.
    Transaction,
    /// Read-only; yields a value immediately.
    View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
    /// Native currency attached to the call.
    pub value: Option<TokenAmount>,
    pub kind: CallKind,
}

impl Call {
    pub fn transaction(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
            value: None,
            kind: CallKind::Transaction,
        }
    }

    pub fn view(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
            value: None,
            kind: CallKind::View,
        }
    }

    pub fn with_value(mut self, value: TokenAmount) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Submitted(TxHandle),
    Returned(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// A verified reference to a contract that already exists on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub contract: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("deployment of {contract} failed: {reason}")]
    DeploymentFailed { contract: String, reason: String },
    #[error("call {method} on {target} reverted: {reason}")]
    Reverted {
        target: Address,
        method: String,
        reason: String,
    },
    #[error("transaction {tx} was not confirmed")]
    NotConfirmed { tx: TxHandle },
    #[error("no {contract} contract at {address}")]
    NoContract { contract: String, address: Address },
    #[error("{method} returned an unexpected outcome")]
    UnexpectedOutcome { method: String },
    #[error("unknown block {0}")]
    UnknownBlock(u64),
    #[error("chain transport failure: {0}")]
    Transport(String),
}

impl ChainError {
    /// The network refused the transaction, so nothing it would have created
    /// or changed exists on chain.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChainError::DeploymentFailed { .. } | ChainError::Reverted { .. }
        )
    }
}

/// Everything the orchestrator asks of a chain.
///
/// Every method blocks until the underlying request completes; there is no
/// speculative or concurrent submission.
pub trait ChainClient {
    /// Account that signs every transaction.
    fn deployer(&self) -> Address;

    fn deploy(&mut self, request: &DeployRequest) -> Result<PendingDeployment, ChainError>;

    fn wait(&mut self, tx: &TxHandle) -> Result<Receipt, ChainError>;

    fn call(&mut self, target: &Address, call: &Call) -> Result<CallOutcome, ChainError>;

    fn block(&mut self, tag: BlockTag) -> Result<BlockInfo, ChainError>;

    /// Handle to an existing instance; fails if nothing of that kind lives there.
    fn attach(&mut self, contract: &str, address: &Address) -> Result<ContractHandle, ChainError>;
}

/// Submit a state-changing call and wait for its confirmation.
pub fn send_and_confirm(
    chain: &mut dyn ChainClient,
    target: &Address,
    call: &Call,
) -> Result<Receipt, ChainError> {
    match chain.call(target, call)? {
        CallOutcome::Submitted(tx) => chain.wait(&tx),
        CallOutcome::Returned(_) => Err(ChainError::UnexpectedOutcome {
            method: call.method.clone(),
        }),
    }
}

/// Run a view call and return its value.
pub fn query(
    chain: &mut dyn ChainClient,
    target: &Address,
    call: &Call,
) -> Result<Value, ChainError> {
    match chain.call(target, call)? {
        CallOutcome::Returned(value) => Ok(value),
        CallOutcome::Submitted(_) => Err(ChainError::UnexpectedOutcome {
            method: call.method.clone(),
        }),
    }
}
