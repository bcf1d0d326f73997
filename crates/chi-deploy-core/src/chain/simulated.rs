//! In-process chain used for rehearsals and tests.
//!
//! Models just enough of the target network for a deployment to be checked
//! end to end: contract creation with deterministic addresses, ERC20-style
//! tokens with an owner-managed minter set, a Uniswap V2 factory and router,
//! and a log of every mined transaction. Any other call is recorded on the
//! target contract and accepted.
//!
//! One-shot faults can be armed to fail a transaction: refused by the node,
//! lost before it is sent, or mined without its confirmation being observed.
//! That is how crash-and-resume scenarios are reproduced.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    BlockInfo, BlockTag, Call, CallKind, CallOutcome, ChainClient, ChainError, ContractHandle,
    DeployRequest, DeployStrategy, PendingDeployment, Receipt, TxHandle,
};
use crate::config::ExternalAddresses;
use crate::types::{Address, TokenAmount, Value};

/// First hardhat development account.
const DEFAULT_DEPLOYER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
/// Fork block of the rehearsal network.
const GENESIS_BLOCK: u64 = 18_071_507;
const GENESIS_TIMESTAMP: u64 = 1_694_563_200;
const BLOCK_TIME_SECS: u64 = 12;

const PAIR_CONTRACT: &str = "UniswapV2Pair";
const FACTORY_CONTRACT: &str = "UniswapV2Factory";
const ROUTER_CONTRACT: &str = "UniswapV2Router02";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPoint {
    /// The node refuses the transaction outright.
    Reject,
    /// The connection drops while sending; the transaction is never sent.
    Submit,
    /// The transaction is mined, but waiting for it fails.
    Confirm,
}

/// A one-shot failure armed on the simulated chain.
///
/// `target` is a contract name for deployments, and a method name or
/// `Contract.method` for calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub point: FaultPoint,
    pub target: String,
    /// Matching transactions to let through before firing.
    #[serde(default)]
    pub skip: usize,
}

impl Fault {
    pub fn rejected(target: impl Into<String>) -> Self {
        Self {
            point: FaultPoint::Reject,
            target: target.into(),
            skip: 0,
        }
    }

    pub fn on_submit(target: impl Into<String>) -> Self {
        Self {
            point: FaultPoint::Submit,
            target: target.into(),
            skip: 0,
        }
    }

    pub fn on_confirm(target: impl Into<String>) -> Self {
        Self {
            point: FaultPoint::Confirm,
            target: target.into(),
            skip: 0,
        }
    }

    /// Fire on the `n`th match instead of the first (zero-based).
    pub fn nth(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    fn matches(&self, contract: &str, method: Option<&str>) -> bool {
        match (self.target.split_once('.'), method) {
            (Some((c, m)), Some(method)) => c == contract && m == method,
            (Some(_), None) => false,
            (None, Some(method)) => self.target == method,
            (None, None) => self.target == contract,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxKind {
    Deploy {
        contract: String,
        address: Address,
        strategy: DeployStrategy,
    },
    Call {
        contract: String,
        target: Address,
        method: String,
    },
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub hash: TxHandle,
    pub block: u64,
    #[serde(flatten)]
    pub kind: TxKind,
}

impl TxRecord {
    pub fn method(&self) -> Option<&str> {
        match &self.kind {
            TxKind::Call { method, .. } => Some(method),
            TxKind::Deploy { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<TokenAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenState {
    owner: Address,
    minters: BTreeSet<Address>,
    balances: BTreeMap<Address, TokenAmount>,
    /// Keyed by `owner/spender`.
    allowances: BTreeMap<String, TokenAmount>,
    total_supply: TokenAmount,
}

impl TokenState {
    fn owned_by(owner: Address) -> Self {
        Self {
            owner,
            minters: BTreeSet::new(),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: TokenAmount::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Behavior {
    Plain,
    Token(TokenState),
    Factory {
        /// Keyed by the sorted token pair, `a/b`.
        pairs: BTreeMap<String, Address>,
    },
    Router {
        factory: Address,
        weth: Address,
    },
    Pair {
        token0: Address,
        token1: Address,
        reserve0: TokenAmount,
        reserve1: TokenAmount,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SimContract {
    contract: String,
    strategy: DeployStrategy,
    args: Vec<Value>,
    behavior: Behavior,
    #[serde(default)]
    calls: Vec<RecordedCall>,
}

impl SimContract {
    fn new(contract: &str, strategy: DeployStrategy, args: Vec<Value>, behavior: Behavior) -> Self {
        Self {
            contract: contract.to_string(),
            strategy,
            args,
            behavior,
            calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingTx {
    block: u64,
    confirms: bool,
}

/// Deterministic in-memory chain implementing [`ChainClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedChain {
    deployer: Address,
    nonce: u64,
    head: BlockInfo,
    genesis: BlockInfo,
    contracts: BTreeMap<Address, SimContract>,
    pending: BTreeMap<TxHandle, PendingTx>,
    log: Vec<TxRecord>,
    #[serde(default)]
    faults: Vec<Fault>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(Address::known(DEFAULT_DEPLOYER))
    }
}

impl SimulatedChain {
    /// Empty chain with no pre-existing contracts.
    pub fn new(deployer: Address) -> Self {
        let genesis = BlockInfo {
            number: GENESIS_BLOCK,
            timestamp: GENESIS_TIMESTAMP,
        };
        Self {
            deployer,
            nonce: 0,
            head: genesis,
            genesis,
            contracts: BTreeMap::new(),
            pending: BTreeMap::new(),
            log: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Chain with the external contracts a deployment expects already in place.
    pub fn with_externals(external: &ExternalAddresses) -> Self {
        let mut chain = Self::default();
        chain.install_externals(external);
        chain
    }

    pub fn install_externals(&mut self, external: &ExternalAddresses) {
        let preinstalled = [
            (
                &external.uniswap_v2_factory,
                FACTORY_CONTRACT,
                Behavior::Factory {
                    pairs: BTreeMap::new(),
                },
            ),
            (
                &external.uniswap_v2_router,
                ROUTER_CONTRACT,
                Behavior::Router {
                    factory: external.uniswap_v2_factory.clone(),
                    weth: external.weth.clone(),
                },
            ),
            (&external.weth, "WETH9", Behavior::Plain),
            (&external.steth, "StETH", Behavior::Plain),
            (&external.eth_usd_price_feed, "AggregatorV3", Behavior::Plain),
            (&external.steth_usd_price_feed, "AggregatorV3", Behavior::Plain),
        ];
        for (address, contract, behavior) in preinstalled {
            self.contracts.entry(address.clone()).or_insert_with(|| {
                SimContract::new(contract, DeployStrategy::Direct, Vec::new(), behavior)
            });
        }
    }

    /// Arm a one-shot fault.
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Every mined transaction, oldest first.
    pub fn transactions(&self) -> &[TxRecord] {
        &self.log
    }

    /// Calls recorded on a contract, filtered by method.
    pub fn calls_to<'a>(
        &'a self,
        address: &Address,
        method: &'a str,
    ) -> impl Iterator<Item = &'a RecordedCall> + 'a {
        self.contracts
            .get(address)
            .into_iter()
            .flat_map(|contract| contract.calls.iter())
            .filter(move |call| call.method == method)
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> TokenAmount {
        self.token(token)
            .and_then(|state| state.balances.get(holder).copied())
            .unwrap_or(TokenAmount::ZERO)
    }

    pub fn minters(&self, token: &Address) -> BTreeSet<Address> {
        self.token(token)
            .map(|state| state.minters.clone())
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: &Address) -> TokenAmount {
        self.token(token)
            .map(|state| state.total_supply)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Reserves of a pair, in `(token0, token1)` order.
    pub fn pair_reserves(&self, pair: &Address) -> Option<(TokenAmount, TokenAmount)> {
        match self.contracts.get(pair).map(|c| &c.behavior) {
            Some(Behavior::Pair {
                reserve0, reserve1, ..
            }) => Some((*reserve0, *reserve1)),
            _ => None,
        }
    }

    /// Load a saved rehearsal chain.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read simulated chain state {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse simulated chain state {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write simulated chain state {}", path.display()))
    }

    fn token(&self, address: &Address) -> Option<&TokenState> {
        match self.contracts.get(address).map(|c| &c.behavior) {
            Some(Behavior::Token(state)) => Some(state),
            _ => None,
        }
    }

    /// Remove and return the first armed fault matching the transaction,
    /// counting down `skip` on the way.
    fn take_fault(&mut self, contract: &str, method: Option<&str>) -> Option<FaultPoint> {
        let index = self
            .faults
            .iter()
            .position(|fault| fault.matches(contract, method))?;
        if self.faults[index].skip > 0 {
            self.faults[index].skip -= 1;
            return None;
        }
        Some(self.faults.remove(index).point)
    }

    fn next_address(&mut self, salt: &[u8]) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(salt);
        hasher.update(self.deployer.as_str().as_bytes());
        hasher.update(&self.nonce.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Address::from_bytes(bytes)
    }

    fn pair_address(factory: &Address, key: &str) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"pair");
        hasher.update(factory.as_str().as_bytes());
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Address::from_bytes(bytes)
    }

    /// Mine a transaction: bump nonce and head, log it, and remember whether
    /// its confirmation will be observed.
    fn mine(&mut self, kind: TxKind, confirms: bool) -> TxHandle {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tx");
        hasher.update(self.deployer.as_str().as_bytes());
        hasher.update(&self.nonce.to_le_bytes());
        let hash = TxHandle(format!("0x{}", hasher.finalize().to_hex()));

        self.nonce += 1;
        self.head = BlockInfo {
            number: self.head.number + 1,
            timestamp: self.head.timestamp + BLOCK_TIME_SECS,
        };
        self.pending.insert(
            hash.clone(),
            PendingTx {
                block: self.head.number,
                confirms,
            },
        );
        self.log.push(TxRecord {
            hash: hash.clone(),
            block: self.head.number,
            kind,
        });
        hash
    }

    fn behavior_for(&self, request: &DeployRequest) -> Result<Behavior, ChainError> {
        match request.contract.as_str() {
            "USC" => Ok(Behavior::Token(TokenState::owned_by(self.deployer.clone()))),
            "CHI" => {
                let supply = request
                    .args
                    .first()
                    .and_then(Value::as_uint)
                    .map(TokenAmount::from_base_units)
                    .ok_or_else(|| ChainError::DeploymentFailed {
                        contract: request.contract.clone(),
                        reason: "missing initial supply".to_string(),
                    })?;
                let mut state = TokenState::owned_by(self.deployer.clone());
                state.total_supply = supply;
                state.balances.insert(self.deployer.clone(), supply);
                Ok(Behavior::Token(state))
            }
            _ => Ok(Behavior::Plain),
        }
    }

    /// Answer a read-only call.
    fn view(&self, target: &Address, contract: &SimContract, call: &Call) -> Result<Value, ChainError> {
        let revert = |reason: &str| ChainError::Reverted {
            target: target.clone(),
            method: call.method.clone(),
            reason: reason.to_string(),
        };
        match (&contract.behavior, call.method.as_str()) {
            (Behavior::Factory { pairs }, "getPair") => {
                let (a, b) = two_addresses(&call.args).ok_or_else(|| revert("bad arguments"))?;
                Ok(pairs
                    .get(&pair_key(a, b))
                    .cloned()
                    .unwrap_or_else(Address::zero)
                    .into())
            }
            _ => Err(revert("no such view")),
        }
    }

    /// Apply a state-changing call. Nothing is mutated when it reverts.
    fn execute(&mut self, target: &Address, call: &Call) -> Result<(), ChainError> {
        let deployer = self.deployer.clone();
        let timestamp = self.head.timestamp;
        let revert = |reason: &str| ChainError::Reverted {
            target: target.clone(),
            method: call.method.clone(),
            reason: reason.to_string(),
        };

        let contract = self
            .contracts
            .get(target)
            .ok_or_else(|| revert("no contract at target"))?;

        match (&contract.behavior, call.method.as_str()) {
            (Behavior::Token(_), "updateMinter") => {
                let account = address_arg(&call.args, 0).ok_or_else(|| revert("bad arguments"))?;
                let allowed = call
                    .args
                    .get(1)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| revert("bad arguments"))?;
                let state = self.token_mut(target)?;
                if state.owner != deployer {
                    return Err(revert("caller is not the owner"));
                }
                if allowed {
                    state.minters.insert(account.clone());
                } else {
                    state.minters.remove(account);
                }
            }
            (Behavior::Token(_), "mint") => {
                let to = address_arg(&call.args, 0).ok_or_else(|| revert("bad arguments"))?;
                let amount = amount_arg(&call.args, 1).ok_or_else(|| revert("bad arguments"))?;
                let state = self.token_mut(target)?;
                if !state.minters.contains(&deployer) {
                    return Err(revert("caller is not a minter"));
                }
                credit(state, to, amount).ok_or_else(|| revert("overflow"))?;
            }
            (Behavior::Token(_), "approve") => {
                let spender = address_arg(&call.args, 0).ok_or_else(|| revert("bad arguments"))?;
                let amount = amount_arg(&call.args, 1).ok_or_else(|| revert("bad arguments"))?;
                let state = self.token_mut(target)?;
                state
                    .allowances
                    .insert(allowance_key(&deployer, spender), amount);
            }
            (Behavior::Factory { pairs }, "createPair") => {
                let (a, b) = two_addresses(&call.args).ok_or_else(|| revert("bad arguments"))?;
                if a == b {
                    return Err(revert("IDENTICAL_ADDRESSES"));
                }
                let key = pair_key(a, b);
                if pairs.contains_key(&key) {
                    return Err(revert("PAIR_EXISTS"));
                }
                let (token0, token1) = sorted(a, b);
                self.create_pair(target, key, token0.clone(), token1.clone());
            }
            (Behavior::Router { factory, weth }, "addLiquidityETH") => {
                let (factory, weth) = (factory.clone(), weth.clone());
                let token = address_arg(&call.args, 0).ok_or_else(|| revert("bad arguments"))?;
                let amount = amount_arg(&call.args, 1).ok_or_else(|| revert("bad arguments"))?;
                let deadline = call
                    .args
                    .get(5)
                    .and_then(Value::as_uint)
                    .ok_or_else(|| revert("bad arguments"))?;
                if deadline < u128::from(timestamp) {
                    return Err(revert("EXPIRED"));
                }
                let eth = call.value.unwrap_or(TokenAmount::ZERO);
                self.add_liquidity(target, &factory, token, &weth, amount, eth)
                    .map_err(|reason| revert(reason))?;
            }
            _ => {}
        }

        if let Some(contract) = self.contracts.get_mut(target) {
            contract.calls.push(RecordedCall {
                method: call.method.clone(),
                args: call.args.clone(),
                value: call.value,
            });
        }
        Ok(())
    }

    fn token_mut(&mut self, address: &Address) -> Result<&mut TokenState, ChainError> {
        match self.contracts.get_mut(address).map(|c| &mut c.behavior) {
            Some(Behavior::Token(state)) => Ok(state),
            _ => Err(ChainError::NoContract {
                contract: "ERC20".to_string(),
                address: address.clone(),
            }),
        }
    }

    fn create_pair(&mut self, factory: &Address, key: String, token0: Address, token1: Address) {
        let pair = Self::pair_address(factory, &key);
        if let Some(SimContract {
            behavior: Behavior::Factory { pairs },
            ..
        }) = self.contracts.get_mut(factory)
        {
            pairs.insert(key, pair.clone());
        }
        self.contracts.insert(
            pair.clone(),
            SimContract::new(
                PAIR_CONTRACT,
                DeployStrategy::Direct,
                vec![token0.clone().into(), token1.clone().into()],
                Behavior::Pair {
                    token0,
                    token1,
                    reserve0: TokenAmount::ZERO,
                    reserve1: TokenAmount::ZERO,
                },
            ),
        );
    }

    /// Pull `amount` of `token` from the deployer into the token/WETH pair.
    fn add_liquidity(
        &mut self,
        router: &Address,
        factory: &Address,
        token: &Address,
        weth: &Address,
        amount: TokenAmount,
        eth: TokenAmount,
    ) -> Result<(), &'static str> {
        let key = pair_key(token, weth);
        let existing = match self.contracts.get(factory).map(|c| &c.behavior) {
            Some(Behavior::Factory { pairs }) => pairs.get(&key).cloned(),
            _ => return Err("router factory missing"),
        };
        let pair = existing.ok_or("pair does not exist")?;

        let deployer = self.deployer.clone();
        let state = match self.contracts.get_mut(token).map(|c| &mut c.behavior) {
            Some(Behavior::Token(state)) => state,
            _ => return Err("token is not an ERC20"),
        };
        let key = allowance_key(&deployer, router);
        let allowance = state.allowances.get(&key).copied().unwrap_or(TokenAmount::ZERO);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or("TRANSFER_FROM_FAILED")?;
        debit(state, &deployer, amount).ok_or("TRANSFER_FROM_FAILED")?;
        credit(state, &pair, amount).ok_or("overflow")?;
        state.allowances.insert(key, remaining);

        if let Some(SimContract {
            behavior:
                Behavior::Pair {
                    token0,
                    reserve0,
                    reserve1,
                    ..
                },
            ..
        }) = self.contracts.get_mut(&pair)
        {
            let (token_reserve, eth_reserve) = if token0 == token {
                (reserve0, reserve1)
            } else {
                (reserve1, reserve0)
            };
            *token_reserve = token_reserve.checked_add(amount).ok_or("overflow")?;
            *eth_reserve = eth_reserve.checked_add(eth).ok_or("overflow")?;
        }
        Ok(())
    }
}

impl ChainClient for SimulatedChain {
    fn deployer(&self) -> Address {
        self.deployer.clone()
    }

    fn deploy(&mut self, request: &DeployRequest) -> Result<PendingDeployment, ChainError> {
        let fault = self.take_fault(&request.contract, None);
        match fault {
            Some(FaultPoint::Reject) => {
                return Err(ChainError::DeploymentFailed {
                    contract: request.contract.clone(),
                    reason: "rejected by the node".to_string(),
                });
            }
            Some(FaultPoint::Submit) => {
                return Err(ChainError::Transport(format!(
                    "connection lost while sending {} deployment",
                    request.contract
                )));
            }
            _ => {}
        }

        let behavior = self.behavior_for(request)?;
        let address = self.next_address(request.contract.as_bytes());
        self.contracts.insert(
            address.clone(),
            SimContract::new(
                &request.contract,
                request.strategy,
                request.args.clone(),
                behavior,
            ),
        );
        let tx = self.mine(
            TxKind::Deploy {
                contract: request.contract.clone(),
                address: address.clone(),
                strategy: request.strategy,
            },
            fault != Some(FaultPoint::Confirm),
        );
        Ok(PendingDeployment { address, tx })
    }

    fn wait(&mut self, tx: &TxHandle) -> Result<Receipt, ChainError> {
        match self.pending.remove(tx) {
            Some(PendingTx {
                confirms: true,
                block,
            }) => Ok(Receipt {
                tx: tx.clone(),
                block_number: block,
            }),
            _ => Err(ChainError::NotConfirmed { tx: tx.clone() }),
        }
    }

    fn call(&mut self, target: &Address, call: &Call) -> Result<CallOutcome, ChainError> {
        let contract = self
            .contracts
            .get(target)
            .ok_or_else(|| ChainError::Reverted {
                target: target.clone(),
                method: call.method.clone(),
                reason: "no contract at target".to_string(),
            })?;

        if call.kind == CallKind::View {
            return self.view(target, contract, call).map(CallOutcome::Returned);
        }

        let name = contract.contract.clone();
        let fault = self.take_fault(&name, Some(&call.method));
        match fault {
            Some(FaultPoint::Reject) => {
                return Err(ChainError::Reverted {
                    target: target.clone(),
                    method: call.method.clone(),
                    reason: "rejected by the node".to_string(),
                });
            }
            Some(FaultPoint::Submit) => {
                return Err(ChainError::Transport(format!(
                    "connection lost while sending {}.{}",
                    name, call.method
                )));
            }
            _ => {}
        }

        self.execute(target, call)?;
        let tx = self.mine(
            TxKind::Call {
                contract: name,
                target: target.clone(),
                method: call.method.clone(),
            },
            fault != Some(FaultPoint::Confirm),
        );
        Ok(CallOutcome::Submitted(tx))
    }

    fn block(&mut self, tag: BlockTag) -> Result<BlockInfo, ChainError> {
        match tag {
            BlockTag::Latest => Ok(self.head),
            BlockTag::Number(number) if number <= self.head.number => {
                let elapsed = number.saturating_sub(self.genesis.number) * BLOCK_TIME_SECS;
                Ok(BlockInfo {
                    number,
                    timestamp: self.genesis.timestamp + elapsed,
                })
            }
            BlockTag::Number(number) => Err(ChainError::UnknownBlock(number)),
        }
    }

    fn attach(&mut self, contract: &str, address: &Address) -> Result<ContractHandle, ChainError> {
        match self.contracts.get(address) {
            Some(found) if found.contract == contract => Ok(ContractHandle {
                contract: contract.to_string(),
                address: address.clone(),
            }),
            _ => Err(ChainError::NoContract {
                contract: contract.to_string(),
                address: address.clone(),
            }),
        }
    }
}

fn address_arg(args: &[Value], index: usize) -> Option<&Address> {
    args.get(index).and_then(Value::as_address)
}

fn amount_arg(args: &[Value], index: usize) -> Option<TokenAmount> {
    args.get(index)
        .and_then(Value::as_uint)
        .map(TokenAmount::from_base_units)
}

fn two_addresses(args: &[Value]) -> Option<(&Address, &Address)> {
    Some((address_arg(args, 0)?, address_arg(args, 1)?))
}

fn sorted<'a>(a: &'a Address, b: &'a Address) -> (&'a Address, &'a Address) {
    if a <= b { (a, b) } else { (b, a) }
}

fn pair_key(a: &Address, b: &Address) -> String {
    let (first, second) = sorted(a, b);
    format!("{first}/{second}")
}

fn allowance_key(owner: &Address, spender: &Address) -> String {
    format!("{owner}/{spender}")
}

fn credit(state: &mut TokenState, to: &Address, amount: TokenAmount) -> Option<()> {
    let balance = state.balances.entry(to.clone()).or_default();
    *balance = balance.checked_add(amount)?;
    state.total_supply = state.total_supply.checked_add(amount)?;
    Some(())
}

fn debit(state: &mut TokenState, from: &Address, amount: TokenAmount) -> Option<()> {
    let balance = state.balances.get(from).copied().unwrap_or(TokenAmount::ZERO);
    state.balances.insert(from.clone(), balance.checked_sub(amount)?);
    state.total_supply = state.total_supply.checked_sub(amount)?;
    Some(())
}
