//! Configuration schema for deploy.toml
//!
//! Every section is optional; missing values fall back to the parameters
//! the protocol launched with on mainnet.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{Address, TokenAmount};

/// Root configuration structure for deploy.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeployConfig {
    pub registry: RegistrySection,
    pub external: ExternalAddresses,
    pub tokens: TokenSection,
    pub liquidity: LiquiditySection,
    pub oracles: OracleSection,
    pub staking: StakingSection,
    pub bonding: BondingSection,
    pub sale: SaleSection,
    pub arbitrage: ArbitrageSection,
    pub distribution: DistributionSection,
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values the deployment cannot proceed with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sale.min_contribution > self.sale.max_contribution {
            anyhow::bail!(
                "sale.min_contribution ({}) exceeds sale.max_contribution ({})",
                self.sale.min_contribution,
                self.sale.max_contribution
            );
        }
        if self.sale.soft_cap > self.sale.hard_cap {
            anyhow::bail!(
                "sale.soft_cap ({}) exceeds sale.hard_cap ({})",
                self.sale.soft_cap,
                self.sale.hard_cap
            );
        }
        if self.staking.vesting_cliff_duration > self.staking.vesting_duration {
            anyhow::bail!("staking.vesting_cliff_duration must not exceed staking.vesting_duration");
        }
        if self.sale.tax_fall_window_secs == 0 {
            anyhow::bail!("sale.tax_fall_window_secs must be greater than zero");
        }
        if self.tokens.chi_initial_supply < self.liquidity.chi_amount {
            anyhow::bail!(
                "tokens.chi_initial_supply ({}) cannot cover liquidity.chi_amount ({})",
                self.tokens.chi_initial_supply,
                self.liquidity.chi_amount
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Registry document; the step journal lives next to it.
    pub path: PathBuf,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("deployed-contracts.json"),
        }
    }
}

/// Contracts that already exist on the target network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAddresses {
    pub uniswap_v2_factory: Address,
    pub uniswap_v2_router: Address,
    pub weth: Address,
    pub steth: Address,
    pub eth_usd_price_feed: Address,
    pub steth_usd_price_feed: Address,
    /// Receives bonding proceeds.
    pub treasury: Address,
    /// Receives sale proceeds.
    pub multisig: Address,
}

impl Default for ExternalAddresses {
    fn default() -> Self {
        Self {
            uniswap_v2_factory: Address::known("0x5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f"),
            uniswap_v2_router: Address::known("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            weth: Address::known("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            steth: Address::known("0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
            eth_usd_price_feed: Address::known("0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"),
            steth_usd_price_feed: Address::known("0xCfE54B5cD566aB89272946F602D76Ea879CAb4a8"),
            treasury: Address::known("0x3384c7CcB87a502494928C29703F26829c816699"),
            multisig: Address::known("0xbf5044a8171392406586162d6b3c210dfb0b6f96"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    /// CHI minted to the deployer by the token constructor.
    pub chi_initial_supply: TokenAmount,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            chi_initial_supply: TokenAmount::tokens(100_000_000),
        }
    }
}

/// Initial pool liquidity, supplied once by the deployer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquiditySection {
    pub usc_amount: TokenAmount,
    pub usc_pool_eth: TokenAmount,
    pub chi_amount: TokenAmount,
    pub chi_pool_eth: TokenAmount,
    /// Router deadline passed to `addLiquidityETH`. Kept as a string in
    /// TOML since it does not fit a TOML integer.
    #[serde(with = "u128_string")]
    pub deadline: u128,
}

impl Default for LiquiditySection {
    fn default() -> Self {
        Self {
            usc_amount: TokenAmount::tokens(5_000_000),
            usc_pool_eth: TokenAmount::tokens(3_000),
            chi_amount: TokenAmount::tokens(60_000_000),
            chi_pool_eth: TokenAmount::tokens(6_000),
            deadline: 99_999_999_999_999_999_999_999_999_999_999_999_999,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub twap_update_period: u64,
    pub twap_min_period_from_snapshot: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            twap_update_period: 500,
            twap_min_period_from_snapshot: 60 * 60 * 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingSection {
    /// Vesting cliff, in epochs.
    pub vesting_cliff_duration: u64,
    /// Vesting duration, in epochs.
    pub vesting_duration: u64,
    pub reserve_holder_eth_threshold: u64,
    /// Curve swap safeguard in basis points.
    pub curve_safe_guard_percentage: u64,
    pub incentives: IncentiveSection,
}

impl Default for StakingSection {
    fn default() -> Self {
        Self {
            vesting_cliff_duration: 24,
            vesting_duration: 48,
            reserve_holder_eth_threshold: 500,
            curve_safe_guard_percentage: 3_00,
            incentives: IncentiveSection::default(),
        }
    }
}

/// CHI incentives configured on the reward controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncentiveSection {
    pub usc_staking: TokenAmount,
    pub chi_locking: TokenAmount,
    pub usc_eth_lp_staking: TokenAmount,
    pub chi_eth_lp_staking: TokenAmount,
}

impl Default for IncentiveSection {
    fn default() -> Self {
        Self {
            usc_staking: TokenAmount::tokens(20_000),
            chi_locking: TokenAmount::tokens(30_000),
            usc_eth_lp_staking: TokenAmount::tokens(10_000),
            chi_eth_lp_staking: TokenAmount::tokens(15_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondingSection {
    /// Seconds from deployment until the bonding cliff ends.
    pub cliff_duration_secs: u64,
}

impl Default for BondingSection {
    fn default() -> Self {
        Self {
            cliff_duration_secs: 6 * 30 * 24 * 60 * 60,
        }
    }
}

/// Initial distribution sale (IDO) parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleSection {
    /// Delay between deployment and sale start.
    pub start_delay_secs: u64,
    pub duration_secs: u64,
    pub min_contribution: TokenAmount,
    pub max_contribution: TokenAmount,
    pub soft_cap: TokenAmount,
    pub hard_cap: TokenAmount,
    /// CHI per ETH.
    pub price: TokenAmount,
    /// Starting tax, 8 decimal percent (70% = 70_00000000).
    pub start_tax_percent: u64,
    /// Tax drop applied over `tax_fall_window_secs`.
    pub tax_fall_percent: u64,
    pub tax_fall_window_secs: u64,
}

impl Default for SaleSection {
    fn default() -> Self {
        let day = 60 * 60 * 24;
        Self {
            start_delay_secs: 2 * day,
            duration_secs: 2 * day,
            min_contribution: TokenAmount::from_base_units(100_000_000_000_000_000),
            max_contribution: TokenAmount::tokens(10),
            soft_cap: TokenAmount::tokens(80),
            hard_cap: TokenAmount::tokens(200),
            price: TokenAmount::tokens(15_000),
            start_tax_percent: 70_00000000,
            tax_fall_percent: 10_00000000,
            tax_fall_window_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageSection {
    pub usc_price_tolerance: u64,
    pub max_mint_price_diff: u64,
}

impl Default for ArbitrageSection {
    fn default() -> Self {
        Self {
            usc_price_tolerance: 200,
            max_mint_price_diff: 7_000_000,
        }
    }
}

/// Final CHI allocations minted at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSection {
    pub treasury: TokenAmount,
    pub ochi: TokenAmount,
    pub reward_controller: TokenAmount,
    /// Drop the deployer's CHI minting right once the allocations are minted.
    pub revoke_deployer_minter: bool,
}

impl Default for DistributionSection {
    fn default() -> Self {
        Self {
            treasury: TokenAmount::tokens(1_000_000),
            ochi: TokenAmount::tokens(1_000_000),
            reward_controller: TokenAmount::tokens(1_000_000),
            revoke_deployer_minter: false,
        }
    }
}

mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .replace('_', "")
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_external_addresses_are_valid() {
        let external = ExternalAddresses::default();
        for address in [
            &external.uniswap_v2_factory,
            &external.uniswap_v2_router,
            &external.weth,
            &external.steth,
            &external.eth_usd_price_feed,
            &external.steth_usd_price_feed,
            &external.treasury,
            &external.multisig,
        ] {
            assert_eq!(Address::parse(address.as_str()).as_ref(), Ok(address));
        }
    }

    #[test]
    fn defaults_validate() {
        DeployConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_inverted_caps() {
        let mut config = DeployConfig::default();
        config.sale.soft_cap = TokenAmount::tokens(500);
        assert!(config.validate().is_err());
    }
}
