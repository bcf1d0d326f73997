//! Deployment configuration.
//!
//! A single `deploy.toml` carries the external contract addresses of the
//! target network and every protocol parameter passed to constructors and
//! wiring calls. Network id, signer and endpoint are not part of it.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_deploy_toml, parse_deploy_toml_str, to_toml};
pub use schema::{
    ArbitrageSection, BondingSection, DeployConfig, DistributionSection, ExternalAddresses,
    IncentiveSection, LiquiditySection, OracleSection, RegistrySection, SaleSection,
    StakingSection, TokenSection,
};
pub use store::{ConfigStore, DEFAULT_CONFIG_FILE};
