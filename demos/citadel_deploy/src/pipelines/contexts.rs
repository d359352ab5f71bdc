// citadel_deploy/src/pipelines/contexts.rs

//! Typed keys for every value the deployment scenarios put in the context.
//! Step declarations use the key names to state what they read and produce.

use crate::models::deployment::{BondAmounts, FundingPool, KnightingRoundDeployment, MintRequest};
use crate::models::roles::RoleSigners;
use crate::models::token_in::TokenIn;
use alloy_primitives::{Address, U256};
use std::path::PathBuf;
use stepwise::{Contract, DeploymentRecord, Key, UsdPrice};

// --- Scenario inputs ---

pub const MINT_TO: Key<Address> = Key::new("mintTo");
pub const X_CITADEL_FEES: Key<[u64; 4]> = Key::new("xCitadelFees");
pub const BASE_PATH: Key<PathBuf> = Key::new("basePath");
pub const CONFIG_FILE: Key<String> = Key::new("configFile");
pub const DESIRED_PRICE: Key<UsdPrice> = Key::new("desiredPriceInUsd");
pub const CITADEL_ADDRESS: Key<Address> = Key::new("citadelTokenAddress");
pub const MULTISIG: Key<Address> = Key::new("citadelMultisig");
pub const MINT_REQUEST: Key<MintRequest> = Key::new("mintRequest");

// --- Deployed core contracts ---

pub const GAC: Key<Contract> = Key::new("gac");
pub const CITADEL: Key<Contract> = Key::new("citadel");
pub const X_CITADEL: Key<Contract> = Key::new("xCitadel");
pub const X_CITADEL_VESTER: Key<Contract> = Key::new("xCitadelVester");
pub const X_CITADEL_LOCKER: Key<Contract> = Key::new("xCitadelLocker");
pub const SCHEDULE: Key<Contract> = Key::new("schedule");
pub const CITADEL_MINTER: Key<Contract> = Key::new("citadelMinter");
pub const KNIGHTING_ROUND: Key<Contract> = Key::new("knightingRound");
pub const FUNDING_WBTC: Key<Contract> = Key::new("fundingWbtc");
pub const FUNDING_CVX: Key<Contract> = Key::new("fundingCvx");

// --- Mock tokens ---

pub const WBTC: Key<Contract> = Key::new("wbtc");
pub const CVX: Key<Contract> = Key::new("cvx");
pub const USDC: Key<Contract> = Key::new("usdc");

// --- Produced along the way ---

pub const SIGNERS: Key<RoleSigners> = Key::new("signers");
pub const ROLES_GRANTED: Key<usize> = Key::new("rolesGranted");
pub const CONFIG_PATH: Key<PathBuf> = Key::new("configPath");
pub const TOKEN_INS: Key<Vec<TokenIn>> = Key::new("tokenIns");
pub const FUNDINGS: Key<Vec<FundingPool>> = Key::new("fundings");
pub const ORACLE_REPORTS: Key<Vec<(String, U256)>> = Key::new("oracleReports");
pub const EPOCH_RATES: Key<Vec<U256>> = Key::new("epochRates");
pub const MINTING_START: Key<u64> = Key::new("mintingStart");
pub const GUEST_LIST: Key<Contract> = Key::new("knightingRoundGuestList");
pub const KNIGHTING_ROUNDS: Key<Vec<KnightingRoundDeployment>> = Key::new("knightingRounds");
pub const DEPLOYMENT_RECORD: Key<DeploymentRecord> = Key::new("deploymentRecord");
pub const MINTED_BALANCE: Key<U256> = Key::new("mintedBalance");

// --- User journey ---

pub const X_CITADEL_STRATEGY: Key<Contract> = Key::new("xCitadelStrategy");
pub const MEDIAN_ORACLE_WBTC: Key<Contract> = Key::new("medianOracleWbtc");
pub const MEDIAN_ORACLE_CVX: Key<Contract> = Key::new("medianOracleCvx");
pub const BOND_AMOUNTS: Key<BondAmounts> = Key::new("bondAmounts");
pub const LOCKED_X_CITADEL: Key<U256> = Key::new("lockedXCitadel");
pub const VESTING_END: Key<u64> = Key::new("vestingEnd");
