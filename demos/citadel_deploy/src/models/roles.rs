// citadel_deploy/src/models/roles.rs

use crate::errors::{AppError, Result};
use alloy_primitives::{keccak256, Address, B256};
use stepwise::Signer;

/// Named operators, picked from the backend's accounts by fixed index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSigners {
  pub governance: Signer,
  pub keeper: Signer,
  pub guardian: Signer,
  pub treasury_vault: Signer,
  pub tech_ops: Signer,
  pub treasury_ops: Signer,
  pub citadel_tree: Signer,
  pub policy_ops: Signer,
  pub rando: Signer,
  pub whale: Signer,
  pub shrimp: Signer,
  pub shark: Signer,
  pub eoa_oracle: Signer,
}

impl RoleSigners {
  pub fn from_accounts(accounts: &[Address]) -> Result<Self> {
    let pick = |label: &str, index: usize| {
      accounts
        .get(index)
        .map(|address| Signer::new(label, *address))
        .ok_or_else(|| {
          AppError::Validation(format!(
            "role '{}' needs account #{} but the backend exposes {} accounts",
            label,
            index,
            accounts.len()
          ))
        })
    };

    Ok(Self {
      governance: pick("governance", 12)?,
      keeper: pick("keeper", 11)?,
      guardian: pick("guardian", 13)?,
      treasury_vault: pick("treasuryVault", 14)?,
      tech_ops: pick("techOps", 15)?,
      treasury_ops: pick("treasuryOps", 18)?,
      citadel_tree: pick("citadelTree", 16)?,
      policy_ops: pick("policyOps", 19)?,
      rando: pick("rando", 17)?,
      whale: pick("whale", 7)?,
      shrimp: pick("shrimp", 8)?,
      shark: pick("shark", 9)?,
      eoa_oracle: pick("eoaOracle", 3)?,
    })
  }
}

/// Access-control role id: keccak-256 of the role name.
pub fn role_id(name: &str) -> B256 {
  keccak256(name.as_bytes())
}

pub const CONTRACT_GOVERNANCE_ROLE: &str = "CONTRACT_GOVERNANCE_ROLE";
pub const TREASURY_GOVERNANCE_ROLE: &str = "TREASURY_GOVERNANCE_ROLE";
pub const TECH_OPERATIONS_ROLE: &str = "TECH_OPERATIONS_ROLE";
pub const TREASURY_OPERATIONS_ROLE: &str = "TREASURY_OPERATIONS_ROLE";
pub const POLICY_OPERATIONS_ROLE: &str = "POLICY_OPERATIONS_ROLE";
pub const CITADEL_MINTER_ROLE: &str = "CITADEL_MINTER_ROLE";
pub const PAUSER_ROLE: &str = "PAUSER_ROLE";
pub const UNPAUSER_ROLE: &str = "UNPAUSER_ROLE";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn too_few_accounts_is_a_validation_error() {
    let accounts: Vec<Address> = (0u8..12).map(Address::repeat_byte).collect();
    assert!(matches!(RoleSigners::from_accounts(&accounts), Err(AppError::Validation(_))));
  }

  #[test]
  fn role_id_is_keccak_of_name() {
    assert_eq!(role_id(PAUSER_ROLE), keccak256(b"PAUSER_ROLE"));
    assert_ne!(role_id(PAUSER_ROLE), role_id(UNPAUSER_ROLE));
  }
}
