//! Role based access control for vault and strategy entry points

use alloy_primitives::Address;

use crate::utils::error::{VaultError, VaultResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Governance,
    Management,
    Guardian,
    Strategist,
    Keeper,
    /// The vault contract itself
    Vault,
    /// The strategy contract itself
    Strategy,
}

/// Strategist or governance
pub const AUTHORIZED: &[Role] = &[Role::Strategist, Role::Governance];

/// Anyone allowed to run harvest and tend
pub const KEEPERS: &[Role] = &[
    Role::Keeper,
    Role::Strategist,
    Role::Governance,
    Role::Guardian,
    Role::Management,
];

/// Anyone allowed to pull the emergency exit
pub const EMERGENCY_AUTHORIZED: &[Role] = &[
    Role::Strategist,
    Role::Governance,
    Role::Guardian,
    Role::Management,
];

pub const VAULT_MANAGERS: &[Role] = &[Role::Governance, Role::Management];

pub const GOVERNANCE: &[Role] = &[Role::Governance];

/// Identities holding each role, resolved for one call
#[derive(Clone, Copy, Debug, Default)]
pub struct Authority {
    pub governance: Address,
    pub management: Address,
    pub guardian: Address,
    pub strategist: Option<Address>,
    pub keeper: Option<Address>,
    pub vault: Option<Address>,
    pub strategy: Option<Address>,
}

impl Authority {
    fn holds(&self, caller: Address, role: Role) -> bool {
        let holder = match role {
            Role::Governance => Some(self.governance),
            Role::Management => Some(self.management),
            Role::Guardian => Some(self.guardian),
            Role::Strategist => self.strategist,
            Role::Keeper => self.keeper,
            Role::Vault => self.vault,
            Role::Strategy => self.strategy,
        };
        holder.is_some_and(|holder| holder != Address::ZERO && holder == caller)
    }

    /// Returns Err if `caller` holds none of `roles`
    pub fn require(&self, caller: Address, roles: &[Role]) -> VaultResult<()> {
        if roles.iter().any(|role| self.holds(caller, *role)) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized)
        }
    }
}
