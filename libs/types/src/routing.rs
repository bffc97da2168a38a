//! Static role → address routing
//!
//! Built once at startup and shared behind an `Arc`; nothing can change an
//! entry afterwards. Each actor receives the table at construction instead of
//! baking peer addresses into its code.

use crate::{Address, Role};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no address configured for role '{0}'")]
    MissingRole(Role),

    #[error("address {address} is assigned to both '{first}' and '{second}'")]
    DuplicateAddress {
        address: Address,
        first: Role,
        second: Role,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<Role, Address>,
}

impl RoutingTable {
    /// Build a table, rejecting two roles that share one mailbox
    pub fn new(routes: impl IntoIterator<Item = (Role, Address)>) -> Result<Self, RoutingError> {
        let mut table = BTreeMap::new();
        for (role, address) in routes {
            if let Some((existing, _)) = table
                .iter()
                .find(|(other, a): &(&Role, &Address)| **a == address && **other != role)
            {
                return Err(RoutingError::DuplicateAddress {
                    address,
                    first: *existing,
                    second: role,
                });
            }
            table.insert(role, address);
        }
        Ok(Self { routes: table })
    }

    /// Table with every role derived from `(role, seed)` pairs
    pub fn from_seeds<'a>(
        seeds: impl IntoIterator<Item = (Role, &'a str)>,
    ) -> Result<Self, RoutingError> {
        Self::new(
            seeds
                .into_iter()
                .map(|(role, seed)| (role, Address::from_seed(seed))),
        )
    }

    /// Table with a random address for every role
    pub fn random() -> Self {
        Self {
            routes: Role::ALL
                .iter()
                .map(|role| (*role, Address::random()))
                .collect(),
        }
    }

    pub fn address(&self, role: Role) -> Result<&Address, RoutingError> {
        self.routes.get(&role).ok_or(RoutingError::MissingRole(role))
    }

    pub fn role_of(&self, address: &Address) -> Option<Role> {
        self.routes
            .iter()
            .find(|(_, a)| *a == address)
            .map(|(role, _)| *role)
    }

    /// Fails on the first role without an address
    pub fn require_all(&self) -> Result<(), RoutingError> {
        for role in Role::ALL {
            self.address(role)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &Address)> {
        self.routes.iter().map(|(role, address)| (*role, address))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
