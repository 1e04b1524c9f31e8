//! Overlap-detecting set of address blocks.
//!
//! Built fresh for each validation call. Pools hold tens of entries at
//! most, so insertion is a linear scan.

use ipnet::IpNet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpPoolError {
    #[error("CIDR {new} overlaps with {existing}")]
    Overlap { new: IpNet, existing: IpNet },
}

/// A set of pairwise non-overlapping CIDR blocks.
#[derive(Debug, Clone, Default)]
pub struct IpPool {
    blocks: Vec<IpNet>,
}

impl IpPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block, failing if it overlaps anything already in the pool.
    pub fn add(&mut self, cidr: IpNet) -> Result<(), IpPoolError> {
        if let Some(existing) = self.find_overlap(&cidr) {
            return Err(IpPoolError::Overlap {
                new: cidr,
                existing,
            });
        }
        self.blocks.push(cidr.trunc());
        Ok(())
    }

    /// First block in the pool that overlaps `cidr`, if any.
    pub fn find_overlap(&self, cidr: &IpNet) -> Option<IpNet> {
        self.blocks.iter().copied().find(|b| overlaps(b, cidr))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpNet> {
        self.blocks.iter()
    }
}

/// Two CIDR blocks overlap iff one contains the other's network address.
/// Blocks of different families never overlap.
pub fn overlaps(a: &IpNet, b: &IpNet) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}
