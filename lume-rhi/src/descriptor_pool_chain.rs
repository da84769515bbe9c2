//! Descriptor pool chain (C2): grows a chain of descriptor pools per distinct layout shape
//! on demand instead of sizing one pool up front, and bulk-resets a pool once every set it
//! handed out has been released.
//!
//! Grounded on `original_source/Core/Framework/Private/Vulkan/DescriptorPoolChain.{h,cpp}`'s
//! `addNewPool`: each chain's Nth pool is sized for `2*N+1` sets (`0 -> 1 -> 3 -> 7 -> 15 -> ...`),
//! and chains are keyed by a content hash of the layout's `(DescriptorType, count)` pairs so two
//! unrelated layouts with the same binding shape happily share pools. Chains are sharded across
//! `descriptor_pool_bucket_count` independently-locked buckets (`EngineConfig`) to keep
//! concurrent allocation from different layouts off a single global mutex.

use crate::{Device, DescriptorPool, DescriptorPoolDescriptor, DescriptorSet, DescriptorSetLayout, DescriptorType};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Content hash of a layout's descriptor-type histogram. Two layouts with the same set of
/// `(type, count)` pairs (independent of binding order or index) get the same id and therefore
/// share a pool chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolId(u64);

impl DescriptorPoolId {
    pub fn from_pool_sizes(pool_sizes: &[(DescriptorType, u32)]) -> Self {
        let mut sorted: Vec<(DescriptorType, u32)> = pool_sizes.to_vec();
        sorted.sort_by_key(|(ty, _)| *ty as usize);
        let mut hasher = DefaultHasher::new();
        sorted.hash(&mut hasher);
        Self(hasher.finish())
    }
}

struct PoolSlot {
    pool: Box<dyn DescriptorPool>,
    max_sets: u32,
    live_sets: usize,
}

/// One growing sequence of pools for a single [`DescriptorPoolId`].
struct Chain {
    pool_sizes: Vec<(DescriptorType, u32)>,
    pools: Vec<PoolSlot>,
}

impl Chain {
    fn new(pool_sizes: Vec<(DescriptorType, u32)>) -> Self {
        Self { pools: Vec::new(), pool_sizes }
    }

    /// `maxSets` for the Nth pool in the chain: 0, 1, 3, 7, 15, 31, ...
    fn next_max_sets(n: usize) -> u32 {
        ((1u64 << (n + 1)) - 1) as u32
    }

    fn grow(&mut self, device: &dyn Device) -> Result<usize, String> {
        let n = pool_sequence_index(self.pools.len());
        let max_sets = Self::next_max_sets(n);
        let pool_sizes = self
            .pool_sizes
            .iter()
            .map(|(ty, per_set)| (*ty, per_set * max_sets))
            .collect();
        let desc = DescriptorPoolDescriptor { max_sets, pool_sizes };
        let pool = device.create_descriptor_pool_with_descriptor(&desc)?;
        log::debug!(
            "descriptor pool chain grew: {} -> {} max_sets",
            self.pools.last().map(|p| p.max_sets).unwrap_or(0),
            max_sets
        );
        self.pools.push(PoolSlot { pool, max_sets, live_sets: 0 });
        Ok(self.pools.len() - 1)
    }

    fn allocate(
        &mut self,
        device: &dyn Device,
        layout: &dyn DescriptorSetLayout,
    ) -> Result<(usize, Box<dyn DescriptorSet>), String> {
        for (index, slot) in self.pools.iter_mut().enumerate() {
            if (slot.live_sets as u32) < slot.max_sets {
                let set = slot.pool.allocate_set(layout)?;
                slot.live_sets += 1;
                return Ok((index, set));
            }
        }
        let index = self.grow(device)?;
        let slot = &mut self.pools[index];
        let set = slot.pool.allocate_set(layout)?;
        slot.live_sets += 1;
        Ok((index, set))
    }

    fn release(&mut self, pool_index: usize) {
        let Some(slot) = self.pools.get_mut(pool_index) else { return };
        slot.live_sets = slot.live_sets.saturating_sub(1);
        if slot.live_sets == 0 {
            if let Err(e) = slot.pool.reset() {
                log::warn!("descriptor pool chain: failed to bulk-reset empty pool: {e}");
            }
        }
    }

    /// Number of pools sitting completely idle (candidates for the periodic cleanup pass).
    fn empty_pool_count(&self) -> usize {
        self.pools.iter().filter(|p| p.live_sets == 0).count()
    }
}

/// `n` such that `pools.len() == n` maps to the pool we're about to create; kept as a free
/// function since it is also exercised directly by the growth-sequence test below.
fn pool_sequence_index(pools_len: usize) -> usize {
    pools_len
}

/// Drop a chain entirely once it accumulates more than this many simultaneously-empty pools;
/// they were sized for a burst of concurrent sets that has since passed.
const MAX_EMPTY_POOLS_PER_CHAIN: usize = 4;
/// Sweep every chain for fully-empty ones once the bucket's total pool count crosses this.
const GLOBAL_POOL_CLEANUP_THRESHOLD: usize = 64;

struct Bucket {
    chains: Mutex<HashMap<DescriptorPoolId, Chain>>,
}

/// A live descriptor set checked out of the chain. Releases its slot back to the chain on drop,
/// which may trigger a bulk pool reset if it was the last live set in its pool.
pub struct PooledDescriptorSet {
    set: Option<Box<dyn DescriptorSet>>,
    chain: Arc<DescriptorPoolChain>,
    id: DescriptorPoolId,
    bucket_index: usize,
    pool_index: usize,
}

impl PooledDescriptorSet {
    pub fn get(&self) -> &dyn DescriptorSet {
        self.set.as_deref().expect("set taken")
    }

    pub fn get_mut(&mut self) -> &mut dyn DescriptorSet {
        self.set.as_deref_mut().expect("set taken")
    }
}

impl Drop for PooledDescriptorSet {
    fn drop(&mut self) {
        self.set = None;
        let bucket = &self.chain.buckets[self.bucket_index];
        let mut chains = bucket.chains.lock().expect("descriptor pool chain mutex poisoned");
        if let Some(chain) = chains.get_mut(&self.id) {
            chain.release(self.pool_index);
        }
    }
}

impl std::fmt::Debug for PooledDescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledDescriptorSet").field("pool_index", &self.pool_index).finish()
    }
}

/// Sharded registry of descriptor pool chains, one chain per distinct layout shape.
pub struct DescriptorPoolChain {
    buckets: Vec<Bucket>,
    total_pools: AtomicUsize,
}

impl DescriptorPoolChain {
    pub fn new(bucket_count: usize) -> Arc<Self> {
        let bucket_count = bucket_count.max(1);
        let buckets = (0..bucket_count).map(|_| Bucket { chains: Mutex::new(HashMap::new()) }).collect();
        Arc::new(Self { buckets, total_pools: AtomicUsize::new(0) })
    }

    fn bucket_index(&self, id: DescriptorPoolId) -> usize {
        (id.0 as usize) % self.buckets.len()
    }

    /// Allocates a descriptor set from the chain keyed by `pool_sizes`, growing the chain if
    /// every existing pool is full.
    pub fn allocate(
        self: &Arc<Self>,
        device: &dyn Device,
        layout: &dyn DescriptorSetLayout,
        pool_sizes: &[(DescriptorType, u32)],
    ) -> Result<PooledDescriptorSet, String> {
        let id = DescriptorPoolId::from_pool_sizes(pool_sizes);
        let bucket_index = self.bucket_index(id);
        let bucket = &self.buckets[bucket_index];
        let mut chains = bucket.chains.lock().expect("descriptor pool chain mutex poisoned");
        let pools_before = chains.get(&id).map(|c| c.pools.len()).unwrap_or(0);
        let chain = chains.entry(id).or_insert_with(|| Chain::new(pool_sizes.to_vec()));
        let (pool_index, set) = chain.allocate(device, layout)?;
        let pools_after = chain.pools.len();
        drop(chains);

        if pools_after > pools_before {
            self.total_pools.fetch_add(1, Ordering::Relaxed);
        }

        Ok(PooledDescriptorSet {
            set: Some(set),
            chain: Arc::clone(self),
            id,
            bucket_index,
            pool_index,
        })
    }

    /// Periodic maintenance: drop any chain that has accumulated too many idle pools, and once
    /// the bucket's pool count crosses the global threshold, drop every chain sitting fully
    /// empty. Call this off the hot path (e.g. once per second from a maintenance tick).
    pub fn run_cleanup(&self) {
        for bucket in &self.buckets {
            let mut chains = bucket.chains.lock().expect("descriptor pool chain mutex poisoned");
            chains.retain(|_, chain| {
                if chain.empty_pool_count() > MAX_EMPTY_POOLS_PER_CHAIN {
                    log::debug!(
                        "descriptor pool chain: dropping chain with {} idle pools",
                        chain.empty_pool_count()
                    );
                    false
                } else {
                    true
                }
            });

            let bucket_pool_count: usize = chains.values().map(|c| c.pools.len()).sum();
            if bucket_pool_count > GLOBAL_POOL_CLEANUP_THRESHOLD {
                chains.retain(|_, chain| chain.empty_pool_count() < chain.pools.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_growth_sequence_matches_spec() {
        let expected = [0u32, 1, 3, 7, 15, 31];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(Chain::next_max_sets(n), *want);
        }
    }

    #[test]
    fn pool_id_ignores_binding_order() {
        let a = [(DescriptorType::UniformBuffer, 2), (DescriptorType::StorageImage, 1)];
        let b = [(DescriptorType::StorageImage, 1), (DescriptorType::UniformBuffer, 2)];
        assert_eq!(DescriptorPoolId::from_pool_sizes(&a), DescriptorPoolId::from_pool_sizes(&b));
    }

    #[test]
    fn pool_id_differs_on_distinct_shapes() {
        let a = [(DescriptorType::UniformBuffer, 2)];
        let b = [(DescriptorType::UniformBuffer, 1)];
        assert_ne!(DescriptorPoolId::from_pool_sizes(&a), DescriptorPoolId::from_pool_sizes(&b));
    }
}
