//! Deterministic random number generation
//!
//! All entropy in the simulation flows through named channels owned by a
//! single registry. A channel is keyed by (world seed, channel name) through
//! a fixed FNV-style combine, so the stream a system sees depends only on
//! the seed and the name it asked for - never on what other systems drew
//! before it. Systems that need per-tick reproducibility reseed their
//! channel with an offset derived from (seed, tick, name).
//!
//! No component may read wall-clock time or any other entropy source.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};

use crate::core::error::{SimError, SimResult};

/// FNV-1a offset basis.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime.
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a hash of a byte slice.
///
/// Used to fold channel names into seeds. The result depends only on the
/// bytes, so the same name always keys the same stream.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Combine seed components into one value with FNV-style mixing.
pub fn combine_seed(parts: &[u64]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &part in parts {
        hash ^= part;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A named deterministic random stream.
///
/// Handles are cheap to clone; clones share the same underlying stream, so
/// a channel fetched twice by name continues one sequence of draws.
#[derive(Clone)]
pub struct RngChannel {
    name: Arc<str>,
    base_seed: u64,
    state: Arc<Mutex<ChaCha8Rng>>,
}

impl RngChannel {
    fn new(name: &str, base_seed: u64) -> Self {
        Self {
            name: Arc::from(name),
            base_seed,
            state: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(base_seed))),
        }
    }

    /// Name this channel was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draw an integer in `[lo_inclusive, hi_exclusive)`.
    pub fn next_int(&self, lo_inclusive: i64, hi_exclusive: i64) -> SimResult<i64> {
        if hi_exclusive <= lo_inclusive {
            return Err(SimError::InvalidArgument(format!(
                "next_int range is empty: [{}, {})",
                lo_inclusive, hi_exclusive
            )));
        }
        let mut rng = self.state.lock().expect("rng channel lock poisoned");
        Ok(rng.gen_range(lo_inclusive..hi_exclusive))
    }

    /// Draw a float in `[0, 1)`.
    pub fn next_float01(&self) -> f64 {
        let mut rng = self.state.lock().expect("rng channel lock poisoned");
        rng.gen::<f64>()
    }

    /// Restart the stream at a reproducible point derived from `offset`.
    ///
    /// Idempotent: reseeding twice with the same offset resets the stream
    /// to the same position.
    pub fn reseed(&self, offset: i64) {
        let seed = combine_seed(&[self.base_seed, offset as u64]);
        let mut rng = self.state.lock().expect("rng channel lock poisoned");
        *rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

/// Registry of named deterministic channels for one world seed.
pub struct RngRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    seed: u64,
    channels: ahash::AHashMap<String, RngChannel>,
}

impl RngRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                seed,
                channels: ahash::AHashMap::new(),
            }),
        }
    }

    /// Seed backing the current channel set.
    pub fn seed(&self) -> u64 {
        self.inner.lock().expect("rng registry lock poisoned").seed
    }

    /// Fetch (or create) the channel for `name`.
    ///
    /// Channels are cached: repeated requests return handles onto the same
    /// stream. Blank names are a configuration error.
    pub fn channel(&self, name: &str) -> SimResult<RngChannel> {
        if name.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "channel name must be provided".to_string(),
            ));
        }

        let mut inner = self.inner.lock().expect("rng registry lock poisoned");
        if let Some(channel) = inner.channels.get(name) {
            return Ok(channel.clone());
        }

        let seed = inner.seed;
        let base_seed = combine_seed(&[seed & 0xFFFF_FFFF, seed >> 32, fnv1a(name.as_bytes())]);
        let channel = RngChannel::new(name, base_seed);
        inner.channels.insert(name.to_string(), channel.clone());
        Ok(channel)
    }

    /// Reset to a new seed and drop all cached channels.
    pub fn reset(&self, seed: u64) {
        let mut inner = self.inner.lock().expect("rng registry lock poisoned");
        inner.seed = seed;
        inner.channels.clear();
    }
}
