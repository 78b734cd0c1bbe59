//! Seedable RNG service with per-stream generators.
//! Uses SplitMix64 for seeding and xorshift64* for the stream PRNG.
//! Streams can be derived from human-readable names via a fast FNV-1a 64-bit hash,
//! so the palette, the tile pool and per-frame tile choice each get their own sequence.

/// Anything that can hand out uniformly distributed 64-bit words.
///
/// Tile synthesis and per-frame tile selection only depend on this trait, so
/// tests can swap in a fixed sequence.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform over the full byte range.
    #[inline]
    fn next_u8(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }

    #[inline]
    fn next_f32_01(&mut self) -> f32 {
        // 24-bit mantissa precision uniform in [0,1)
        let v = (self.next_u32() >> 8) as f32;
        v / (1u32 << 24) as f32
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    #[inline]
    fn below(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        // multiply-shift keeps the result in range without a modulo
        ((self.next_u32() as u64 * len as u64) >> 32) as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RngService {
    base_seed: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RngStream {
    state: u64,
}

impl RngService {
    pub fn with_seed(seed: u64) -> Self {
        Self { base_seed: seed }
    }

    /// Seeds from the operating system. Falls back to the clock if the OS source is unavailable.
    pub fn from_entropy() -> Self {
        let mut bytes = [0u8; 8];
        let seed = match getrandom::getrandom(&mut bytes) {
            Ok(()) => u64::from_le_bytes(bytes),
            Err(err) => {
                log::warn!("getrandom failed ({err}), seeding from the system clock");
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0x5EED)
            }
        };
        Self::with_seed(seed)
    }

    pub fn seed(&self) -> u64 {
        self.base_seed
    }

    pub fn derive_stream(&self, stream_id: u64) -> RngStream {
        let seed = splitmix64(self.base_seed ^ stream_id);
        RngStream { state: seed.max(1) }
    }

    /// Derive a stream from a human-readable name using FNV-1a 64 hashing.
    pub fn derive_stream_by_name(&self, name: &str) -> RngStream {
        self.derive_stream(fnv1a64(name.as_bytes()))
    }
}

impl RandomSource for RngStream {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(2685821657736338717)
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z ^= z >> 30;
    z = z.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z ^= z >> 27;
    z = z.wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x00000100000001B3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
