//! Subcommand name index: FNV-1a buckets with per-bucket collision chains.

/// Number of buckets. Fixed.
pub const BUCKET_COUNT: usize = 1024;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

/// One chained entry: a subcommand name and its slot in the registry.
#[derive(Debug, Clone)]
struct HashBox {
    name: String,
    slot: usize,
}

/// Maps subcommand names to registry slots.
#[derive(Debug)]
pub struct SubcommandIndex {
    buckets: Vec<Vec<HashBox>>,
    len: usize,
}

impl Default for SubcommandIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SubcommandIndex {
    pub fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); BUCKET_COUNT],
            len: 0,
        }
    }

    /// Bucket a name hashes to.
    pub fn bucket_of(name: &str) -> usize {
        let mut hash = FNV_OFFSET;
        for byte in name.bytes() {
            hash = (u32::from(byte) ^ hash).wrapping_mul(FNV_PRIME);
        }
        // Keeps only the low 10 bits, so the result is always < BUCKET_COUNT.
        (hash ^ ((hash >> 10) << 10)) as usize
    }

    /// Append `name` to the end of its bucket's chain.
    pub fn insert(&mut self, name: &str, slot: usize) {
        self.buckets[Self::bucket_of(name)].push(HashBox {
            name: name.to_string(),
            slot,
        });
        self.len += 1;
    }

    /// Exact-match lookup. The first inserted entry wins for duplicate names.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.buckets[Self::bucket_of(name)]
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.slot)
    }

    /// Length of the chain rooted at `bucket`.
    pub fn chain_len(&self, bucket: usize) -> usize {
        self.buckets.get(bucket).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every chain. The bucket array itself stays allocated.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Vec::new();
        }
        self.len = 0;
    }
}
