//! Per-session request identifier allocation.

use std::collections::HashSet;

use rand::Rng;

use crate::message::WampId;

/// Largest id a WAMP peer is allowed to generate (2^53, the largest integer
/// a double-precision float can represent exactly).
pub const MAX_ID: WampId = 1u64 << 53;

/// Yields ids unique while held; accessed only from the serialized session
/// evaluator, so no internal synchronization is required.
pub trait IdAllocator {
    /// Returns a previously-unused id in `[1, 2^53]`.
    fn new_id(&mut self) -> WampId;
    /// Releases a held id, allowing it to be reused later.
    fn release_id(&mut self, id: WampId);
}

/// Draws randomly from `[1, 2^53]` and retries on collision.
#[derive(Debug, Default)]
pub struct RandomIdAllocator {
    held: HashSet<WampId>,
}

impl RandomIdAllocator {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
        }
    }
}

impl IdAllocator for RandomIdAllocator {
    fn new_id(&mut self) -> WampId {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = rng.gen_range(1..=MAX_ID);
            if self.held.insert(candidate) {
                return candidate;
            }
        }
    }

    fn release_id(&mut self, id: WampId) {
        self.held.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_hands_out_a_held_id_twice() {
        let mut alloc = RandomIdAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let id = alloc.new_id();
            assert!(seen.insert(id), "id {} was handed out twice while held", id);
            assert!(id >= 1 && id <= MAX_ID);
        }
    }

    #[test]
    fn released_id_can_be_reused() {
        let mut alloc = RandomIdAllocator::new();
        let id = alloc.new_id();
        alloc.release_id(id);
        assert!(!alloc.held.contains(&id));
    }
}
