use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

const STRIPE_COUNT: usize = 256;

/// Per-barcode mutual exclusion striped across a fixed pool (spec §5:
/// "keyed in-process lock striped across a fixed pool, e.g. 256 stripes").
/// Two different barcodes landing on the same stripe serialize needlessly
/// but correctly; this trades a small amount of false contention for a
/// bounded number of mutexes regardless of how many barcodes exist.
pub struct BarcodeLocks {
    stripes: Vec<Mutex<()>>,
}

impl BarcodeLocks {
    pub fn new() -> Self {
        Self { stripes: (0..STRIPE_COUNT).map(|_| Mutex::new(())).collect() }
    }

    pub async fn lock(&self, code: &str) -> MutexGuard<'_, ()> {
        self.stripes[stripe_for(code)].lock().await
    }
}

impl Default for BarcodeLocks {
    fn default() -> Self {
        Self::new()
    }
}

fn stripe_for(code: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    code.hash(&mut hasher);
    (hasher.finish() as usize) % STRIPE_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_is_exclusive_for_the_same_code() {
        let locks = BarcodeLocks::new();
        let _guard = locks.lock("ABC123").await;
        let second = locks.lock("ABC123");
        tokio::select! {
            _ = second => panic!("second lock should not acquire while first is held"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
        }
    }

    #[tokio::test]
    async fn stripe_assignment_is_deterministic() {
        assert_eq!(stripe_for("ABC123"), stripe_for("ABC123"));
    }
}
