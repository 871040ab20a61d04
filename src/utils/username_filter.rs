use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;

use crate::store::UserStore;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Probabilistic set of taken usernames.
///
/// `might_exist == false` is definitive and lets registration skip the
/// database; `true` must be confirmed against the user store.
pub struct UsernameIndex {
    filter: RwLock<CuckooFilter<String>>,
}

impl Default for UsernameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }

    pub fn might_exist(&self, username: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize(username))
    }

    pub fn insert(&self, username: &str) {
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&normalize(username));
    }

    /// Load every stored username, `batch_size` per write lock.
    pub async fn warmup(&self, users: &dyn UserStore, batch_size: usize) -> Result<usize> {
        let names = users.usernames().await?;
        for batch in names.chunks(batch_size.max(1)) {
            let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
            for username in batch {
                filter.add(&normalize(username));
            }
        }

        log::info!("Username filter warmup complete: {} users", names.len());
        Ok(names.len())
    }

    /// true => username AVAILABLE
    pub async fn is_available(&self, username: &str, users: &dyn UserStore) -> bool {
        // Cuckoo filter gives a fast, certain negative.
        if !self.might_exist(username) {
            return true;
        }

        // Fall back to the store; treat errors as taken.
        match users.find_by_username(&normalize(username)).await {
            Ok(found) => found.is_none(),
            Err(e) => {
                tracing::error!(error = %e, "Username lookup failed");
                false
            }
        }
    }
}
