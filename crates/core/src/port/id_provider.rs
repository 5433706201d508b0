// ID Provider Port (for deterministic testing)

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated entry tokens
pub const ENTRY_ID_LEN: usize = 7;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new ID
    fn generate_id(&self) -> String;
}

/// Short random entry token (production)
///
/// 7 characters drawn uniformly from `[A-Za-z0-9]`. Not collision-checked
/// here; the store rejects duplicates.
pub struct RandomTokenProvider;

impl IdProvider for RandomTokenProvider {
    fn generate_id(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ENTRY_ID_LEN)
            .map(char::from)
            .collect()
    }
}

/// UUID v4 provider, used for history records
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Hands out a fixed sequence of IDs, then falls back to `fallback-N`
    pub struct SequenceIdProvider {
        ids: Mutex<VecDeque<String>>,
        issued: Mutex<usize>,
    }

    impl SequenceIdProvider {
        pub fn new<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
                issued: Mutex::new(0),
            }
        }

        pub fn issued(&self) -> usize {
            *self.issued.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl IdProvider for SequenceIdProvider {
        fn generate_id(&self) -> String {
            let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
            *issued += 1;
            self.ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| format!("fallback-{}", *issued))
        }
    }
}
