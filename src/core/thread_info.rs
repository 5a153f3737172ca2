//! Thread identity captured on the producer path
//!
//! Each thread gets a small numeric id and a cached copy of its name the
//! first time it logs. After that first call the lookup is a thread-local
//! read and an `Arc` clone, so stamping a record never allocates.

use std::cell::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Id 0 is reserved for records with no thread context (internal notices).
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: OnceCell<ThreadInfo> = const { OnceCell::new() };
}

#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub id: u64,
    pub name: Option<Arc<str>>,
}

/// Identity of the calling thread, computed once per thread.
pub fn current() -> ThreadInfo {
    CURRENT.with(|cell| {
        cell.get_or_init(|| ThreadInfo {
            id: NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed),
            name: std::thread::current().name().map(Arc::from),
        })
        .clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_within_thread() {
        let a = current();
        let b = current();
        assert_eq!(a.id, b.id);
        assert_eq!(a.name.as_deref(), b.name.as_deref());
        assert_ne!(a.id, 0);
    }

    #[test]
    fn test_distinct_across_threads() {
        let here = current().id;
        let there = std::thread::Builder::new()
            .name("probe".into())
            .spawn(|| {
                let info = current();
                (info.id, info.name.as_deref().map(String::from))
            })
            .unwrap()
            .join()
            .unwrap();

        assert_ne!(here, there.0);
        assert_eq!(there.1.as_deref(), Some("probe"));
    }
}
