use ideaboard::services::TtlCache;
use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

fn paused_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("build paused runtime")
}

proptest! {
    /// Property: an entry is visible strictly before its TTL elapses and
    /// never at or after it.
    #[test]
    fn prop_entry_fresh_only_inside_ttl(
        ttl_ms in 1u64..10_000,
        elapsed_ms in 0u64..20_000,
    ) {
        let rt = paused_runtime();
        let visible = rt.block_on(async {
            let cache = TtlCache::new(Duration::from_millis(ttl_ms));
            cache.set("k", 7u32);
            tokio::time::advance(Duration::from_millis(elapsed_ms)).await;
            cache.get("k")
        });

        prop_assert_eq!(visible.is_some(), elapsed_ms < ttl_ms);
    }

    /// Property: cleanup removes exactly the expired entries and keeps the rest.
    #[test]
    fn prop_cleanup_counts_expired(
        ttls in prop::collection::vec(1u64..1_000, 1..40),
        elapsed_ms in 0u64..1_500,
    ) {
        let rt = paused_runtime();
        let (removed, remaining) = rt.block_on(async {
            let cache = TtlCache::new(Duration::from_secs(60));
            for (i, ttl) in ttls.iter().enumerate() {
                cache.set_with_ttl(i, i, Duration::from_millis(*ttl));
            }
            tokio::time::advance(Duration::from_millis(elapsed_ms)).await;
            (cache.cleanup(), cache.len())
        });

        let expected = ttls.iter().filter(|ttl| **ttl <= elapsed_ms).count();
        prop_assert_eq!(removed, expected);
        prop_assert_eq!(remaining, ttls.len() - expected);
    }

    /// Property: overwriting a key restarts its lifetime.
    #[test]
    fn prop_overwrite_resets_expiry(
        ttl_ms in 2u64..5_000,
        before_ms in 1u64..5_000,
    ) {
        let before_ms = before_ms.min(ttl_ms - 1);
        let rt = paused_runtime();
        let (value, expired) = rt.block_on(async {
            let cache = TtlCache::new(Duration::from_millis(ttl_ms));
            cache.set("k", "old");
            tokio::time::advance(Duration::from_millis(before_ms)).await;
            cache.set("k", "new");
            tokio::time::advance(Duration::from_millis(ttl_ms - 1)).await;
            let value = cache.get("k");
            tokio::time::advance(Duration::from_millis(1)).await;
            (value, cache.get("k").is_none())
        });

        prop_assert_eq!(value, Some("new"));
        prop_assert!(expired);
    }
}
