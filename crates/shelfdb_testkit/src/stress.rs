//! Load generators for ShelfDB.
//!
//! Each run hammers one collection and reports how many operations went
//! through. The concurrent runs also check that whole-operation locking
//! holds up: identities stay unique and readers never see a torn image.

use crate::fixtures::Toy;
use shelfdb_core::{Database, FieldValue, Record};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Collection used by the stress runs.
pub const STRESS_COLLECTION: &str = "stress";

/// Outcome of one stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Operations attempted.
    pub total_ops: usize,
    /// Operations that returned `Ok`.
    pub successful_ops: usize,
    /// Operations that returned an error (or, for readers, saw too little).
    pub failed_ops: usize,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl StressTestResult {
    fn finish(successful: usize, failed: usize, started: Instant) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration: started.elapsed(),
        }
    }

    /// Operations per second over the run (0 for an instantaneous run).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_ops as f64 / secs
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of records to seed before read runs.
    pub record_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            record_count: 100,
        }
    }
}

/// Run a sequential create stress test.
pub fn stress_sequential_creates(db: &Database, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let mut toy = Toy::new(format!("toy_{}", i), (i % 10) as i64);
        match db.create(STRESS_COLLECTION, &mut toy) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::finish(successful, failed, start)
}

/// Run a mixed create/filter/modify stress test.
pub fn stress_mixed_operations(db: &Database, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let result = if i % 3 == 0 {
            // Create (33%)
            db.create(STRESS_COLLECTION, &mut Toy::new("mixed", (i % 10) as i64))
                .map(|_| ())
        } else if i % 3 == 1 {
            // Filter (33%)
            db.filter_equals(STRESS_COLLECTION, "price", FieldValue::Integer((i % 10) as i64))
                .map(|_| ())
        } else {
            // Drop the oldest record (33%)
            db.modify_collection(STRESS_COLLECTION, |records| {
                if !records.is_empty() {
                    records.remove(0);
                }
                Ok(())
            })
        };

        match result {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::finish(successful, failed, start)
}

/// Run a concurrent create stress test.
///
/// Returns the run result and every identity handed out, so callers can
/// check that none repeats.
pub fn stress_concurrent_creates(
    db: Arc<Database>,
    config: &StressConfig,
) -> (StressTestResult, Vec<String>) {
    let failed = Arc::new(AtomicUsize::new(0));
    let ids = Arc::new(Mutex::new(Vec::with_capacity(config.operations)));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let failed = Arc::clone(&failed);
            let ids = Arc::clone(&ids);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let mut toy = Toy::new(format!("t{}_{}", t, i), t as i64);
                    match db.create(STRESS_COLLECTION, &mut toy) {
                        Ok(created) => ids.lock().push(created.id().to_string()),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let ids = std::mem::take(&mut *ids.lock());
    let result = StressTestResult::finish(ids.len(), failed.load(Ordering::Relaxed), start);
    (result, ids)
}

/// Run a concurrent read stress test alongside one writer.
pub fn stress_concurrent_reads(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    for i in 0..config.record_count {
        let _ = db.create(STRESS_COLLECTION, &mut Toy::new(format!("seed_{}", i), 0));
    }

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;
    let seeded = config.record_count;

    let start = Instant::now();

    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for i in 0..ops_per_thread {
                let _ = db.create(STRESS_COLLECTION, &mut Toy::new(format!("late_{}", i), 1));
            }
        })
    };

    let readers: Vec<_> = (0..config.threads)
        .map(|_| {
            let db = Arc::clone(&db);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    match db.fetch_collection(STRESS_COLLECTION) {
                        // Readers see whole images: never fewer than the seed.
                        Ok(records) if records.len() >= seeded => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    writer.join().expect("Writer panicked");
    for handle in readers {
        handle.join().expect("Reader panicked");
    }

    StressTestResult::finish(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start,
    )
}

/// Returns `true` if `ids` are exactly `"1"..="n"` in some order.
pub fn is_dense_identity_set(ids: &[String]) -> bool {
    let set: HashSet<&str> = ids.iter().map(String::as_str).collect();
    set.len() == ids.len() && (1..=ids.len()).all(|n| set.contains(n.to_string().as_str()))
}
