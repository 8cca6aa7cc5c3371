//! Batched worker pool (component B).
//!
//! Ports `multiprocessor.py`'s batching/sharding scheme onto `rayon`: the
//! donor spawns one OS process per shard to dodge the GIL, we spawn one
//! `rayon` task per shard over a shared thread pool, which satisfies the
//! same "workers are isolated, accumulator is per-worker" contract without
//! needing IPC.

use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::rng::{rng_from_seed_str, worker_seed};

/// Split `length` items across `workers` contiguous ranges, uniform with
/// any remainder absorbed into the final range. Mirrors
/// `utils.py::compute_intervals_uniform` exactly, including its
/// width-adjustment rule (not a plain `chunks()` split).
pub fn compute_intervals_uniform(length: usize, workers: usize) -> Vec<(usize, usize)> {
    if length == 0 {
        return Vec::new();
    }
    let workers = workers.min(length).max(1);
    let uniform = (length + workers - 1) / workers;
    let mut intervals = Vec::with_capacity(workers);
    let mut prev_end = 0usize;
    for i in 0..workers.saturating_sub(1) {
        let start = prev_end;
        let remaining_workers = workers - i;
        let width = if (length - start) as f64 / remaining_workers as f64 <= (uniform - 1) as f64
        {
            uniform.saturating_sub(1)
        } else {
            uniform
        };
        let end = start + width;
        prev_end = end;
        intervals.push((start, end));
    }
    intervals.push((prev_end, length));
    intervals
}

/// Runs `single_sample` over every sample in `samples`, sharded across
/// `num_workers` workers in batches of `num_batches`, folding worker
/// accumulators with `reduce_worker` and batch results with `reduce_batch`.
///
/// `S`: sample type. `A`: per-worker accumulator, must have a `Default`.
/// `single_sample(sample, &mut accumulator, params)` runs once per sample.
/// `reduce_worker` folds a worker's accumulator into the running batch total.
/// `reduce_batch` folds a batch total into the running overall total.
pub struct BatchedWorkerPool<'a, S, A, P> {
    pub num_workers: usize,
    pub num_batches: usize,
    pub params: &'a P,
}

impl<'a, S, A, P> BatchedWorkerPool<'a, S, A, P>
where
    S: Send,
    A: Default + Send,
    P: Sync,
{
    pub fn new(num_workers: usize, num_batches: usize, params: &'a P) -> Self {
        assert!(num_workers > 0 && num_batches > 0);
        let num_workers = num_workers.min(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(num_workers),
        );
        Self {
            num_workers,
            num_batches,
            params,
        }
    }

    pub fn run<T>(
        &self,
        mut samples: Vec<S>,
        single_sample: impl Fn(&S, &mut A, &P) + Sync,
        mut reduce: impl FnMut(T, A) -> T,
        initial: T,
    ) -> T
    where
        T: Send,
    {
        let mut shuffle_rng = rng_from_seed_str("DINFK");
        samples.shuffle(&mut shuffle_rng);

        let samples_len = samples.len();
        let per_worker_batch = (samples_len + self.num_batches - 1) / self.num_batches;
        let per_worker_batch = (per_worker_batch + self.num_workers - 1) / self.num_workers;
        let batch_size = (per_worker_batch * self.num_workers).max(1);

        let mut total = initial;
        let mut batch_start = 0;
        while batch_start < samples_len {
            let batch_end = (batch_start + batch_size).min(samples_len);
            let batch = &samples[batch_start..batch_end];
            batch_start = batch_end;

            let intervals = compute_intervals_uniform(batch.len(), self.num_workers);
            let worker_accs: Vec<A> = intervals
                .into_par_iter()
                .enumerate()
                .map(|(worker_id, (s, e))| {
                    let mut rng = rng_from_seed_str(&worker_seed(worker_id));
                    let _ = &mut rng; // reserved for strategies needing per-worker randomness
                    let mut acc = A::default();
                    for sample in &batch[s..e] {
                        single_sample(sample, &mut acc, self.params);
                    }
                    acc
                })
                .collect();

            for acc in worker_accs {
                total = reduce(total, acc);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_absorb_remainder_in_last_range() {
        let intervals = compute_intervals_uniform(10, 3);
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals.last().unwrap().1, 10);
        assert_eq!(intervals[0].0, 0);
        // ranges are contiguous
        for w in intervals.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
    }

    #[test]
    fn intervals_clamp_workers_to_length() {
        let intervals = compute_intervals_uniform(2, 8);
        assert_eq!(intervals.len(), 2);
    }

    #[test]
    fn pool_reduces_all_samples() {
        let pool: BatchedWorkerPool<i64, i64, ()> = BatchedWorkerPool::new(4, 2, &());
        let samples: Vec<i64> = (0..97).collect();
        let total = pool.run(
            samples,
            |s, acc, _| *acc += s,
            |total, acc| total + acc,
            0i64,
        );
        assert_eq!(total, (0..97).sum::<i64>());
    }
}
