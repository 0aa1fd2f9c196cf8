//! Execution of independent work items, serially or on a thread pool.

use rayon::{prelude::*, ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Where independent work items are evaluated.
pub enum Workers {
    Serial,
    Pool(ThreadPool),
}

impl Workers {
    /// A serial executor for `parallelism` 0 or 1, a dedicated pool otherwise.
    pub fn new(parallelism: usize) -> Result<Self, ThreadPoolBuildError> {
        if parallelism < 2 {
            return Ok(Self::Serial);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("archsynth-worker-{i}"))
            .build()?;
        Ok(Self::Pool(pool))
    }

    pub fn n_threads(&self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Pool(pool) => pool.current_num_threads(),
        }
    }

    /// Apply `f` to every item. The output is in input order.
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Send + Sync,
    {
        match self {
            Self::Serial => items.iter().map(f).collect(),
            Self::Pool(pool) => pool.install(|| items.par_iter().map(f).collect()),
        }
    }
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Pool(pool) => write!(f, "Pool({})", pool.current_num_threads()),
        }
    }
}
