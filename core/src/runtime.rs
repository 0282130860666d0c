use rayon::{ThreadPool, ThreadPoolBuilder};
use std::env;
use std::sync::OnceLock;

use crate::{Error, Result};

/// Environment variable consulted when no explicit thread count is given.
pub const CPU_THREADS_ENV: &str = "EDGECV_CPU_THREADS";

static THREAD_POOL_INIT: OnceLock<Result<()>> = OnceLock::new();

/// Initialize the global Rayon thread pool used by the frame filter.
///
/// Priority:
/// 1. `num_threads` argument
/// 2. `EDGECV_CPU_THREADS` environment variable
/// 3. Rayon default
///
/// Repeated calls are idempotent and return the first initialization result.
pub fn init_global_thread_pool(num_threads: Option<usize>) -> Result<()> {
    let res = THREAD_POOL_INIT.get_or_init(|| {
        let builder = configured_builder(num_threads)?;
        builder
            .build_global()
            .map_err(|e| Error::config(format!("failed to build global thread pool: {e}")))?;
        tracing::debug!(threads = current_cpu_threads(), "global thread pool ready");
        Ok(())
    });
    res.clone()
}

/// Build a dedicated pool, resolving the thread count the same way as the global one.
pub fn build_thread_pool(num_threads: Option<usize>) -> Result<ThreadPool> {
    configured_builder(num_threads)?
        .thread_name(|i| format!("edgecv-worker-{i}"))
        .build()
        .map_err(|e| Error::config(format!("failed to build thread pool: {e}")))
}

pub fn current_cpu_threads() -> usize {
    rayon::current_num_threads()
}

fn configured_builder(num_threads: Option<usize>) -> Result<ThreadPoolBuilder> {
    let configured_threads = match num_threads {
        Some(0) => return Err(Error::config("requested thread count must be >= 1")),
        Some(n) => Some(n),
        None => read_cpu_threads_from_env()?,
    };

    let mut builder = ThreadPoolBuilder::new();
    if let Some(n) = configured_threads {
        builder = builder.num_threads(n);
    }
    Ok(builder)
}

fn read_cpu_threads_from_env() -> Result<Option<usize>> {
    match env::var(CPU_THREADS_ENV) {
        Ok(raw) => parse_cpu_threads(&raw).map(Some),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::config(format!("failed to read {CPU_THREADS_ENV}: {e}"))),
    }
}

fn parse_cpu_threads(raw: &str) -> Result<usize> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        Error::config(format!(
            "{CPU_THREADS_ENV} must be a positive integer, got '{raw}'"
        ))
    })?;
    if parsed == 0 {
        return Err(Error::config(format!("{CPU_THREADS_ENV} must be >= 1")));
    }
    Ok(parsed)
}
