use super::rng::*;
use std::cell::RefCell;
use std::sync::Mutex;

thread_local!(static THREAD_RNG_KEY: RefCell<RtRng> = RefCell::new(RtRng::seed_from_u64(0)));

// Create a rayon thread pool with a start handler that installs a suitable rng
// for the thread. Each thread's RNG is built from the provided RNG doing
// `thread_index + 1` jumps, so no worker shares the caller's stream.
pub fn init_pool_with_rng(rng: RtRng) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
  let rng_mutex = Mutex::new(rng);
  rayon::ThreadPoolBuilder::new()
    .thread_name(|idx| format!("srt-worker-{}", idx))
    .start_handler(move |idx| {
      let mut rng = match rng_mutex.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
      };
      for _ in 0..=idx {
        rng.jump();
      }
      THREAD_RNG_KEY.with(|cell| *cell.borrow_mut() = rng);
    })
    .build()
}

/// Runs `f` with the calling thread's generator. Threads outside a pool built
/// by `init_pool_with_rng` get a fixed-seed generator.
pub fn with_thread_rng<T>(f: impl FnOnce(&mut RtRng) -> T) -> T {
  THREAD_RNG_KEY.with(|cell| f(&mut cell.borrow_mut()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn workers_get_distinct_streams() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(3)).unwrap();
    let draws: Vec<u64> = pool.broadcast(|_| with_thread_rng(|rng| rng.gen::<u64>()));
    let mut unique = draws.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), draws.len());
  }
}
