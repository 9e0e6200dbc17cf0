// shopflow/src/core/context_data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable pipeline context.
///
/// Every handler of a run receives a clone of the same `ContextData`; clones
/// share one `parking_lot::RwLock`. Guards are blocking and MUST be dropped
/// before the handler reaches an `.await`. The closure helpers [`Self::with`]
/// and [`Self::update`] make that hard to get wrong.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Runs `f` under a read lock and returns its result.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Runs `f` under a write lock and returns its result.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(&mut self.0.write())
  }

  /// Recovers the inner value when this is the last handle, otherwise hands
  /// the context back.
  pub fn try_into_inner(self) -> Result<T, Self> {
    Arc::try_unwrap(self.0).map(|lock| lock.into_inner()).map_err(ContextData)
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
