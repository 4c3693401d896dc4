use std::{fmt, path::Path, sync::Arc, thread::JoinHandle};

use crate::error::{ReelError, ReelResult};

/// Completion callback: `(location, payload)`. A missing payload is the
/// authoritative failure signal for everything that happens after pre-flight.
pub type Completion = Box<dyn FnOnce(&Path, Option<Vec<u8>>) + Send + 'static>;

/// Execution context the completion callback is dispatched onto, so callers
/// are never invoked from a sink's internal thread by accident.
///
/// The default (`inline`) runs the callback on the run's worker thread right
/// before it exits. `custom` hands the boxed invocation to an arbitrary
/// executor, e.g. a UI event-loop proxy.
#[derive(Clone)]
pub struct NotifyContext {
    dispatch: Arc<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>,
}

impl NotifyContext {
    pub fn inline() -> Self {
        Self {
            dispatch: Arc::new(|job| job()),
        }
    }

    pub fn custom(dispatch: impl Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static) -> Self {
        Self {
            dispatch: Arc::new(dispatch),
        }
    }

    pub(crate) fn dispatch(&self, job: Box<dyn FnOnce() + Send>) {
        (self.dispatch)(job);
    }
}

impl Default for NotifyContext {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Debug for NotifyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NotifyContext")
    }
}

/// Handle to one in-flight encoding run. Dropping it detaches the run;
/// joining waits for the worker to settle (which, with the default inline
/// context, includes the completion callback having returned).
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<()>,
}

impl RunHandle {
    pub(crate) fn new(join: JoinHandle<()>) -> Self {
        Self { join }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn join(self) -> ReelResult<()> {
        self.join
            .join()
            .map_err(|_| ReelError::encoding("encoding worker panicked"))
    }
}
