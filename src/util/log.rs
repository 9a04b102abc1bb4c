use core::fmt::Debug;
use log::{Level, STATIC_MAX_LEVEL};

/// When enabling backtraces (but not feature `backtrace_full`), the number of
/// stack frames to log.
#[cfg(feature = "backtrace")]
const SHORT_BACKTRACE_LOG_FRAMES: usize = 2;

/// Logs `error` at `level`, followed by the frames that led to it when the
/// `backtrace` feature is enabled.
fn report<E: Debug>(level: Level, error: &E) {
  // Const comparison allows dead code elimination.
  if level > STATIC_MAX_LEVEL {
    return;
  }
  log::log!(level, "{:?}", error);
  #[cfg(feature = "backtrace")]
  {
    let mut bt = backtrace::Backtrace::new_unresolved();
    bt.resolve();
    if cfg!(feature = "backtrace_full") {
      log::trace!("{:?}", bt);
    } else {
      for frame in bt.frames().iter().skip(1).take(SHORT_BACKTRACE_LOG_FRAMES) {
        log::trace!("{frame:?}");
      }
    }
  }
}

/// Utility trait for error reporting, primarily used with [`Option`].
///
/// Unlike `ok_or`, the error is reported where it is generated, which is far
/// more useful than catching it further up the call stack.  Unlike
/// `ok_or_else`, no closure is needed at each call site.
pub(crate) trait OkOrLog<O, E>: Sized
where
  E: Debug,
{
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E>;
}

impl<O, E> OkOrLog<O, E> for Option<O>
where
  E: Debug,
{
  #[inline(always)]
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E> {
    match self {
      Some(value) => Ok(value),
      None => {
        report(level, &error);
        Err(error)
      },
    }
  }
}

/// Reports an error passing through a [`Result`] without changing it.
pub(crate) trait LogErr<O, E>
where
  E: Debug,
{
  fn log_err(self, level: Level) -> Result<O, E>;
}

impl<O, E> LogErr<O, E> for Result<O, E>
where
  E: Debug,
{
  #[inline(always)]
  fn log_err(self, level: Level) -> Result<O, E> {
    if let Err(error) = &self {
      report(level, error);
    }
    self
  }
}
