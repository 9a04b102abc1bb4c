//! Internal macros.

/// Annotates an error with its source location.
///
/// In debug builds the error is logged at `$level` along with the file and
/// line where it was created, followed by a full backtrace when the
/// `backtrace_full` feature is enabled.  Release builds pass the error through
/// untouched.
macro_rules! err {
  ($level:ident, $error:expr) => {{
    let error = $error;

    #[cfg(debug_assertions)]
    {
      ::log::$level!("{}:{}: {:?}", file!(), line!(), &error);
      #[cfg(feature = "backtrace_full")]
      {
        let bt = ::backtrace::Backtrace::new();
        ::log::trace!("{:?}", bt);
      }
    }

    error
  }};
}

/// Returns early with an annotated error if a condition does not hold.
macro_rules! ensure {
  ($cond:expr, $level:ident, $error:expr) => {
    if !($cond) {
      return Err(err!($level, $error));
    }
  };
}
