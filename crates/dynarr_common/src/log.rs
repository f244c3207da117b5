// Logging for the containers, compiled out without the `logging` feature.

cfg_if::cfg_if! {
    if #[cfg(feature = "logging")] {
        pub(crate) use dynarr_logging::{log_error, log_verbose, log_warning};

        pub(crate) const LOG_CAT: dynarr_logging::LogCategory = dynarr_logging::LogCategory::new_with_sub("Collections", "DynArray");
    } else {
        macro_rules! log_error {
            ($($arg:tt)*) => {};
        }

        macro_rules! log_verbose {
            ($($arg:tt)*) => {};
        }

        macro_rules! log_warning {
            ($($arg:tt)*) => {};
        }

        pub(crate) use {log_error, log_verbose, log_warning};

        pub(crate) const LOG_CAT: () = ();
    }
}
