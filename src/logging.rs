//! Category-tagged logging.
//!
//! Grounded on `onca_logging`'s `LogCategory` + `log_info!`/`log_warning!`/
//! `log_error!` macros, backed by the `log` crate facade instead of
//! `onca_logging`'s hand-rolled global logger (see DESIGN.md for why).
//! Each module declares a `const LOG_CAT: LogCategory` and logs through it;
//! the category name becomes the `log` target.

use core::fmt;

/// A named log category, optionally with a sub-category, e.g.
/// `LogCategory::new("LowLatency")` or
/// `LogCategory::new_with_sub("LowLatency", "Stats")`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogCategory {
    category: &'static str,
    sub_category: Option<&'static str>,
}

impl LogCategory {
    pub const fn new(name: &'static str) -> Self {
        Self { category: name, sub_category: None }
    }

    pub const fn new_with_sub(name: &'static str, sub_name: &'static str) -> Self {
        Self { category: name, sub_category: Some(sub_name) }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_category {
            Some(sub) => write!(f, "{}({sub})", self.category),
            None => write!(f, "{}", self.category),
        }
    }
}

#[macro_export]
macro_rules! log_verbose {
    ($cat:expr, $($args:tt)*) => {
        log::trace!(target: $cat.category(), "[{}] {}", $cat, format_args!($($args)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($args:tt)*) => {
        log::info!(target: $cat.category(), "[{}] {}", $cat, format_args!($($args)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($cat:expr, $($args:tt)*) => {
        log::warn!(target: $cat.category(), "[{}] {}", $cat, format_args!($($args)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($args:tt)*) => {
        log::error!(target: $cat.category(), "[{}] {}", $cat, format_args!($($args)*))
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_sub_category() {
        let cat = LogCategory::new_with_sub("FrameGen", "Synthesis");
        assert_eq!(cat.to_string(), "FrameGen(Synthesis)");
    }

    #[test]
    fn display_without_sub_category() {
        let cat = LogCategory::new("LowLatency");
        assert_eq!(cat.to_string(), "LowLatency");
    }
}
