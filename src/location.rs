use std::fmt;

/// Call-site identity used as the statement cache key.
///
/// Ordered by file, then line. Build one with [`statement_here!`](crate::statement_here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementLocation {
    file: &'static str,
    line: u32,
}

impl StatementLocation {
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for StatementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Location of the invoking source line.
///
/// ```rust
/// use sql_exec_core::statement_here;
///
/// let here = statement_here!();
/// assert_eq!(here.line(), line!() - 1);
/// ```
#[macro_export]
macro_rules! statement_here {
    () => {
        $crate::location::StatementLocation::new(file!(), line!())
    };
}
