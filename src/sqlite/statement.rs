use crate::translation::BindingPlan;

/// Statement compiled for `SQLite`.
///
/// The native handle lives in the connection's `prepare_cached` cache, keyed by `sql`.
#[derive(Debug, Clone)]
pub struct SqliteStatement {
    sql: String,
    plan: BindingPlan,
    read_only: bool,
}

impl SqliteStatement {
    pub(crate) fn new(sql: String, plan: BindingPlan, read_only: bool) -> Self {
        Self {
            sql,
            plan,
            read_only,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}
