use tokio_postgres::Statement;

use crate::translation::BindingPlan;

/// Statement prepared server-side with declared parameter types.
#[derive(Debug, Clone)]
pub struct PostgresStatement {
    sql: String,
    plan: BindingPlan,
    read_only: bool,
    statement: Statement,
}

impl PostgresStatement {
    pub(crate) fn new(sql: String, plan: BindingPlan, read_only: bool, statement: Statement) -> Self {
        Self {
            sql,
            plan,
            read_only,
            statement,
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

    pub(crate) fn native(&self) -> &Statement {
        &self.statement
    }
}
