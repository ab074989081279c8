use crate::error::SqlExecError;
use crate::types::Value;

use super::RowSource;

/// Rows already materialised in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    fields_count: usize,
    rows: Vec<Vec<Value>>,
    position: usize,
}

impl MemoryRows {
    #[must_use]
    pub fn new(fields_count: usize, rows: Vec<Vec<Value>>) -> Self {
        Self {
            fields_count,
            rows,
            position: 0,
        }
    }
}

impl RowSource for MemoryRows {
    fn fields_count(&self) -> usize {
        self.fields_count
    }

    fn is_done(&self) -> bool {
        self.position >= self.rows.len()
    }

    fn advance(&mut self) -> Result<(), SqlExecError> {
        if self.position < self.rows.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn fetch_field(&mut self, index: usize) -> Result<Option<Value>, SqlExecError> {
        Ok(self
            .rows
            .get(self.position)
            .and_then(|row| row.get(index))
            .cloned())
    }
}
