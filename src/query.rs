use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use crate::error::SqlExecError;
use crate::translation::ParameterFormatter;
use crate::types::ValueType;

static PARAMETER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\{(.*?)\}").expect("valid placeholder pattern"));

/// One piece of a parsed SQL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// SQL text copied verbatim
    Literal(String),
    /// A `${name}` reference
    Parameter(String),
}

/// A SQL template with `${name}` placeholders, parsed once.
///
/// Every occurrence of a name is its own token; the type map holds one entry per distinct
/// name in first-seen order.
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let mut query = Query::new("SELECT ${a} FROM t WHERE x=${b} AND y=${a}", true);
/// query.set_type("a", ValueType::Integer64)?;
/// assert_eq!(query.parameters().count(), 2);
/// # Ok::<(), SqlExecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    tokens: Vec<Token>,
    parameters: Vec<(String, ValueType)>,
    read_only: bool,
}

impl Query {
    #[must_use]
    pub fn new(sql: &str, read_only: bool) -> Self {
        let mut tokens = Vec::new();
        let mut parameters: Vec<(String, ValueType)> = Vec::new();
        let mut last = 0;

        for caps in PARAMETER_PATTERN.captures_iter(sql) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if last != whole.start() {
                tokens.push(Token::Literal(sql[last..whole.start()].to_string()));
            }

            let name = name.as_str();
            tokens.push(Token::Parameter(name.to_string()));
            if !parameters.iter().any(|(known, _)| known == name) {
                parameters.push((name.to_string(), ValueType::Null));
            }
            last = whole.end();
        }

        if last != sql.len() {
            tokens.push(Token::Literal(sql[last..].to_string()));
        }

        Self {
            tokens,
            parameters,
            read_only,
        }
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|(known, _)| known == name)
    }

    /// Declared type of a parameter (`Null` until set).
    ///
    /// # Errors
    /// Returns `SqlExecError::InexistentItem` if the template has no such parameter.
    pub fn get_type(&self, name: &str) -> Result<ValueType, SqlExecError> {
        self.parameters
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| {
                error!("Inexistent parameter in a SQL query: {name}");
                SqlExecError::InexistentItem(format!("no parameter {name:?} in the query"))
            })
    }

    /// Declare the type of a parameter.
    ///
    /// # Errors
    /// Returns `SqlExecError::OutOfRange` if the template has no such parameter; names are never
    /// added after parsing.
    pub fn set_type(&mut self, name: &str, ty: ValueType) -> Result<(), SqlExecError> {
        match self.parameters.iter_mut().find(|(known, _)| known == name) {
            Some((_, slot)) => {
                *slot = ty;
                Ok(())
            }
            None => {
                error!("Ignoring inexistent parameter in a SQL query: {name}");
                Err(SqlExecError::OutOfRange(format!(
                    "no parameter {name:?} in the query"
                )))
            }
        }
    }

    /// Distinct parameters with their declared types, in first-seen order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, ValueType)> {
        self.parameters.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Render the template, asking `formatter` for the text of each parameter occurrence.
    ///
    /// # Errors
    /// Propagates formatter failures.
    pub fn format(&self, formatter: &mut impl ParameterFormatter) -> Result<String, SqlExecError> {
        let mut sql = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => sql.push_str(text),
                Token::Parameter(name) => {
                    let ty = self.get_type(name)?;
                    sql.push_str(&formatter.format(name, ty)?);
                }
            }
        }
        Ok(sql)
    }
}
