use crate::core::{Result, StoreError, Value};
use std::fmt;
use std::str::FromStr;

/// Filter operators understood by the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::ArrayContains => "array-contains",
            Self::ArrayContainsAny => "array-contains-any",
            Self::In => "in",
            Self::NotIn => "not-in",
        }
    }

    /// Operators whose operand must be a list of candidates
    pub fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::ArrayContainsAny)
    }
}

impl FromStr for Operator {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::LtEq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::GtEq),
            "array-contains" => Ok(Self::ArrayContains),
            "array-contains-any" => Ok(Self::ArrayContainsAny),
            "in" => Ok(Self::In),
            "not-in" => Ok(Self::NotIn),
            other => Err(StoreError::InvalidQuery(format!(
                "unsupported operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (field, operator, value) filter triple
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Build from a textual operator such as `"=="` or `"array-contains"`
    pub fn parse(field: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(Self::new(field, op.parse()?, value))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Shape check run by the store before a query executes
    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(StoreError::InvalidQuery(
                "condition field must not be empty".into(),
            ));
        }
        if self.op.takes_list() && self.value.as_array().is_none() {
            return Err(StoreError::InvalidQuery(format!(
                "'{}' on '{}' requires an array value, got {}",
                self.op,
                self.field,
                self.value.type_name()
            )));
        }
        Ok(())
    }

    /// Stable textual form, used to derive subscription keys
    pub(crate) fn canonical(&self) -> String {
        format!("{}{}{}", self.field, self.op, self.value.canonical())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operators() {
        for op in ["==", "!=", "<", "<=", ">", ">=", "array-contains", "in", "not-in"] {
            let parsed: Operator = op.parse().unwrap();
            assert_eq!(parsed.as_str(), op);
        }
    }

    #[test]
    fn test_unsupported_operator() {
        let err = Condition::parse("runs", "=~", 10).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_list_operators_need_arrays() {
        assert!(Condition::new("team", Operator::In, "IND").validate().is_err());
        assert!(
            Condition::new("team", Operator::In, vec!["IND", "AUS"])
                .validate()
                .is_ok()
        );
    }
}
