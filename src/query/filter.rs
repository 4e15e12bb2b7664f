use super::{Condition, Operator};
use crate::core::{Document, Value};
use std::cmp::Ordering;

/// Evaluates condition triples against cached documents.
///
/// Mirrors the store's matching rules: a missing field never matches,
/// values of incompatible types never match (not even `!=`).
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn matches(condition: &Condition, doc: &Document) -> bool {
        let Some(field) = doc.get(&condition.field) else {
            return false;
        };
        Self::evaluate(field, condition.op, &condition.value)
    }

    pub fn matches_all(conditions: &[Condition], doc: &Document) -> bool {
        conditions.iter().all(|condition| Self::matches(condition, doc))
    }

    fn evaluate(field: &Value, op: Operator, operand: &Value) -> bool {
        match op {
            Operator::Eq => field == operand,
            Operator::NotEq => !field.is_null() && field.compare(operand).is_some_and(|o| o.is_ne()),
            Operator::Lt => Self::ordered(field, operand, Ordering::is_lt),
            Operator::LtEq => Self::ordered(field, operand, Ordering::is_le),
            Operator::Gt => Self::ordered(field, operand, Ordering::is_gt),
            Operator::GtEq => Self::ordered(field, operand, Ordering::is_ge),
            Operator::ArrayContains => field
                .as_array()
                .is_some_and(|items| items.contains(operand)),
            Operator::ArrayContainsAny => match (field.as_array(), operand.as_array()) {
                (Some(items), Some(candidates)) => {
                    candidates.iter().any(|candidate| items.contains(candidate))
                }
                _ => false,
            },
            Operator::In => operand
                .as_array()
                .is_some_and(|candidates| candidates.contains(field)),
            Operator::NotIn => {
                !field.is_null()
                    && operand
                        .as_array()
                        .is_some_and(|candidates| !candidates.contains(field))
            }
        }
    }

    fn ordered(field: &Value, operand: &Value, test: fn(Ordering) -> bool) -> bool {
        if field.is_null() || operand.is_null() {
            return false;
        }
        field.compare(operand).is_some_and(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::to_fields;
    use serde_json::json;

    fn doc(data: serde_json::Value) -> Document {
        Document::new("d1", to_fields(&data).unwrap())
    }

    #[test]
    fn test_comparisons() {
        let d = doc(json!({"runs": 45, "team": "IND"}));
        assert!(ConditionEvaluator::matches(&Condition::new("runs", Operator::Gt, 40), &d));
        assert!(ConditionEvaluator::matches(&Condition::new("runs", Operator::LtEq, 45.0), &d));
        assert!(!ConditionEvaluator::matches(&Condition::new("runs", Operator::Lt, 45), &d));
        assert!(ConditionEvaluator::matches(&Condition::new("team", Operator::NotEq, "AUS"), &d));
    }

    #[test]
    fn test_type_mismatch_and_missing_field() {
        let d = doc(json!({"runs": 45}));
        assert!(!ConditionEvaluator::matches(&Condition::new("runs", Operator::Gt, "40"), &d));
        assert!(!ConditionEvaluator::matches(&Condition::new("runs", Operator::NotEq, "40"), &d));
        assert!(!ConditionEvaluator::matches(&Condition::eq("wickets", 0), &d));
    }

    #[test]
    fn test_array_operators() {
        let d = doc(json!({"tags": ["t20", "final"], "venue": "Lord's"}));
        assert!(ConditionEvaluator::matches(
            &Condition::new("tags", Operator::ArrayContains, "final"),
            &d
        ));
        assert!(ConditionEvaluator::matches(
            &Condition::new("tags", Operator::ArrayContainsAny, vec!["odi", "t20"]),
            &d
        ));
        assert!(ConditionEvaluator::matches(
            &Condition::new("venue", Operator::In, vec!["Lord's", "Oval"]),
            &d
        ));
        assert!(!ConditionEvaluator::matches(
            &Condition::new("venue", Operator::NotIn, vec!["Lord's"]),
            &d
        ));
    }

    #[test]
    fn test_conditions_are_a_conjunction() {
        let d = doc(json!({"userId": "u1", "isRead": false}));
        let conditions = vec![Condition::eq("userId", "u1"), Condition::eq("isRead", false)];
        assert!(ConditionEvaluator::matches_all(&conditions, &d));

        let reversed: Vec<_> = conditions.iter().rev().cloned().collect();
        assert!(ConditionEvaluator::matches_all(&reversed, &d));

        let conditions = vec![Condition::eq("userId", "u1"), Condition::eq("isRead", true)];
        assert!(!ConditionEvaluator::matches_all(&conditions, &d));
    }
}
