//! Common building blocks for DynamoDB expressions.
//!
//! This module provides the compiled expression type shared by every compiler,
//! the placeholder encoder, the condition and filter compilers, key records,
//! projections and the set conversion primitive.

/// Condition compilation: single conditions and boolean condition trees.
pub mod condition;

/// Filter compilation with purging of meaningless filter values.
pub mod filter;

/// Key records identifying items in DynamoDB tables.
pub mod key;

/// Placeholder encoding for attribute names and values.
pub mod placeholder;

/// Attribute selection for projection expressions.
pub mod selection;

/// Conversion of plain lists into DynamoDB set attribute values.
pub mod set;

use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use std::collections;

/// An expression string together with the placeholders it references.
///
/// Every placeholder appearing in `expression` has an entry in either
/// `attribute_names` or `attribute_values`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledExpression {
    /// The DynamoDB expression text.
    pub expression: String,
    /// `#placeholder -> attribute name` bindings.
    pub attribute_names: collections::HashMap<String, String>,
    /// `:placeholder -> attribute value` bindings.
    pub attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl CompiledExpression {
    /// Whether the expression text is empty.
    pub fn is_empty(&self) -> bool {
        self.expression.is_empty()
    }

    pub(crate) fn bind_name(&mut self, placeholder: String, property: &str) {
        self.attribute_names
            .insert(placeholder, property.to_string());
    }

    pub(crate) fn bind_value(
        &mut self,
        placeholder: String,
        value: types::AttributeValue,
    ) -> Result<()> {
        match self.attribute_values.get(&placeholder) {
            Some(existing) if *existing != value => Err(Error::PlaceholderCollision(placeholder)),
            _ => {
                self.attribute_values.insert(placeholder, value);
                Ok(())
            }
        }
    }

    /// Union the placeholder maps of `other` into `self`, returning `other`'s text.
    pub(crate) fn absorb(&mut self, other: Self) -> Result<String> {
        self.attribute_names.extend(other.attribute_names);
        for (placeholder, value) in other.attribute_values {
            self.bind_value(placeholder, value)?;
        }
        Ok(other.expression)
    }

    /// Join `items` with `separator`, skipping empty expressions.
    pub(crate) fn join(separator: &str, items: Vec<Self>) -> Result<Self> {
        let mut joined = Self::default();
        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            let fragment = joined.absorb(item)?;
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
        }
        joined.expression = fragments.join(separator);
        Ok(joined)
    }

    /// Move the placeholder maps into optional request fields, returning the text.
    ///
    /// Empty maps are left out: DynamoDB rejects empty attribute maps.
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> String {
        if !self.attribute_names.is_empty() {
            names
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.attribute_names);
        }
        if !self.attribute_values.is_empty() {
            values
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.attribute_values);
        }
        self.expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(expression: &str, placeholder: &str, value: &str) -> CompiledExpression {
        CompiledExpression {
            expression: expression.to_string(),
            attribute_names: collections::HashMap::new(),
            attribute_values: collections::HashMap::from([(
                placeholder.to_string(),
                types::AttributeValue::S(value.to_string()),
            )]),
        }
    }

    #[test]
    fn test_join_skips_empty_fragments() {
        let joined = CompiledExpression::join(
            ", ",
            vec![
                fragment("a", ":a", "1"),
                CompiledExpression::default(),
                fragment("b", ":b", "2"),
            ],
        )
        .unwrap();
        assert_eq!(joined.expression, "a, b");
        assert_eq!(joined.attribute_values.len(), 2);
    }

    #[test]
    fn test_join_rejects_conflicting_values() {
        let actual = CompiledExpression::join(
            " ",
            vec![fragment("a", ":a", "1"), fragment("a", ":a", "2")],
        );
        assert!(matches!(actual, Err(Error::PlaceholderCollision(p)) if p == ":a"));
    }

    #[test]
    fn test_merge_into_leaves_empty_maps_out() {
        let mut names = None;
        let mut values = None;
        let expression = CompiledExpression {
            expression: "#a".to_string(),
            attribute_names: collections::HashMap::from([("#a".to_string(), "a".to_string())]),
            ..Default::default()
        }
        .merge_into(&mut names, &mut values);
        assert_eq!(expression, "#a");
        assert_eq!(names.unwrap().len(), 1);
        assert!(values.is_none());
    }
}
