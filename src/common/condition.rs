use crate::common::{self, placeholder::Placeholders};
use crate::error::Result;

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::{collections, ops};

/// Logical operator joining a condition to the one before it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - both sides must be true.
    #[default]
    And,
    /// Logical OR - at least one side must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " and ",
            Self::Or => " or ",
        }
    }
}

/// Operator applied to a single attribute.
///
/// ```rust
/// use dynamodb_provider::common::condition;
///
/// let eq = condition::Condition::Equal("value".to_string());
/// let range = condition::Condition::Between(1, 10);
/// let exists: condition::Condition<String> = condition::Condition::Exists;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// `#a = :a`
    Equal(T),
    /// `#a <> :a`
    NotEqual(T),
    /// `#a < :a`
    LowerThan(T),
    /// `#a <= :a`
    LowerOrEqualThan(T),
    /// `#a > :a`
    BiggerThan(T),
    /// `#a >= :a`
    BiggerOrEqualThan(T),
    /// `begins_with(#a, :a)`
    BeginsWith(T),
    /// `contains(#a, :a)`
    Contains(T),
    /// `not contains(#a, :a)`
    NotContains(T),
    /// `attribute_exists(#a)`
    Exists,
    /// `attribute_not_exists(#a)`
    NotExists,
    /// `#a in (:a_0, :a_1, ...)`
    In(Vec<T>),
    /// `not #a in (:a_0, :a_1, ...)`
    NotIn(Vec<T>),
    /// `#a between :a_start and :a_end` (inclusive)
    Between(T, T),
}

impl<T> Condition<T> {
    /// Convert every operand with `f`, keeping the operator.
    pub(crate) fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Condition<U>, E> {
        let condition = match self {
            Self::Equal(value) => Condition::Equal(f(value)?),
            Self::NotEqual(value) => Condition::NotEqual(f(value)?),
            Self::LowerThan(value) => Condition::LowerThan(f(value)?),
            Self::LowerOrEqualThan(value) => Condition::LowerOrEqualThan(f(value)?),
            Self::BiggerThan(value) => Condition::BiggerThan(f(value)?),
            Self::BiggerOrEqualThan(value) => Condition::BiggerOrEqualThan(f(value)?),
            Self::BeginsWith(value) => Condition::BeginsWith(f(value)?),
            Self::Contains(value) => Condition::Contains(f(value)?),
            Self::NotContains(value) => Condition::NotContains(f(value)?),
            Self::Exists => Condition::Exists,
            Self::NotExists => Condition::NotExists,
            Self::In(values) => {
                Condition::In(values.into_iter().map(f).collect::<Result<_, _>>()?)
            }
            Self::NotIn(values) => {
                Condition::NotIn(values.into_iter().map(f).collect::<Result<_, _>>()?)
            }
            Self::Between(low, high) => Condition::Between(f(low)?, f(high)?),
        };
        Ok(condition)
    }
}

impl Condition<types::AttributeValue> {
    /// Render the fragment for `property`. Pure: no state besides the arguments.
    pub(crate) fn render(
        self,
        property: &str,
        placeholders: &Placeholders<'_>,
    ) -> common::CompiledExpression {
        let name = placeholders.name(property);
        let mut values = collections::HashMap::new();
        let expression = match self {
            Self::Equal(value) => {
                format!("{name} = {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::NotEqual(value) => {
                format!("{name} <> {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::LowerThan(value) => {
                format!("{name} < {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::LowerOrEqualThan(value) => {
                format!("{name} <= {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::BiggerThan(value) => {
                format!("{name} > {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::BiggerOrEqualThan(value) => {
                format!("{name} >= {}", bind_single(property, value, placeholders, &mut values))
            }
            Self::BeginsWith(value) => format!(
                "begins_with({name}, {})",
                bind_single(property, value, placeholders, &mut values)
            ),
            Self::Contains(value) => format!(
                "contains({name}, {})",
                bind_single(property, value, placeholders, &mut values)
            ),
            Self::NotContains(value) => format!(
                "not contains({name}, {})",
                bind_single(property, value, placeholders, &mut values)
            ),
            Self::Exists => format!("attribute_exists({name})"),
            Self::NotExists => format!("attribute_not_exists({name})"),
            Self::In(list) => format!(
                "{name} in ({})",
                bind_list(property, list, placeholders, &mut values)
            ),
            Self::NotIn(list) => format!(
                "not {name} in ({})",
                bind_list(property, list, placeholders, &mut values)
            ),
            Self::Between(low, high) => {
                let (start, end) = placeholders.range(property);
                values.insert(start.clone(), low);
                values.insert(end.clone(), high);
                format!("{name} between {start} and {end}")
            }
        };
        common::CompiledExpression {
            expression,
            attribute_names: collections::HashMap::from([(name, property.to_string())]),
            attribute_values: values,
        }
    }
}

fn bind_single(
    property: &str,
    value: types::AttributeValue,
    placeholders: &Placeholders<'_>,
    values: &mut collections::HashMap<String, types::AttributeValue>,
) -> String {
    let placeholder = placeholders.value(property);
    values.insert(placeholder.clone(), value);
    placeholder
}

fn bind_list(
    property: &str,
    list: Vec<types::AttributeValue>,
    placeholders: &Placeholders<'_>,
    values: &mut collections::HashMap<String, types::AttributeValue>,
) -> String {
    let mut tokens = Vec::with_capacity(list.len());
    for (index, value) in list.into_iter().enumerate() {
        let placeholder = placeholders.indexed(property, index);
        values.insert(placeholder.clone(), value);
        tokens.push(placeholder);
    }
    tokens.join(", ")
}

/// Condition applied to a named attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeCondition<T> {
    /// The name of the attribute the condition applies to.
    pub name: String,
    /// The operator and its operands.
    pub condition: Condition<T>,
}

impl<T: Serialize> AttributeCondition<T> {
    /// Compile this single condition, without surrounding parentheses.
    pub fn compile(self, placeholders: &Placeholders<'_>) -> Result<common::CompiledExpression> {
        let condition: Condition<types::AttributeValue> =
            self.condition.try_map(to_attribute_value)?;
        Ok(condition.render(&self.name, placeholders))
    }
}

/// A node of a boolean condition expression.
///
/// Groups are rendered inside their own parentheses, in source order; nothing is
/// reordered by operator precedence.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionTree<T> {
    /// A single attribute condition.
    Leaf(AttributeCondition<T>),
    /// A parenthesized sub-expression.
    Group(Vec<JoinedCondition<T>>),
}

impl<T> ConditionTree<T> {
    /// Leaf condition on `name`.
    pub fn leaf(name: impl Into<String>, condition: Condition<T>) -> Self {
        Self::Leaf(AttributeCondition {
            name: name.into(),
            condition,
        })
    }

    /// `parent` grouped together with `nested`, the first nested condition joined
    /// to the parent by its own operator.
    pub fn nested(parent: AttributeCondition<T>, nested: Vec<JoinedCondition<T>>) -> Self {
        let mut items = Vec::with_capacity(nested.len() + 1);
        items.push(JoinedCondition::and(Self::Leaf(parent)));
        items.extend(nested);
        Self::Group(items)
    }

    pub(crate) fn collect_properties<'a>(&'a self, properties: &mut Vec<&'a str>) {
        match self {
            Self::Leaf(leaf) => properties.push(&leaf.name),
            Self::Group(items) => {
                for item in items {
                    item.node.collect_properties(properties);
                }
            }
        }
    }
}

/// A condition node together with the operator joining it to its predecessor.
///
/// The operator of the first condition in a list is ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedCondition<T> {
    /// How this condition joins the previous one.
    pub join: LogicalOperator,
    /// The condition itself.
    pub node: ConditionTree<T>,
}

impl<T> JoinedCondition<T> {
    /// Join `node` with `and`.
    pub fn and(node: ConditionTree<T>) -> Self {
        Self {
            join: LogicalOperator::And,
            node,
        }
    }

    /// Join `node` with `or`.
    pub fn or(node: ConditionTree<T>) -> Self {
        Self {
            join: LogicalOperator::Or,
            node,
        }
    }
}

/// Compile an ordered condition list into one boolean expression.
///
/// ```rust
/// use dynamodb_provider::common::{condition, placeholder::Placeholders};
/// use condition::{Condition, ConditionTree, JoinedCondition};
///
/// let compiled = condition::compile_conditions(
///     vec![
///         JoinedCondition::and(ConditionTree::leaf("status", Condition::Equal("active"))),
///         JoinedCondition::or(ConditionTree::leaf("deleted", Condition::<&str>::NotExists)),
///     ],
///     &Placeholders::default(),
/// )
/// .unwrap();
/// assert_eq!(
///     compiled.expression,
///     "(#status = :status) or (attribute_not_exists(#deleted))"
/// );
/// ```
pub fn compile_conditions<T: Serialize>(
    conditions: Vec<JoinedCondition<T>>,
    placeholders: &Placeholders<'_>,
) -> Result<common::CompiledExpression> {
    let mut compiled = common::CompiledExpression::default();
    compiled.expression = compile_joined(conditions, placeholders, &mut compiled)?;
    Ok(compiled)
}

fn compile_joined<T: Serialize>(
    conditions: Vec<JoinedCondition<T>>,
    placeholders: &Placeholders<'_>,
    compiled: &mut common::CompiledExpression,
) -> Result<String> {
    let mut expression = String::new();
    for JoinedCondition { join, node } in conditions {
        let fragment = match node {
            ConditionTree::Leaf(leaf) => compiled.absorb(leaf.compile(placeholders)?)?,
            ConditionTree::Group(items) => compile_joined(items, placeholders, compiled)?,
        };
        if fragment.is_empty() {
            continue;
        }
        if !expression.is_empty() {
            expression.push_str(&join);
        }
        expression.push('(');
        expression.push_str(&fragment);
        expression.push(')');
    }
    Ok(expression)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;

    use rstest::rstest;
    use serde_json::{Value, json};

    /// Every `#name` and `:value` token referenced by `expression`.
    pub(crate) fn placeholders_in(expression: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current: Option<String> = None;
        for c in expression.chars() {
            match current.as_mut() {
                Some(token) if c.is_ascii_alphanumeric() || c == '_' => token.push(c),
                _ => {
                    if let Some(token) = current.take() {
                        tokens.push(token);
                    }
                    if c == '#' || c == ':' {
                        current = Some(c.to_string());
                    }
                }
            }
        }
        tokens.extend(current);
        tokens
    }

    fn s(value: &str) -> types::AttributeValue {
        types::AttributeValue::S(value.to_string())
    }

    fn n(value: &str) -> types::AttributeValue {
        types::AttributeValue::N(value.to_string())
    }

    #[rstest]
    #[case::equal(Condition::Equal(json!("b")), "#a = :a", vec![(":a", s("b"))])]
    #[case::not_equal(Condition::NotEqual(json!(1)), "#a <> :a", vec![(":a", n("1"))])]
    #[case::lower_than(Condition::LowerThan(json!(1)), "#a < :a", vec![(":a", n("1"))])]
    #[case::lower_or_equal_than(Condition::LowerOrEqualThan(json!(1)), "#a <= :a", vec![(":a", n("1"))])]
    #[case::bigger_than(Condition::BiggerThan(json!(1)), "#a > :a", vec![(":a", n("1"))])]
    #[case::bigger_or_equal_than(Condition::BiggerOrEqualThan(json!(1)), "#a >= :a", vec![(":a", n("1"))])]
    #[case::begins_with(Condition::BeginsWith(json!("pre")), "begins_with(#a, :a)", vec![(":a", s("pre"))])]
    #[case::contains(Condition::Contains(json!("x")), "contains(#a, :a)", vec![(":a", s("x"))])]
    #[case::not_contains(Condition::NotContains(json!("x")), "not contains(#a, :a)", vec![(":a", s("x"))])]
    #[case::exists(Condition::Exists, "attribute_exists(#a)", vec![])]
    #[case::not_exists(Condition::NotExists, "attribute_not_exists(#a)", vec![])]
    #[case::in_list(
        Condition::In(vec![json!("x"), json!("y")]),
        "#a in (:a_0, :a_1)",
        vec![(":a_0", s("x")), (":a_1", s("y"))]
    )]
    #[case::in_empty(Condition::In(vec![]), "#a in ()", vec![])]
    #[case::not_in(
        Condition::NotIn(vec![json!(1)]),
        "not #a in (:a_0)",
        vec![(":a_0", n("1"))]
    )]
    #[case::between(
        Condition::Between(json!(1), json!(9)),
        "#a between :a_start and :a_end",
        vec![(":a_start", n("1")), (":a_end", n("9"))]
    )]
    fn test_single_condition(
        #[case] condition: Condition<Value>,
        #[case] expected_expression: &str,
        #[case] expected_values: Vec<(&str, types::AttributeValue)>,
    ) {
        let actual = AttributeCondition {
            name: "a".to_string(),
            condition,
        }
        .compile(&Placeholders::default())
        .unwrap();
        let expected = common::CompiledExpression {
            expression: expected_expression.to_string(),
            attribute_names: collections::HashMap::from([("#a".to_string(), "a".to_string())]),
            attribute_values: expected_values
                .into_iter()
                .map(|(placeholder, value)| (placeholder.to_string(), value))
                .collect(),
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::single(
        vec![
            JoinedCondition::and(ConditionTree::leaf("a", Condition::Equal(json!(1)))),
        ],
        "(#a = :a)"
    )]
    #[case::first_join_ignored(
        vec![
            JoinedCondition::or(ConditionTree::leaf("a", Condition::Equal(json!(1)))),
            JoinedCondition::and(ConditionTree::leaf("b", Condition::Exists)),
        ],
        "(#a = :a) and (attribute_exists(#b))"
    )]
    #[case::source_order_no_precedence(
        vec![
            JoinedCondition::and(ConditionTree::leaf("a", Condition::Equal(json!(1)))),
            JoinedCondition::or(ConditionTree::leaf("b", Condition::Equal(json!(2)))),
            JoinedCondition::and(ConditionTree::leaf("c", Condition::Equal(json!(3)))),
        ],
        "(#a = :a) or (#b = :b) and (#c = :c)"
    )]
    #[case::nested(
        vec![
            JoinedCondition::and(ConditionTree::nested(
                AttributeCondition {
                    name: "a".to_string(),
                    condition: Condition::Equal(json!(1)),
                },
                vec![
                    JoinedCondition::or(ConditionTree::leaf("b", Condition::NotExists)),
                    JoinedCondition::and(ConditionTree::leaf("c", Condition::BiggerThan(json!(2)))),
                ],
            )),
            JoinedCondition::or(ConditionTree::leaf("d", Condition::Exists)),
        ],
        "((#a = :a) or (attribute_not_exists(#b)) and (#c > :c)) or (attribute_exists(#d))"
    )]
    #[case::deeply_nested(
        vec![
            JoinedCondition::and(ConditionTree::leaf("a", Condition::Exists)),
            JoinedCondition::and(ConditionTree::Group(vec![
                JoinedCondition::and(ConditionTree::leaf("b", Condition::Exists)),
                JoinedCondition::or(ConditionTree::Group(vec![
                    JoinedCondition::and(ConditionTree::leaf("c", Condition::Exists)),
                    JoinedCondition::and(ConditionTree::leaf("d", Condition::Exists)),
                ])),
            ])),
        ],
        "(attribute_exists(#a)) and ((attribute_exists(#b)) or ((attribute_exists(#c)) and (attribute_exists(#d))))"
    )]
    #[case::empty_group_skipped(
        vec![
            JoinedCondition::and(ConditionTree::Group(vec![])),
            JoinedCondition::or(ConditionTree::leaf("a", Condition::Exists)),
        ],
        "(attribute_exists(#a))"
    )]
    fn test_compile_conditions(
        #[case] conditions: Vec<JoinedCondition<Value>>,
        #[case] expected: &str,
    ) {
        let actual = compile_conditions(conditions, &Placeholders::default()).unwrap();
        assert_eq!(actual.expression, expected);
    }

    #[test]
    fn test_prefix_changes_only_placeholders() {
        let conditions = || {
            vec![
                JoinedCondition::and(ConditionTree::leaf("a", Condition::Equal(json!(1)))),
                JoinedCondition::or(ConditionTree::leaf(
                    "b",
                    Condition::Between(json!(1), json!(2)),
                )),
                JoinedCondition::and(ConditionTree::leaf("c", Condition::In(vec![json!("x")]))),
            ]
        };
        let plain = compile_conditions(conditions(), &Placeholders::default()).unwrap();
        let prefixed = compile_conditions(conditions(), &Placeholders::new("p_")).unwrap();
        let expected = plain
            .expression
            .replace('#', "#p_")
            .replace(':', ":p_");
        assert_eq!(prefixed.expression, expected);
        for (placeholder, property) in plain.attribute_names {
            let prefixed_placeholder = placeholder.replacen('#', "#p_", 1);
            assert_eq!(prefixed.attribute_names[&prefixed_placeholder], property);
        }
        for (placeholder, value) in plain.attribute_values {
            let prefixed_placeholder = placeholder.replacen(':', ":p_", 1);
            assert_eq!(prefixed.attribute_values[&prefixed_placeholder], value);
        }
    }

    #[test]
    fn test_every_placeholder_is_bound() {
        let conditions = vec![
            JoinedCondition::and(ConditionTree::nested(
                AttributeCondition {
                    name: "a".to_string(),
                    condition: Condition::In(vec![json!(1), json!(2), json!(3)]),
                },
                vec![JoinedCondition::or(ConditionTree::leaf(
                    "b",
                    Condition::Between(json!("a"), json!("z")),
                ))],
            )),
            JoinedCondition::and(ConditionTree::leaf("c", Condition::BeginsWith(json!("x")))),
            JoinedCondition::and(ConditionTree::leaf("d", Condition::NotExists)),
        ];
        let compiled = compile_conditions(conditions, &Placeholders::new("q_")).unwrap();
        let tokens = placeholders_in(&compiled.expression);
        assert_eq!(tokens.len(), 10);
        for token in tokens {
            let bound = if token.starts_with('#') {
                compiled.attribute_names.contains_key(&token)
            } else {
                compiled.attribute_values.contains_key(&token)
            };
            assert!(bound, "{token} is not bound");
        }
        assert_eq!(compiled.attribute_names.len(), 4);
        assert_eq!(compiled.attribute_values.len(), 6);
    }

    #[test]
    fn test_same_property_different_values_collide() {
        let conditions = vec![
            JoinedCondition::and(ConditionTree::leaf("a", Condition::BiggerThan(json!(1)))),
            JoinedCondition::and(ConditionTree::leaf("a", Condition::LowerThan(json!(5)))),
        ];
        let actual = compile_conditions(conditions, &Placeholders::default());
        assert!(matches!(actual, Err(Error::PlaceholderCollision(p)) if p == ":a"));
    }
}
