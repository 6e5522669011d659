use crate::common::{self, placeholder::Placeholders};

/// Separator for attribute path components.
const PATH_SEPARATOR: char = '.';

/// Compile the properties to retrieve into a projection expression.
///
/// Dotted properties address nested map attributes: every path segment gets its
/// own name placeholder.
///
/// ```rust
/// use dynamodb_provider::common::selection;
///
/// let projection = selection::compile_projection(&["id", "address.city"]);
/// assert_eq!(projection.expression, "#id, #address.#city");
/// ```
pub fn compile_projection<S: AsRef<str>>(properties: &[S]) -> common::CompiledExpression {
    let placeholders = Placeholders::default();
    let mut projection = common::CompiledExpression::default();
    let mut paths = Vec::with_capacity(properties.len());
    for property in properties {
        let segments: Vec<_> = property
            .as_ref()
            .split(PATH_SEPARATOR)
            .map(|segment| {
                let placeholder = placeholders.name(segment);
                projection.bind_name(placeholder.clone(), segment);
                placeholder
            })
            .collect();
        paths.push(segments.join("."));
    }
    projection.expression = paths.join(", ");
    projection
}
