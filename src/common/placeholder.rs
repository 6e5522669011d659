/// Caller-supplied rewrite of the base value placeholder name.
pub type NameTransform = fn(&str) -> String;

/// Encoder mapping attribute names and values to `#name` / `:value` tokens.
///
/// A prefix namespaces every token the encoder produces, so that expressions
/// compiled for different clauses of one request can be merged by map union.
///
/// ```rust
/// use dynamodb_provider::common::placeholder::Placeholders;
///
/// let placeholders = Placeholders::new("__filter_");
/// assert_eq!(placeholders.name("age"), "#__filter_age");
/// assert_eq!(placeholders.value("age"), ":__filter_age");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Placeholders<'a> {
    prefix: &'a str,
    transform: Option<NameTransform>,
}

impl<'a> Placeholders<'a> {
    /// Encoder namespaced under `prefix` (may be empty).
    pub fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            transform: None,
        }
    }

    /// Rewrite the base of every value placeholder with `transform`.
    ///
    /// Structural suffixes (`_start`, `_end`, `_<index>`) are appended after the
    /// transform runs and cannot be removed by it.
    pub fn with_value_transform(mut self, transform: NameTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The prefix this encoder namespaces under.
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    /// Attribute-name placeholder: `#<prefix><property>`.
    pub fn name(&self, property: &str) -> String {
        format!("#{}{}", self.prefix, property)
    }

    /// Value placeholder: `:<prefix><property>`.
    pub fn value(&self, property: &str) -> String {
        let base = match self.transform {
            Some(transform) => transform(property),
            None => property.to_string(),
        };
        format!(":{}{}", self.prefix, base)
    }

    /// Indexed value placeholder used by `in` lists: `:<prefix><property>_<index>`.
    pub fn indexed(&self, property: &str, index: usize) -> String {
        format!("{}_{index}", self.value(property))
    }

    /// Lower and upper bound placeholders used by `between`.
    pub fn range(&self, property: &str) -> (String, String) {
        let base = self.value(property);
        (format!("{base}_start"), format!("{base}_end"))
    }
}
