use crate::{
    common::{ExpressionInput, Placeholders},
    error::Result,
};

/// Attributes to return from a read, as dotted paths.
///
/// ```rust
/// use dynamodb_exec::common::selection::Projection;
///
/// let projection = Projection::new(["partition", "uuid", "count-map.M"]);
/// assert_eq!(projection.paths().len(), 3);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Projection {
    paths: Vec<String>,
}

impl Projection {
    /// Creates a projection of the given attribute paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds one more attribute path.
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// The selected paths, in insertion order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn render(self, placeholders: &mut Placeholders) -> Result<ExpressionInput> {
        let mut operations = Vec::with_capacity(self.paths.len());
        for path in self.paths {
            let mut operation = ExpressionInput::default();
            operation.expression = placeholders.path(&path, &mut operation)?;
            operations.push(operation);
        }
        Ok(ExpressionInput::merge(", ", operations))
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
