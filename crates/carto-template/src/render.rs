//! Template evaluation.
//!
//! Rendering is pure: the same nodes, scope, and helpers always produce the same string.
//! Nothing here can fail. A path the scope cannot resolve renders as `""`, and so does a
//! helper that is not registered.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::ast::{Expr, Node, Path};

/// A registered helper: a pure string transform.
pub type HelperFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Resolves template paths to values.
pub trait Scope {
    /// Returns the value at `path`, or `None` if it is not available.
    fn resolve(&self, path: &Path) -> Option<String>;
}

impl<F> Scope for F
where
    F: Fn(&Path) -> Option<String>,
{
    fn resolve(&self, path: &Path) -> Option<String> {
        self(path)
    }
}

/// Helpers available to `{{name arg}}` tags, looked up by name at render time.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    /// Helper functions by name.
    helpers: HashMap<String, HelperFn>,
}

impl HelperRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in helpers: `toUpper`, `toLower`, and `trim`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("toUpper", str::to_uppercase);
        registry.register("toLower", str::to_lowercase);
        registry.register("trim", |s: &str| s.trim().to_string());
        registry
    }

    /// Registers a helper, replacing any existing helper with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, helper: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
        self
    }

    /// Returns the helper registered under `name`.
    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name)
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.helpers.keys().collect();
        names.sort();
        f.debug_struct("HelperRegistry")
            .field("helpers", &names)
            .finish()
    }
}

/// Evaluates an expression to a string.
fn eval<S: Scope + ?Sized>(expr: &Expr, scope: &S) -> String {
    match expr {
        Expr::Literal(text) => text.clone(),
        Expr::Path(path) => scope.resolve(path).unwrap_or_default(),
    }
}

/// Renders a list of nodes into `out`.
pub(crate) fn render_nodes<S: Scope + ?Sized>(
    nodes: &[Node],
    scope: &S,
    helpers: &HelperRegistry,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
            Node::Field(path) => {
                if let Some(value) = scope.resolve(path) {
                    out.push_str(&value);
                }
            }
            Node::Helper { name, arg } => match helpers.get(name) {
                Some(helper) => out.push_str(&helper(&eval(arg, scope))),
                None => debug!(helper = %name, "unknown template helper"),
            },
            Node::Eq {
                left,
                right,
                then,
                otherwise,
            } => {
                let branch = if eval(left, scope) == eval(right, scope) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, scope, helpers, out);
            }
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if eval(cond, scope).is_empty() {
                    otherwise
                } else {
                    then
                };
                render_nodes(branch, scope, helpers, out);
            }
        }
    }
}

/// Cleans up a rendered label.
///
/// Comma-separated parts are trimmed, inner whitespace runs collapse to one space, and
/// empty parts are dropped, so levels missing from the chain leave no dangling
/// separators: `" Main st , , "` becomes `"Main st"`.
pub fn tidy_label(raw: &str) -> String {
    raw.split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Template;

    fn chain(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn render(source: &str, values: &HashMap<String, String>, helpers: &HelperRegistry) -> String {
        let scope = |path: &Path| values.get(&path.to_string()).cloned();
        Template::compile(source).unwrap().render(&scope, helpers)
    }

    fn hyphenated(num: &str) -> String {
        match num.len() {
            4 => format!("{}-{}", &num[..2], &num[2..]),
            6 => format!("{}-{}", &num[..3], &num[3..]),
            _ => num.to_string(),
        }
    }

    #[test]
    fn eq_else_with_registered_helpers() {
        let values = chain(&[("address.number", "2169"), ("address.name", "Quincy Lane")]);
        let mut helpers = HelperRegistry::new();
        helpers
            .register("toUpper", str::to_uppercase)
            .register("hyphenated", hyphenated);

        let out = render(
            "{{#eq address.number \"3000\"}}3000!{{else}}{{hyphenated address.number}}{{/eq}} {{toUpper address.name}}",
            &values,
            &helpers,
        );
        assert_eq!(out, "21-69 QUINCY LANE");
    }

    #[test]
    fn eq_takes_then_branch() {
        let values = chain(&[("address.number", "3000"), ("address.name", "Quincy Lane")]);
        let out = render(
            "{{#eq address.number \"3000\"}}3000!{{else}}{{address.number}}{{/eq}} {{address.name}}",
            &values,
            &HelperRegistry::new(),
        );
        assert_eq!(out, "3000! Quincy Lane");
    }

    #[test]
    fn missing_fields_render_empty() {
        let values = chain(&[("address.name", "Main st")]);
        let out = render(
            "{{address.number}} {{address.name}} {{place.name}}",
            &values,
            &HelperRegistry::new(),
        );
        assert_eq!(out, " Main st ");
    }

    #[test]
    fn comments_are_not_emitted() {
        let values = chain(&[("region.name", "California")]);
        let out = render(
            "{{!-- comment --}}{{region.name}}{{! short }}",
            &values,
            &HelperRegistry::new(),
        );
        assert_eq!(out, "California");
    }

    #[test]
    fn unknown_helper_renders_empty() {
        let values = chain(&[("place.name", "Paris")]);
        let out = render("[{{shout place.name}}]", &values, &HelperRegistry::new());
        assert_eq!(out, "[]");
    }

    #[test]
    fn if_block_tests_emptiness() {
        let template = "{{place.name}}{{#if postcode.name}} {{postcode.name}}{{else}}!{{/if}}";
        let with = chain(&[("place.name", "Paris"), ("postcode.name", "75001")]);
        let without = chain(&[("place.name", "Paris")]);
        assert_eq!(render(template, &with, &HelperRegistry::new()), "Paris 75001");
        assert_eq!(render(template, &without, &HelperRegistry::new()), "Paris!");
    }

    #[test]
    fn eq_of_two_missing_values_is_true() {
        let out = render("{{#eq a b}}same{{/eq}}", &HashMap::new(), &HelperRegistry::new());
        assert_eq!(out, "same");
    }

    #[test]
    fn builtins_are_available() {
        let values = chain(&[("name", "  Mixed Case  ")]);
        let helpers = HelperRegistry::with_builtins();
        assert_eq!(render("{{toUpper name}}", &values, &helpers), "  MIXED CASE  ");
        assert_eq!(render("{{toLower name}}", &values, &helpers), "  mixed case  ");
        assert_eq!(render("{{trim name}}", &values, &helpers), "Mixed Case");
    }

    #[test]
    fn register_replaces_existing_helper() {
        let mut helpers = HelperRegistry::with_builtins();
        helpers.register("toUpper", |_: &str| "replaced".to_string());
        let values = chain(&[("name", "x")]);
        assert_eq!(render("{{toUpper name}}", &values, &helpers), "replaced");
    }

    #[test]
    fn debug_lists_sorted_names() {
        let helpers = HelperRegistry::with_builtins();
        assert_eq!(
            format!("{helpers:?}"),
            "HelperRegistry { helpers: [\"toLower\", \"toUpper\", \"trim\"] }"
        );
    }

    #[test]
    fn tidy_drops_empty_parts() {
        assert_eq!(tidy_label("  Main st , , "), "Main st");
        assert_eq!(
            tidy_label(" 2 Frosted Flakes Street New York, New York 12345, United States"),
            "2 Frosted Flakes Street New York, New York 12345, United States"
        );
        assert_eq!(tidy_label("21-69 QUINCY LANE, ,  "), "21-69 QUINCY LANE");
    }

    #[test]
    fn tidy_collapses_whitespace() {
        assert_eq!(tidy_label("9  Lucky   Charms ,New York"), "9 Lucky Charms, New York");
        assert_eq!(tidy_label(""), "");
    }
}
