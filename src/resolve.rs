//! Field path resolution.
//!
//! Rules address other fields by dotted path (`"Obj.Sub.Y2K"`). On the
//! trusted side a path walks an object graph through [`Container`]; models
//! describe their members once in a [`Schema`]. On the interactive side a
//! path names a form input, looked up through a [`FieldAccessor`].

use std::collections::HashMap;

use crate::{convert, value::Value};

/// One step of a path walk: a leaf value or a nested container.
pub enum Member<'a> {
    Value(Value),
    Container(&'a dyn Container),
}

/// Something with named members, e.g. a model or a JSON object.
///
/// Implementations only read; resolution never mutates the graph.
pub trait Container {
    fn member(&self, name: &str) -> Option<Member<'_>>;
}

/// Reads one member of `T`.
pub type Accessor<T> = for<'a> fn(&'a T) -> Member<'a>;

/// Accessor table for a model type, built once and shared.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
/// use validif_lang::resolve::{resolve, Container, Member, Schema};
/// use validif_lang::Value;
///
/// struct Address {
///     country: i32,
/// }
///
/// static ADDRESS: LazyLock<Schema<Address>> = LazyLock::new(|| {
///     Schema::<Address>::builder()
///         .field("Country", |a| Member::Value(a.country.into()))
///         .build()
/// });
///
/// impl Container for Address {
///     fn member(&self, name: &str) -> Option<Member<'_>> {
///         ADDRESS.member(self, name)
///     }
/// }
///
/// let home = Address { country: 42 };
/// assert_eq!(resolve(&home, "Country"), Value::Number(42.0));
/// assert_eq!(resolve(&home, "Street"), Value::Null);
/// ```
pub struct Schema<T> {
    fields: HashMap<&'static str, Accessor<T>>,
}

pub struct SchemaBuilder<T> {
    fields: HashMap<&'static str, Accessor<T>>,
}

impl<T> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            fields: HashMap::new(),
        }
    }

    pub fn member<'a>(&self, target: &'a T, name: &str) -> Option<Member<'a>> {
        self.fields.get(name).map(|accessor| accessor(target))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }
}

impl<T> SchemaBuilder<T> {
    pub fn field(mut self, name: &'static str, accessor: Accessor<T>) -> Self {
        self.fields.insert(name, accessor);
        self
    }

    pub fn build(self) -> Schema<T> {
        Schema {
            fields: self.fields,
        }
    }
}

/// Walk `path` from `root`.
///
/// Empty segments are skipped. A missing member, a leaf reached before the
/// path ends, or a path ending on a nested container all resolve to Null.
pub fn resolve<'a>(root: &'a dyn Container, path: &str) -> Value {
    let mut current = root;
    let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();

    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        match current.member(segment) {
            Some(Member::Container(next)) if !last => current = next,
            Some(Member::Value(value)) if last => return value,
            _ => return Value::Null,
        }
    }

    Value::Null
}

impl Container for serde_json::Value {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        let value = self.as_object()?.get(name)?;
        if value.is_object() {
            Some(Member::Container(value))
        } else {
            Some(Member::Value(convert::json_to_value(value)))
        }
    }
}

/// Looks up a field path for the evaluator.
pub trait Resolve {
    fn resolve(&self, path: &str) -> Value;
}

/// Resolves paths against an object graph.
#[derive(Clone, Copy)]
pub struct GraphResolver<'a> {
    root: &'a dyn Container,
}

impl<'a> GraphResolver<'a> {
    pub fn new(root: &'a dyn Container) -> Self {
        GraphResolver { root }
    }
}

impl Resolve for GraphResolver<'_> {
    fn resolve(&self, path: &str) -> Value {
        resolve(self.root, path)
    }
}

/// A model with no other fields; every path is Null.
pub struct NoFields;

impl Container for NoFields {
    fn member(&self, _name: &str) -> Option<Member<'_>> {
        None
    }
}

/// Named-field lookups on the interactive side.
pub trait FieldAccessor {
    /// The current value of the field with this full name, or `None` when
    /// no such field exists.
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// The state of one form input.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Text box, text area or single select; raw text
    Text(String),
    /// Checkbox; reads as a boolean
    Checkbox(bool),
    /// Radio group; the checked option's text, if any
    Radio(Option<String>),
    /// Multi-select; the selected options
    Select(Vec<String>),
}

impl FieldInput {
    /// The value the rule sees, with raw text passed through type inference.
    pub fn value(&self) -> Value {
        match self {
            FieldInput::Text(text) => Value::infer(text),
            FieldInput::Checkbox(checked) => Value::Boolean(*checked),
            FieldInput::Radio(choice) => choice.as_deref().map_or(Value::Null, Value::infer),
            FieldInput::Select(options) => {
                Value::List(options.iter().map(|o| Value::infer(o)).collect())
            }
        }
    }
}

/// Map-backed form state.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    fields: HashMap<String, FieldInput>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, input: FieldInput) {
        self.fields.insert(name.into(), input);
    }

    pub fn with(mut self, name: impl Into<String>, input: FieldInput) -> Self {
        self.set(name, input);
        self
    }

    pub fn text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(name, FieldInput::Text(text.into()))
    }

    pub fn get(&self, name: &str) -> Option<&FieldInput> {
        self.fields.get(name)
    }
}

impl FieldAccessor for FormFields {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.fields.get(name).map(FieldInput::value)
    }
}

/// Resolves paths relative to the element being validated.
///
/// Form field names are hierarchical (`Order.Shipping.Street`); a rule on
/// `Order.Total` that mentions `Street` means a sibling, so lookups are
/// scoped by everything up to and including the element's last `.`.
pub struct FormResolver<'a> {
    fields: &'a dyn FieldAccessor,
    scope: String,
}

impl<'a> FormResolver<'a> {
    pub fn for_element(fields: &'a dyn FieldAccessor, element_name: &str) -> Self {
        let scope = match element_name.rfind('.') {
            Some(index) => element_name[..=index].to_string(),
            None => String::new(),
        };
        FormResolver { fields, scope }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Resolve for FormResolver<'_> {
    fn resolve(&self, path: &str) -> Value {
        let name = format!("{}{}", self.scope, path);
        self.fields.lookup(&name).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_paths() {
        let graph = json!({
            "One": 1,
            "Obj": { "Three": 3.0, "Sub": { "Name": "deep" } },
            "List": [1, 2, 3],
        });

        assert_eq!(resolve(&graph, "One"), Value::Number(1.0));
        assert_eq!(resolve(&graph, "Obj.Sub.Name"), Value::from("deep"));
        assert_eq!(resolve(&graph, ".Obj..Three"), Value::Number(3.0));
        assert_eq!(resolve(&graph, "List"), Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn unresolvable_paths_are_null() {
        let graph = json!({ "One": 1, "Obj": { "Three": 3 } });

        assert_eq!(resolve(&graph, "Missing"), Value::Null);
        assert_eq!(resolve(&graph, "One.Two"), Value::Null);
        assert_eq!(resolve(&graph, "Obj"), Value::Null);
        assert_eq!(resolve(&graph, ""), Value::Null);
    }

    #[test]
    fn form_lookups_are_scoped_to_the_element() {
        let fields = FormFields::new()
            .text("Order.Street", "North Pole")
            .text("Street", "elsewhere")
            .with("Order.Gift", FieldInput::Checkbox(true))
            .with("Order.Size", FieldInput::Radio(None))
            .with(
                "Order.Tags",
                FieldInput::Select(vec!["1".to_string(), "b".to_string()]),
            );

        let resolver = FormResolver::for_element(&fields, "Order.Total");
        assert_eq!(resolver.scope(), "Order.");
        assert_eq!(resolver.resolve("Street"), Value::from("North Pole"));
        assert_eq!(resolver.resolve("Gift"), Value::Boolean(true));
        assert_eq!(resolver.resolve("Size"), Value::Null);
        assert_eq!(
            resolver.resolve("Tags"),
            Value::List(vec![Value::Number(1.0), Value::from("b")])
        );
        assert_eq!(resolver.resolve("Missing"), Value::Null);

        let top = FormResolver::for_element(&fields, "Total");
        assert_eq!(top.resolve("Street"), Value::from("elsewhere"));
    }
}
