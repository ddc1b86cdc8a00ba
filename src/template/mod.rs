//! Deferred rendering of string values.
//!
//! Every string stored in a [`ConfigNode`](crate::ConfigNode) is wrapped in a
//! [`TemplateValue`]. It behaves like its raw string for comparison, display
//! and concatenation, and renders with Handlebars syntax only when asked:
//!
//! ```
//! use konfigure::TemplateValue;
//! use serde_json::json;
//!
//! let greeting = TemplateValue::new("Hello {{ name }}");
//! assert_eq!(greeting, "Hello {{ name }}");
//! assert_eq!(greeting.render(&json!({"name": "World"}))?, "Hello World");
//! # Ok::<(), konfigure::TemplateError>(())
//! ```

mod engine;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use engine::RenderOptions;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// A leaf string that can be rendered against bindings on demand.
///
/// Rendering never changes the stored raw string.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateValue {
    raw: String,
}

impl TemplateValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The unrendered string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Renders with the default [`RenderOptions`].
    ///
    /// Missing bindings render as empty text. Only a syntax error in the raw
    /// string itself is reported.
    pub fn render<T: Serialize + ?Sized>(&self, bindings: &T) -> Result<String, TemplateError> {
        self.render_with(bindings, &RenderOptions::default())
    }

    pub fn render_with<T: Serialize + ?Sized>(
        &self,
        bindings: &T,
        options: &RenderOptions,
    ) -> Result<String, TemplateError> {
        engine::render(&self.raw, bindings, options)
    }
}

impl fmt::Debug for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TemplateValue").field(&self.raw).finish()
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Deref for TemplateValue {
    type Target = str;

    fn deref(&self) -> &str {
        &self.raw
    }
}

impl AsRef<str> for TemplateValue {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Borrow<str> for TemplateValue {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for TemplateValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TemplateValue {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<TemplateValue> for String {
    fn from(value: TemplateValue) -> Self {
        value.raw
    }
}

impl Add<&str> for TemplateValue {
    type Output = String;

    fn add(mut self, rhs: &str) -> String {
        self.raw.push_str(rhs);
        self.raw
    }
}

impl Add<&str> for &TemplateValue {
    type Output = String;

    fn add(self, rhs: &str) -> String {
        let mut out = String::with_capacity(self.raw.len() + rhs.len());
        out.push_str(&self.raw);
        out.push_str(rhs);
        out
    }
}

macro_rules! impl_str_comparisons {
    ($($ty:ty),*) => {
        $(
            impl PartialEq<$ty> for TemplateValue {
                fn eq(&self, other: &$ty) -> bool {
                    self.raw.as_str() == AsRef::<str>::as_ref(other)
                }
            }

            impl PartialEq<TemplateValue> for $ty {
                fn eq(&self, other: &TemplateValue) -> bool {
                    AsRef::<str>::as_ref(self) == other.raw.as_str()
                }
            }

            impl PartialOrd<$ty> for TemplateValue {
                fn partial_cmp(&self, other: &$ty) -> Option<Ordering> {
                    self.raw.as_str().partial_cmp(AsRef::<str>::as_ref(other))
                }
            }

            impl PartialOrd<TemplateValue> for $ty {
                fn partial_cmp(&self, other: &TemplateValue) -> Option<Ordering> {
                    AsRef::<str>::as_ref(self).partial_cmp(other.raw.as_str())
                }
            }
        )*
    };
}

impl_str_comparisons!(str, &str, String);

impl Serialize for TemplateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TemplateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_string_is_kept() {
        let tv = TemplateValue::new("Hello {{ name }}");
        assert_eq!(tv.raw(), "Hello {{ name }}");
        assert_eq!(tv.to_string(), "Hello {{ name }}");
        assert_eq!(format!("{tv:?}"), r#"TemplateValue("Hello {{ name }}")"#);
    }

    #[test]
    fn test_render() {
        let tv = TemplateValue::new("Hello {{ name }}");
        assert_eq!(tv.render(&json!({"name": "World"})).unwrap(), "Hello World");
    }

    #[test]
    fn test_render_is_pure() {
        let tv = TemplateValue::new("{{ greeting }}, {{ name }}");
        let bindings = json!({"greeting": "Hi", "name": "Bo"});
        let first = tv.render(&bindings).unwrap();
        let second = tv.render(&bindings).unwrap();
        assert_eq!(first, second);
        assert_eq!(tv, "{{ greeting }}, {{ name }}");
    }

    #[test]
    fn test_render_with_struct_bindings() {
        #[derive(Serialize)]
        struct Vars<'a> {
            user: &'a str,
            count: u32,
        }

        let tv = TemplateValue::new("{{ user }} has {{ count }} messages");
        let out = tv.render(&Vars { user: "kim", count: 4 }).unwrap();
        assert_eq!(out, "kim has 4 messages");
    }

    #[test]
    fn test_equality_with_strings() {
        let a = TemplateValue::new("Hello {{ name }}");
        let b = TemplateValue::new("Hello {{ name }}");
        let c = TemplateValue::new("Goodbye {{ name }}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "Hello {{ name }}");
        assert_eq!("Hello {{ name }}", a);
        assert_eq!(a, String::from("Hello {{ name }}"));
        assert_eq!(String::from("Hello {{ name }}"), a);
    }

    #[test]
    fn test_ordering_with_strings() {
        let tv = TemplateValue::new("m");
        assert!(tv > "a");
        assert!(tv < "z");
        assert!("a" < tv);
        assert!(TemplateValue::new("a") < tv);
    }

    #[test]
    fn test_behaves_like_str() {
        let tv = TemplateValue::new("prompt text");
        assert_eq!(tv.len(), 11);
        assert!(tv.starts_with("prompt"));
        assert_eq!(tv.clone() + "!", "prompt text!");
        assert_eq!(&tv + "?", "prompt text?");
        let s: String = tv.into();
        assert_eq!(s, "prompt text");
    }

    #[test]
    fn test_serializes_as_raw_string() {
        let tv = TemplateValue::new("{{ x }}");
        assert_eq!(serde_json::to_value(&tv).unwrap(), json!("{{ x }}"));
        let back: TemplateValue = serde_json::from_value(json!("{{ x }}")).unwrap();
        assert_eq!(back, tv);
    }
}
