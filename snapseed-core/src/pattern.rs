//! Tri-state placeholder values.
//!
//! A [`Pattern`] is either absent, a wildcard that accepts any compatible
//! value, or an exact value. Patterns live inside data trees as
//! [`Value::Pattern`] and take part in comparison through [`Placeholder`].

use std::any::Any;
use std::fmt;

use crate::compare::{Diff, MismatchKind, RuleContext};
use crate::model::{Array, Document, Value};

/// A Rust type that can sit inside a [`Pattern`].
pub trait PatternType: Clone + fmt::Debug + Default + PartialEq + Send + Sync + 'static {
    /// Type name used in mismatch messages.
    const TYPE_NAME: &'static str;

    /// Whether "no value" is a legal value of this type.
    const NILABLE: bool = false;

    /// Convert into the tree representation.
    fn to_value(&self) -> Value;

    /// Convert from the tree representation, if the value is assignable or
    /// convertible to this type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl PatternType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PatternType for i64 {
    const TYPE_NAME: &'static str = "int";

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }
}

impl PatternType for f64 {
    const TYPE_NAME: &'static str = "float";

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl PatternType for String {
    const TYPE_NAME: &'static str = "string";

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl PatternType for Document {
    const TYPE_NAME: &'static str = "document";
    const NILABLE: bool = true;

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_document().cloned()
    }
}

impl PatternType for Array {
    const TYPE_NAME: &'static str = "array";
    const NILABLE: bool = true;

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl PatternType for Value {
    const TYPE_NAME: &'static str = "value";
    const NILABLE: bool = true;

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: PatternType> PatternType for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
    const NILABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Tri-state placeholder: absent, wildcard or exact.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Pattern<T> {
    /// No value at all.
    #[default]
    Absent,
    /// Any value compatible with `T`. The payload is only used for display
    /// and as the concrete value written when seeding.
    Any(T),
    /// Exactly this value.
    Exact(T),
}

impl<T: PatternType> Pattern<T> {
    pub fn absent() -> Self {
        Pattern::Absent
    }

    pub fn any(placeholder: T) -> Self {
        Pattern::Any(placeholder)
    }

    pub fn value(value: T) -> Self {
        Pattern::Exact(value)
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Pattern::Absent)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Pattern::Exact(_))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Pattern::Any(_))
    }

    /// The payload, if any.
    pub fn typed(&self) -> Option<&T> {
        match self {
            Pattern::Absent => None,
            Pattern::Any(v) | Pattern::Exact(v) => Some(v),
        }
    }

    /// The payload as a tree value; `T::default()` when absent.
    pub fn unwrap_value(&self) -> Value {
        match self.typed() {
            Some(v) => v.to_value(),
            None => T::default().to_value(),
        }
    }
}

impl<T: PatternType> fmt::Display for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Absent => write!(f, "absent"),
            Pattern::Exact(v) => write!(f, "{}", v.to_value()),
            Pattern::Any(v) => write!(f, "{} (wildcard)", v.to_value()),
        }
    }
}

impl<T: PatternType> From<Pattern<T>> for Value {
    fn from(pattern: Pattern<T>) -> Self {
        Value::pattern(pattern)
    }
}

/// Type-erased view of a [`Pattern`] stored in a data tree.
///
/// Adapters may implement this for custom rule types; [`Pattern`] covers
/// the absent/wildcard/exact cases.
pub trait Placeholder: fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    fn is_present(&self) -> bool;

    fn is_explicit(&self) -> bool;

    fn is_wildcard(&self) -> bool {
        self.is_present() && !self.is_explicit()
    }

    /// The concrete value to write when seeding.
    fn unwrap_value(&self) -> Value;

    /// Check `actual` against this placeholder. `None` means the value is
    /// missing from the actual tree.
    fn test(&self, cx: &mut RuleContext<'_>, actual: Option<&Value>) -> Result<(), Diff>;

    fn as_any(&self) -> &dyn Any;

    fn eq_placeholder(&self, other: &dyn Placeholder) -> bool;
}

impl<T: PatternType> Placeholder for Pattern<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn is_present(&self) -> bool {
        Pattern::is_present(self)
    }

    fn is_explicit(&self) -> bool {
        Pattern::is_explicit(self)
    }

    fn unwrap_value(&self) -> Value {
        Pattern::unwrap_value(self)
    }

    fn test(&self, cx: &mut RuleContext<'_>, actual: Option<&Value>) -> Result<(), Diff> {
        match self {
            Pattern::Absent => cx.test(None, actual),
            Pattern::Exact(v) => cx.test(Some(&v.to_value()), actual),
            Pattern::Any(_) => match actual {
                None | Some(Value::Null) => {
                    if T::NILABLE {
                        Ok(())
                    } else {
                        Err(cx.mismatch(MismatchKind::Rule {
                            message: format!(
                                "expected non-nil value of type {}, got <nil>",
                                T::TYPE_NAME
                            ),
                        }))
                    }
                }
                Some(value) => {
                    if T::from_value(value).is_some() {
                        Ok(())
                    } else {
                        Err(cx.mismatch(MismatchKind::Rule {
                            message: format!(
                                "expected value assignable or convertible to {}, got {}",
                                T::TYPE_NAME,
                                value.kind()
                            ),
                        }))
                    }
                }
            },
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_placeholder(&self, other: &dyn Placeholder) -> bool {
        other
            .as_any()
            .downcast_ref::<Pattern<T>>()
            .is_some_and(|other| other == self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{StructuralTester, Tester};
    use crate::doc;

    fn check(expected: Value, actual: Option<Value>) -> Result<(), crate::SnapError> {
        let mut exp = doc! {};
        exp.push("field", expected);
        let mut act = doc! {};
        if let Some(actual) = actual {
            act.push("field", actual);
        }
        StructuralTester::new().test(&exp, &act)
    }

    #[test]
    fn test_predicates() {
        let absent = Pattern::<String>::absent();
        assert!(!absent.is_present());
        assert!(!absent.is_explicit());
        assert!(!absent.is_wildcard());

        let any = Pattern::any("x".to_string());
        assert!(any.is_present());
        assert!(!any.is_explicit());
        assert!(any.is_wildcard());

        let exact = Pattern::value(7i64);
        assert!(exact.is_present());
        assert!(exact.is_explicit());
        assert!(!exact.is_wildcard());
    }

    #[test]
    fn test_unwrap_value() {
        assert_eq!(Pattern::value(7i64).unwrap_value(), Value::Int(7));
        assert_eq!(Pattern::any(3i64).unwrap_value(), Value::Int(3));
        assert_eq!(Pattern::<i64>::absent().unwrap_value(), Value::Int(0));
        assert_eq!(Pattern::<Option<i64>>::absent().unwrap_value(), Value::Null);
    }

    #[test]
    fn test_absent_accepts_missing_and_null() {
        assert!(check(Pattern::<i64>::absent().into(), None).is_ok());
        assert!(check(Pattern::<i64>::absent().into(), Some(Value::Null)).is_ok());
        assert!(check(Pattern::<i64>::absent().into(), Some(Value::Int(1))).is_err());
    }

    #[test]
    fn test_exact_compares_value() {
        assert!(check(Pattern::value(5i64).into(), Some(Value::Int(5))).is_ok());
        assert!(check(Pattern::value(5i64).into(), Some(Value::Float(5.0))).is_ok());
        assert!(check(Pattern::value(5i64).into(), Some(Value::Int(6))).is_err());
        assert!(check(Pattern::value(5i64).into(), None).is_err());
    }

    #[test]
    fn test_wildcard_checks_compatibility() {
        let any_string = || Value::from(Pattern::any(String::new()));
        assert!(check(any_string(), Some(Value::from("anything"))).is_ok());

        let err = check(any_string(), Some(Value::Int(1))).unwrap_err();
        let report = err.to_string();
        assert!(report.contains("string"), "{}", report);
        assert!(report.contains("int"), "{}", report);
    }

    #[test]
    fn test_wildcard_nil_handling() {
        let err = check(Pattern::any(0i64).into(), Some(Value::Null)).unwrap_err();
        assert!(err.to_string().contains("expected non-nil value of type int"));
        assert!(check(Pattern::any(0i64).into(), None).is_err());

        assert!(check(Pattern::any(None::<i64>).into(), Some(Value::Null)).is_ok());
        assert!(check(Pattern::any(None::<i64>).into(), None).is_ok());
        assert!(check(Pattern::any(None::<i64>).into(), Some(Value::Int(2))).is_ok());
    }

    #[test]
    fn test_pattern_values_compare_by_state_and_payload() {
        assert_eq!(Value::from(Pattern::value(1i64)), Value::from(Pattern::value(1i64)));
        assert_ne!(Value::from(Pattern::value(1i64)), Value::from(Pattern::any(1i64)));
        assert_ne!(Value::from(Pattern::value(1i64)), Value::from(Pattern::value(1.0f64)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Pattern::<i64>::absent().to_string(), "absent");
        assert_eq!(Pattern::value(4i64).to_string(), "4");
        assert_eq!(Pattern::any("id".to_string()).to_string(), "\"id\" (wildcard)");
    }
}
