//! Placeholder-aware structural comparison.

use std::collections::HashSet;
use std::fmt;

use crate::error::SnapError;
use crate::model::{Array, Document, Value};

/// Compares an expected tree with an actual one.
pub trait Tester: Send + Sync {
    fn test(&self, expected: &Document, actual: &Document) -> Result<(), SnapError>;
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a tree, rendered like `users[1].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_owned()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// What went wrong at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum MismatchKind {
    /// Expected a value, the actual tree has none.
    MissingKey,
    /// The actual tree has a key the expectation does not mention.
    UnexpectedKey,
    /// Expected no value, the actual tree has one.
    UnexpectedValue { actual: String },
    /// Values are of incompatible kinds.
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Same kind, different value.
    ValueMismatch { expected: String, actual: String },
    /// Arrays of different length.
    LengthMismatch { expected: usize, actual: usize },
    /// A placeholder rule rejected the value.
    Rule { message: String },
}

/// A single difference between expected and actual trees.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: FieldPath,
    pub kind: MismatchKind,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            MismatchKind::MissingKey => write!(f, "{}: missing", path),
            MismatchKind::UnexpectedKey => write!(f, "{}: unexpected key", path),
            MismatchKind::UnexpectedValue { actual } => {
                write!(f, "{}: expected no value, got {}", path, actual)
            }
            MismatchKind::KindMismatch { expected, actual } => {
                write!(f, "{}: expected {}, got {}", path, expected, actual)
            }
            MismatchKind::ValueMismatch { expected, actual } => {
                write!(f, "{}: expected {}, got {}", path, expected, actual)
            }
            MismatchKind::LengthMismatch { expected, actual } => {
                write!(f, "{}: expected {} elements, got {}", path, expected, actual)
            }
            MismatchKind::Rule { message } => write!(f, "{}: {}", path, message),
        }
    }
}

/// All mismatches found by one comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub mismatches: Vec<Mismatch>,
}

impl Diff {
    pub fn single(path: FieldPath, kind: MismatchKind) -> Self {
        Self {
            mismatches: vec![Mismatch { path, kind }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    pub fn extend(&mut self, other: Diff) {
        self.mismatches.extend(other.mismatches);
    }

    /// Generate a human-readable report.
    pub fn report(&self) -> String {
        if self.mismatches.is_empty() {
            return "Trees match".to_string();
        }

        let mut lines = vec![format!("Found {} mismatches:", self.mismatches.len())];
        for mismatch in &self.mismatches {
            lines.push(format!("  - {}", mismatch));
        }
        lines.join("\n")
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

/// Hands placeholder rules a way to recurse into the comparator at their
/// own position in the tree.
pub struct RuleContext<'a> {
    tester: &'a StructuralTester,
    path: &'a FieldPath,
}

impl<'a> RuleContext<'a> {
    pub fn path(&self) -> &FieldPath {
        self.path
    }

    /// Compare at the current path. `None` on either side means "no value".
    pub fn test(&mut self, expected: Option<&Value>, actual: Option<&Value>) -> Result<(), Diff> {
        self.tester.compare_at(self.path, expected, actual)
    }

    /// A diff holding one mismatch at the current path.
    pub fn mismatch(&self, kind: MismatchKind) -> Diff {
        Diff::single(self.path.clone(), kind)
    }
}

/// Default [`Tester`]: key-based document comparison, ordered arrays,
/// numeric `Int`/`Float` equality, placeholders delegated to their rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralTester;

impl StructuralTester {
    pub fn new() -> Self {
        Self
    }

    /// Compare two documents and collect every mismatch.
    pub fn diff(&self, expected: &Document, actual: &Document) -> Diff {
        match self.compare_documents(&FieldPath::root(), expected, actual) {
            Ok(()) => Diff::default(),
            Err(diff) => diff,
        }
    }

    fn compare_at(
        &self,
        path: &FieldPath,
        expected: Option<&Value>,
        actual: Option<&Value>,
    ) -> Result<(), Diff> {
        match (expected, actual) {
            (Some(Value::Pattern(rule)), _) => {
                let mut cx = RuleContext { tester: self, path };
                rule.test(&mut cx, actual)
            }
            (None, None) | (None, Some(Value::Null)) | (Some(Value::Null), None) => Ok(()),
            (None, Some(actual)) => Err(Diff::single(
                path.clone(),
                MismatchKind::UnexpectedValue {
                    actual: actual.to_string(),
                },
            )),
            (Some(_), None) => Err(Diff::single(path.clone(), MismatchKind::MissingKey)),
            (Some(expected), Some(actual)) => self.compare_values(path, expected, actual),
        }
    }

    fn compare_values(
        &self,
        path: &FieldPath,
        expected: &Value,
        actual: &Value,
    ) -> Result<(), Diff> {
        match (expected, actual) {
            (_, Value::Pattern(rule)) => self.compare_values(path, expected, &rule.unwrap_value()),
            (Value::Document(e), Value::Document(a)) => self.compare_documents(path, e, a),
            (Value::Array(e), Value::Array(a)) => self.compare_arrays(path, e, a),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                if numbers_equal(expected, actual) {
                    Ok(())
                } else {
                    Err(value_mismatch(path, expected, actual))
                }
            }
            (Value::Null, Value::Null) => Ok(()),
            (Value::Bool(e), Value::Bool(a)) if e == a => Ok(()),
            (Value::String(e), Value::String(a)) if e == a => Ok(()),
            (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => {
                Err(value_mismatch(path, expected, actual))
            }
            _ => Err(Diff::single(
                path.clone(),
                MismatchKind::KindMismatch {
                    expected: expected.kind(),
                    actual: actual.kind(),
                },
            )),
        }
    }

    fn compare_documents(
        &self,
        path: &FieldPath,
        expected: &Document,
        actual: &Document,
    ) -> Result<(), Diff> {
        let mut diff = Diff::default();

        for entry in expected {
            let child = path.key(&entry.key);
            if let Err(d) = self.compare_at(&child, Some(&entry.value), actual.get(&entry.key)) {
                diff.extend(d);
            }
        }

        let expected_keys: HashSet<&str> = expected.keys().collect();
        for key in actual.keys() {
            if !expected_keys.contains(key) {
                diff.mismatches.push(Mismatch {
                    path: path.key(key),
                    kind: MismatchKind::UnexpectedKey,
                });
            }
        }

        if diff.is_empty() {
            Ok(())
        } else {
            Err(diff)
        }
    }

    fn compare_arrays(
        &self,
        path: &FieldPath,
        expected: &Array,
        actual: &Array,
    ) -> Result<(), Diff> {
        if expected.len() != actual.len() {
            return Err(Diff::single(
                path.clone(),
                MismatchKind::LengthMismatch {
                    expected: expected.len(),
                    actual: actual.len(),
                },
            ));
        }

        let mut diff = Diff::default();
        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            if let Err(d) = self.compare_at(&path.index(i), Some(e), Some(a)) {
                diff.extend(d);
            }
        }

        if diff.is_empty() {
            Ok(())
        } else {
            Err(diff)
        }
    }
}

impl Tester for StructuralTester {
    fn test(&self, expected: &Document, actual: &Document) -> Result<(), SnapError> {
        let diff = self.diff(expected, actual);
        if diff.is_empty() {
            Ok(())
        } else {
            log::debug!("Comparison found {} mismatches", diff.len());
            Err(SnapError::Comparison(diff))
        }
    }
}

fn numbers_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Int(e), Value::Int(a)) => e == a,
        _ => expected.as_f64() == actual.as_f64(),
    }
}

fn value_mismatch(path: &FieldPath, expected: &Value, actual: &Value) -> Diff {
    Diff::single(
        path.clone(),
        MismatchKind::ValueMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        },
    )
}
