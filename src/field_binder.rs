//! Resolver parameter classification.
//!
//! A field resolver's parameters are matched to roles by what their types
//! are, not where they appear. The definition builder computes a
//! [`ParamShape`] for each parameter from its type identity and hands the
//! list to [`classify`], which is pure and applies a fixed priority:
//!
//! 1. no type annotation: error
//! 2. the root context type
//! 3. a derived context type
//! 4. the info type
//! 5. a structural type: the arguments object
//! 6. anything else: a positional argument
//!
//! The parent value is not classified here. It is the receiver of methods
//! and the first parameter of free functions, and callers strip it first.

/// What a parameter's type says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// No type annotation.
    Missing,
    RootContext,
    DerivedContext,
    Info,
    /// An untagged struct, inline object type or destructuring pattern.
    Structural,
    /// A schema type.
    Plain,
}

/// The role assigned to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ArgumentsObject,
    Positional,
    RootContext,
    DerivedContext,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    MissingType,
    MultipleArgumentObjects,
    MixedConventions,
    DuplicateRootContext,
}

/// A classification failure at parameter `index`, optionally pointing at
/// an earlier parameter it conflicts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindError {
    pub index: usize,
    pub related: Option<usize>,
    pub kind: BindErrorKind,
}

impl BindError {
    pub fn message(&self) -> &'static str {
        match self.kind {
            BindErrorKind::MissingType => {
                "Missing type annotation for resolver arguments. Give the parameter an explicit struct type, e.g. `Args { name }: Args`."
            }
            BindErrorKind::MultipleArgumentObjects => {
                "Multiple arguments objects. A resolver takes either one arguments struct or positional arguments."
            }
            BindErrorKind::MixedConventions => {
                "Cannot mix an arguments struct with positional arguments in one resolver."
            }
            BindErrorKind::DuplicateRootContext => {
                "The context may only be requested once per resolver."
            }
        }
    }

    pub fn related_message(&self) -> &'static str {
        match self.kind {
            BindErrorKind::MultipleArgumentObjects => "first arguments object",
            BindErrorKind::MixedConventions => "conflicting parameter",
            BindErrorKind::DuplicateRootContext => "context first requested here",
            BindErrorKind::MissingType => "",
        }
    }
}

/// Assigns a slot to every parameter, or reports every conflict found.
pub fn classify(shapes: &[ParamShape]) -> Result<Vec<Slot>, Vec<BindError>> {
    let mut slots = Vec::with_capacity(shapes.len());
    let mut errors = Vec::new();
    let mut root_context: Option<usize> = None;
    let mut arguments_object: Option<usize> = None;
    let mut positional: Option<usize> = None;

    for (index, shape) in shapes.iter().enumerate() {
        let slot = match shape {
            ParamShape::Missing => {
                errors.push(BindError {
                    index,
                    related: None,
                    kind: BindErrorKind::MissingType,
                });
                continue;
            }
            ParamShape::RootContext => {
                if let Some(first) = root_context {
                    errors.push(BindError {
                        index,
                        related: Some(first),
                        kind: BindErrorKind::DuplicateRootContext,
                    });
                    continue;
                }
                root_context = Some(index);
                Slot::RootContext
            }
            ParamShape::DerivedContext => Slot::DerivedContext,
            ParamShape::Info => Slot::Info,
            ParamShape::Structural => {
                if let Some(first) = arguments_object {
                    errors.push(BindError {
                        index,
                        related: Some(first),
                        kind: BindErrorKind::MultipleArgumentObjects,
                    });
                    continue;
                }
                if let Some(first) = positional {
                    errors.push(BindError {
                        index,
                        related: Some(first),
                        kind: BindErrorKind::MixedConventions,
                    });
                    continue;
                }
                arguments_object = Some(index);
                Slot::ArgumentsObject
            }
            ParamShape::Plain => {
                if let Some(first) = arguments_object {
                    errors.push(BindError {
                        index,
                        related: Some(first),
                        kind: BindErrorKind::MixedConventions,
                    });
                    continue;
                }
                positional.get_or_insert(index);
                Slot::Positional
            }
        };
        slots.push(slot);
    }

    if errors.is_empty() {
        Ok(slots)
    } else {
        Err(errors)
    }
}
