//! Directive applications and default values.
//!
//! Every application written in a doc comment is checked against the
//! matching definition: location, repetition and argument values. Default
//! values of arguments and input fields are coerced against their declared
//! types with the same rules, so `1` becomes `[1]` for a list and an enum
//! default written as a variant path becomes the enum value's schema name.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::literal::ConstValue;
use crate::model::{FileId, Span};
use crate::schema::{
    DirectiveApplication, DirectiveDefinition, DirectiveLocation, InputValue, TypeDefinition,
    TypeRef,
};
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Directive names reserved by the schema language.
pub const RESERVED_DIRECTIVES: [&str; 5] = ["deprecated", "include", "skip", "specifiedBy", "oneOf"];

/// Directives every schema understands. They validate applications but are
/// not listed in the output.
pub fn builtin_directives() -> Vec<DirectiveDefinition> {
    let span = Span::new(FileId(0), 0, 0);
    vec![
        DirectiveDefinition {
            name: "specifiedBy".to_string(),
            description: None,
            locations: vec![DirectiveLocation::Scalar],
            arguments: vec![InputValue {
                name: "url".to_string(),
                description: None,
                ty: TypeRef::named("String").non_null(),
                default_value: None,
                deprecation_reason: None,
                directives: Vec::new(),
                span,
            }],
            repeatable: false,
            span,
        },
        DirectiveDefinition {
            name: "oneOf".to_string(),
            description: None,
            locations: vec![DirectiveLocation::InputObject],
            arguments: Vec::new(),
            repeatable: false,
            span,
        },
    ]
}

/// Reports reserved and duplicate directive names.
pub fn check_definitions(definitions: &[DirectiveDefinition], sink: &mut DiagnosticSink) {
    let mut seen: HashMap<&str, Span> = HashMap::new();
    for definition in definitions {
        if RESERVED_DIRECTIVES.contains(&definition.name.as_str())
            || definition.name.starts_with("__")
        {
            sink.semantic(
                definition.span,
                format!(
                    "Directive name `@{}` is reserved. Choose a different name.",
                    definition.name
                ),
            );
            continue;
        }
        match seen.get(definition.name.as_str()) {
            Some(first) => sink.push(
                Diagnostic::semantic(
                    definition.span,
                    format!("Duplicate directive definition `@{}`.", definition.name),
                )
                .with_related(*first, "also defined here"),
            ),
            None => {
                seen.insert(&definition.name, definition.span);
            }
        }
    }
}

/// Input-side shape of the schema, detached from the definitions so they
/// can be edited while values are checked.
#[derive(Debug, Default)]
struct InputShapes {
    /// Enum name to `(schema name, host name)` of every value.
    enums: HashMap<String, Vec<(String, String)>>,
    inputs: HashMap<String, InputShape>,
    outputs: HashSet<String>,
}

#[derive(Debug)]
struct InputShape {
    fields: Vec<(String, TypeRef, bool)>,
    one_of: bool,
}

impl InputShapes {
    fn new<'t>(types: impl IntoIterator<Item = &'t TypeDefinition>) -> Self {
        let mut shapes = Self::default();
        for definition in types {
            match definition {
                TypeDefinition::Enum(definition) => {
                    shapes.enums.insert(
                        definition.name.clone(),
                        definition
                            .values
                            .iter()
                            .map(|v| (v.name.clone(), v.source_name.clone()))
                            .collect(),
                    );
                }
                TypeDefinition::InputObject(definition) => {
                    shapes.inputs.insert(
                        definition.name.clone(),
                        InputShape {
                            fields: definition
                                .fields
                                .iter()
                                .map(|f| (f.name.clone(), f.ty.clone(), f.default_value.is_some()))
                                .collect(),
                            one_of: definition.one_of,
                        },
                    );
                }
                TypeDefinition::Scalar(_) => {}
                other => {
                    shapes.outputs.insert(other.name().to_string());
                }
            }
        }
        shapes
    }

    /// Checks `value` against `ty`, returning the normalized value.
    fn coerce(&self, value: &ConstValue, ty: &TypeRef) -> Result<ConstValue, String> {
        match ty {
            TypeRef::NonNull(inner) => match value {
                ConstValue::Null => Err(format!("Expected a value of type `{}`, found null.", ty)),
                _ => self.coerce(value, inner),
            },
            _ if *value == ConstValue::Null => Ok(ConstValue::Null),
            TypeRef::List(inner) => match value {
                ConstValue::List(items) => {
                    let mut coerced = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        coerced.push(
                            self.coerce(item, inner)
                                .map_err(|err| format!("At index {}: {}", index, err))?,
                        );
                    }
                    Ok(ConstValue::List(coerced))
                }
                single => Ok(ConstValue::List(vec![self.coerce(single, inner)?])),
            },
            TypeRef::External { .. } => Ok(value.clone()),
            TypeRef::Named(name) => self.coerce_named(value, name),
        }
    }

    fn coerce_named(&self, value: &ConstValue, name: &str) -> Result<ConstValue, String> {
        let mismatch = || Err(format!("Expected a value of type `{}`, found `{}`.", name, value));
        match (name, value) {
            ("Int", ConstValue::Int(int)) => {
                if i32::try_from(*int).is_ok() {
                    Ok(value.clone())
                } else {
                    Err(format!("Int cannot represent the value {}; it is not a 32-bit integer.", int))
                }
            }
            ("Float", ConstValue::Int(int)) => Ok(ConstValue::Float(*int as f64)),
            ("Float", ConstValue::Float(_))
            | ("String", ConstValue::String(_))
            | ("Boolean", ConstValue::Boolean(_))
            | ("ID", ConstValue::String(_) | ConstValue::Int(_)) => Ok(value.clone()),
            ("Int" | "Float" | "String" | "Boolean" | "ID", _) => mismatch(),
            _ => {
                if let Some(values) = self.enums.get(name) {
                    let ConstValue::Enum(member) = value else {
                        return mismatch();
                    };
                    return values
                        .iter()
                        .find(|(schema, host)| schema == member || host == member)
                        .map(|(schema, _)| ConstValue::Enum(schema.clone()))
                        .ok_or_else(|| {
                            format!("Enum `{}` has no value named `{}`.", name, member)
                        });
                }
                if let Some(shape) = self.inputs.get(name) {
                    return self.coerce_object(value, name, shape);
                }
                if self.outputs.contains(name) {
                    return Err(format!("`{}` is not an input type.", name));
                }
                // Custom and external scalars accept any literal.
                Ok(value.clone())
            }
        }
    }

    fn coerce_object(
        &self,
        value: &ConstValue,
        name: &str,
        shape: &InputShape,
    ) -> Result<ConstValue, String> {
        let ConstValue::Object(entries) = value else {
            return Err(format!(
                "Expected an object of input type `{}`, found `{}`.",
                name, value
            ));
        };
        let mut coerced = BTreeMap::new();
        for (key, entry) in entries {
            let Some((_, ty, _)) = shape.fields.iter().find(|(field, _, _)| field == key) else {
                return Err(format!("Input type `{}` has no field `{}`.", name, key));
            };
            let entry = self
                .coerce(entry, ty)
                .map_err(|err| format!("In field `{}`: {}", key, err))?;
            coerced.insert(key.clone(), entry);
        }
        if shape.one_of {
            let provided = coerced.values().filter(|v| **v != ConstValue::Null).count();
            if provided != 1 || coerced.len() != 1 {
                return Err(format!(
                    "Exactly one field of oneOf input `{}` must be provided with a non-null value.",
                    name
                ));
            }
        } else {
            for (field, ty, has_default) in &shape.fields {
                if ty.is_non_null() && !has_default && !coerced.contains_key(field) {
                    return Err(format!(
                        "Missing required field `{}: {}` of input type `{}`.",
                        field, ty, name
                    ));
                }
            }
        }
        Ok(ConstValue::Object(coerced))
    }
}

/// Validates applications and coerces default values across the schema.
pub struct DirectiveChecker<'a> {
    definitions: HashMap<String, &'a DirectiveDefinition>,
    shapes: InputShapes,
}

impl<'a> DirectiveChecker<'a> {
    pub fn new<'t>(
        definitions: &'a [DirectiveDefinition],
        builtins: &'a [DirectiveDefinition],
        types: impl IntoIterator<Item = &'t TypeDefinition>,
    ) -> Self {
        let mut by_name = HashMap::new();
        for definition in builtins.iter().chain(definitions) {
            by_name
                .entry(definition.name.clone())
                .or_insert(definition);
        }
        Self {
            definitions: by_name,
            shapes: InputShapes::new(types),
        }
    }

    /// Checks every site of a type, dropping unmatched bare uses.
    pub fn check_type(&self, definition: &mut TypeDefinition, sink: &mut DiagnosticSink) {
        match definition {
            TypeDefinition::Object(object) => {
                self.check_site(&mut object.directives, DirectiveLocation::Object, sink);
                for field in &mut object.fields {
                    let field = Arc::make_mut(field);
                    self.check_site(&mut field.directives, DirectiveLocation::FieldDefinition, sink);
                    self.check_values(&mut field.arguments, DirectiveLocation::ArgumentDefinition, sink);
                }
            }
            TypeDefinition::Interface(interface) => {
                self.check_site(&mut interface.directives, DirectiveLocation::Interface, sink);
                for field in &mut interface.fields {
                    let field = Arc::make_mut(field);
                    self.check_site(&mut field.directives, DirectiveLocation::FieldDefinition, sink);
                    self.check_values(&mut field.arguments, DirectiveLocation::ArgumentDefinition, sink);
                }
            }
            TypeDefinition::Union(union) => {
                self.check_site(&mut union.directives, DirectiveLocation::Union, sink);
            }
            TypeDefinition::Enum(definition) => {
                self.check_site(&mut definition.directives, DirectiveLocation::Enum, sink);
                for value in &mut definition.values {
                    self.check_site(&mut value.directives, DirectiveLocation::EnumValue, sink);
                }
            }
            TypeDefinition::Scalar(scalar) => {
                self.check_site(&mut scalar.directives, DirectiveLocation::Scalar, sink);
            }
            TypeDefinition::InputObject(input) => {
                let before = input.directives.len();
                input
                    .directives
                    .retain(|d| d.name != "oneOf" || !d.arguments.is_empty());
                if input.directives.len() != before {
                    debug!("`{}` marked oneOf by directive", input.name);
                    input.one_of = true;
                }
                self.check_site(&mut input.directives, DirectiveLocation::InputObject, sink);
                self.check_values(
                    &mut input.fields,
                    DirectiveLocation::InputFieldDefinition,
                    sink,
                );
            }
        }
    }

    /// Coerces the default values of directive definition arguments.
    pub fn check_definition_defaults(
        &self,
        definitions: &mut [DirectiveDefinition],
        sink: &mut DiagnosticSink,
    ) {
        for definition in definitions {
            self.check_values(
                &mut definition.arguments,
                DirectiveLocation::ArgumentDefinition,
                sink,
            );
        }
    }

    /// Arguments, input fields: their own directives and default values.
    fn check_values(
        &self,
        values: &mut [InputValue],
        location: DirectiveLocation,
        sink: &mut DiagnosticSink,
    ) {
        for value in values {
            self.check_site(&mut value.directives, location, sink);
            let Some(default) = &value.default_value else {
                continue;
            };
            match self.shapes.coerce(default, &value.ty) {
                Ok(coerced) => value.default_value = Some(coerced),
                Err(err) => {
                    sink.syntax(
                        value.span,
                        format!("Invalid default value for `{}`: {}", value.name, err),
                    );
                    value.default_value = None;
                }
            }
        }
    }

    fn check_site(
        &self,
        applications: &mut Vec<DirectiveApplication>,
        location: DirectiveLocation,
        sink: &mut DiagnosticSink,
    ) {
        applications.retain(|application| {
            let known = self.definitions.contains_key(&application.name);
            if !known && application.explicit {
                sink.syntax(
                    application.span,
                    format!("Unknown directive `@{}`.", application.name),
                );
            }
            known
        });

        let mut seen: HashMap<String, Span> = HashMap::new();
        for application in applications.iter_mut() {
            let Some(definition) = self.definitions.get(&application.name) else {
                continue;
            };

            if !definition.locations.contains(&location) {
                sink.push(
                    Diagnostic::syntax(
                        application.span,
                        format!(
                            "Directive `@{}` cannot be applied at {}. Valid locations: {}.",
                            application.name,
                            location.as_str(),
                            definition
                                .locations
                                .iter()
                                .map(|l| l.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    )
                    .with_related(definition.span, "directive defined here"),
                );
            }

            match seen.get(&application.name) {
                Some(first) if !definition.repeatable => sink.push(
                    Diagnostic::semantic(
                        application.span,
                        format!(
                            "Directive `@{}` is not repeatable but is applied more than once.",
                            application.name
                        ),
                    )
                    .with_related(*first, "first applied here"),
                ),
                Some(_) => {}
                None => {
                    seen.insert(application.name.clone(), application.span);
                }
            }

            self.check_arguments(application, definition, sink);
        }
    }

    fn check_arguments(
        &self,
        application: &mut DirectiveApplication,
        definition: &DirectiveDefinition,
        sink: &mut DiagnosticSink,
    ) {
        let mut coerced = BTreeMap::new();
        for (name, value) in &application.arguments {
            let span = application
                .argument_spans
                .get(name)
                .copied()
                .unwrap_or(application.span);
            let Some(argument) = definition.arguments.iter().find(|a| a.name == *name) else {
                sink.syntax(
                    span,
                    format!(
                        "Unknown argument `{}` for directive `@{}`.",
                        name, application.name
                    ),
                );
                continue;
            };
            match self.shapes.coerce(value, &argument.ty) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                }
                Err(err) => sink.syntax(
                    span,
                    format!(
                        "Invalid value for argument `{}` of directive `@{}`: {}",
                        name, application.name, err
                    ),
                ),
            }
        }

        for argument in &definition.arguments {
            if argument.ty.is_non_null()
                && argument.default_value.is_none()
                && !application.arguments.contains_key(&argument.name)
            {
                sink.syntax(
                    application.span,
                    format!(
                        "Missing required argument `{}: {}` for directive `@{}`.",
                        argument.name, argument.ty, application.name
                    ),
                );
            }
        }
        application.arguments = coerced;
    }
}
