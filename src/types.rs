//! Built-in runtime types.
//!
//! A [`RuntimeType`] is a namespace of constant members plus an optional
//! initializer used when the type name is called (`Int(3.0)`). The catalog
//! data lives in `const` tables; type objects are built per interpreter
//! when its global scope is created, so no state is shared between
//! interpreters.

use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::Interpreter;
use crate::value::{ArgumentsExt, ResolvedArgument, Value};
use crate::{EvalError, EvalResult};

pub const COLOR_CATALOG: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("gray", "#8E8E93"),
    ("red", "#FF3B30"),
    ("orange", "#FF9500"),
    ("yellow", "#FFCC00"),
    ("green", "#34C759"),
    ("mint", "#00C7BE"),
    ("teal", "#30B0C7"),
    ("cyan", "#32ADE6"),
    ("blue", "#007AFF"),
    ("indigo", "#5856D6"),
    ("purple", "#AF52DE"),
    ("pink", "#FF2D55"),
    ("brown", "#A2845E"),
    ("clear", "#00000000"),
];

pub const FONT_CATALOG: &[&str] = &[
    "largeTitle",
    "title",
    "title2",
    "title3",
    "headline",
    "subheadline",
    "body",
    "callout",
    "footnote",
    "caption",
    "caption2",
];

pub const IMAGE_SCALE_CATALOG: &[&str] = &["small", "medium", "large"];

/// Definition of a built-in type.
pub trait BuiltinType {
    /// Lookup key in the enclosing namespace.
    fn name(&self) -> &'static str;

    /// Register constant members.
    fn populate(&self, _ty: &mut RuntimeType) {}

    /// Called when the type name is used as a constructor.
    fn make_value(
        &self,
        arguments: &[ResolvedArgument],
        interpreter: &mut Interpreter,
    ) -> EvalResult<Value>;
}

pub struct RuntimeType {
    name: String,
    members: HashMap<String, Value>,
    definition: Option<Rc<dyn BuiltinType>>,
}

impl RuntimeType {
    /// A plain namespace without an initializer
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
            definition: None,
        }
    }

    pub fn from_definition(definition: Rc<dyn BuiltinType>) -> Self {
        let mut ty = Self::new(definition.name());
        definition.populate(&mut ty);
        ty.definition = Some(definition);
        ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add or overwrite a member
    pub fn define_member<S: Into<String>>(&mut self, name: S, value: Value) {
        self.members.insert(name.into(), value);
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn member_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.members.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn make_value(
        &self,
        arguments: &[ResolvedArgument],
        interpreter: &mut Interpreter,
    ) -> EvalResult<Value> {
        match &self.definition {
            Some(definition) => definition.make_value(arguments, interpreter),
            None => Err(EvalError::unsupported(format!(
                "{} cannot be constructed",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RuntimeType")
            .field("name", &self.name)
            .field("members", &self.member_names())
            .finish()
    }
}

/// Every built-in type, in registration order.
pub fn builtin_types() -> Vec<Rc<dyn BuiltinType>> {
    vec![
        Rc::new(IntType),
        Rc::new(DoubleType { name: "Double" }),
        Rc::new(DoubleType { name: "Float" }),
        Rc::new(ColorType),
        Rc::new(FontType),
        Rc::new(ImageType),
    ]
}

fn single_argument<'a>(name: &str, arguments: &'a [ResolvedArgument]) -> EvalResult<&'a Value> {
    match arguments {
        [argument] => Ok(&argument.value),
        _ => Err(EvalError::unsupported(format!(
            "{} expects exactly one argument, got {}",
            name,
            arguments.len()
        ))),
    }
}

pub struct IntType;

impl BuiltinType for IntType {
    fn name(&self) -> &'static str {
        "Int"
    }

    fn make_value(&self, arguments: &[ResolvedArgument], _: &mut Interpreter) -> EvalResult<Value> {
        match single_argument(self.name(), arguments)? {
            Value::Int(i) => Ok(Value::Int(*i)),
            // truncates toward zero; values outside i64 are rejected
            Value::Double(d) if d.is_finite() && *d >= i64::MIN as f64 && *d < i64::MAX as f64 => {
                Ok(Value::Int(d.trunc() as i64))
            }
            other => Err(EvalError::conversion(other.type_name(), self.name())),
        }
    }
}

pub struct DoubleType {
    name: &'static str,
}

impl BuiltinType for DoubleType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn make_value(&self, arguments: &[ResolvedArgument], _: &mut Interpreter) -> EvalResult<Value> {
        let argument = single_argument(self.name, arguments)?;
        argument
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| EvalError::conversion(argument.type_name(), self.name))
    }
}

fn constant_namespace(name: &str) -> EvalResult<Value> {
    Err(EvalError::unsupported(format!(
        "{} is a constant namespace and cannot be constructed",
        name
    )))
}

pub struct ColorType;

impl BuiltinType for ColorType {
    fn name(&self) -> &'static str {
        "Color"
    }

    fn populate(&self, ty: &mut RuntimeType) {
        for (name, hex) in COLOR_CATALOG {
            ty.define_member(*name, Value::from(*hex));
        }
    }

    fn make_value(&self, _: &[ResolvedArgument], _: &mut Interpreter) -> EvalResult<Value> {
        constant_namespace(self.name())
    }
}

pub struct FontType;

impl BuiltinType for FontType {
    fn name(&self) -> &'static str {
        "Font"
    }

    fn populate(&self, ty: &mut RuntimeType) {
        for name in FONT_CATALOG {
            ty.define_member(*name, Value::from(*name));
        }
    }

    fn make_value(&self, _: &[ResolvedArgument], _: &mut Interpreter) -> EvalResult<Value> {
        constant_namespace(self.name())
    }
}

pub struct ImageScaleType;

impl BuiltinType for ImageScaleType {
    fn name(&self) -> &'static str {
        "Scale"
    }

    fn populate(&self, ty: &mut RuntimeType) {
        for name in IMAGE_SCALE_CATALOG {
            ty.define_member(*name, Value::from(*name));
        }
    }

    fn make_value(&self, _: &[ResolvedArgument], _: &mut Interpreter) -> EvalResult<Value> {
        constant_namespace("Image.Scale")
    }
}

/// Host-constructible image. Construction delegates to the host's `Image`
/// constructor and wraps the artifact in a new instance.
pub struct ImageType;

impl BuiltinType for ImageType {
    fn name(&self) -> &'static str {
        "Image"
    }

    fn populate(&self, ty: &mut RuntimeType) {
        let scale = RuntimeType::from_definition(Rc::new(ImageScaleType));
        ty.define_member("Scale", Value::Type(Rc::new(scale)));
    }

    fn make_value(
        &self,
        arguments: &[ResolvedArgument],
        interpreter: &mut Interpreter,
    ) -> EvalResult<Value> {
        let build = interpreter.registry().constructor(self.name())?;
        let artifact = build(arguments)?;
        let name = arguments
            .labeled("systemName")
            .or_else(|| arguments.positional(0))
            .cloned();

        let mut members = vec![("artifact", Value::Artifact(artifact))];
        members.extend(name.map(|name| ("name", name)));
        Ok(Value::Instance(interpreter.new_instance(members)?))
    }
}
