//! Recording host.
//!
//! Stands in for a real UI toolkit: constructors and modifiers only record
//! what was asked of them, so the result of a chain can be inspected and
//! printed.

use core::fmt;

use tracing::debug;

use crate::registry::Registry;
use crate::value::{ArgumentsExt, Artifact, ResolvedArgument, Value};
use crate::{EvalError, EvalResult};

pub const DEFAULT_VIEWS: &[&str] = &[
    "Text", "Image", "Label", "Button", "VStack", "HStack", "ZStack", "List", "Spacer", "Divider",
];

pub const DEFAULT_MODIFIERS: &[&str] = &[
    "font",
    "bold",
    "italic",
    "padding",
    "frame",
    "foregroundColor",
    "background",
    "cornerRadius",
    "opacity",
    "resizable",
    "scaledToFit",
    "imageScale",
];

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedModifier {
    pub name: String,
    pub arguments: Vec<ResolvedArgument>,
}

/// Plain-data artifact produced by the recording handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribedView {
    pub kind: String,
    pub arguments: Vec<ResolvedArgument>,
    /// In application order.
    pub modifiers: Vec<AppliedModifier>,
}

impl DescribedView {
    pub fn new<S: Into<String>>(kind: S, arguments: Vec<ResolvedArgument>) -> Self {
        Self {
            kind: kind.into(),
            arguments,
            modifiers: Vec::new(),
        }
    }

    /// First positional string argument, e.g. the text of `Text("hi")`.
    pub fn content(&self) -> Option<&str> {
        self.arguments.positional(0).and_then(Value::as_str)
    }

    /// Last application of the named modifier.
    pub fn modifier(&self, name: &str) -> Option<&AppliedModifier> {
        self.modifiers.iter().rev().find(|m| m.name == name)
    }

    /// Enum-like argument of a modifier: `.font(.title)` gives `title`.
    pub fn symbol(&self, modifier: &str) -> Option<&str> {
        self.modifier(modifier)?
            .arguments
            .positional(0)
            .and_then(Value::as_symbol)
    }

    /// Views passed as arguments, e.g. the children of a stack.
    pub fn children(&self) -> impl Iterator<Item = &DescribedView> {
        self.arguments
            .iter()
            .filter_map(|argument| argument.value.as_artifact())
            .filter_map(|artifact| artifact.downcast_ref::<DescribedView>())
    }
}

struct Arguments<'a>(&'a [ResolvedArgument]);

impl fmt::Display for Arguments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, argument) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let Some(label) = &argument.label {
                write!(f, "{}: ", label)?;
            }
            match argument
                .value
                .as_artifact()
                .and_then(|artifact| artifact.downcast_ref::<DescribedView>())
            {
                Some(view) => write!(f, "{}", view)?,
                None => write!(f, "{}", argument.value)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for DescribedView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.kind, Arguments(&self.arguments))?;
        for modifier in &self.modifiers {
            write!(f, ".{}({})", modifier.name, Arguments(&modifier.arguments))?;
        }
        Ok(())
    }
}

/// Register a recording constructor for each of `views` and a recording
/// decorator for each of `modifiers`.
pub fn install(registry: &mut Registry, views: &[&str], modifiers: &[&str]) -> EvalResult<()> {
    for &kind in views {
        let kind = kind.to_string();
        registry.register_constructor(kind.clone(), move |arguments: &[ResolvedArgument]| {
            Ok(Artifact::new(DescribedView::new(kind.clone(), arguments.to_vec())))
        })?;
    }
    for &name in modifiers {
        let name = name.to_string();
        registry.register_decorator(
            name.clone(),
            move |arguments: &[ResolvedArgument], artifact: Artifact| {
                let mut view = artifact
                    .downcast_ref::<DescribedView>()
                    .cloned()
                    .ok_or_else(|| {
                        EvalError::invalid_arguments(format!(
                            "{}() can only decorate a described view",
                            name
                        ))
                    })?;
                view.modifiers.push(AppliedModifier {
                    name: name.clone(),
                    arguments: arguments.to_vec(),
                });
                Ok(Artifact::new(view))
            },
        )?;
    }
    debug!(
        "installed {} view(s) and {} modifier(s)",
        views.len(),
        modifiers.len()
    );
    Ok(())
}

pub fn install_defaults(registry: &mut Registry) -> EvalResult<()> {
    install(registry, DEFAULT_VIEWS, DEFAULT_MODIFIERS)
}
