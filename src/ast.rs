use core::fmt;

// Syntax tree for a single view or value expression.
//
// Only call, member-access, identifier, literal and array nodes exist: the
// engine never needs statements or operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    /// `base.name`, or `.name` when `base` is `None` (implicit member).
    Member {
        base: Option<Box<Expression>>,
        name: String,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Argument>,
    },
    Array(Vec<Expression>),
}

impl Expression {
    pub fn identifier<S: Into<String>>(name: S) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn member<S: Into<String>>(base: Expression, name: S) -> Self {
        Expression::Member {
            base: Some(Box::new(base)),
            name: name.into(),
        }
    }

    pub fn implicit_member<S: Into<String>>(name: S) -> Self {
        Expression::Member {
            base: None,
            name: name.into(),
        }
    }

    pub fn call(callee: Expression, arguments: Vec<Argument>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    /// Dotted identifier path (`Color.mint`, `Image.Scale.large`), if the
    /// expression is one.
    pub fn as_path(&self) -> Option<Vec<&str>> {
        match self {
            Expression::Identifier(name) => Some(vec![name.as_str()]),
            Expression::Member {
                base: Some(base),
                name,
            } => {
                let mut path = base.as_path()?;
                path.push(name.as_str());
                Some(path)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Member { base: Some(base), name } => write!(f, "{}.{}", base, name),
            Expression::Member { base: None, name } => write!(f, ".{}", name),
            Expression::Call { callee, arguments } => {
                write!(f, "{}(", callee)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
            Expression::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub label: Option<String>,
    pub value: Expression,
}

impl Argument {
    pub fn positional(value: Expression) -> Self {
        Self { label: None, value }
    }

    pub fn labeled<S: Into<String>>(label: S, value: Expression) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}: {}", label, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "{:?}", s),
        }
    }
}
