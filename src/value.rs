//! The dynamically-typed runtime value: one of nil, boolean, number,
//! string, native function, user function, class, or instance.
//!
//! Callables and instances are reference values: cloning a `Value` clones
//! an `Rc`, and equality on them is identity, not structure.

use crate::class::{LoxClass, LoxInstance};
use crate::function::LoxFunction;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Signature of a built-in function: evaluated arguments in, value or
/// message out.  The interpreter attributes the message to the call site.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

#[derive(Clone)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Native {
        name: &'static str,
        arity: usize,
        func: NativeFn<'a>,
    },
    Function(Rc<LoxFunction<'a>>),
    Class(Rc<LoxClass<'a>>),
    Instance(Rc<RefCell<LoxInstance<'a>>>),
}

impl<'a> Value<'a> {
    /// `nil` and `false` are falsy; every other value (including `0` and
    /// the empty string) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl PartialEq for Value<'_> {
    /// Equality never errors: nil equals only nil, primitives compare by
    /// value, reference values compare by identity, and mixed kinds are
    /// simply unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Native { name: a, .. }, Value::Native { name: b, .. }) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                // whole values lose the trailing ".0": 3.0 → "3"
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Str(s) => write!(f, "{}", s),

            Value::Native { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(fun) => write!(f, "<fun {}>", fun.name()),

            Value::Class(class) => write!(f, "<class {}>", class.name()),

            Value::Instance(instance) => {
                write!(f, "<instance of {}>", instance.borrow().class().name())
            }
        }
    }
}
