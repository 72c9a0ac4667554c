//! User-defined function objects: a declaration node paired with the
//! environment captured at its definition, plus the initializer flag that
//! drives constructor semantics.

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Control, Interpreter};
use crate::parser::FunctionDecl;
use crate::value::Value;

use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

/// A closure: the function's AST node plus the defining environment.  Every
/// invocation creates a fresh environment parented at that closure, so
/// separate calls do not share parameter bindings while all calls share
/// the captured outer scope.
pub struct LoxFunction<'a> {
    declaration: &'a FunctionDecl<'a>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: &'a FunctionDecl<'a>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    /// Fixed number of arguments this function requires.
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure is extended by one scope
    /// binding `this` to `instance`.  Called on every property access that
    /// finds a method, so each access yields a fresh bound closure.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance<'a>>>) -> LoxFunction<'a> {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction {
            declaration: self.declaration,
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function: bind parameters positionally in a fresh
    /// environment parented at the closure, execute the body, and collapse
    /// the `Return` outcome here — this call frame is exactly where the
    /// control transfer stops.
    ///
    /// An initializer always yields the instance bound as `this` in its
    /// closure, overriding both normal completion and a bare `return;`.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!(
            "Calling function '{}' with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));

        {
            let mut env = environment.borrow_mut();

            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                env.define(param.lexeme, argument);
            }
        }

        let outcome: Control<'a> = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        match outcome {
            Control::Return(value) => Ok(value),
            Control::Normal => Ok(Value::Nil),
        }
    }
}
