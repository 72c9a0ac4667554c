//! Tree-walking evaluator and the interpreter state it runs against: the
//! persistent `globals` environment, the active-environment pointer, and
//! the resolver's binding-distance side table.
//!
//! Statement execution returns an explicit [`Control`] outcome rather than
//! smuggling `return` through the error channel: every statement boundary
//! checks for a propagating return, and the enclosing function-call frame
//! collapses it into the call's result.  Runtime *errors* are a separate
//! mechanism entirely and abort the whole `interpret` invocation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::function::LoxFunction;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: either execution continues with the
/// next statement, or a `return` is propagating outward with its value.
pub enum Control<'a> {
    Normal,
    Return(Value<'a>),
}

/// Built-in `clock`: seconds since the Unix epoch as a fractional number.
fn clock_native<'v>(_args: &[Value<'v>]) -> std::result::Result<Value<'v>, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
        .map_err(|e| format!("Clock error: {}", e))
}

pub struct Interpreter<'a> {
    /// Created once per interpreter and never replaced.
    pub globals: Rc<RefCell<Environment<'a>>>,

    /// The currently-active scope; swapped and restored around block and
    /// function entry.
    environment: Rc<RefCell<Environment<'a>>>,

    /// Resolver-recorded binding distances, keyed by variable-reference
    /// node identity.
    locals: HashMap<ExprId, usize>,

    /// Where `print` writes.  Injected so tests can capture output.
    out: Box<dyn Write + 'a>,
}

impl<'a> Interpreter<'a> {
    /// Interpreter printing to stdout, with the native functions
    /// registered in `globals`.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to an arbitrary sink.
    pub fn with_output(out: Box<dyn Write + 'a>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::Native {
                name: "clock",
                arity: 0,
                func: clock_native,
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record a binding distance for one variable occurrence.  Called by
    /// the resolver.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Execute each top-level statement in order.  The first runtime error
    /// aborts the whole invocation.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            // a top-level `return` is rejected by the resolver, so the
            // outcome here is always Normal
            self.execute(stmt)?;
        }

        info!("Interpretation completed");

        Ok(())
    }

    // ────────────────────────── statements ──────────────────────────

    fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Control<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Control::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Control::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Control::Normal)
            }

            Stmt::Block(statements) => {
                let scope = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, scope)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(eb) = else_branch {
                    self.execute(eb)
                } else {
                    Ok(Control::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ret @ Control::Return(_) = self.execute(body)? {
                        return Ok(ret);
                    }
                }

                Ok(Control::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // the current environment is the function's closure
                let function = Value::Function(Rc::new(LoxFunction::new(
                    decl,
                    Rc::clone(&self.environment),
                    false,
                )));

                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme, function);

                Ok(Control::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Control::Return(value))
            }

            Stmt::Class {
                name,
                superclass: _,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                // two-step define/assign lets methods refer to the class
                // by name once it exists
                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                let mut method_table: HashMap<&'a str, Rc<LoxFunction<'a>>> = HashMap::new();

                for method in methods {
                    let is_initializer = method.name.lexeme == "init";
                    let function =
                        LoxFunction::new(method, Rc::clone(&self.environment), is_initializer);

                    method_table.insert(method.name.lexeme, Rc::new(function));
                }

                let class = Value::Class(Rc::new(LoxClass::new(name.lexeme, method_table)));

                self.environment
                    .borrow_mut()
                    .assign(name.lexeme, class, name.line)?;

                Ok(Control::Normal)
            }
        }
    }

    /// Execute `statements` with `environment` as the active scope,
    /// restoring the previous scope on every exit path — normal
    /// completion, propagating return, or error.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Control<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut outcome = Ok(Control::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Control::Normal) => continue,
                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;

        outcome
    }

    // ────────────────────────── expressions ─────────────────────────

    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        let value = match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            },

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Value::Number(-n),
                        _ => {
                            return Err(LoxError::runtime(
                                operator.line,
                                "Operand must be a number.",
                            ));
                        }
                    },

                    TokenType::BANG => Value::Bool(!right.is_truthy()),

                    _ => {
                        return Err(LoxError::runtime(operator.line, "Invalid unary operator."));
                    }
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                self.binary_op(operator, left, right)?
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                // the result is whichever operand decided it, uncoerced
                let left = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if left.is_truthy() => left,
                    TokenType::AND if !left.is_truthy() => left,
                    _ => self.evaluate(right)?,
                }
            }

            Expr::Variable { name, id } => self.look_up_variable(name, *id)?,

            Expr::Assign { name, id, value } => {
                let value = self.evaluate(value)?;

                if let Some(&distance) = self.locals.get(id) {
                    Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?;
                } else {
                    self.environment
                        .borrow_mut()
                        .assign(name.lexeme, value.clone(), name.line)?;
                }

                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee, args, paren)?
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        // fields shadow methods; methods bind fresh on
                        // every access
                        if let Some(value) = instance.borrow().get_field(name.lexeme) {
                            value
                        } else if let Some(method) =
                            instance.borrow().class().find_method(name.lexeme)
                        {
                            Value::Function(Rc::new(method.bind(Rc::clone(&instance))))
                        } else {
                            return Err(LoxError::runtime(
                                name.line,
                                format!("Undefined property '{}'.", name.lexeme),
                            ));
                        }
                    }

                    _ => {
                        return Err(LoxError::runtime(
                            name.line,
                            "Only instances have properties.",
                        ));
                    }
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        instance.borrow_mut().set_field(name.lexeme, value.clone());

                        value
                    }

                    _ => {
                        return Err(LoxError::runtime(name.line, "Only instances have fields."));
                    }
                }
            }

            Expr::This { keyword, id } => self.look_up_variable(keyword, *id)?,
        };

        Ok(value)
    }

    /// Read a variable: exact-hop lookup when the resolver recorded a
    /// distance, otherwise a full chain walk ending at globals (covers
    /// natives and bindings introduced by earlier REPL lines).
    fn look_up_variable(&self, name: &'a Token<'a>, id: ExprId) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, name.lexeme, name.line)
            }

            None => self.environment.borrow().get(name.lexeme, name.line),
        }
    }

    fn binary_op(
        &mut self,
        operator: &'a Token<'a>,
        left: Value<'a>,
        right: Value<'a>,
    ) -> Result<Value<'a>> {
        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers or strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = Self::number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(LoxError::runtime(
                operator.line,
                "Invalid binary operator.",
            )),
        }
    }

    fn number_operands(
        operator: &Token<'_>,
        left: Value<'_>,
        right: Value<'_>,
    ) -> Result<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            _ => Err(LoxError::runtime(
                operator.line,
                "Operands must be numbers.",
            )),
        }
    }

    /// The function-call protocol: arity check, then dispatch on the kind
    /// of callable.  Anything else is a runtime error at the call site.
    fn call_value(
        &mut self,
        callee: Value<'a>,
        arguments: Vec<Value<'a>>,
        paren: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::Native { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                Self::check_arity(arity, arguments.len(), paren)?;

                func(&arguments).map_err(|message| LoxError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                Self::check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name());

                Self::check_arity(class.arity(), arguments.len(), paren)?;

                let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(&class))));

                // the initializer's own return value is discarded: the
                // expression's result is always the new instance
                if let Some(init) = class.find_method("init") {
                    init.bind(Rc::clone(&instance)).call(self, arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    fn check_arity(expected: usize, got: usize, paren: &Token<'_>) -> Result<()> {
        if expected != got {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}
