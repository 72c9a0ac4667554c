//! Classes and instances.
//!
//! A class is a name plus a method table and is itself callable: invoking
//! it allocates an instance and, if an `init` method exists, runs it bound
//! to that instance.  An instance owns its field map; reads check fields
//! before methods, writes always hit the field map.

use crate::function::LoxFunction;
use crate::value::Value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub struct LoxClass<'a> {
    name: String,
    methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(name: &str, methods: HashMap<&'a str, Rc<LoxFunction<'a>>>) -> Self {
        Self {
            name: name.to_string(),
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        self.methods.get(name).cloned()
    }

    /// As a callable, a class has the arity of its initializer, or zero
    /// when no `init` method exists.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

pub struct LoxInstance<'a> {
    class: Rc<LoxClass<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> Rc<LoxClass<'a>> {
        Rc::clone(&self.class)
    }

    /// A field value by name, if the instance has one.  Fields shadow
    /// methods of the same name.
    pub fn get_field(&self, name: &str) -> Option<Value<'a>> {
        self.fields.get(name).cloned()
    }

    /// Create or overwrite a field on this instance.  Never touches the
    /// class's method table.
    pub fn set_field(&mut self, name: &str, value: Value<'a>) {
        self.fields.insert(name.to_string(), value);
    }
}
