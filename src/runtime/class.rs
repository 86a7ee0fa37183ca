use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Statement;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Closure;

/// A user-defined method: caller-visible formal parameters plus the body
/// block. `self` is not part of `formal_params`; the runtime binds it into
/// the call scope separately, so the declared arity equals the number of
/// arguments a call site passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Vec<Statement>,
}

/// Class descriptor: a method table plus an optional parent class.
#[derive(Debug, PartialEq)]
pub struct Class {
    name: String,
    methods: HashMap<String, Method>,
    parent: Option<Rc<Class>>,
}

impl Class {
    /// Build the method table, rejecting duplicate method names.
    pub fn new(
        name: String,
        methods: Vec<Method>,
        parent: Option<Rc<Class>>,
    ) -> Result<Self, RuntimeError> {
        let mut table = HashMap::with_capacity(methods.len());
        for method in methods {
            if table.contains_key(&method.name) {
                return Err(RuntimeError::DuplicateMethod {
                    class: name,
                    method: method.name,
                });
            }
            table.insert(method.name.clone(), method);
        }
        Ok(Self {
            name,
            methods: table,
            parent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nearest definition of `name`, scanning this class then the parent
    /// chain.
    pub fn method(&self, name: &str) -> Option<&Method> {
        match self.methods.get(name) {
            Some(method) => Some(method),
            None => self.parent.as_ref().and_then(|parent| parent.method(name)),
        }
    }
}

/// Class instance: a shared class descriptor plus its own field scope.
#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    fields: Closure,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }
}
