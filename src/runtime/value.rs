use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::runtime::class::{Class, Instance};

/// Flat name-to-handle mapping used as a call frame or as an instance's
/// field store. Resolution never walks up to an enclosing scope.
pub type Closure = HashMap<String, Value>;

/// Closed set of runtime object variants.
#[derive(Debug)]
pub enum Object {
    Number(i64),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(Instance),
}

/// Shared-ownership handle to a runtime object.
///
/// The default handle is the `None` sentinel. Cloning a handle shares the
/// underlying allocation; `self` inside a method body is exactly such a
/// clone of the receiver's handle.
#[derive(Clone, Default)]
pub struct Value {
    object: Option<Rc<RefCell<Object>>>,
}

impl Value {
    pub fn none_object() -> Self {
        Self::default()
    }

    /// Handle owning a freshly allocated object.
    pub fn own(object: Object) -> Self {
        Self {
            object: Some(Rc::new(RefCell::new(object))),
        }
    }

    pub fn number_object(value: i64) -> Self {
        Self::own(Object::Number(value))
    }

    pub fn string_object(value: String) -> Self {
        Self::own(Object::String(value))
    }

    pub fn bool_object(value: bool) -> Self {
        Self::own(Object::Bool(value))
    }

    pub fn class_object(class: Rc<Class>) -> Self {
        Self::own(Object::Class(class))
    }

    pub fn instance_object(instance: Instance) -> Self {
        Self::own(Object::Instance(instance))
    }

    pub fn is_none(&self) -> bool {
        self.object.is_none()
    }

    pub fn is_truthy(&self) -> bool {
        match &self.object {
            None => false,
            Some(object) => match &*object.borrow() {
                Object::Number(value) => *value != 0,
                Object::String(value) => !value.is_empty(),
                Object::Bool(value) => *value,
                Object::Class(_) | Object::Instance(_) => true,
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &self.object {
            None => "None",
            Some(object) => match &*object.borrow() {
                Object::Number(_) => "number",
                Object::String(_) => "string",
                Object::Bool(_) => "bool",
                Object::Class(_) => "class",
                Object::Instance(_) => "object",
            },
        }
    }

    pub fn try_number(&self) -> Option<i64> {
        match &*self.object.as_ref()?.borrow() {
            Object::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn try_string(&self) -> Option<String> {
        match &*self.object.as_ref()?.borrow() {
            Object::String(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn try_bool(&self) -> Option<bool> {
        match &*self.object.as_ref()?.borrow() {
            Object::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        match &self.object {
            Some(object) => matches!(&*object.borrow(), Object::Instance(_)),
            None => false,
        }
    }

    pub fn instance_class(&self) -> Option<Rc<Class>> {
        match &*self.object.as_ref()?.borrow() {
            Object::Instance(instance) => Some(Rc::clone(instance.class())),
            _ => None,
        }
    }

    pub fn instance_field(&self, name: &str) -> Option<Value> {
        match &*self.object.as_ref()?.borrow() {
            Object::Instance(instance) => instance.fields().get(name).cloned(),
            _ => None,
        }
    }

    /// Store a field on the underlying instance; `false` when the handle
    /// does not carry one.
    pub fn set_instance_field(&self, name: &str, value: Value) -> bool {
        let Some(object) = self.object.as_ref() else {
            return false;
        };
        match &mut *object.borrow_mut() {
            Object::Instance(instance) => {
                instance.fields_mut().insert(name.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// True when the handle carries an instance whose class chain defines
    /// `method` with exactly `argument_count` formal parameters.
    pub fn has_method(&self, method: &str, argument_count: usize) -> bool {
        self.instance_class()
            .and_then(|class| {
                class
                    .method(method)
                    .map(|m| m.formal_params.len() == argument_count)
            })
            .unwrap_or(false)
    }

    /// Context-free rendering. Instances print an identity token here; the
    /// evaluator intercepts `__str__` before falling back to this.
    pub fn to_output(&self) -> String {
        match &self.object {
            None => "None".to_string(),
            Some(object) => match &*object.borrow() {
                Object::Number(value) => value.to_string(),
                Object::String(value) => value.clone(),
                Object::Bool(true) => "True".to_string(),
                Object::Bool(false) => "False".to_string(),
                Object::Class(class) => format!("Class {}", class.name()),
                Object::Instance(instance) => format!(
                    "<{} object at {:p}>",
                    instance.class().name(),
                    Rc::as_ptr(object)
                ),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.type_name())
    }
}
