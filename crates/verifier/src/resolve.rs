//! Type and method resolution used by existence and assignability checks.
use std::collections::VecDeque;

use csi_ir::{MethodDescriptor, MethodFlags, Type, OBJECT_CLASS};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

/// Interfaces every array type implements.
const ARRAY_INTERFACES: [&str; 2] = ["java.lang.Cloneable", "java.io.Serializable"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub is_interface: bool,
    pub declared_methods: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    pub is_static: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("type `{0}` cannot be resolved")]
    UnresolvedType(Type),

    #[error("method `{0}` cannot be resolved")]
    UnresolvedMethod(SmolStr),

    #[error("{} resolution errors", .0.len())]
    Multiple(Vec<ResolutionError>),
}

impl ResolutionError {
    /// Collapses `errors` into a single error, `None` if there are none.
    pub fn from_many(mut errors: Vec<ResolutionError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// The leaf errors, in order.
    pub fn causes(&self) -> Vec<&ResolutionError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Self::causes).collect(),
            _ => vec![self],
        }
    }
}

pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, ty: &Type) -> Result<TypeInfo, ResolutionError>;

    fn resolve_method(&self, method: &MethodDescriptor) -> Result<MethodInfo, ResolutionError>;

    /// Whether a value of type `from` can be stored in a location of type `to`.
    fn is_assignable(&self, to: &Type, from: &Type) -> Result<bool, ResolutionError>;
}

/// A class or interface registered in a [`ClassPath`].
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: SmolStr,
    is_interface: bool,
    superclass: Option<SmolStr>,
    interfaces: Vec<SmolStr>,
    methods: Vec<MethodDescriptor>,
}

impl ClassDef {
    pub fn class(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            is_interface: false,
            superclass: Some(OBJECT_CLASS.into()),
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            is_interface: true,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<SmolStr>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<SmolStr>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Declares a public method owned by this class.
    pub fn method(self, name: &str, params: &[Type], ret_ty: Type, is_static: bool) -> Self {
        let flags = MethodFlags {
            is_static,
            is_public: true,
        };
        let method =
            MethodDescriptor::new(Type::object(self.name.clone()), name, params, ret_ty);
        self.with_method(method.with_flags(flags))
    }

    pub fn constructor(self, params: &[Type]) -> Self {
        let flags = MethodFlags {
            is_static: false,
            is_public: true,
        };
        let ctor = MethodDescriptor::constructor(Type::object(self.name.clone()), params);
        self.with_method(ctor.with_flags(flags))
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    fn supertypes(&self) -> impl Iterator<Item = &SmolStr> {
        self.superclass.iter().chain(&self.interfaces)
    }

    fn find_method(&self, method: &MethodDescriptor) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|candidate| {
            candidate.name() == method.name()
                && candidate.params() == method.params()
                && candidate.ret_ty() == method.ret_ty()
        })
    }
}

/// In-memory [`TypeResolver`] over explicitly registered classes.
///
/// `java.lang.Object` is always present. Arrays of reference types are covariant and every
/// array is a `java.lang.Object`, `java.lang.Cloneable` and `java.io.Serializable`.
#[derive(Debug, Clone)]
pub struct ClassPath {
    classes: FxHashMap<SmolStr, ClassDef>,
}

impl Default for ClassPath {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassPath {
    pub fn new() -> Self {
        let mut classes = FxHashMap::default();
        let mut object = ClassDef::class(OBJECT_CLASS);
        object.superclass = None;
        classes.insert(object.name.clone(), object);
        Self { classes }
    }

    pub fn with(mut self, class: ClassDef) -> Self {
        self.add(class);
        self
    }

    pub fn add(&mut self, class: ClassDef) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    fn lookup(&self, name: &SmolStr) -> Result<&ClassDef, ResolutionError> {
        self.classes
            .get(name)
            .ok_or_else(|| ResolutionError::UnresolvedType(Type::Object(name.clone())))
    }

    /// Checks that `ty` names only known classes.
    fn check_type(&self, ty: &Type) -> Result<(), ResolutionError> {
        match ty.base().0 {
            Type::Object(name) => self.lookup(name).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Whether class `from` is `to` or one of its transitive supertypes is.
    fn is_subclass(&self, from: &SmolStr, to: &SmolStr) -> Result<bool, ResolutionError> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([from]);
        while let Some(name) = queue.pop_front() {
            if name == to {
                return Ok(true);
            }
            if !visited.insert(name) {
                continue;
            }
            queue.extend(self.lookup(name)?.supertypes());
        }
        Ok(false)
    }

    fn find_method(&self, method: &MethodDescriptor) -> Option<&MethodDescriptor> {
        let Type::Object(owner) = method.owner() else {
            return None;
        };
        if method.is_constructor() {
            return self.classes.get(owner)?.find_method(method);
        }

        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([owner]);
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name) {
                continue;
            }
            let Some(class) = self.classes.get(name) else {
                continue;
            };
            if let Some(found) = class.find_method(method) {
                return Some(found);
            }
            queue.extend(class.supertypes());
        }
        None
    }
}

impl TypeResolver for ClassPath {
    fn resolve_type(&self, ty: &Type) -> Result<TypeInfo, ResolutionError> {
        match ty {
            Type::Object(name) => {
                let class = self.lookup(name)?;
                Ok(TypeInfo {
                    is_interface: class.is_interface,
                    declared_methods: class.methods.len(),
                })
            }
            Type::Array(_) => {
                self.check_type(ty)?;
                Ok(TypeInfo {
                    is_interface: false,
                    declared_methods: 0,
                })
            }
            _ => Ok(TypeInfo {
                is_interface: false,
                declared_methods: 0,
            }),
        }
    }

    fn resolve_method(&self, method: &MethodDescriptor) -> Result<MethodInfo, ResolutionError> {
        let errors: Vec<_> = std::iter::once(method.owner())
            .chain(method.params())
            .chain(std::iter::once(method.ret_ty()))
            .filter_map(|ty| self.check_type(ty).err())
            .collect();
        if let Some(err) = ResolutionError::from_many(errors) {
            return Err(err);
        }

        let found = self
            .find_method(method)
            .ok_or_else(|| ResolutionError::UnresolvedMethod(method.to_string().into()))?;
        Ok(MethodInfo {
            is_static: found.is_static(),
            is_public: found.is_public(),
        })
    }

    fn is_assignable(&self, to: &Type, from: &Type) -> Result<bool, ResolutionError> {
        if to == from {
            return self.check_type(to).map(|_| true);
        }
        match (to, from) {
            (Type::Object(to), Type::Object(from)) => {
                self.lookup(to)?;
                if to == OBJECT_CLASS {
                    return self.lookup(from).map(|_| true);
                }
                self.is_subclass(from, to)
            }
            (Type::Object(to), Type::Array(_)) => {
                self.check_type(from)?;
                Ok(to == OBJECT_CLASS || ARRAY_INTERFACES.contains(&to.as_str()))
            }
            (Type::Array(to), Type::Array(from)) if to.is_reference() && from.is_reference() => {
                self.is_assignable(to, from)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_path() -> ClassPath {
        ClassPath::new()
            .with(ClassDef::interface("java.lang.CharSequence"))
            .with(ClassDef::interface("java.io.Serializable"))
            .with(
                ClassDef::class("java.lang.String")
                    .implements("java.lang.CharSequence")
                    .implements("java.io.Serializable")
                    .method(
                        "concat",
                        &[Type::object("java.lang.String")],
                        Type::object("java.lang.String"),
                        false,
                    )
                    .method("valueOf", &[Type::Int], Type::object("java.lang.String"), true),
            )
            .with(ClassDef::class("java.lang.Number"))
            .with(ClassDef::class("java.lang.Integer").extends("java.lang.Number"))
    }

    #[test]
    fn class_hierarchy_assignability() {
        let cp = class_path();
        let string = Type::object("java.lang.String");
        let seq = Type::object("java.lang.CharSequence");
        let object = Type::java_lang_object();

        assert!(cp.is_assignable(&seq, &string).unwrap());
        assert!(cp.is_assignable(&object, &string).unwrap());
        assert!(cp.is_assignable(&object, &seq).unwrap());
        assert!(!cp.is_assignable(&string, &seq).unwrap());
        assert!(!cp.is_assignable(&Type::object("java.lang.Integer"), &string).unwrap());
        assert!(cp
            .is_assignable(&Type::object("java.lang.Number"), &Type::object("java.lang.Integer"))
            .unwrap());
    }

    #[test]
    fn primitive_and_array_assignability() {
        let cp = class_path();
        let string = Type::object("java.lang.String");
        let object = Type::java_lang_object();

        assert!(cp.is_assignable(&Type::Int, &Type::Int).unwrap());
        assert!(!cp.is_assignable(&Type::Long, &Type::Int).unwrap());
        assert!(!cp.is_assignable(&object, &Type::Int).unwrap());
        assert!(cp
            .is_assignable(&Type::array(object.clone()), &Type::array(string.clone()))
            .unwrap());
        assert!(!cp
            .is_assignable(&Type::array(object.clone()), &Type::array(Type::Int))
            .unwrap());
        assert!(cp.is_assignable(&object, &Type::array(Type::Int)).unwrap());
        assert!(cp
            .is_assignable(&Type::object("java.io.Serializable"), &Type::array(string))
            .unwrap());
    }

    #[test]
    fn unknown_types_fail_to_resolve() {
        let cp = class_path();
        let err = cp
            .is_assignable(&Type::object("a.Missing"), &Type::object("java.lang.String"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::UnresolvedType(Type::object("a.Missing")));
    }

    #[test]
    fn methods_resolve_with_flags() {
        let cp = class_path();
        let value_of = MethodDescriptor::new(
            Type::object("java.lang.String"),
            "valueOf",
            &[Type::Int],
            Type::object("java.lang.String"),
        );
        let info = cp.resolve_method(&value_of).unwrap();
        assert!(info.is_static && info.is_public);

        let missing =
            MethodDescriptor::new(Type::object("java.lang.String"), "trim", &[], Type::Int);
        assert!(matches!(
            cp.resolve_method(&missing),
            Err(ResolutionError::UnresolvedMethod(_))
        ));
    }

    #[test]
    fn nested_resolution_errors() {
        let cp = class_path();
        let method = MethodDescriptor::new(
            Type::object("a.Missing"),
            "m",
            &[Type::array(Type::object("b.Gone"))],
            Type::Void,
        );
        let err = cp.resolve_method(&method).unwrap_err();
        assert_eq!(err.causes().len(), 2);
        assert_eq!(err.to_string(), "2 resolution errors");
    }
}
