use csi_ir::{
    AdviceKind, AdviceSpecification, MethodDescriptor, MethodFlags, ParameterSpecification, Type,
};
use csi_verifier::{ClassDef, ClassPath};

pub fn string() -> Type {
    Type::object("java.lang.String")
}

pub fn url() -> Type {
    Type::object("java.net.URL")
}

pub fn class_path() -> ClassPath {
    ClassPath::new()
        .with(ClassDef::interface("java.lang.CharSequence"))
        .with(
            ClassDef::class("java.lang.String")
                .implements("java.lang.CharSequence")
                .method("concat", &[string()], string(), false)
                .method("valueOf", &[Type::Int], string(), true)
                .method("valueOf", &[Type::Long], string(), true),
        )
        .with(ClassDef::class("java.net.URL").constructor(&[string()]))
        .with(ClassDef::class("csi.NotAnInterface"))
}

/// An unparsed advice entry owned by `owner`; the compiler parses `signature`.
pub fn advice(
    kind: AdviceKind,
    owner: &str,
    name: &str,
    params: &[Type],
    ret_ty: Type,
    signature: &str,
    bindings: &[(usize, ParameterSpecification)],
) -> AdviceSpecification {
    let method = MethodDescriptor::new(Type::object(owner), name, params, ret_ty)
        .with_flags(MethodFlags::PUBLIC_STATIC);
    AdviceSpecification::new(kind, method, signature)
        .with_bindings(bindings.iter().copied())
        .unwrap()
}
