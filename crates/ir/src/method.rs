use std::fmt;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::Type;

/// Name the JVM gives to instance initializers.
pub const CONSTRUCTOR_NAME: &str = "<init>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodFlags {
    pub is_static: bool,
    pub is_public: bool,
}

impl MethodFlags {
    pub const PUBLIC_STATIC: Self = Self {
        is_static: true,
        is_public: true,
    };
}

/// A method or constructor, identified by owner, name and parameter/return types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    owner: Type,
    name: SmolStr,
    params: SmallVec<[Type; 8]>,
    ret_ty: Type,
    flags: MethodFlags,
}

impl MethodDescriptor {
    pub fn new(owner: Type, name: impl Into<SmolStr>, params: &[Type], ret_ty: Type) -> Self {
        Self {
            owner,
            name: name.into(),
            params: params.into(),
            ret_ty,
            flags: MethodFlags::default(),
        }
    }

    pub fn constructor(owner: Type, params: &[Type]) -> Self {
        Self::new(owner, CONSTRUCTOR_NAME, params, Type::Void)
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn owner(&self) -> &Type {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn param(&self, idx: usize) -> Option<&Type> {
        self.params.get(idx)
    }

    pub fn ret_ty(&self) -> &Type {
        &self.ret_ty
    }

    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static
    }

    pub fn is_public(&self) -> bool {
        self.flags.is_public
    }

    /// The type a call to this method leaves on the stack: the owner for constructors
    /// (the initialized receiver), otherwise the return type.
    pub fn produced_ty(&self) -> &Type {
        if self.is_constructor() {
            &self.owner
        } else {
            &self.ret_ty
        }
    }

    /// JVM method descriptor, e.g. `(Ljava/lang/String;I)V`.
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        self.ret_ty.write_descriptor(&mut out);
        out
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static() {
            f.write_str("static ")?;
        }
        write!(f, "{} {}.{}(", self.ret_ty, self.owner, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
