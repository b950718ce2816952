//! Java-level value types as they appear in advice and pointcut descriptors.
use std::fmt;

use smol_str::SmolStr;

use crate::stack::Category;

pub const OBJECT_CLASS: &str = "java.lang.Object";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// A class or interface, by its binary name (`java.lang.String`, `a.Outer$Inner`).
    Object(SmolStr),
    Array(Box<Type>),
}

impl Type {
    pub fn object(name: impl Into<SmolStr>) -> Self {
        Self::Object(name.into())
    }

    pub fn array(elem: Type) -> Self {
        Self::Array(Box::new(elem))
    }

    pub fn java_lang_object() -> Self {
        Self::object(OBJECT_CLASS)
    }

    /// Maps a Java keyword (`int`, `void`, ...) to its primitive type.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let ty = match keyword {
            "void" => Self::Void,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object(_) | Self::Array(_))
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Width of a value of this type on the operand stack, `None` for `void`.
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Void => None,
            Self::Long | Self::Double => Some(Category::Two),
            _ => Some(Category::One),
        }
    }

    /// Returns the innermost non-array type and the number of array dimensions around it.
    pub fn base(&self) -> (&Type, usize) {
        let mut ty = self;
        let mut dims = 0;
        while let Self::Array(elem) = ty {
            ty = elem;
            dims += 1;
        }
        (ty, dims)
    }

    /// Java source spelling, e.g. `java.lang.String[]`.
    pub fn class_name(&self) -> String {
        self.to_string()
    }

    /// JVM field descriptor, e.g. `[Ljava/lang/String;`.
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    pub(crate) fn write_descriptor(&self, out: &mut String) {
        match self {
            Self::Void => out.push('V'),
            Self::Boolean => out.push('Z'),
            Self::Byte => out.push('B'),
            Self::Char => out.push('C'),
            Self::Short => out.push('S'),
            Self::Int => out.push('I'),
            Self::Long => out.push('J'),
            Self::Float => out.push('F'),
            Self::Double => out.push('D'),
            Self::Object(name) => {
                out.push('L');
                out.extend(name.chars().map(|c| if c == '.' { '/' } else { c }));
                out.push(';');
            }
            Self::Array(elem) => {
                out.push('[');
                elem.write_descriptor(out);
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Boolean => f.write_str("boolean"),
            Self::Byte => f.write_str("byte"),
            Self::Char => f.write_str("char"),
            Self::Short => f.write_str("short"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Object(name) => f.write_str(name),
            Self::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}
