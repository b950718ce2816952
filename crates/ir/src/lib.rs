pub mod inst;
pub mod method;
pub mod pointcut;
pub mod spec;
pub mod stack;
pub mod types;

pub use inst::{simulate, StackError, StackInst, StackInsts};
pub use method::{MethodDescriptor, MethodFlags, CONSTRUCTOR_NAME};
pub use pointcut::{PointcutParseError, PointcutParser};
pub use spec::{
    AdviceKind, AdviceRef, AdviceSpecification, CallSiteSpecification, ParameterSpecification,
    SpecError, ADVICE_ANNOTATIONS, DEFAULT_SPI, PARAMETER_ANNOTATIONS,
};
pub use stack::{Category, Slot, SlotId, StackLayout};
pub use types::{Type, OBJECT_CLASS};
