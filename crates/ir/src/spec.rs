//! Declarative description of a call site: its advice entries and their parameter bindings.
use std::{collections::BTreeMap, fmt, sync::OnceLock};

use cranelift_entity::{entity_impl, PrimaryMap};
use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::{MethodDescriptor, Type};

/// Marker interface used when a call site does not name its own SPI.
pub const DEFAULT_SPI: &str = "csi.CallSiteAdvice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    Before,
    Around,
    After,
}

impl AdviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "Before",
            Self::Around => "Around",
            Self::After => "After",
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an advice parameter receives from the intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSpecification {
    This,
    Argument(usize),
    Return,
}

type ParameterCtor = fn(Option<usize>) -> Option<ParameterSpecification>;

/// Parameter annotation tags, mapped to constructors taking the annotation's index value.
pub static PARAMETER_ANNOTATIONS: [(&str, ParameterCtor); 3] = [
    ("This", |_| Some(ParameterSpecification::This)),
    ("Argument", |index| index.map(ParameterSpecification::Argument)),
    ("Return", |_| Some(ParameterSpecification::Return)),
];

impl ParameterSpecification {
    /// Decodes a parameter annotation; `Argument` requires its index.
    pub fn from_annotation(tag: &str, index: Option<usize>) -> Result<Self, SpecError> {
        let (_, ctor) = PARAMETER_ANNOTATIONS
            .iter()
            .find(|(name, _)| *name == tag)
            .ok_or_else(|| SpecError::UnknownAnnotation(tag.into()))?;
        ctor(index).ok_or_else(|| SpecError::MissingIndex(tag.into()))
    }

    pub fn is_this(self) -> bool {
        self == Self::This
    }

    pub fn is_return(self) -> bool {
        self == Self::Return
    }
}

impl fmt::Display for ParameterSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::This => f.write_str("@This"),
            Self::Argument(idx) => write!(f, "@Argument({idx})"),
            Self::Return => f.write_str("@Return"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("advice parameter {position} is bound more than once")]
    DuplicatePosition { position: usize },

    #[error("unknown advice annotation `@{0}`")]
    UnknownAnnotation(SmolStr),

    #[error("annotation `@{0}` requires an index")]
    MissingIndex(SmolStr),

    #[error("pointcut of `{advice}` has already been set")]
    PointcutAlreadySet { advice: SmolStr },
}

type AdviceCtor = fn(MethodDescriptor, SmolStr) -> AdviceSpecification;

/// Annotation tags understood by the descriptor reader, mapped to advice constructors.
pub static ADVICE_ANNOTATIONS: [(&str, AdviceCtor); 3] = [
    ("Before", AdviceSpecification::before),
    ("Around", AdviceSpecification::around),
    ("After", AdviceSpecification::after),
];

#[derive(Debug, Clone)]
pub struct AdviceSpecification {
    kind: AdviceKind,
    advice: MethodDescriptor,
    params: BTreeMap<usize, ParameterSpecification>,
    signature: SmolStr,
    pointcut: OnceLock<MethodDescriptor>,
}

impl AdviceSpecification {
    pub fn new(kind: AdviceKind, advice: MethodDescriptor, signature: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            advice,
            params: BTreeMap::new(),
            signature: signature.into(),
            pointcut: OnceLock::new(),
        }
    }

    pub fn before(advice: MethodDescriptor, signature: SmolStr) -> Self {
        Self::new(AdviceKind::Before, advice, signature)
    }

    pub fn around(advice: MethodDescriptor, signature: SmolStr) -> Self {
        Self::new(AdviceKind::Around, advice, signature)
    }

    pub fn after(advice: MethodDescriptor, signature: SmolStr) -> Self {
        Self::new(AdviceKind::After, advice, signature)
    }

    pub fn from_annotation(
        tag: &str,
        advice: MethodDescriptor,
        signature: impl Into<SmolStr>,
    ) -> Result<Self, SpecError> {
        let (_, ctor) = ADVICE_ANNOTATIONS
            .iter()
            .find(|(name, _)| *name == tag)
            .ok_or_else(|| SpecError::UnknownAnnotation(tag.into()))?;
        Ok(ctor(advice, signature.into()))
    }

    /// Binds advice parameter `position`. Each position can be bound once.
    pub fn bind(&mut self, position: usize, param: ParameterSpecification) -> Result<(), SpecError> {
        if self.params.contains_key(&position) {
            return Err(SpecError::DuplicatePosition { position });
        }
        self.params.insert(position, param);
        Ok(())
    }

    /// Binds advice parameter `position` from its annotation tag and optional index value.
    pub fn bind_annotation(
        &mut self,
        position: usize,
        tag: &str,
        index: Option<usize>,
    ) -> Result<(), SpecError> {
        let param = ParameterSpecification::from_annotation(tag, index)?;
        self.bind(position, param)
    }

    pub fn with_bindings(
        mut self,
        bindings: impl IntoIterator<Item = (usize, ParameterSpecification)>,
    ) -> Result<Self, SpecError> {
        for (position, param) in bindings {
            self.bind(position, param)?;
        }
        Ok(self)
    }

    /// Records the parsed pointcut. Only the first call succeeds.
    pub fn set_pointcut(&self, pointcut: MethodDescriptor) -> Result<(), SpecError> {
        self.pointcut
            .set(pointcut)
            .map_err(|_| SpecError::PointcutAlreadySet {
                advice: self.advice.name().into(),
            })
    }

    pub fn kind(&self) -> AdviceKind {
        self.kind
    }

    pub fn advice(&self) -> &MethodDescriptor {
        &self.advice
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn pointcut(&self) -> Option<&MethodDescriptor> {
        self.pointcut.get()
    }

    pub fn binding(&self, position: usize) -> Option<ParameterSpecification> {
        self.params.get(&position).copied()
    }

    /// Bindings in ascending position order.
    pub fn params(&self) -> impl Iterator<Item = (usize, ParameterSpecification)> + '_ {
        self.params.iter().map(|(pos, param)| (*pos, *param))
    }

    pub fn first_param(&self) -> Option<ParameterSpecification> {
        self.params.values().next().copied()
    }

    pub fn last_param(&self) -> Option<ParameterSpecification> {
        self.params.values().next_back().copied()
    }

    pub fn has_this(&self) -> bool {
        self.params.values().any(|p| p.is_this())
    }

    pub fn has_return(&self) -> bool {
        self.params.values().any(|p| p.is_return())
    }

    /// `(position, pointcut index)` of every `Argument` binding.
    pub fn arguments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.params().filter_map(|(pos, param)| match param {
            ParameterSpecification::Argument(idx) => Some((pos, idx)),
            _ => None,
        })
    }

    /// Values the advice consumes from the stack, in position order.
    pub fn bound(&self) -> impl Iterator<Item = ParameterSpecification> + '_ {
        self.params.values().copied().filter(|p| !p.is_return())
    }
}

impl fmt::Display for AdviceSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(\"{}\") {}", self.kind, self.signature, self.advice)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdviceRef(pub u32);
entity_impl!(AdviceRef, "advice");

#[derive(Debug, Clone)]
pub struct CallSiteSpecification {
    owner: Type,
    spi: Type,
    helpers: IndexSet<Type>,
    advices: PrimaryMap<AdviceRef, AdviceSpecification>,
}

impl CallSiteSpecification {
    /// Creates an empty call site. The owner is always registered as a helper.
    pub fn new(owner: Type) -> Self {
        let mut helpers = IndexSet::new();
        helpers.insert(owner.clone());
        Self {
            owner,
            spi: Type::object(DEFAULT_SPI),
            helpers,
            advices: PrimaryMap::new(),
        }
    }

    pub fn with_spi(mut self, spi: Type) -> Self {
        self.spi = spi;
        self
    }

    /// Returns `false` if `helper` was already present.
    pub fn add_helper(&mut self, helper: Type) -> bool {
        self.helpers.insert(helper)
    }

    pub fn push_advice(&mut self, advice: AdviceSpecification) -> AdviceRef {
        self.advices.push(advice)
    }

    pub fn owner(&self) -> &Type {
        &self.owner
    }

    pub fn spi(&self) -> &Type {
        &self.spi
    }

    pub fn has_default_spi(&self) -> bool {
        matches!(&self.spi, Type::Object(name) if name == DEFAULT_SPI)
    }

    pub fn helpers(&self) -> &IndexSet<Type> {
        &self.helpers
    }

    pub fn advices(&self) -> impl Iterator<Item = (AdviceRef, &AdviceSpecification)> {
        self.advices.iter()
    }

    pub fn advice(&self, advice: AdviceRef) -> &AdviceSpecification {
        &self.advices[advice]
    }

    pub fn advice_count(&self) -> usize {
        self.advices.len()
    }
}
