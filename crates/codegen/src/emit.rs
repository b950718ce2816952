//! Assembly of the ordered operation list for one advice unit.
use std::fmt;

use csi_ir::{
    AdviceKind, AdviceSpecification, Category, MethodDescriptor, ParameterSpecification, Slot,
    StackInst, StackLayout, Type,
};
use csi_verifier::DiagnosticCode;
use smol_str::SmolStr;

use crate::stackify::StackHandler;

/// One step of an advice unit's body, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Stack(StackInst),
    /// `invokestatic` of the advice method.
    InvokeAdvice(MethodDescriptor),
    /// The intercepted instruction itself.
    InvokeOriginal,
    CheckCast(Type),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(inst) => write!(f, "{inst}"),
            Self::InvokeAdvice(method) => write!(
                f,
                "INVOKESTATIC {}.{}{}",
                internal_name(method.owner()),
                method.name(),
                method.descriptor()
            ),
            Self::InvokeOriginal => f.write_str("INVOKE <original>"),
            Self::CheckCast(ty) => write!(f, "CHECKCAST {}", internal_name(ty)),
        }
    }
}

/// Everything the source generator needs to render one advice unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionRecord {
    pub spi: Type,
    pub helpers: Vec<Type>,
    pub name: SmolStr,
    pub kind: AdviceKind,
    pub pointcut: MethodDescriptor,
    pub ops: Vec<Operation>,
}

impl EmissionRecord {
    /// Stack instructions in the unit, in order.
    pub fn stack_insts(&self) -> impl Iterator<Item = StackInst> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Operation::Stack(inst) => Some(*inst),
            _ => None,
        })
    }
}

impl fmt::Display for EmissionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "unit {} implements {}", self.name, self.spi)?;
        write!(f, "  helpers:")?;
        for helper in &self.helpers {
            write!(f, " {helper}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "  {} {}.{}{}",
            self.kind,
            internal_name(self.pointcut.owner()),
            self.pointcut.name(),
            self.pointcut.descriptor()
        )?;
        for op in &self.ops {
            writeln!(f, "    {op}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("pointcut `{0}` has not been parsed")]
    MissingPointcut(SmolStr),

    #[error("argument {0} is not declared by the pointcut")]
    ArgumentOutOfBounds(usize),

    #[error("`{0}` cannot be bound on a static pointcut")]
    NoReceiver(ParameterSpecification),

    #[error("pointcut parameter {0} has type void")]
    VoidOperand(usize),

    #[error("no stack transform from {current} to {target}")]
    Unsolvable {
        current: StackLayout,
        target: StackLayout,
    },
}

impl EmitError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::MissingPointcut(_) => DiagnosticCode::PointcutSignatureInvalid,
            Self::ArgumentOutOfBounds(_) => DiagnosticCode::ArgumentOutOfBounds,
            Self::NoReceiver(_) => DiagnosticCode::ThisOnStaticMethod,
            Self::VoidOperand(_) => DiagnosticCode::ParameterNotCompatible,
            Self::Unsolvable { .. } => DiagnosticCode::StackUnsolvable,
        }
    }
}

/// Stack shapes before and after the shuffle that precedes the calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPlan {
    pub current: StackLayout,
    pub target: StackLayout,
}

const RECEIVER: Slot = Slot::new(0, Category::One);

/// Slot 0 is the receiver and slot `i + 1` is argument `i`.
fn argument_slot(pointcut: &MethodDescriptor, idx: usize) -> Result<Slot, EmitError> {
    let ty = pointcut
        .param(idx)
        .ok_or(EmitError::ArgumentOutOfBounds(idx))?;
    let category = ty.category().ok_or(EmitError::VoidOperand(idx))?;
    Ok(Slot::new(idx as u32 + 1, category))
}

/// Computes the layouts an advice needs around the intercepted call. `Around` advice takes
/// the operands as they are, so it has no plan.
pub fn plan_stack(
    advice: &AdviceSpecification,
    pointcut: &MethodDescriptor,
    pointcut_static: bool,
) -> Result<Option<StackPlan>, EmitError> {
    let kind = advice.kind();
    if kind == AdviceKind::Around {
        return Ok(None);
    }

    let is_ctor = pointcut.is_constructor();
    let has_receiver = is_ctor || !pointcut_static;

    let mut operands = StackLayout::new();
    if has_receiver {
        operands.push(RECEIVER);
    }
    for idx in 0..pointcut.params().len() {
        operands.push(argument_slot(pointcut, idx)?);
    }

    // `new` leaves an extra copy of the uninitialized receiver below the operands.
    let current: StackLayout = is_ctor
        .then_some(RECEIVER)
        .into_iter()
        .chain(operands.slots().iter().copied())
        .collect();

    let mut bound = StackLayout::new();
    for param in advice.bound() {
        let slot = match param {
            ParameterSpecification::This if has_receiver => RECEIVER,
            ParameterSpecification::This => return Err(EmitError::NoReceiver(param)),
            ParameterSpecification::Argument(idx) => argument_slot(pointcut, idx)?,
            ParameterSpecification::Return => continue,
        };
        bound.push(slot);
    }

    let target = match kind {
        AdviceKind::Before => {
            let mut target = current.clone();
            target.extend(bound.slots().iter().copied());
            target
        }
        _ => {
            let mut target = bound;
            target.extend(operands.slots().iter().copied());
            target
        }
    };

    Ok(Some(StackPlan { current, target }))
}

/// Builds the emission record for one advice unit named `name`.
///
/// The pointcut must already be parsed; `pointcut_static` is the staticness the caller
/// established for it (resolution wins over the signature's modifier).
pub fn emit(
    spi: &Type,
    helpers: &[Type],
    advice: &AdviceSpecification,
    name: SmolStr,
    pointcut_static: bool,
    solver: &dyn StackHandler,
) -> Result<EmissionRecord, EmitError> {
    let pointcut = advice
        .pointcut()
        .ok_or_else(|| EmitError::MissingPointcut(advice.signature().into()))?;

    let mut ops = Vec::new();
    if let Some(plan) = plan_stack(advice, pointcut, pointcut_static)? {
        let insts = solver
            .solve(&plan.current, &plan.target)
            .ok_or_else(|| EmitError::Unsolvable {
                current: plan.current.clone(),
                target: plan.target.clone(),
            })?;
        ops.extend(insts.into_iter().map(Operation::Stack));
    }

    let invoke_advice = Operation::InvokeAdvice(advice.advice().clone());
    match advice.kind() {
        AdviceKind::Before => {
            ops.push(invoke_advice);
            ops.push(Operation::InvokeOriginal);
        }
        AdviceKind::After => {
            ops.push(Operation::InvokeOriginal);
            ops.push(invoke_advice);
        }
        AdviceKind::Around => ops.push(invoke_advice),
    }

    if advice.kind() != AdviceKind::Before {
        let produced = pointcut.produced_ty();
        if produced.is_reference() && advice.advice().ret_ty() != produced {
            ops.push(Operation::CheckCast(produced.clone()));
        }
    }

    Ok(EmissionRecord {
        spi: spi.clone(),
        helpers: helpers.to_vec(),
        name,
        kind: advice.kind(),
        pointcut: pointcut.clone(),
        ops,
    })
}

/// JVM internal name: `java/lang/String` for classes, the descriptor for arrays.
fn internal_name(ty: &Type) -> String {
    match ty {
        Type::Object(name) => name.replace('.', "/"),
        _ => ty.descriptor(),
    }
}
