#[macro_use]
extern crate tracing;

mod compiler;
pub mod emit;
pub mod stackify;

pub use compiler::{CallSiteResult, Compiler, CompilerConfig};
pub use emit::{plan_stack, EmissionRecord, EmitError, Operation, StackPlan};
pub use stackify::{Memoized, MemoizedSolver, SearchSolver, SolverConfig, StackHandler};
