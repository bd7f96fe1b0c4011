pub mod runtime_error;
pub mod stack;
pub mod vm_bc;

pub use runtime_error::{FaultKind, RuntimeError};
pub use vm_bc::{RuntimeDiagnostic, Vm, VmConfig};
