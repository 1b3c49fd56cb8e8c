//! Shared containers, interpolation and parsing utilities

pub mod columns;
pub mod constants;
pub mod interpolate;
pub mod table_set;
pub mod trapezoid;

pub use columns::{ColumnsError, TextTable};
pub use constants::CGS;
pub use interpolate::{interp_loglog, repair_nan_loglog, InterpError, RepairError};
pub use table_set::{Keyword, Keywords, Table, TableSet, TableSetError};
pub use trapezoid::{trap_integrate_samples, TrapezoidError};
