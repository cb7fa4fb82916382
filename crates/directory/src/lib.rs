//! Employee directory domain module.
//!
//! Employees, departments, search predicates and report aggregation,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod department;
pub mod employee;
pub mod report;
pub mod search;

pub use department::Department;
pub use employee::{Employee, EmployeeDraft, EmployeePatch, Gender, Salary};
pub use report::ReportRow;
pub use search::{Condition, EmployeePredicate, SearchCriteria};
