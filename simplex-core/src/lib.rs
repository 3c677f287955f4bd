//! Revised simplex engine for linear programs in bounded-variable form.
//!
//! The engine works on the homogeneous system `A~ x = 0` with
//! `A~ = (I | -A)`, where variables `0..m` are auxiliary (one per
//! constraint row) and `m..m+n` are the structural columns. Three drivers
//! share one set of evaluation kernels:
//!
//! - **Primal optimization** from a primal feasible basis
//! - **Dual optimization** from a dual feasible basis
//! - **Feasibility restoration**, which minimizes the sum of bound
//!   violations by temporarily reinterpreting violated bounds
//!
//! Pricing is projected steepest edge (primal and dual flavors) with a
//! fall-back to textbook pricing; ratio tests come in plain and Harris
//! two-pass forms. The basis factorization sits behind the
//! [`factor::Factorization`] trait so a different backend can be plugged
//! in; the built-in one keeps a dense LU with a product-form eta file and
//! reports when it wants a fresh decomposition.
//!
//! # Example
//!
//! ```ignore
//! use simplex_core::{solve_lp, Bounds, Direction, LpSettings, Problem};
//!
//! // max 2 x0 + x1, s.t. x0 + x1 <= 4, x0 - x1 <= 2, x >= 0
//! let problem = Problem::build(
//!     2,
//!     2,
//!     vec![
//!         Bounds::upper(4.0),
//!         Bounds::upper(2.0),
//!         Bounds::lower(0.0),
//!         Bounds::lower(0.0),
//!     ],
//!     vec![2.0, 1.0],
//!     0.0,
//!     Direction::Maximize,
//!     vec![false, false],
//!     &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, -1.0)],
//! )?;
//! let solution = solve_lp(&problem, &LpSettings::default())?;
//! println!("objective: {}", solution.objective);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod basis;
pub mod driver;
pub mod error;
pub mod factor;
pub mod kernels;
pub mod pricing;
pub mod problem;
pub mod steepest;

pub use basis::{natural_tag, Basis, BasisTag, Leaving, Position};
pub use driver::{
    dual_optimize, feasibility_restore, primal_optimize, solve_lp, two_phase, LimitMonitor,
    LpSettings, LpSolution, LpStatus, Monitor, SimplexOutcome, StopReason, Tolerances,
};
pub use error::{SimplexError, SimplexResult};
pub use factor::{FactorError, Factorization, ProductFormInverse};
pub use kernels::{compare_rel, Residual};
pub use problem::{BoundKind, Bounds, Direction, Problem};
