//! Launch command generation for heterogeneous cluster launchers.
//!
//! A resolved [`Job`](crate::job::Job) is rendered into the flag syntax of
//! one concrete launcher (srun, mpirun or aprun) by
//! [`Launcher::prepare`], producing a [`LaunchData`] bundle that performs
//! the actual process spawn.

pub mod launcher;
pub(crate) mod vocabulary;

pub use launcher::{LaunchData, Launcher};
