//! Runtime builders.
//!
//! Each builder shells out to the runtime's toolchain and packages the result. The
//! toolchain program can be overridden, which tests use to substitute stub scripts.

mod go;
mod java;
mod node;
mod python;

pub use go::GoBuilder;
pub use java::JavaBuilder;
pub use node::NodeBuilder;
pub use python::PythonBuilder;
