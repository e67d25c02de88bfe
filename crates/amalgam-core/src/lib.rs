//! Core of the amalgam source merger
//!
//! Merges a tree of interface and implementation files, connected by quoted
//! `#include` references, into one interface file and one implementation file.

pub mod amalgamate;
pub mod config;
pub mod error;
pub mod line;
pub mod resolver;

pub use amalgamate::{implementation_name, AmalgamReport, Amalgamation, Amalgamator};
pub use config::AmalgamConfig;
pub use error::{AmalgamError, Result};
pub use resolver::{PassOutput, Resolution, Resolver, UnresolvedReason, VisitedRegistry};
