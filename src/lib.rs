//! Decides which modules of a multi-task system run as isolated services and
//! which are folded into the one service that uses them, then collects the
//! memory and DMA regions every service must own.
//!
//! ```
//! use svcplan::{FlagPolicy, ModuleDescriptor, Registry, Resolution};
//!
//! let registry = Registry::load([
//!     ModuleDescriptor::new("shell").depends_on("uart"),
//!     ModuleDescriptor::new("uart").memory((0x1_2000_0000, 0x900_0000, 0x1000)),
//! ])?;
//! let run = Resolution::run(&registry, &["shell"])?;
//! let plan = run.plan(FlagPolicy::Local)?;
//!
//! assert_eq!(plan.components.len(), 1);
//! assert_eq!(plan.components[0].memory.len(), 1);
//! # Ok::<(), svcplan::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
pub mod logging;
pub mod plan;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod templates;

pub use config::{Manifest, Selection};
pub use context::ContextEnv;
pub use emit::Emitter;
pub use error::Error;
pub use plan::{Component, FlagPolicy, Plan};
pub use registry::{DmaRegion, MemRegion, Module, ModuleDescriptor, ModuleId, Registry};
pub use resolve::{Resolution, Resources, Role};
