//! State diagram parsing and hierarchical machine reconstruction
//!
//! Stages, in the order the pipeline runs them:
//! ```text
//! text --Scanner--> events --ScopeTracker--> block tree
//!      --StateDatabase--> scoped flat machine
//!      --HistoryResolver--> history placed
//!      --ModelAssembler (+ HierarchyBuilder)--> HierarchicalModel
//! ```
//!
//! Syntax example:
//! ```text
//! stateDiagram-v2
//!     [*] --> On
//!     state On {
//!         [*] --> Idle
//!         Idle --> Busy : start [paper > 0] / spin()
//!     }
//! ```

mod assembler;
mod database;
mod hierarchy;
mod history;
mod label;
mod model;
mod scanner;
mod scope;
mod statement;

pub use assembler::ModelAssembler;
pub use database::{FlatMachine, InitialDecl, Note, RegionInfo, ScopeRef, StateDatabase};
pub use hierarchy::HierarchyBuilder;
pub use history::{HistoryResolver, Resolved, HISTORY_NAME};
pub use label::{decompose, TransitionLabel};
pub use model::{
    AnnotationKind, HierarchicalModel, Region, RegionNode, State, StateAnnotation, StateNode,
    Transition,
};
pub use scanner::{Event, Scanner, Spanned};
pub use scope::{Block, Item, ScopeTracker, ScopeTree};
pub use statement::{Endpoint, NotePosition, Statement, StatementParser};
