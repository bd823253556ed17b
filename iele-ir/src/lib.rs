//! IELE IR - Values, Containers and Instructions
//!
//! This crate defines the in-memory IR a Solidity front end lowers into before
//! IELE assembly is emitted: a value hierarchy rooted in a [`Context`],
//! contracts and functions with their symbol tables, and instructions
//! threaded through basic blocks.
//!
//! Every entity is addressed by a copyable handle into the context's arenas.
//! Handles carry the id of the context that minted them, so mixing entities
//! of two contexts is reported instead of silently aliasing.

pub mod builder;
pub mod containers;
pub mod context;
pub mod display;
pub mod handles;
pub mod instruction;
pub mod naming;
pub mod opcode;
pub mod symbol_table;
pub mod value;

pub use builder::{AccountCall, ContractCreation, CreationSource, MAX_LOG_TOPICS};
pub use containers::{DEPOSIT_FUNCTION_NAME, INIT_FUNCTION_NAME};
pub use context::Context;
pub use handles::{
    BlockId, ConstantId, ContextId, ContractId, FunctionId, GlobalValueId, GlobalVariableId, InstId,
    LocalId, ValueHandle, ValueId,
};
pub use instruction::{InsertPoint, Instructions};
pub use opcode::{Arity, Opcode, OpcodeRange, Shape};
pub use symbol_table::SymbolTable;
pub use value::ValueKind;

pub use iele_common::{ErrorKind, IrError, IrResult};
