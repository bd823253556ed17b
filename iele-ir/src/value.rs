//! Value Model
//!
//! A value is anything an instruction can name: constants, storage slots,
//! functions, contracts, blocks, locals and arguments. The kind is derived
//! from the payload, so it can never disagree with the stored data.

use crate::handles::{ConstantId, InstId, ValueId};
use crate::symbol_table::SymbolTable;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    IntConstant,
    GlobalVariable,
    Function,
    Contract,
    Block,
    LocalVariable,
    Argument,
}

impl ValueKind {
    /// Functions and global variables live in a contract's symbol table and
    /// get a `.` separator when uniqued
    pub fn is_global_value(self) -> bool {
        matches!(self, ValueKind::Function | ValueKind::GlobalVariable)
    }

    pub fn is_constant(self) -> bool {
        matches!(
            self,
            ValueKind::IntConstant | ValueKind::GlobalVariable | ValueKind::Function | ValueKind::Contract
        )
    }

    /// Kinds whose parent is a function
    pub fn is_function_local(self) -> bool {
        matches!(self, ValueKind::Block | ValueKind::LocalVariable | ValueKind::Argument)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::IntConstant => "integer constant",
            ValueKind::GlobalVariable => "global variable",
            ValueKind::Function => "function",
            ValueKind::Contract => "contract",
            ValueKind::Block => "block",
            ValueKind::LocalVariable => "local variable",
            ValueKind::Argument => "argument",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct IntConstantData {
    pub value: BigInt,
    pub print_as_hex: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GlobalVariableData {
    pub storage_address: Option<ConstantId>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionData {
    pub arguments: Vec<ValueId>,
    pub locals: Vec<ValueId>,
    pub blocks: Vec<ValueId>,
    pub symbols: SymbolTable,
    pub is_public: bool,
    pub is_init: bool,
    pub is_deposit: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ContractData {
    pub functions: Vec<ValueId>,
    pub globals: Vec<ValueId>,
    pub contracts: Vec<ValueId>,
    pub symbols: SymbolTable,
    pub metadata: Vec<u8>,
}

/// Intrusive instruction list header
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InstructionList {
    pub head: Option<InstId>,
    pub tail: Option<InstId>,
    pub len: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BlockData {
    pub instructions: InstructionList,
}

#[derive(Debug, Clone)]
pub(crate) enum ValueData {
    IntConstant(IntConstantData),
    GlobalVariable(GlobalVariableData),
    Function(FunctionData),
    Contract(ContractData),
    Block(BlockData),
    LocalVariable,
    Argument,
}

impl ValueData {
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueData::IntConstant(_) => ValueKind::IntConstant,
            ValueData::GlobalVariable(_) => ValueKind::GlobalVariable,
            ValueData::Function(_) => ValueKind::Function,
            ValueData::Contract(_) => ValueKind::Contract,
            ValueData::Block(_) => ValueKind::Block,
            ValueData::LocalVariable => ValueKind::LocalVariable,
            ValueData::Argument => ValueKind::Argument,
        }
    }
}

/// Arena entry for one value
#[derive(Debug, Clone)]
pub(crate) struct ValueSlot {
    pub data: ValueData,
    pub name: Option<String>,
    /// Owning contract or function, `None` while detached
    pub parent: Option<ValueId>,
}

impl ValueSlot {
    pub fn new(data: ValueData) -> Self {
        ValueSlot { data, name: None, parent: None }
    }

    pub fn kind(&self) -> ValueKind {
        self.data.kind()
    }

    pub fn symbol_table(&self) -> Option<&SymbolTable> {
        match &self.data {
            ValueData::Function(function) => Some(&function.symbols),
            ValueData::Contract(contract) => Some(&contract.symbols),
            _ => None,
        }
    }

    pub fn symbol_table_mut(&mut self) -> Option<&mut SymbolTable> {
        match &mut self.data {
            ValueData::Function(function) => Some(&mut function.symbols),
            ValueData::Contract(contract) => Some(&mut contract.symbols),
            _ => None,
        }
    }
}
