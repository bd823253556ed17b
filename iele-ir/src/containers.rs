//! Containers
//!
//! Contracts hold functions, global variables and sub-contracts; functions
//! hold arguments, local variables and blocks. Every list keeps the parent
//! back-reference of its members and the owner's symbol table in step with
//! its contents: inserting sets the parent and enters the name, removing
//! clears both, transferring does both in one go.

use crate::context::Context;
use crate::naming::check_name;
use crate::handles::{
    BlockId, ConstantId, ContractId, FunctionId, GlobalVariableId, LocalId, ValueHandle, ValueId,
};
use crate::value::{BlockData, FunctionData, GlobalVariableData, ValueData, ValueKind};
use iele_common::{IrError, IrResult};
use log::{debug, trace};
use std::ops::Range;

/// Name given to a contract's constructor
pub const INIT_FUNCTION_NAME: &str = "init";
/// Name given to a contract's deposit entry point
pub const DEPOSIT_FUNCTION_NAME: &str = "deposit";

/// One of the ordered member lists an owner keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListSlot {
    Functions,
    Globals,
    Contracts,
    Arguments,
    Locals,
    Blocks,
}

impl ListSlot {
    fn member_kind(self) -> ValueKind {
        match self {
            ListSlot::Functions => ValueKind::Function,
            ListSlot::Globals => ValueKind::GlobalVariable,
            ListSlot::Contracts => ValueKind::Contract,
            ListSlot::Arguments => ValueKind::Argument,
            ListSlot::Locals => ValueKind::LocalVariable,
            ListSlot::Blocks => ValueKind::Block,
        }
    }

    fn owner_kind(self) -> ValueKind {
        match self {
            ListSlot::Functions | ListSlot::Globals | ListSlot::Contracts => ValueKind::Contract,
            ListSlot::Arguments | ListSlot::Locals | ListSlot::Blocks => ValueKind::Function,
        }
    }

    fn for_member(kind: ValueKind) -> Option<ListSlot> {
        match kind {
            ValueKind::Function => Some(ListSlot::Functions),
            ValueKind::GlobalVariable => Some(ListSlot::Globals),
            ValueKind::Contract => Some(ListSlot::Contracts),
            ValueKind::Argument => Some(ListSlot::Arguments),
            ValueKind::LocalVariable => Some(ListSlot::Locals),
            ValueKind::Block => Some(ListSlot::Blocks),
            ValueKind::IntConstant => None,
        }
    }
}

impl Context {
    fn list(&self, owner: ValueId, slot: ListSlot) -> &[ValueId] {
        match (&self.slot(owner).data, slot) {
            (ValueData::Contract(contract), ListSlot::Functions) => &contract.functions,
            (ValueData::Contract(contract), ListSlot::Globals) => &contract.globals,
            (ValueData::Contract(contract), ListSlot::Contracts) => &contract.contracts,
            (ValueData::Function(function), ListSlot::Arguments) => &function.arguments,
            (ValueData::Function(function), ListSlot::Locals) => &function.locals,
            (ValueData::Function(function), ListSlot::Blocks) => &function.blocks,
            _ => &[],
        }
    }

    fn list_mut(&mut self, owner: ValueId, slot: ListSlot) -> IrResult<&mut Vec<ValueId>> {
        let kind = self.kind(owner);
        match (&mut self.slot_mut(owner).data, slot) {
            (ValueData::Contract(contract), ListSlot::Functions) => Ok(&mut contract.functions),
            (ValueData::Contract(contract), ListSlot::Globals) => Ok(&mut contract.globals),
            (ValueData::Contract(contract), ListSlot::Contracts) => Ok(&mut contract.contracts),
            (ValueData::Function(function), ListSlot::Arguments) => Ok(&mut function.arguments),
            (ValueData::Function(function), ListSlot::Locals) => Ok(&mut function.locals),
            (ValueData::Function(function), ListSlot::Blocks) => Ok(&mut function.blocks),
            _ => Err(IrError::unsupported(format!("a {} has no {:?} list", kind, slot))),
        }
    }

    /// Position of `before` in the list, or the end when `None`
    fn insertion_index(&self, owner: ValueId, slot: ListSlot, before: Option<ValueId>) -> IrResult<usize> {
        let list = self.list(owner, slot);
        match before {
            None => Ok(list.len()),
            Some(before) => list.iter().position(|member| *member == before).ok_or_else(|| {
                IrError::ownership(format!(
                    "insertion point '{}' is not a member of '{}'",
                    self.name(before),
                    self.name(owner)
                ))
            }),
        }
    }

    fn check_list_pair(&self, owner: ValueId, slot: ListSlot, member: ValueId) -> IrResult<()> {
        self.check_value(owner)?;
        self.check_value(member)?;
        if self.kind(owner) != slot.owner_kind() || self.kind(member) != slot.member_kind() {
            return Err(IrError::unsupported(format!(
                "a {} cannot hold a {} in its {:?} list",
                self.kind(owner),
                self.kind(member),
                slot
            )));
        }
        Ok(())
    }

    fn list_insert(&mut self, owner: ValueId, slot: ListSlot, member: ValueId, before: Option<ValueId>) -> IrResult<()> {
        self.check_list_pair(owner, slot, member)?;
        if let Some(parent) = self.slot(member).parent {
            return Err(IrError::ownership(format!(
                "{} '{}' already belongs to '{}'",
                self.kind(member),
                self.name(member),
                self.name(parent)
            )));
        }
        if slot == ListSlot::Contracts && self.is_contract_ancestor(member, owner) {
            return Err(IrError::ownership(format!(
                "contract '{}' cannot be nested inside itself",
                self.name(member)
            )));
        }
        if slot == ListSlot::Blocks {
            self.validate_block_members(BlockId(member), FunctionId(owner))?;
        }

        let index = self.insertion_index(owner, slot, before)?;
        self.list_mut(owner, slot)?.insert(index, member);
        self.slot_mut(member).parent = Some(owner);
        self.reinsert_name(owner, member)?;
        trace!("inserted {} '{}' into '{}'", self.kind(member), self.name(member), self.name(owner));
        Ok(())
    }

    fn list_remove(&mut self, owner: ValueId, slot: ListSlot, member: ValueId) -> IrResult<()> {
        self.check_list_pair(owner, slot, member)?;
        let Some(index) = self.list(owner, slot).iter().position(|m| *m == member) else {
            return Err(IrError::ownership(format!(
                "{} '{}' is not a member of '{}'",
                self.kind(member),
                self.name(member),
                self.name(owner)
            )));
        };
        self.list_mut(owner, slot)?.remove(index);
        self.forget_name(owner, member)?;
        self.slot_mut(member).parent = None;
        trace!("removed {} '{}' from '{}'", self.kind(member), self.name(member), self.name(owner));
        Ok(())
    }

    fn list_transfer(
        &mut self,
        from: ValueId,
        to: ValueId,
        slot: ListSlot,
        range: Range<usize>,
        before: Option<ValueId>,
    ) -> IrResult<()> {
        self.check_value(from)?;
        self.check_value(to)?;
        if from == to {
            return Err(IrError::unsupported("cannot transfer a range into the list it came from"));
        }
        for owner in [from, to] {
            if self.kind(owner) != slot.owner_kind() {
                return Err(IrError::unsupported(format!("a {} has no {:?} list", self.kind(owner), slot)));
            }
        }
        let len = self.list(from, slot).len();
        if range.start > range.end || range.end > len {
            return Err(IrError::ownership(format!(
                "transfer range {:?} out of bounds for a list of {} members",
                range, len
            )));
        }

        let moved: Vec<ValueId> = self.list(from, slot)[range.clone()].to_vec();
        for &member in &moved {
            if slot == ListSlot::Contracts && self.is_contract_ancestor(member, to) {
                return Err(IrError::ownership(format!(
                    "contract '{}' cannot be nested inside itself",
                    self.name(member)
                )));
            }
            if slot == ListSlot::Blocks {
                self.validate_block_members(BlockId(member), FunctionId(to))?;
            }
        }
        let index = self.insertion_index(to, slot, before)?;

        self.list_mut(from, slot)?.drain(range);
        for &member in &moved {
            self.forget_name(from, member)?;
        }
        let destination = self.list_mut(to, slot)?;
        let tail = destination.split_off(index);
        destination.extend(moved.iter().copied());
        destination.extend(tail);
        for &member in &moved {
            self.slot_mut(member).parent = Some(to);
            self.reinsert_name(to, member)?;
        }
        debug!(
            "transferred {} members from '{}' to '{}'",
            moved.len(),
            self.name(from),
            self.name(to)
        );
        Ok(())
    }

    /// True when `candidate` is `contract` or one of its enclosing contracts
    fn is_contract_ancestor(&self, candidate: ValueId, contract: ValueId) -> bool {
        let mut current = Some(contract);
        while let Some(value) = current {
            if value == candidate {
                return true;
            }
            current = self.slot(value).parent;
        }
        false
    }

    fn members<H: ValueHandle>(&self, owner: ValueId, slot: ListSlot) -> impl Iterator<Item = H> + '_ {
        self.list(owner, slot).iter().map(|member| H::from_value_unchecked(*member))
    }

    // === Creation ===

    /// Create a sub-contract of `parent`
    pub fn create_subcontract(&mut self, name: &str, parent: ContractId) -> IrResult<ContractId> {
        self.check_value(parent.0)?;
        let contract = self.create_contract(name)?;
        self.insert_subcontract(parent, contract, None)?;
        Ok(contract)
    }

    pub fn create_global_variable(&mut self, name: &str, contract: Option<ContractId>) -> IrResult<GlobalVariableId> {
        check_name(name)?;
        let global = GlobalVariableId(self.alloc_value(ValueData::GlobalVariable(GlobalVariableData::default())));
        if let Some(contract) = contract {
            self.insert_global_variable(contract, global, None)?;
        }
        self.set_name(global, name)?;
        Ok(global)
    }

    pub fn create_function(&mut self, is_public: bool, name: &str, contract: Option<ContractId>) -> IrResult<FunctionId> {
        self.new_function(FunctionData { is_public, ..FunctionData::default() }, name, contract)
    }

    /// Create the contract constructor, always named `init`
    pub fn create_init_function(&mut self, contract: Option<ContractId>) -> IrResult<FunctionId> {
        let data = FunctionData { is_public: true, is_init: true, ..FunctionData::default() };
        self.new_function(data, INIT_FUNCTION_NAME, contract)
    }

    /// Create the deposit entry point, always named `deposit`
    pub fn create_deposit_function(&mut self, is_public: bool, contract: Option<ContractId>) -> IrResult<FunctionId> {
        let data = FunctionData { is_public, is_deposit: true, ..FunctionData::default() };
        self.new_function(data, DEPOSIT_FUNCTION_NAME, contract)
    }

    fn new_function(&mut self, data: FunctionData, name: &str, contract: Option<ContractId>) -> IrResult<FunctionId> {
        check_name(name)?;
        let function = FunctionId(self.alloc_value(ValueData::Function(data)));
        if let Some(contract) = contract {
            self.insert_function(contract, function, None)?;
        }
        self.set_name(function, name)?;
        Ok(function)
    }

    /// Create a block, appended to `function` or inserted before `before`
    pub fn create_block(&mut self, name: &str, function: Option<FunctionId>, before: Option<BlockId>) -> IrResult<BlockId> {
        check_name(name)?;
        let block = BlockId(self.alloc_value(ValueData::Block(BlockData::default())));
        match (function, before) {
            (Some(function), before) => self.insert_block_into(block, function, before)?,
            (None, Some(_)) => {
                return Err(IrError::ownership(
                    "cannot insert a block before another block without a function",
                ))
            }
            (None, None) => {}
        }
        self.set_name(block, name)?;
        Ok(block)
    }

    pub fn create_argument(&mut self, name: &str, function: Option<FunctionId>) -> IrResult<LocalId> {
        check_name(name)?;
        let argument = LocalId(self.alloc_value(ValueData::Argument));
        if let Some(function) = function {
            self.insert_argument(function, argument, None)?;
        }
        self.set_name(argument, name)?;
        Ok(argument)
    }

    pub fn create_local_variable(&mut self, name: &str, function: Option<FunctionId>) -> IrResult<LocalId> {
        check_name(name)?;
        let local = LocalId(self.alloc_value(ValueData::LocalVariable));
        if let Some(function) = function {
            self.insert_local_variable(function, local, None)?;
        }
        self.set_name(local, name)?;
        Ok(local)
    }

    // === Insertion ===

    pub fn insert_function(&mut self, contract: ContractId, function: FunctionId, before: Option<FunctionId>) -> IrResult<()> {
        self.list_insert(contract.0, ListSlot::Functions, function.0, before.map(|f| f.0))
    }

    pub fn insert_global_variable(
        &mut self,
        contract: ContractId,
        global: GlobalVariableId,
        before: Option<GlobalVariableId>,
    ) -> IrResult<()> {
        self.list_insert(contract.0, ListSlot::Globals, global.0, before.map(|g| g.0))
    }

    pub fn insert_subcontract(&mut self, parent: ContractId, child: ContractId, before: Option<ContractId>) -> IrResult<()> {
        self.list_insert(parent.0, ListSlot::Contracts, child.0, before.map(|c| c.0))
    }

    /// Insert `block` into `function`
    ///
    /// Every instruction already in the block must only reference locals,
    /// arguments and blocks of `function`.
    pub fn insert_block_into(&mut self, block: BlockId, function: FunctionId, before: Option<BlockId>) -> IrResult<()> {
        self.list_insert(function.0, ListSlot::Blocks, block.0, before.map(|b| b.0))
    }

    pub fn insert_argument(&mut self, function: FunctionId, argument: LocalId, before: Option<LocalId>) -> IrResult<()> {
        self.list_insert(function.0, ListSlot::Arguments, argument.0, before.map(|a| a.0))
    }

    pub fn insert_local_variable(&mut self, function: FunctionId, local: LocalId, before: Option<LocalId>) -> IrResult<()> {
        self.list_insert(function.0, ListSlot::Locals, local.0, before.map(|l| l.0))
    }

    // === Removal ===

    /// Detach a value from the container holding it
    ///
    /// The value survives and may be inserted elsewhere.
    pub fn remove_from_container(&mut self, value: impl Into<ValueId>) -> IrResult<()> {
        let value = value.into();
        self.check_value(value)?;
        let kind = self.kind(value);
        let Some(parent) = self.slot(value).parent else {
            return Err(IrError::ownership(format!("{} '{}' has no parent", kind, self.name(value))));
        };
        let slot = ListSlot::for_member(kind)
            .ok_or_else(|| IrError::unsupported(format!("a {} is never held in a container", kind)))?;
        self.list_remove(parent, slot, value)
    }

    // === Transfer ===

    pub fn transfer_functions(
        &mut self,
        from: ContractId,
        range: Range<usize>,
        to: ContractId,
        before: Option<FunctionId>,
    ) -> IrResult<()> {
        self.list_transfer(from.0, to.0, ListSlot::Functions, range, before.map(|f| f.0))
    }

    pub fn transfer_global_variables(
        &mut self,
        from: ContractId,
        range: Range<usize>,
        to: ContractId,
        before: Option<GlobalVariableId>,
    ) -> IrResult<()> {
        self.list_transfer(from.0, to.0, ListSlot::Globals, range, before.map(|g| g.0))
    }

    pub fn transfer_blocks(
        &mut self,
        from: FunctionId,
        range: Range<usize>,
        to: FunctionId,
        before: Option<BlockId>,
    ) -> IrResult<()> {
        self.list_transfer(from.0, to.0, ListSlot::Blocks, range, before.map(|b| b.0))
    }

    pub fn transfer_local_variables(
        &mut self,
        from: FunctionId,
        range: Range<usize>,
        to: FunctionId,
        before: Option<LocalId>,
    ) -> IrResult<()> {
        self.list_transfer(from.0, to.0, ListSlot::Locals, range, before.map(|l| l.0))
    }

    // === Contract queries ===

    pub fn functions(&self, contract: ContractId) -> impl Iterator<Item = FunctionId> + '_ {
        self.members(contract.0, ListSlot::Functions)
    }

    pub fn global_variables(&self, contract: ContractId) -> impl Iterator<Item = GlobalVariableId> + '_ {
        self.members(contract.0, ListSlot::Globals)
    }

    pub fn subcontracts(&self, contract: ContractId) -> impl Iterator<Item = ContractId> + '_ {
        self.members(contract.0, ListSlot::Contracts)
    }

    pub fn parent_contract(&self, value: impl Into<ValueId>) -> Option<ContractId> {
        let parent = self.parent(value)?;
        self.dyn_cast::<ContractId>(parent)
    }

    pub fn init_function(&self, contract: ContractId) -> Option<FunctionId> {
        self.functions(contract).find(|f| self.is_init(*f))
    }

    pub fn deposit_function(&self, contract: ContractId) -> Option<FunctionId> {
        self.functions(contract).find(|f| self.is_deposit(*f))
    }

    pub fn contract_metadata(&self, contract: ContractId) -> &[u8] {
        match &self.slot(contract.0).data {
            ValueData::Contract(data) => &data.metadata,
            _ => &[],
        }
    }

    pub fn set_contract_metadata(&mut self, contract: ContractId, metadata: Vec<u8>) {
        if let ValueData::Contract(data) = &mut self.slot_mut(contract.0).data {
            data.metadata = metadata;
        }
    }

    // === Global variable queries ===

    pub fn storage_address(&self, global: GlobalVariableId) -> Option<ConstantId> {
        match &self.slot(global.0).data {
            ValueData::GlobalVariable(data) => data.storage_address,
            _ => None,
        }
    }

    pub fn set_storage_address(&mut self, global: GlobalVariableId, address: ConstantId) -> IrResult<()> {
        self.check_value(address.0)?;
        if let ValueData::GlobalVariable(data) = &mut self.slot_mut(global.0).data {
            data.storage_address = Some(address);
        }
        Ok(())
    }

    // === Function queries ===

    pub fn arguments(&self, function: FunctionId) -> impl Iterator<Item = LocalId> + '_ {
        self.members(function.0, ListSlot::Arguments)
    }

    pub fn local_variables(&self, function: FunctionId) -> impl Iterator<Item = LocalId> + '_ {
        self.members(function.0, ListSlot::Locals)
    }

    pub fn blocks(&self, function: FunctionId) -> impl Iterator<Item = BlockId> + '_ {
        self.members(function.0, ListSlot::Blocks)
    }

    pub fn entry_block(&self, function: FunctionId) -> Option<BlockId> {
        self.blocks(function).next()
    }

    pub fn parent_function(&self, value: impl Into<ValueId>) -> Option<FunctionId> {
        let parent = self.parent(value)?;
        self.dyn_cast::<FunctionId>(parent)
    }

    fn function_data(&self, function: FunctionId) -> Option<&FunctionData> {
        match &self.slot(function.0).data {
            ValueData::Function(data) => Some(data),
            _ => None,
        }
    }

    fn function_data_mut(&mut self, function: FunctionId) -> Option<&mut FunctionData> {
        match &mut self.slot_mut(function.0).data {
            ValueData::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_public(&self, function: FunctionId) -> bool {
        self.function_data(function).is_some_and(|f| f.is_public)
    }

    pub fn is_init(&self, function: FunctionId) -> bool {
        self.function_data(function).is_some_and(|f| f.is_init)
    }

    pub fn is_deposit(&self, function: FunctionId) -> bool {
        self.function_data(function).is_some_and(|f| f.is_deposit)
    }

    pub fn set_public(&mut self, function: FunctionId, is_public: bool) {
        if let Some(data) = self.function_data_mut(function) {
            data.is_public = is_public;
        }
    }

    pub fn set_init(&mut self, function: FunctionId, is_init: bool) {
        if let Some(data) = self.function_data_mut(function) {
            data.is_init = is_init;
        }
    }

    pub fn set_deposit(&mut self, function: FunctionId, is_deposit: bool) {
        if let Some(data) = self.function_data_mut(function) {
            data.is_deposit = is_deposit;
        }
    }

    /// Whether `local` is a formal argument rather than a local variable
    pub fn is_argument(&self, local: LocalId) -> bool {
        self.kind(local) == ValueKind::Argument
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::handles::ValueId;
    use iele_common::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_creation_attaches_to_parent() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("token").unwrap();
        let function = ctx.create_function(true, "transfer", Some(contract)).unwrap();
        let global = ctx.create_global_variable("balance", Some(contract)).unwrap();
        let arg = ctx.create_argument("to", Some(function)).unwrap();
        let local = ctx.create_local_variable("tmp", Some(function)).unwrap();
        let block = ctx.create_block("entry", Some(function), None).unwrap();

        assert_eq!(ctx.parent(function), Some(contract.into()));
        assert_eq!(ctx.parent(global), Some(contract.into()));
        assert_eq!(ctx.parent_function(arg), Some(function));
        assert_eq!(ctx.parent_function(local), Some(function));
        assert_eq!(ctx.parent_function(block), Some(function));
        assert_eq!(ctx.functions(contract).collect::<Vec<_>>(), vec![function]);
        assert_eq!(ctx.arguments(function).collect::<Vec<_>>(), vec![arg]);
        assert_eq!(ctx.local_variables(function).collect::<Vec<_>>(), vec![local]);
        assert!(ctx.is_argument(arg));
        assert!(!ctx.is_argument(local));
        assert!(ctx.is_public(function));
    }

    #[test]
    fn test_malformed_name_creates_nothing() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        ctx.create_local_variable("x", Some(function)).unwrap();

        let err = ctx.create_local_variable("a\0b", Some(function)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedName);
        let err = ctx.create_function(false, "g\0", Some(contract)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedName);
        ctx.create_argument("\0", Some(function)).unwrap_err();
        ctx.create_block("b\0", Some(function), None).unwrap_err();
        ctx.create_global_variable("v\0", Some(contract)).unwrap_err();
        ctx.create_subcontract("s\0", contract).unwrap_err();
        ctx.create_contract("\0").unwrap_err();

        assert_eq!(ctx.local_variables(function).count(), 1);
        assert_eq!(ctx.functions(contract).count(), 1);
        assert_eq!(ctx.arguments(function).count(), 0);
        assert_eq!(ctx.blocks(function).count(), 0);
        assert_eq!(ctx.global_variables(contract).count(), 0);
        assert_eq!(ctx.subcontracts(contract).count(), 0);
        assert_eq!(ctx.contracts().count(), 1);
    }

    #[test]
    fn test_init_and_deposit_names() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let init = ctx.create_init_function(Some(contract)).unwrap();
        let deposit = ctx.create_deposit_function(true, Some(contract)).unwrap();
        assert_eq!(ctx.name(init), "init");
        assert_eq!(ctx.name(deposit), "deposit");
        assert_eq!(ctx.init_function(contract), Some(init));
        assert_eq!(ctx.deposit_function(contract), Some(deposit));
    }

    #[test]
    fn test_block_order_with_insert_before() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let exit = ctx.create_block("exit", Some(function), None).unwrap();
        let entry = ctx.create_block("entry", Some(function), Some(exit)).unwrap();
        assert_eq!(ctx.blocks(function).collect::<Vec<_>>(), vec![entry, exit]);
        assert_eq!(ctx.entry_block(function), Some(entry));
    }

    #[test]
    fn test_block_before_without_function_rejected() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let exit = ctx.create_block("exit", Some(function), None).unwrap();
        let err = ctx.create_block("orphan", None, Some(exit)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
    }

    #[test]
    fn test_remove_and_reinsert_restores_membership() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let f = ctx.create_function(false, "f", Some(contract)).unwrap();
        let g = ctx.create_function(false, "g", Some(contract)).unwrap();

        ctx.remove_from_container(f).unwrap();
        assert_eq!(ctx.parent(f), None);
        assert_eq!(ctx.contract_symbol_table(contract).lookup("f"), None);
        assert_eq!(ctx.functions(contract).collect::<Vec<_>>(), vec![g]);

        ctx.insert_function(contract, f, Some(g)).unwrap();
        assert_eq!(ctx.parent(f), Some(contract.into()));
        assert_eq!(ctx.contract_symbol_table(contract).lookup("f"), Some(f.into()));
        assert_eq!(ctx.functions(contract).collect::<Vec<_>>(), vec![f, g]);
    }

    #[test]
    fn test_reinsert_renames_on_collision() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let first = ctx.create_function(false, "f", Some(contract)).unwrap();
        let second = ctx.create_function(false, "f", None).unwrap();
        ctx.insert_function(contract, second, None).unwrap();
        assert_eq!(ctx.name(first), "f");
        assert_eq!(ctx.name(second), "f.1");
    }

    #[test]
    fn test_double_insert_rejected() {
        let mut ctx = Context::new();
        let a = ctx.create_contract("a").unwrap();
        let b = ctx.create_contract("b").unwrap();
        let f = ctx.create_function(false, "f", Some(a)).unwrap();
        let err = ctx.insert_function(b, f, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
        assert_eq!(ctx.functions(b).count(), 0);
    }

    #[test]
    fn test_remove_detached_rejected() {
        let mut ctx = Context::new();
        let local = ctx.create_local_variable("x", None).unwrap();
        let err = ctx.remove_from_container(local).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
    }

    #[test]
    fn test_subcontract_cycle_rejected() {
        let mut ctx = Context::new();
        let outer = ctx.create_contract("outer").unwrap();
        let inner = ctx.create_subcontract("inner", outer).unwrap();
        assert_eq!(ctx.subcontracts(outer).collect::<Vec<_>>(), vec![inner]);
        assert_eq!(ctx.parent_contract(inner), Some(outer));

        ctx.remove_from_container(inner).unwrap();
        ctx.insert_subcontract(inner, inner, None).unwrap_err();
    }

    #[test]
    fn test_transfer_locals_renames_into_destination() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let f = ctx.create_function(false, "f", Some(contract)).unwrap();
        let g = ctx.create_function(false, "g", Some(contract)).unwrap();
        let a = ctx.create_local_variable("x", Some(f)).unwrap();
        let b = ctx.create_local_variable("y", Some(f)).unwrap();
        let existing = ctx.create_local_variable("x", Some(g)).unwrap();

        ctx.transfer_local_variables(f, 0..2, g, Some(existing)).unwrap();
        assert_eq!(ctx.local_variables(f).count(), 0);
        assert_eq!(ctx.local_variables(g).collect::<Vec<_>>(), vec![a, b, existing]);
        assert_eq!(ctx.parent_function(a), Some(g));
        assert_eq!(ctx.name(a), "x1");
        assert!(ctx.function_symbol_table(f).is_empty());
        assert_eq!(ctx.function_symbol_table(g).lookup("x1"), Some(ValueId::from(a)));
    }

    #[test]
    fn test_transfer_out_of_bounds_rejected() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let f = ctx.create_function(false, "f", Some(contract)).unwrap();
        let g = ctx.create_function(false, "g", Some(contract)).unwrap();
        ctx.create_block("entry", Some(f), None).unwrap();
        assert!(ctx.transfer_blocks(f, 0..2, g, None).is_err());
        assert_eq!(ctx.blocks(f).count(), 1);
    }

    #[test]
    fn test_storage_address_and_metadata() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let global = ctx.create_global_variable("g", Some(contract)).unwrap();
        assert_eq!(ctx.storage_address(global), None);
        let slot = ctx.int_constant_hex(0x10);
        ctx.set_storage_address(global, slot).unwrap();
        assert_eq!(ctx.storage_address(global), Some(slot));

        ctx.set_contract_metadata(contract, b"abi".to_vec());
        assert_eq!(ctx.contract_metadata(contract), b"abi");
    }

    #[test]
    fn test_foreign_values_rejected() {
        let mut first = Context::new();
        let mut second = Context::new();
        let contract = first.create_contract("c").unwrap();
        let function = second.create_function(false, "f", None).unwrap();
        let err = first.insert_function(contract, function, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
    }
}
