//! Value Naming
//!
//! A value's name is unique within the symbol table of its owner: the parent
//! contract for contracts, functions and global variables, the parent
//! function for blocks, locals and arguments. Detached values keep their name
//! without a table.

use crate::context::Context;
use crate::handles::{ContractId, FunctionId, ValueId};
use crate::symbol_table::SymbolTable;
use crate::value::ValueKind;
use iele_common::{IrError, IrResult};
use log::trace;

/// Reject names the textual IR cannot spell
pub(crate) fn check_name(name: &str) -> IrResult<()> {
    if name.contains('\0') {
        return Err(IrError::malformed_name(format!("name {:?} contains a NUL byte", name)));
    }
    Ok(())
}

impl Context {
    /// Current name, empty when unnamed
    ///
    /// # Panics
    ///
    /// Panics if `value` was created by another context.
    pub fn name(&self, value: impl Into<ValueId>) -> &str {
        self.slot(value.into()).name.as_deref().unwrap_or("")
    }

    pub fn has_name(&self, value: impl Into<ValueId>) -> bool {
        self.slot(value.into()).name.is_some()
    }

    /// Rename `value`, uniquing against the owner's symbol table
    ///
    /// The stored name may differ from `name` when it collides. An empty
    /// `name` clears the current one.
    pub fn set_name(&mut self, value: impl Into<ValueId>, name: &str) -> IrResult<()> {
        let value = value.into();
        self.check_value(value)?;

        check_name(name)?;
        let kind = self.kind(value);
        if kind == ValueKind::IntConstant {
            return Err(IrError::unsupported("integer constants cannot be named"));
        }
        if self.name(value) == name {
            return Ok(());
        }

        let table_owner = self.symbol_table_owner(value);
        let old_name = self.slot_mut(value).name.take();

        let Some(owner) = table_owner else {
            if !name.is_empty() {
                self.slot_mut(value).name = Some(name.to_string());
            }
            return Ok(());
        };

        let new_name = {
            let table = self.owner_table_mut(owner)?;
            if let Some(old) = &old_name {
                table.remove(old, value);
            }
            if name.is_empty() {
                None
            } else {
                Some(table.insert_unique(name, value, kind.is_global_value()))
            }
        };
        trace!("renamed {} {:?} -> {:?}", kind, old_name, new_name);
        self.slot_mut(value).name = new_name;
        Ok(())
    }

    /// The contract or function whose table holds `value`'s name
    pub(crate) fn symbol_table_owner(&self, value: ValueId) -> Option<ValueId> {
        let parent = self.slot(value).parent?;
        match self.kind(parent) {
            ValueKind::Contract | ValueKind::Function => Some(parent),
            _ => None,
        }
    }

    pub(crate) fn owner_table_mut(&mut self, owner: ValueId) -> IrResult<&mut SymbolTable> {
        let kind = self.kind(owner);
        self.slot_mut(owner)
            .symbol_table_mut()
            .ok_or_else(|| IrError::unsupported(format!("a {} has no symbol table", kind)))
    }

    /// Enter an attached value's name into its new owner's table
    pub(crate) fn reinsert_name(&mut self, owner: ValueId, value: ValueId) -> IrResult<()> {
        let Some(name) = self.slot(value).name.clone() else {
            return Ok(());
        };
        let is_global = self.kind(value).is_global_value();
        let unique = self.owner_table_mut(owner)?.insert_unique(&name, value, is_global);
        self.slot_mut(value).name = Some(unique);
        Ok(())
    }

    /// Drop a value's name from the table it is leaving
    pub(crate) fn forget_name(&mut self, owner: ValueId, value: ValueId) -> IrResult<()> {
        let Some(name) = self.slot(value).name.clone() else {
            return Ok(());
        };
        self.owner_table_mut(owner)?.remove(&name, value);
        Ok(())
    }

    pub fn function_symbol_table(&self, function: FunctionId) -> &SymbolTable {
        self.owned_table(function.0)
    }

    pub fn contract_symbol_table(&self, contract: ContractId) -> &SymbolTable {
        self.owned_table(contract.0)
    }

    fn owned_table(&self, owner: ValueId) -> &SymbolTable {
        match self.slot(owner).symbol_table() {
            Some(table) => table,
            None => unreachable!("container handle without a symbol table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use iele_common::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detached_value_keeps_name() {
        let mut ctx = Context::new();
        let local = ctx.create_local_variable("x", None).unwrap();
        assert_eq!(ctx.name(local), "x");
        ctx.set_name(local, "").unwrap();
        assert!(!ctx.has_name(local));
    }

    #[test]
    fn test_function_scope_collisions() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let first = ctx.create_local_variable("tmp", Some(function)).unwrap();
        let second = ctx.create_local_variable("tmp", Some(function)).unwrap();
        assert_eq!(ctx.name(first), "tmp");
        assert_eq!(ctx.name(second), "tmp1");
        assert_eq!(ctx.function_symbol_table(function).lookup("tmp1"), Some(second.into()));
    }

    #[test]
    fn test_contract_scope_collisions() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let first = ctx.create_global_variable("g", Some(contract)).unwrap();
        let second = ctx.create_global_variable("g", Some(contract)).unwrap();
        assert_eq!(ctx.name(first), "g");
        assert_eq!(ctx.name(second), "g.1");
    }

    #[test]
    fn test_rename_frees_old_name() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let block = ctx.create_block("entry", Some(function), None).unwrap();
        ctx.set_name(block, "start").unwrap();
        let table = ctx.function_symbol_table(function);
        assert_eq!(table.lookup("entry"), None);
        assert_eq!(table.lookup("start"), Some(block.into()));
    }

    #[test]
    fn test_same_name_is_noop() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let local = ctx.create_local_variable("x", Some(function)).unwrap();
        ctx.set_name(local, "x").unwrap();
        assert_eq!(ctx.name(local), "x");
        assert_eq!(ctx.function_symbol_table(function).len(), 1);
    }

    #[test]
    fn test_nul_byte_rejected() {
        let mut ctx = Context::new();
        let local = ctx.create_local_variable("x", None).unwrap();
        let err = ctx.set_name(local, "a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedName);
        assert_eq!(ctx.name(local), "x");
    }

    #[test]
    fn test_constants_cannot_be_named() {
        let mut ctx = Context::new();
        let one = ctx.one();
        let err = ctx.set_name(one, "one").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
