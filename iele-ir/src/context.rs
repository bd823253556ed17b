//! IR Context
//!
//! The context owns every value and instruction of one compilation, interns
//! integer constants and keeps the list of top-level contracts. Dropping the
//! context releases everything it created.
//!
//! Fallible operations report a handle from another context as an
//! ownership violation. The plain queries (`kind`, `name`, `parent`,
//! `opcode`, `operands`, ...) panic on such a handle instead; check with
//! [`Context::owns_value`] or [`Context::owns_instruction`] first when the
//! handle's origin is unknown.

use crate::handles::{ConstantId, ContextId, ContractId, InstId, ValueHandle, ValueId};
use crate::instruction::InstructionData;
use crate::naming::check_name;
use crate::value::{ContractData, IntConstantData, ValueData, ValueKind, ValueSlot};
use iele_common::{IrError, IrResult};
use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::collections::HashMap;

pub struct Context {
    id: ContextId,
    values: Vec<ValueSlot>,
    pub(crate) instructions: Vec<Option<InstructionData>>,
    constants: HashMap<BigInt, ConstantId>,
    contracts: Vec<ContractId>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        let id = ContextId::fresh();
        debug!("created IR context {:?}", id);
        Context {
            id,
            values: Vec::new(),
            instructions: Vec::new(),
            constants: HashMap::new(),
            contracts: Vec::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn owns_value(&self, value: impl Into<ValueId>) -> bool {
        let value = value.into();
        value.context == self.id && (value.index as usize) < self.values.len()
    }

    pub fn owns_instruction(&self, inst: InstId) -> bool {
        inst.context == self.id
            && self.instructions.get(inst.index as usize).is_some_and(|slot| slot.is_some())
    }

    pub(crate) fn check_value(&self, value: ValueId) -> IrResult<()> {
        if self.owns_value(value) {
            Ok(())
        } else {
            Err(IrError::ownership(format!("value {} belongs to a different context", value)))
        }
    }

    pub(crate) fn alloc_value(&mut self, data: ValueData) -> ValueId {
        let index = self.values.len() as u32;
        self.values.push(ValueSlot::new(data));
        ValueId { context: self.id, index }
    }

    /// # Panics
    ///
    /// Panics if `value` was created by another context.
    pub(crate) fn slot(&self, value: ValueId) -> &ValueSlot {
        assert_eq!(value.context, self.id, "value {} used with a foreign context", value);
        &self.values[value.index as usize]
    }

    pub(crate) fn slot_mut(&mut self, value: ValueId) -> &mut ValueSlot {
        assert_eq!(value.context, self.id, "value {} used with a foreign context", value);
        &mut self.values[value.index as usize]
    }

    // === Kind queries ===

    /// # Panics
    ///
    /// Panics if `value` was created by another context.
    pub fn kind(&self, value: impl Into<ValueId>) -> ValueKind {
        self.slot(value.into()).kind()
    }

    pub fn isa<H: ValueHandle>(&self, value: impl Into<ValueId>) -> bool {
        H::classof(self.kind(value))
    }

    pub fn dyn_cast<H: ValueHandle>(&self, value: impl Into<ValueId>) -> Option<H> {
        let value = value.into();
        if self.isa::<H>(value) {
            Some(H::from_value_unchecked(value))
        } else {
            None
        }
    }

    /// Like [`Context::dyn_cast`], reporting the mismatch as an error
    pub fn cast<H: ValueHandle>(&self, value: impl Into<ValueId>) -> IrResult<H> {
        let value = value.into();
        self.check_value(value)?;
        self.dyn_cast::<H>(value).ok_or_else(|| {
            IrError::unsupported(format!(
                "{} '{}' has the wrong kind for this use",
                self.kind(value),
                self.name(value)
            ))
        })
    }

    /// Owning contract or function, if attached
    ///
    /// # Panics
    ///
    /// Panics if `value` was created by another context.
    pub fn parent(&self, value: impl Into<ValueId>) -> Option<ValueId> {
        self.slot(value.into()).parent
    }

    // === Integer constants ===

    /// The unique constant for `value` in this context
    ///
    /// The first request for a value decides whether it prints as hex.
    pub fn int_constant(&mut self, value: impl Into<BigInt>) -> ConstantId {
        self.intern(value.into(), false)
    }

    pub fn int_constant_hex(&mut self, value: impl Into<BigInt>) -> ConstantId {
        self.intern(value.into(), true)
    }

    pub fn zero(&mut self) -> ConstantId {
        self.int_constant(BigInt::zero())
    }

    pub fn one(&mut self) -> ConstantId {
        self.int_constant(BigInt::one())
    }

    pub fn minus_one(&mut self) -> ConstantId {
        self.int_constant(-BigInt::one())
    }

    fn intern(&mut self, value: BigInt, print_as_hex: bool) -> ConstantId {
        if let Some(existing) = self.constants.get(&value) {
            return *existing;
        }
        let id = ConstantId(self.alloc_value(ValueData::IntConstant(IntConstantData {
            value: value.clone(),
            print_as_hex,
        })));
        self.constants.insert(value, id);
        id
    }

    pub fn constant_value(&self, constant: ConstantId) -> &BigInt {
        match &self.slot(constant.0).data {
            ValueData::IntConstant(data) => &data.value,
            _ => unreachable!("constant handle to a non-constant value"),
        }
    }

    pub fn prints_as_hex(&self, constant: ConstantId) -> bool {
        match &self.slot(constant.0).data {
            ValueData::IntConstant(data) => data.print_as_hex,
            _ => unreachable!("constant handle to a non-constant value"),
        }
    }

    pub fn interned_constant_count(&self) -> usize {
        self.constants.len()
    }

    // === Contracts ===

    /// Create a top-level contract owned by this context
    pub fn create_contract(&mut self, name: &str) -> IrResult<ContractId> {
        check_name(name)?;
        let contract = ContractId(self.alloc_value(ValueData::Contract(ContractData::default())));
        self.set_name(contract, name)?;
        self.contracts.push(contract);
        debug!("created contract '{}'", name);
        Ok(contract)
    }

    /// Every contract of this context, nested ones included, in creation order
    pub fn contracts(&self) -> impl Iterator<Item = ContractId> + '_ {
        self.contracts.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::{BlockId, FunctionId, LocalId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constants_are_interned() {
        let mut ctx = Context::new();
        let a = ctx.int_constant(42);
        let b = ctx.int_constant(BigInt::from(42u8));
        assert_eq!(a, b);
        assert_eq!(ctx.interned_constant_count(), 1);
        assert_ne!(a, ctx.int_constant(43));
    }

    #[test]
    fn test_first_hex_flag_wins() {
        let mut ctx = Context::new();
        let hex = ctx.int_constant_hex(255);
        let plain = ctx.int_constant(255);
        assert_eq!(hex, plain);
        assert!(ctx.prints_as_hex(plain));
    }

    #[test]
    fn test_no_reserved_constant_values() {
        let mut ctx = Context::new();
        let zero = ctx.zero();
        let minus_one = ctx.minus_one();
        let minus_two = ctx.int_constant(-2);
        assert_eq!(ctx.constant_value(zero), &BigInt::zero());
        assert_eq!(ctx.constant_value(minus_one), &BigInt::from(-1));
        assert_eq!(ctx.constant_value(minus_two), &BigInt::from(-2));
        assert_eq!(ctx.interned_constant_count(), 3);
    }

    #[test]
    fn test_huge_constants() {
        let mut ctx = Context::new();
        let big: BigInt = BigInt::one() << 300;
        let a = ctx.int_constant(big.clone());
        let b = ctx.int_constant(big.clone());
        assert_eq!(a, b);
        assert_eq!(ctx.constant_value(a), &big);
    }

    #[test]
    fn test_dyn_cast() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let value: ValueId = contract.into();
        assert!(ctx.isa::<ContractId>(value));
        assert!(!ctx.isa::<FunctionId>(value));
        assert_eq!(ctx.dyn_cast::<ContractId>(value), Some(contract));
        assert_eq!(ctx.dyn_cast::<BlockId>(value), None);
        assert!(ctx.cast::<LocalId>(value).is_err());
    }

    #[test]
    fn test_contexts_do_not_share_values() {
        let mut first = Context::new();
        let second = Context::new();
        let one = first.one();
        assert!(first.owns_value(one));
        assert!(!second.owns_value(one));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    #[should_panic(expected = "used with a foreign context")]
    fn test_query_with_foreign_value_panics() {
        let mut first = Context::new();
        let second = Context::new();
        let one = first.one();
        second.kind(one);
    }
}
