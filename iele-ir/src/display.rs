//! Textual IR
//!
//! Display adapters that print values, instructions, blocks, functions and
//! contracts in IELE assembly syntax. Used for diagnostics and trace logs.

use crate::context::Context;
use crate::handles::{BlockId, ConstantId, ContractId, FunctionId, InstId, ValueId};
use crate::opcode::Opcode;
use crate::value::ValueKind;
use std::fmt;

pub struct DisplayValue<'a> {
    ctx: &'a Context,
    value: ValueId,
}

pub struct DisplayInstruction<'a> {
    ctx: &'a Context,
    inst: InstId,
}

pub struct DisplayBlock<'a> {
    ctx: &'a Context,
    block: BlockId,
}

pub struct DisplayFunction<'a> {
    ctx: &'a Context,
    function: FunctionId,
}

pub struct DisplayContract<'a> {
    ctx: &'a Context,
    contract: ContractId,
}

impl Context {
    /// Operand spelling of a value: `%local`, `@global`, `label` or a literal
    pub fn display_value(&self, value: impl Into<ValueId>) -> DisplayValue<'_> {
        DisplayValue { ctx: self, value: value.into() }
    }

    pub fn display_instruction(&self, inst: InstId) -> DisplayInstruction<'_> {
        DisplayInstruction { ctx: self, inst }
    }

    pub fn display_block(&self, block: BlockId) -> DisplayBlock<'_> {
        DisplayBlock { ctx: self, block }
    }

    pub fn display_function(&self, function: FunctionId) -> DisplayFunction<'_> {
        DisplayFunction { ctx: self, function }
    }

    pub fn display_contract(&self, contract: ContractId) -> DisplayContract<'_> {
        DisplayContract { ctx: self, contract }
    }
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        match ctx.kind(self.value) {
            ValueKind::IntConstant => {
                let constant = ConstantId(self.value);
                let value = ctx.constant_value(constant);
                if ctx.prints_as_hex(constant) {
                    write!(f, "{:#x}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            ValueKind::LocalVariable | ValueKind::Argument => write!(f, "%{}", ctx.name(self.value)),
            ValueKind::GlobalVariable | ValueKind::Function => write!(f, "@{}", ctx.name(self.value)),
            ValueKind::Block | ValueKind::Contract => write!(f, "{}", ctx.name(self.value)),
        }
    }
}

fn write_list<I>(f: &mut fmt::Formatter<'_>, ctx: &Context, values: I) -> fmt::Result
where
    I: IntoIterator,
    I::Item: Into<ValueId>,
{
    for (index, value) in values.into_iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ctx.display_value(value))?;
    }
    Ok(())
}

impl fmt::Display for DisplayInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        let opcode = ctx.opcode(self.inst);
        let results = ctx.results(self.inst);
        let operands = ctx.operands(self.inst);

        // Account calls and creations lay their results out themselves
        let self_printing = matches!(
            opcode,
            Opcode::CallAt | Opcode::StaticCallAt | Opcode::Create | Opcode::CopyCreate
        );
        if !results.is_empty() && !self_printing {
            write_list(f, ctx, results.iter().copied())?;
            write!(f, " = ")?;
        }

        match opcode {
            Opcode::Ret if operands.is_empty() => write!(f, "ret void"),
            Opcode::Assign => write!(f, "{}", ctx.display_value(operands[0])),
            Opcode::Call => {
                write!(f, "call {}(", ctx.display_value(operands[0]))?;
                write_list(f, ctx, operands[1..].iter().copied())?;
                write!(f, ")")
            }
            Opcode::CallAt | Opcode::StaticCallAt => {
                write_list(f, ctx, results.iter().copied())?;
                write!(
                    f,
                    " = {} {} at {} (",
                    opcode.mnemonic(),
                    ctx.display_value(operands[0]),
                    ctx.display_value(operands[1])
                )?;
                let (transfer, gas, args) = if opcode == Opcode::CallAt {
                    (Some(operands[2]), operands[3], &operands[4..])
                } else {
                    (None, operands[2], &operands[3..])
                };
                write_list(f, ctx, args.iter().copied())?;
                write!(f, ")")?;
                if let Some(transfer) = transfer {
                    write!(f, " send {},", ctx.display_value(transfer))?;
                }
                write!(f, " gaslimit {}", ctx.display_value(gas))
            }
            Opcode::CallAddress => write!(
                f,
                "calladdress {} at {}",
                ctx.display_value(operands[0]),
                ctx.display_value(operands[1])
            ),
            Opcode::Create | Opcode::CopyCreate => {
                write_list(f, ctx, results.iter().copied())?;
                write!(f, " = {} {} (", opcode.mnemonic(), ctx.display_value(operands[0]))?;
                write_list(f, ctx, operands[2..].iter().copied())?;
                write!(f, ") send {}", ctx.display_value(operands[1]))
            }
            op if op.is_intrinsic() => {
                write!(f, "call @{}(", op.mnemonic())?;
                write_list(f, ctx, operands.iter().copied())?;
                write!(f, ")")
            }
            op => {
                write!(f, "{} ", op.mnemonic())?;
                write_list(f, ctx, operands.iter().copied())
            }
        }
    }
}

impl fmt::Display for DisplayBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.ctx.name(self.block))?;
        for inst in self.ctx.instructions(self.block) {
            writeln!(f, "  {}", self.ctx.display_instruction(inst))?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        write!(f, "define ")?;
        if ctx.is_public(self.function) {
            write!(f, "public ")?;
        }
        write!(f, "@{}(", ctx.name(self.function))?;
        write_list(f, ctx, ctx.arguments(self.function))?;
        writeln!(f, ") {{")?;
        for (index, block) in ctx.blocks(self.function).enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", ctx.display_block(block))?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for DisplayContract<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        for sub in ctx.subcontracts(self.contract) {
            writeln!(f, "{}", ctx.display_contract(sub))?;
        }
        writeln!(f, "contract {} {{", ctx.name(self.contract))?;
        for sub in ctx.subcontracts(self.contract) {
            writeln!(f, "external contract {}", ctx.name(sub))?;
        }
        for global in ctx.global_variables(self.contract) {
            write!(f, "{}", ctx.display_value(global))?;
            if let Some(address) = ctx.storage_address(global) {
                write!(f, " = {}", ctx.display_value(address))?;
            }
            writeln!(f)?;
        }
        for function in ctx.functions(self.contract) {
            writeln!(f)?;
            write!(f, "{}", ctx.display_function(function))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::opcode::Opcode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_text() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(true, "f", Some(contract)).unwrap();
        let entry = ctx.create_block("entry", Some(function), None).unwrap();
        let exit = ctx.create_block("exit", Some(function), None).unwrap();
        let a = ctx.create_argument("a", Some(function)).unwrap();
        let x = ctx.create_local_variable("x", Some(function)).unwrap();
        let mask = ctx.int_constant_hex(255);

        let and = ctx.create_binary_op(Opcode::And, x, a, mask, entry).unwrap();
        let cmp = ctx.create_binary_op(Opcode::CmpLt, x, x, a, entry).unwrap();
        let br = ctx.create_cond_br(x, exit, entry).unwrap();
        let ret = ctx.create_ret_void(exit).unwrap();

        assert_eq!(ctx.display_instruction(and).to_string(), "%x = and %a, 0xff");
        assert_eq!(ctx.display_instruction(cmp).to_string(), "%x = cmp lt %x, %a");
        assert_eq!(ctx.display_instruction(br).to_string(), "br %x, exit");
        assert_eq!(ctx.display_instruction(ret).to_string(), "ret void");
    }

    #[test]
    fn test_function_text() {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(true, "id", Some(contract)).unwrap();
        let a = ctx.create_argument("a", Some(function)).unwrap();
        let entry = ctx.create_block("entry", Some(function), None).unwrap();
        ctx.create_ret(&[a.into()], entry).unwrap();

        let expected = "define public @id(%a) {\nentry:\n  ret %a\n}\n";
        assert_eq!(ctx.display_function(function).to_string(), expected);
    }

    #[test]
    fn test_negative_constant() {
        let mut ctx = Context::new();
        let minus_one = ctx.minus_one();
        assert_eq!(ctx.display_value(minus_one).to_string(), "-1");
    }
}
