//! Opcodes
//!
//! The catalog is laid out in three contiguous ranges, so range membership is
//! a single integer comparison: ordinary instructions first, then the call
//! family, then the `iele.*` intrinsics.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum Opcode {
    // Other
    Ret,
    Revert,
    Selfdestruct,
    Br,
    Assign,
    Load,
    Store,
    SLoad,
    SStore,
    IsZero,
    Not,
    Log2,
    Sha3,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    AddMod,
    MulMod,
    ExpMod,
    SExt,
    Twos,
    BSwap,
    Byte,
    Shift,
    And,
    Or,
    Xor,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Log,
    // Calls
    Call,
    CallAt,
    StaticCallAt,
    CallAddress,
    Create,
    CopyCreate,
    // Intrinsics
    Gas,
    GasPrice,
    GasLimit,
    Beneficiary,
    Timestamp,
    Number,
    Difficulty,
    Address,
    Origin,
    Caller,
    CallValue,
    MSize,
    CodeSize,
    BlockHash,
    Balance,
    ExtCodeSize,
}

/// Which of the three contiguous opcode ranges an opcode falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpcodeRange {
    Other,
    Call,
    Intrinsic,
}

/// Accepted count of results or operands for an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
    OneOf(&'static [usize]),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::AtMost(n) => count <= n,
            Arity::OneOf(counts) => counts.contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::AtMost(n) => write!(f, "at most {}", n),
            Arity::OneOf(counts) => {
                let counts: Vec<String> = counts.iter().map(|n| n.to_string()).collect();
                write!(f, "one of {}", counts.join(", "))
            }
        }
    }
}

/// Result and operand counts an opcode requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub results: Arity,
    pub operands: Arity,
}

impl Opcode {
    pub const OTHERS_BEGIN: u16 = Opcode::Ret as u16;
    pub const OTHERS_END: u16 = Opcode::Log as u16 + 1;
    pub const CALLS_BEGIN: u16 = Opcode::Call as u16;
    pub const CALLS_END: u16 = Opcode::CopyCreate as u16 + 1;
    pub const INTRINSICS_BEGIN: u16 = Opcode::Gas as u16;
    pub const INTRINSICS_END: u16 = Opcode::ExtCodeSize as u16 + 1;

    /// Every opcode, indexed by its discriminant
    pub const ALL: [Opcode; 59] = [
        Opcode::Ret,
        Opcode::Revert,
        Opcode::Selfdestruct,
        Opcode::Br,
        Opcode::Assign,
        Opcode::Load,
        Opcode::Store,
        Opcode::SLoad,
        Opcode::SStore,
        Opcode::IsZero,
        Opcode::Not,
        Opcode::Log2,
        Opcode::Sha3,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Exp,
        Opcode::AddMod,
        Opcode::MulMod,
        Opcode::ExpMod,
        Opcode::SExt,
        Opcode::Twos,
        Opcode::BSwap,
        Opcode::Byte,
        Opcode::Shift,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::CmpEq,
        Opcode::CmpNe,
        Opcode::CmpLt,
        Opcode::CmpLe,
        Opcode::CmpGt,
        Opcode::CmpGe,
        Opcode::Log,
        Opcode::Call,
        Opcode::CallAt,
        Opcode::StaticCallAt,
        Opcode::CallAddress,
        Opcode::Create,
        Opcode::CopyCreate,
        Opcode::Gas,
        Opcode::GasPrice,
        Opcode::GasLimit,
        Opcode::Beneficiary,
        Opcode::Timestamp,
        Opcode::Number,
        Opcode::Difficulty,
        Opcode::Address,
        Opcode::Origin,
        Opcode::Caller,
        Opcode::CallValue,
        Opcode::MSize,
        Opcode::CodeSize,
        Opcode::BlockHash,
        Opcode::Balance,
        Opcode::ExtCodeSize,
    ];

    pub fn from_u16(raw: u16) -> Option<Opcode> {
        Opcode::ALL.get(raw as usize).copied()
    }

    pub fn range(self) -> OpcodeRange {
        let raw = self as u16;
        if (Self::CALLS_BEGIN..Self::CALLS_END).contains(&raw) {
            OpcodeRange::Call
        } else if (Self::INTRINSICS_BEGIN..Self::INTRINSICS_END).contains(&raw) {
            OpcodeRange::Intrinsic
        } else {
            OpcodeRange::Other
        }
    }

    pub fn is_call(self) -> bool {
        (Self::CALLS_BEGIN..Self::CALLS_END).contains(&(self as u16))
    }

    pub fn is_intrinsic(self) -> bool {
        (Self::INTRINSICS_BEGIN..Self::INTRINSICS_END).contains(&(self as u16))
    }

    /// Branches, returns and reverts end a straight-line run
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Br | Opcode::Ret | Opcode::Revert)
    }

    pub fn is_binary_op(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Exp
                | Opcode::SExt
                | Opcode::Twos
                | Opcode::BSwap
                | Opcode::Byte
                | Opcode::Shift
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::CmpLt
                | Opcode::CmpLe
                | Opcode::CmpGt
                | Opcode::CmpGe
        )
    }

    pub fn is_ternary_op(self) -> bool {
        matches!(self, Opcode::AddMod | Opcode::MulMod | Opcode::ExpMod)
    }

    pub fn is_unary_op(self) -> bool {
        matches!(self, Opcode::IsZero | Opcode::Not | Opcode::Log2 | Opcode::Sha3)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::CmpEq | Opcode::CmpNe | Opcode::CmpLt | Opcode::CmpLe | Opcode::CmpGt | Opcode::CmpGe
        )
    }

    /// Result and operand counts every instance of this opcode must have
    pub fn shape(self) -> Shape {
        use Arity::*;
        let (results, operands) = match self {
            Opcode::Ret => (Exact(0), AtLeast(0)),
            Opcode::Revert | Opcode::Selfdestruct => (Exact(0), Exact(1)),
            Opcode::Br => (Exact(0), OneOf(&[1, 2])),
            Opcode::Assign | Opcode::SLoad => (Exact(1), Exact(1)),
            Opcode::Load => (Exact(1), OneOf(&[1, 3])),
            Opcode::Store => (Exact(0), OneOf(&[2, 4])),
            Opcode::SStore => (Exact(0), Exact(2)),
            Opcode::Log => (Exact(0), AtLeast(1)),
            op if op.is_unary_op() => (Exact(1), Exact(1)),
            op if op.is_binary_op() => (Exact(1), Exact(2)),
            op if op.is_ternary_op() => (Exact(1), Exact(3)),
            Opcode::Call => (AtLeast(0), AtLeast(1)),
            Opcode::CallAt => (AtLeast(1), AtLeast(4)),
            Opcode::StaticCallAt => (AtLeast(1), AtLeast(3)),
            Opcode::CallAddress => (Exact(1), Exact(2)),
            Opcode::Create | Opcode::CopyCreate => (Exact(2), AtLeast(2)),
            _ => (AtMost(1), AtLeast(0)),
        };
        Shape { results, operands }
    }

    /// Assembly spelling; assignment has none
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ret => "ret",
            Opcode::Revert => "revert",
            Opcode::Selfdestruct => "selfdestruct",
            Opcode::Br => "br",
            Opcode::Assign => "",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::SLoad => "sload",
            Opcode::SStore => "sstore",
            Opcode::IsZero => "iszero",
            Opcode::Not => "not",
            Opcode::Log2 => "log2",
            Opcode::Sha3 => "sha3",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Exp => "exp",
            Opcode::AddMod => "addmod",
            Opcode::MulMod => "mulmod",
            Opcode::ExpMod => "expmod",
            Opcode::SExt => "sext",
            Opcode::Twos => "twos",
            Opcode::BSwap => "bswap",
            Opcode::Byte => "byte",
            Opcode::Shift => "shift",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::CmpEq => "cmp eq",
            Opcode::CmpNe => "cmp ne",
            Opcode::CmpLt => "cmp lt",
            Opcode::CmpLe => "cmp le",
            Opcode::CmpGt => "cmp gt",
            Opcode::CmpGe => "cmp ge",
            Opcode::Log => "log",
            Opcode::Call | Opcode::CallAt => "call",
            Opcode::StaticCallAt => "staticcall",
            Opcode::CallAddress => "calladdress",
            Opcode::Create => "create",
            Opcode::CopyCreate => "copycreate",
            Opcode::Gas => "iele.gas",
            Opcode::GasPrice => "iele.gasprice",
            Opcode::GasLimit => "iele.gaslimit",
            Opcode::Beneficiary => "iele.beneficiary",
            Opcode::Timestamp => "iele.timestamp",
            Opcode::Number => "iele.number",
            Opcode::Difficulty => "iele.difficulty",
            Opcode::Address => "iele.address",
            Opcode::Origin => "iele.origin",
            Opcode::Caller => "iele.caller",
            Opcode::CallValue => "iele.callvalue",
            Opcode::MSize => "iele.msize",
            Opcode::CodeSize => "iele.codesize",
            Opcode::BlockHash => "iele.blockhash",
            Opcode::Balance => "iele.balance",
            Opcode::ExtCodeSize => "iele.extcodesize",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Assign => write!(f, "assign"),
            op => write!(f, "{}", op.mnemonic()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_discriminants_are_contiguous() {
        for (index, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*opcode as u16 as usize, index);
            assert_eq!(Opcode::from_u16(index as u16), Some(*opcode));
        }
        assert_eq!(Opcode::from_u16(Opcode::ALL.len() as u16), None);
    }

    #[test]
    fn test_ranges_partition_catalog() {
        assert_eq!(Opcode::OTHERS_BEGIN, 0);
        assert_eq!(Opcode::OTHERS_END, Opcode::CALLS_BEGIN);
        assert_eq!(Opcode::CALLS_END, Opcode::INTRINSICS_BEGIN);
        assert_eq!(Opcode::INTRINSICS_END as usize, Opcode::ALL.len());

        for opcode in Opcode::ALL {
            let expected = match opcode {
                Opcode::Call
                | Opcode::CallAt
                | Opcode::StaticCallAt
                | Opcode::CallAddress
                | Opcode::Create
                | Opcode::CopyCreate => OpcodeRange::Call,
                op if op.mnemonic().starts_with("iele.") => OpcodeRange::Intrinsic,
                _ => OpcodeRange::Other,
            };
            assert_eq!(opcode.range(), expected, "{:?}", opcode);
            assert_eq!(opcode.is_call(), expected == OpcodeRange::Call);
            assert_eq!(opcode.is_intrinsic(), expected == OpcodeRange::Intrinsic);
        }
    }

    #[test]
    fn test_shapes() {
        assert!(Opcode::Add.shape().results.accepts(1));
        assert!(Opcode::Add.shape().operands.accepts(2));
        assert!(!Opcode::Add.shape().operands.accepts(3));
        assert!(Opcode::Br.shape().operands.accepts(1));
        assert!(Opcode::Br.shape().operands.accepts(2));
        assert!(!Opcode::Br.shape().operands.accepts(3));
        assert!(!Opcode::Load.shape().operands.accepts(2));
        assert!(Opcode::Gas.shape().results.accepts(0));
        assert!(!Opcode::Gas.shape().results.accepts(2));
        assert_eq!(Opcode::MulMod.shape().operands, Arity::Exact(3));
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::CmpLe.mnemonic(), "cmp le");
        assert_eq!(Opcode::StaticCallAt.mnemonic(), "staticcall");
        assert_eq!(Opcode::Assign.mnemonic(), "");
        assert_eq!(Opcode::Assign.to_string(), "assign");
        assert_eq!(Opcode::ExtCodeSize.to_string(), "iele.extcodesize");
    }

    #[test]
    fn test_opcode_serializes_by_name() {
        let json = serde_json::to_string(&Opcode::AddMod).unwrap();
        assert_eq!(json, "\"AddMod\"");
        let back: Opcode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Opcode::AddMod);
    }
}
