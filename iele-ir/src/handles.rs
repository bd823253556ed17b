//! Stable Handles
//!
//! Every IR entity lives in an arena owned by a [`Context`](crate::Context)
//! and is addressed by a small copyable handle. Handles remember which context
//! created them, so a handle can never silently alias an entity of another
//! compilation.

use crate::value::ValueKind;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter handing out one id per context
static CONTEXT_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Identity of a [`Context`](crate::Context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    pub(crate) fn fresh() -> Self {
        ContextId(CONTEXT_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Handle to any value in a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId {
    pub(crate) context: ContextId,
    pub(crate) index: u32,
}

impl ValueId {
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

/// Handle to an instruction in a context
///
/// Instructions are not values: an `InstId` can never be used as an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId {
    pub(crate) context: ContextId,
    pub(crate) index: u32,
}

impl InstId {
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.index)
    }
}

/// A handle that can be recovered from a [`ValueId`] by kind inspection
///
/// `classof` decides which value kinds a handle type accepts. It backs
/// [`Context::isa`](crate::Context::isa) and
/// [`Context::dyn_cast`](crate::Context::dyn_cast).
pub trait ValueHandle: Copy + Into<ValueId> {
    fn classof(kind: ValueKind) -> bool;

    #[doc(hidden)]
    fn from_value_unchecked(value: ValueId) -> Self;
}

impl ValueHandle for ValueId {
    fn classof(_kind: ValueKind) -> bool {
        true
    }

    fn from_value_unchecked(value: ValueId) -> Self {
        value
    }
}

macro_rules! define_value_handle {
    ($(#[$meta:meta])* $name:ident => $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) ValueId);

        impl $name {
            pub fn as_value(&self) -> ValueId {
                self.0
            }
        }

        impl From<$name> for ValueId {
            fn from(handle: $name) -> ValueId {
                handle.0
            }
        }

        impl ValueHandle for $name {
            fn classof(kind: ValueKind) -> bool {
                matches!(kind, $(ValueKind::$kind)|+)
            }

            fn from_value_unchecked(value: ValueId) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_value_handle!(
    /// Handle to an interned integer constant
    ConstantId => IntConstant
);
define_value_handle!(
    /// Handle to a contract-scoped storage slot
    GlobalVariableId => GlobalVariable
);
define_value_handle!(
    /// Handle to a function
    FunctionId => Function
);
define_value_handle!(
    /// Handle to a contract
    ContractId => Contract
);
define_value_handle!(
    /// Handle to a basic block
    BlockId => Block
);
define_value_handle!(
    /// Handle to a local variable or a formal argument
    LocalId => LocalVariable | Argument
);
define_value_handle!(
    /// Handle to a contract-scope global value: a function or a global variable
    GlobalValueId => Function | GlobalVariable
);

impl From<FunctionId> for GlobalValueId {
    fn from(function: FunctionId) -> Self {
        GlobalValueId(function.0)
    }
}

impl From<GlobalVariableId> for GlobalValueId {
    fn from(global: GlobalVariableId) -> Self {
        GlobalValueId(global.0)
    }
}
