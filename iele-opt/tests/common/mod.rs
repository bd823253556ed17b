use iele_ir::{BlockId, Context, ContractId, FunctionId};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A context holding contract `c` with an empty function `f`
pub fn function_fixture() -> (Context, ContractId, FunctionId) {
    init_logging();
    let mut ctx = Context::new();
    let contract = ctx.create_contract("c").unwrap();
    let function = ctx.create_function(true, "f", Some(contract)).unwrap();
    (ctx, contract, function)
}

pub fn block(ctx: &mut Context, function: FunctionId, name: &str) -> BlockId {
    ctx.create_block(name, Some(function), None).unwrap()
}
