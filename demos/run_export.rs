//! Loads a `.wasm` file and invokes one of its exports by name, printing the
//! result or the trap that stopped it. Unlike a parity-wasm-based loader,
//! there's no import-prefixed index space to translate a command-line
//! function name through: this engine has no function imports, so an
//! export name resolves directly to a function index.
use std::{env, sync::Arc};

use wembed::{Instance, Module, ValueCell};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <wasm file> <exported func> [<i32 arg>...]", args[0]);
        std::process::exit(1);
    }

    let bytes = std::fs::read(&args[1]).expect("failed to read wasm file");
    let module = Module::from_buffer(&bytes).expect("module failed to decode");

    let func_name = &args[2];
    let export = module.export(func_name).expect("no export with that name");
    let result_type = module.signature(export.index).expect("exported function has a signature").result;

    let call_args: Vec<ValueCell> = args[3..]
        .iter()
        .map(|raw| ValueCell::from(raw.parse::<i32>().unwrap_or_else(|_| panic!("argument {raw:?} is not an i32"))))
        .collect();

    let mut instance = Instance::new(Arc::new(module));
    match instance.call(func_name, &call_args) {
        Ok(Some(cell)) => match result_type {
            Some(ty) => println!("result: {}", cell.to_value(ty)),
            None => println!("result: <none>"),
        },
        Ok(None) if instance.is_trapped() => println!("trapped"),
        Ok(None) => println!("result: <none>"),
        Err(err) => println!("call rejected: {err}"),
    }
}
