use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use wembed::{Instance, Module, ValueCell};

// No loop or branch opcodes: this engine rejects control flow at lowering
// time, so every benchmark fixture is straight-line code.
const ARITHMETIC: &str = r#"
(module
  (func (export "poly") (param i64) (result i64)
    local.get 0
    local.get 0
    i64.mul
    local.get 0
    i64.mul
    i64.const 7
    i64.add))
"#;

const COUNT_UNTIL: &str = r#"
(module
  (func (export "identity") (param i32) (result i32)
    local.get 0))
"#;

fn wasm_bytes(text: &str) -> Vec<u8> {
    wat::parse_str(text).unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let bytes = wasm_bytes(COUNT_UNTIL);
    c.bench_function("decode/identity", |b| {
        b.iter(|| {
            let _module = Module::from_buffer(&bytes).unwrap();
        })
    });
}

fn bench_lower(c: &mut Criterion) {
    let bytes = wasm_bytes(COUNT_UNTIL);
    c.bench_function("lower/identity", |b| {
        b.iter(|| {
            let module = Module::from_buffer(&bytes).unwrap();
            let export = module.export("identity").unwrap();
            let _lowered = module.lowered_function(export.index).unwrap();
        })
    });
}

fn bench_instantiate(c: &mut Criterion) {
    let bytes = wasm_bytes(COUNT_UNTIL);
    let module = Arc::new(Module::from_buffer(&bytes).unwrap());
    c.bench_function("instantiate/identity", |b| {
        b.iter(|| {
            let _instance = Instance::new(module.clone());
        })
    });
}

fn bench_execute_arithmetic(c: &mut Criterion) {
    let bytes = wasm_bytes(ARITHMETIC);
    let module = Arc::new(Module::from_buffer(&bytes).unwrap());
    let mut instance = Instance::new(module);

    c.bench_function("execute/poly", |b| {
        b.iter(|| {
            let result = instance.call("poly", &[ValueCell::from(20i64)]).unwrap();
            assert_eq!(result, Some(ValueCell::from(8_007i64)));
        })
    });
}

criterion_group!(pipeline, bench_decode, bench_lower, bench_instantiate);
criterion_group!(execute, bench_execute_arithmetic);
criterion_main!(pipeline, execute);
