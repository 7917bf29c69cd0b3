//! The literal end-to-end scenarios: decode a module, run it, and check the
//! externally observable result against what a host embedding this engine
//! would see.
use std::sync::Arc;

use wembed::{CallError, Instance, LowerErrorKind, Module, Value, ValueCell};

fn instance(text: &str) -> Instance {
    let bytes = wat::parse_str(text).unwrap();
    let module = Module::from_buffer(&bytes).unwrap();
    Instance::new(Arc::new(module))
}

#[test]
fn add_of_two_params_returns_their_sum() {
    let mut i = instance(
        r#"(module (func (export "add") (param i32 i32) (result i32)
             local.get 0 local.get 1 i32.add))"#,
    );
    assert_eq!(i.call("add", &[ValueCell::from(7i32), ValueCell::from(35i32)]).unwrap(), Some(ValueCell::from(42i32)));
}

#[test]
fn self_recursive_factorial_is_rejected_at_lowering_time() {
    // `fact` needs `if`/`else`/`br_if` to terminate the recursion; this
    // engine's lowerer rejects that as an unsupported feature rather than
    // emitting code for it, so the module never decodes to a callable form.
    let text = r#"
        (module
          (func $fact (export "fact") (param i64) (result i64)
            (if (result i64) (i64.eqz (local.get 0))
              (then (i64.const 1))
              (else
                (i64.mul
                  (local.get 0)
                  (call $fact (i64.sub (local.get 0) (i64.const 1))))))))
    "#;
    let bytes = wat::parse_str(text).unwrap();
    let module = Module::from_buffer(&bytes).unwrap();
    let mut instance = Instance::new(Arc::new(module));

    match instance.call("fact", &[ValueCell::from(10i64)]) {
        Err(CallError::LowerFailed(err)) => {
            assert!(matches!(err.kind, LowerErrorKind::UnsupportedFeature(_)));
        }
        other => panic!("expected a lowering rejection, got {other:?}"),
    }
}

#[test]
fn division_traps_and_restart_recovers_the_instance() {
    let mut i = instance(
        r#"(module (func (export "div") (param i32 i32) (result i32)
             local.get 0 local.get 1 i32.div_s))"#,
    );

    assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(3i32)]).unwrap(), Some(ValueCell::from(3i32)));

    assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(0i32)]).unwrap(), None);
    assert!(i.is_trapped());

    i.restart();
    assert!(!i.is_trapped());
    assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(3i32)]).unwrap(), Some(ValueCell::from(3i32)));
}

#[test]
fn load32_traps_exactly_at_memory_size() {
    let mut i = instance(
        r#"(module (memory 1) (func (export "load32") (param i32) (result i32)
             local.get 0 i32.load))"#,
    );

    assert_eq!(i.call("load32", &[ValueCell::from(0i32)]).unwrap(), Some(ValueCell::from(0i32)));
    // A 4-byte load at memory-size - width is the last address that fits.
    assert_eq!(i.call("load32", &[ValueCell::from(65_532i32)]).unwrap(), Some(ValueCell::from(0i32)));
    assert_eq!(i.call("load32", &[ValueCell::from(65_533i32)]).unwrap(), None);
    assert!(i.is_trapped());
}

#[test]
fn inv_sqrt_is_within_one_ulp_of_the_exact_value() {
    let mut i = instance(
        r#"(module (func (export "inv_sqrt") (param f32) (result f32)
             f32.const 1 local.get 0 f32.sqrt f32.div))"#,
    );

    let result = i.call("inv_sqrt", &[ValueCell::from(47.0f32)]).unwrap();
    let got = match result {
        Some(cell) => match cell.to_value(wembed::ValueType::F32) {
            Value::F32(v) => f32::from(v),
            other => panic!("expected an f32 result, got {other:?}"),
        },
        None => panic!("expected a result, call trapped"),
    };

    let expected = 1.0_f32 / 47.0_f32.sqrt();
    let ulp = expected.to_bits().abs_diff(got.to_bits());
    assert!(ulp <= 1, "expected {expected} (bits {:#x}), got {got} (bits {:#x})", expected.to_bits(), got.to_bits());
}

#[test]
fn restarted_instance_behaves_like_a_fresh_one() {
    let mut i = instance(
        r#"(module (func (export "div") (param i32 i32) (result i32)
             local.get 0 local.get 1 i32.div_s))"#,
    );

    assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(0i32)]).unwrap(), None);
    assert!(i.is_trapped());

    i.restart();

    assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(3i32)]).unwrap(), Some(ValueCell::from(3i32)));
    assert!(!i.is_trapped());
}
