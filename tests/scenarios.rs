//! End-to-end behaviour: decode, instantiate and invoke whole modules.

mod common;

use common::*;
use rstest::rstest;
use std::cell::RefCell;
use std::rc::Rc;
use wasmstack::parser::module::{FunctionType, ValueType};
use wasmstack::{decode, instantiate, DecodeError, ImportObject, Input, Instance, Value};

fn load(bytes: &[u8]) -> Instance {
    let module = decode(bytes).expect("module should decode");
    instantiate(&module, &ImportObject::new()).expect("module should instantiate")
}

fn add_module() -> Vec<u8> {
    let mut m = ModuleBuilder::new();
    let t = m.typ(&[I32, I32], &[I32]);
    let add = m.func(t, &[], &[local_get(0), local_get(1), vec![op::I32_ADD]].concat());
    m.export_func("add", add);
    m.build()
}

/// fib(n) = n < 2 ? n : fib(n - 1) + fib(n - 2)
fn fib_module() -> Vec<u8> {
    let mut m = ModuleBuilder::new();
    let t = m.typ(&[I64], &[I64]);
    let code = [
        local_get(0),
        i64_const(2),
        vec![op::I64_LT_S, op::IF, I64],
        local_get(0),
        vec![op::ELSE],
        local_get(0),
        i64_const(1),
        vec![op::I64_SUB],
        call(0),
        local_get(0),
        i64_const(2),
        vec![op::I64_SUB],
        call(0),
        vec![op::I64_ADD, op::END],
    ]
    .concat();
    let fib = m.func(t, &[], &code);
    m.export_func("fib", fib);
    m.build()
}

fn counter_module() -> Vec<u8> {
    let mut m = ModuleBuilder::new();
    let show_type = m.typ(&[], &[I32]);
    let set_type = m.typ(&[I32], &[]);
    let add_type = m.typ(&[], &[]);
    let g = m.global(I32, true, &i32_const(0));

    let show = m.func(show_type, &[], &with_index(op::GLOBAL_GET, g));
    let set = m.func(set_type, &[], &[local_get(0), with_index(op::GLOBAL_SET, g)].concat());
    let add = m.func(
        add_type,
        &[],
        &[
            with_index(op::GLOBAL_GET, g),
            i32_const(1),
            vec![op::I32_ADD],
            with_index(op::GLOBAL_SET, g),
        ]
        .concat(),
    );
    m.export_func("show", show).export_func("set", set).export_func("add", add);
    m.build()
}

#[rstest]
#[case(1, 2, 3)]
#[case(100, 200, 300)]
#[case(i32::MAX, 1, i32::MIN)]
fn add_exports_wrapping_sum(#[case] a: i32, #[case] b: i32, #[case] expected: i32) {
    let mut instance = load(&add_module());
    let results = instance.invoke("add", &[Value::from_i32(a), Value::from_i32(b)]).unwrap();
    assert_eq!(results, vec![Value::from_i32(expected)]);
}

#[test]
fn add_accepts_string_inputs() {
    let mut instance = load(&add_module());
    let results = instance
        .invoke_inputs("add", &[Input::from("100"), Input::from("0xc8")])
        .unwrap();
    assert_eq!(results, vec![Value::from_i32(300)]);

    let err = instance.invoke_inputs("add", &[Input::I32(1)]).unwrap_err();
    assert!(matches!(
        err,
        wasmstack::RuntimeError::ArgumentCountMismatch { expected: 2, actual: 1 }
    ));
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(10, 55)]
#[case(20, 6765)]
fn recursive_fib(#[case] n: i64, #[case] expected: i64) {
    let mut instance = load(&fib_module());
    assert_eq!(instance.invoke("fib", &[Value::from_i64(n)]).unwrap(), vec![Value::from_i64(expected)]);
}

#[test]
fn mutable_global_counter() {
    let mut instance = load(&counter_module());
    let show = |instance: &mut Instance| instance.invoke("show", &[]).unwrap();

    assert_eq!(show(&mut instance), vec![Value::from_i32(0)]);
    assert_eq!(instance.invoke("set", &[Value::from_i32(1234)]).unwrap(), vec![]);
    assert_eq!(show(&mut instance), vec![Value::from_i32(1234)]);
    instance.invoke("add", &[]).unwrap();
    assert_eq!(show(&mut instance), vec![Value::from_i32(1235)]);
}

#[test]
fn host_import_receives_arguments_in_order() {
    let mut m = ModuleBuilder::new();
    let print_type = m.typ(&[I32, I32], &[]);
    let run_type = m.typ(&[I32], &[I32]);
    let print = m.import_func("env", "print", print_type);
    // print(x, x * 2); return x + 1
    let run = m.func(
        run_type,
        &[],
        &[
            local_get(0),
            local_get(0),
            i32_const(2),
            vec![op::I32_MUL],
            call(print),
            local_get(0),
            i32_const(1),
            vec![op::I32_ADD],
        ]
        .concat(),
    );
    m.export_func("run", run);
    let module = decode(&m.build()).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let mut imports = ImportObject::new();
    imports.add_function(
        "env",
        "print",
        FunctionType::new(vec![ValueType::I32, ValueType::I32], vec![]),
        move |args, types| {
            assert_eq!(types, &[ValueType::I32, ValueType::I32]);
            sink.borrow_mut().push(args.to_vec());
            Ok(vec![])
        },
    );

    let mut instance = instantiate(&module, &imports).unwrap();
    assert_eq!(instance.invoke("run", &[Value::from_i32(21)]).unwrap(), vec![Value::from_i32(22)]);
    assert_eq!(*calls.borrow(), vec![vec![Value::from_i32(21), Value::from_i32(42)]]);
}

#[test]
fn function_and_code_counts_must_agree() {
    let mut m = ModuleBuilder::new();
    let t = m.typ(&[], &[]);
    m.func(t, &[], &[]);
    m.func(t, &[], &[]);
    m.declare_only(t);

    let err = decode(&m.build()).unwrap_err();
    assert!(matches!(err, DecodeError::FunctionCodeMismatch { functions: 3, codes: 2 }));
}

#[test]
fn loop_with_locals_and_memory() {
    // sum 1..=n into memory[0], then load it back
    let mut m = ModuleBuilder::new();
    let t = m.typ(&[I32], &[I32]);
    m.memory(1, Some(1));
    let code = [
        vec![op::BLOCK, 0x40, op::LOOP, 0x40],
        local_get(0),
        vec![op::I32_EQZ],
        with_index(op::BR_IF, 1),
        i32_const(0),
        i32_const(0),
        mem(op::I32_LOAD, 0),
        local_get(0),
        vec![op::I32_ADD],
        mem(op::I32_STORE, 0),
        local_get(0),
        i32_const(1),
        vec![op::I32_SUB],
        with_index(op::LOCAL_SET, 0),
        with_index(op::BR, 0),
        vec![op::END, op::END],
        i32_const(0),
        mem(op::I32_LOAD, 0),
    ]
    .concat();
    let sum = m.func(t, &[], &code);
    m.export_func("sum", sum).export("memory", DESC_MEMORY, 0);

    let mut instance = load(&m.build());
    assert_eq!(instance.invoke("sum", &[Value::from_i32(100)]).unwrap(), vec![Value::from_i32(5050)]);
}

#[test]
fn data_and_start_run_at_instantiation() {
    let mut m = ModuleBuilder::new();
    let void = m.typ(&[], &[]);
    let get = m.typ(&[], &[I32]);
    m.memory(1, None).data(4, &[0x2a, 0, 0, 0]);
    let g = m.global(I32, true, &i32_const(0));
    // start copies memory[4] into the global
    let start = m.func(
        void,
        &[],
        &[i32_const(4), mem(op::I32_LOAD, 0), with_index(op::GLOBAL_SET, g)].concat(),
    );
    let read = m.func(get, &[], &with_index(op::GLOBAL_GET, g));
    m.start(start).export_func("read", read).export("g", DESC_GLOBAL, g);

    let mut instance = load(&m.build());
    assert_eq!(instance.global("g"), Some(Value::from_i32(42)));
    assert_eq!(instance.invoke("read", &[]).unwrap(), vec![Value::from_i32(42)]);
}

#[test]
fn float_to_int_through_locals() {
    let mut m = ModuleBuilder::new();
    let t = m.typ(&[F64], &[I32]);
    let code = [
        local_get(0),
        f64_const(0.75),
        vec![op::F64_ADD],
        with_index(op::LOCAL_TEE, 1),
        with_index(op::LOCAL_GET, 1),
        vec![op::DROP, op::I32_TRUNC_F64_S],
    ]
    .concat();
    let f = m.func(t, &[(1, F64)], &code);
    m.export_func("f", f);

    let mut instance = load(&m.build());
    assert_eq!(instance.invoke("f", &[Value::from_f64(41.5)]).unwrap(), vec![Value::from_i32(42)]);
}
