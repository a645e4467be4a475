//! Typed call tests against a real Lua 5.4 state
//!
//! The fixture script defines a handful of globals that echo, count or
//! fail on purpose; each test drives them through `GlobalFunction`.
//!
//! # Running Tests
//! ```bash
//! cargo test -p moonbind-lua --test lua_call_tests
//! ```

use std::io::Write;

use moonbind::{
    call_global, CallError, CallStatus, ConversionError, GlobalFunction, LuaStack, Nil,
    ValueKind, Variadic,
};
use moonbind_lua::{Lua, LuaError};

const FIXTURES: &str = r#"
function identity(...) return ... end

function probe(...)
    last_args = table.pack(...)
    return select('#', ...)
end

function last_arg(i) return last_args[i] end

function last_arg_type(i)
    local v = last_args[i]
    return math.type(v) or type(v)
end

function noop() end

function add(a, b) return a + b end

function primes() return 2, 3, 5 end

function countdown(n)
    local t = {}
    for i = n, 1, -1 do t[#t + 1] = i end
    return table.unpack(t)
end

function fail(msg) error(msg) end

function fail_with_table() error({ code = 1 }) end

function version() return 1 end

answer = 42
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture_state() -> Lua {
    init_tracing();
    let lua = Lua::new().unwrap();
    lua.exec_named(FIXTURES, "=fixtures").unwrap();
    lua
}

// ===== Round Trips =====

#[test]
fn test_integer_round_trips() {
    let lua = fixture_state();
    let id32: GlobalFunction<_, i32> = GlobalFunction::new(&lua, "identity");
    for value in [0, -1, i32::MAX, i32::MIN] {
        assert_eq!(id32.call(value).unwrap(), value);
    }

    let id64: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "identity");
    for value in [0, -7, i64::MAX, i64::MIN] {
        assert_eq!(id64.call(value).unwrap(), value);
    }
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_float_round_trips() {
    let lua = fixture_state();
    let id: GlobalFunction<_, f64> = GlobalFunction::new(&lua, "identity");
    for value in [0.0, -2.5, 1e300, f64::MAX, f64::MIN_POSITIVE] {
        assert_eq!(id.call(value).unwrap(), value);
    }

    let id32: GlobalFunction<_, f32> = GlobalFunction::new(&lua, "identity");
    assert_eq!(id32.call(0.25f32).unwrap(), 0.25f32);
}

#[test]
fn test_string_round_trips() {
    let lua = fixture_state();
    let id: GlobalFunction<_, String> = GlobalFunction::new(&lua, "identity");
    for text in [
        "",
        "-- not a comment",
        "--[[ nor a block ]]",
        "]] and [[ brackets",
        "back\\slash \"quoted\" 'single'\n",
        "embedded\0nul",
        "ünïcödé",
    ] {
        assert_eq!(id.call(text).unwrap(), text);
    }
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_bool_and_truthiness() {
    let lua = fixture_state();
    let id: GlobalFunction<_, bool> = GlobalFunction::new(&lua, "identity");
    assert!(id.call(true).unwrap());
    assert!(!id.call(false).unwrap());
    // Lua truthiness: only nil and false are false.
    assert!(id.call(0).unwrap());
    assert!(!id.call(Nil).unwrap());
}

// ===== Argument Marshalling =====

#[test]
fn test_zero_arguments_no_result() {
    let lua = fixture_state();
    lua.push_string(b"sentinel");
    let noop: GlobalFunction<_> = GlobalFunction::new(&lua, "noop");
    noop.call(()).unwrap();
    assert_eq!(lua.top(), 1);
    assert_eq!(lua.to_bytes(-1), Some(b"sentinel".to_vec()));
}

#[test]
fn test_argument_order_and_types() {
    let lua = fixture_state();
    let probe: GlobalFunction<_, i32> = GlobalFunction::new(&lua, "probe");
    let last_arg_type: GlobalFunction<_, String> = GlobalFunction::new(&lua, "last_arg_type");

    assert_eq!(probe.call(()).unwrap(), 0);
    assert_eq!(probe.call("only").unwrap(), 1);
    assert_eq!(call_global::<_, _, String>(&lua, "last_arg", 1).unwrap(), "only");

    assert_eq!(probe.call((1, 2.5, true)).unwrap(), 3);
    assert_eq!(last_arg_type.call(1).unwrap(), "integer");
    assert_eq!(last_arg_type.call(2).unwrap(), "float");
    assert_eq!(last_arg_type.call(3).unwrap(), "boolean");

    assert_eq!(probe.call((Nil, "x", Nil)).unwrap(), 3);
    assert_eq!(last_arg_type.call(1).unwrap(), "nil");
    assert_eq!(last_arg_type.call(2).unwrap(), "string");
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_variadic_arguments() {
    let lua = fixture_state();
    let probe: GlobalFunction<_, i32> = GlobalFunction::new(&lua, "probe");
    let args: Variadic<i64> = (1..=40).collect();
    assert_eq!(probe.call(args).unwrap(), 40);
    assert_eq!(call_global::<_, _, i64>(&lua, "last_arg", 40).unwrap(), 40);
}

// ===== Return Shapes =====

#[test]
fn test_single_return_value() {
    let lua = fixture_state();
    let add: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "add");
    assert_eq!(add.call((2, 3)).unwrap(), 5);

    let add_float: GlobalFunction<_, f64> = GlobalFunction::new(&lua, "add");
    assert_eq!(add_float.call((0.5, 0.25)).unwrap(), 0.75);
}

#[test]
fn test_three_return_values() {
    let lua = fixture_state();
    let primes: GlobalFunction<_, (i32, i32, i32)> = GlobalFunction::new(&lua, "primes");
    assert_eq!(primes.call(()).unwrap(), (2, 3, 5));
    assert_eq!(lua.top(), 0);

    let first_two: GlobalFunction<_, (i32, i32)> = GlobalFunction::new(&lua, "primes");
    assert_eq!(first_two.call(()).unwrap(), (2, 3));

    let padded: GlobalFunction<_, (i32, i32, i32, Option<i32>)> =
        GlobalFunction::new(&lua, "primes");
    assert_eq!(padded.call(()).unwrap(), (2, 3, 5, None));
}

#[test]
fn test_variadic_results() {
    let lua = fixture_state();
    let countdown: GlobalFunction<_, Variadic<i64>> = GlobalFunction::new(&lua, "countdown");
    assert_eq!(countdown.call(4).unwrap().into_inner(), vec![4, 3, 2, 1]);
    assert!(countdown.call(0).unwrap().is_empty());
    assert_eq!(lua.top(), 0);
}

// ===== Errors =====

#[test]
fn test_missing_global() {
    let lua = fixture_state();
    let missing: GlobalFunction<_, i32> = GlobalFunction::new(&lua, "not_defined");
    assert_eq!(
        missing.call(()).unwrap_err(),
        CallError::NotAFunction {
            name: "not_defined".to_string(),
            found: ValueKind::Nil,
        }
    );

    let answer: GlobalFunction<_> = GlobalFunction::new(&lua, "answer");
    assert!(matches!(
        answer.call(()).unwrap_err(),
        CallError::NotAFunction { found: ValueKind::Number, .. }
    ));
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_runtime_errors() {
    let lua = fixture_state();
    let fail: GlobalFunction<_> = GlobalFunction::new(&lua, "fail");

    match fail.call("bad thing").unwrap_err() {
        CallError::Runtime { name, status, message } => {
            assert_eq!(name, "fail");
            assert_eq!(status, CallStatus::RuntimeError);
            assert!(message.starts_with("fixtures:"), "{message}");
            assert!(message.ends_with(": bad thing"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    match fail.call(42).unwrap_err() {
        CallError::Runtime { message, .. } => assert_eq!(message, "42"),
        other => panic!("unexpected error: {other}"),
    }

    let fail_with_table: GlobalFunction<_> = GlobalFunction::new(&lua, "fail_with_table");
    match fail_with_table.call(()).unwrap_err() {
        CallError::Runtime { message, .. } => {
            assert_eq!(message, "(error object is a table value)")
        }
        other => panic!("unexpected error: {other}"),
    }

    let add: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "add");
    match add.call(("x", 1)).unwrap_err() {
        CallError::Runtime { message, .. } => assert!(message.contains("arithmetic"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(add.call((1, 1)).unwrap(), 2);
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_arguments_beyond_stack_limit() {
    let lua = fixture_state();
    let probe: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "probe");

    // More values than LUAI_MAXSTACK (one million) allows.
    let args: Variadic<i64> = (0..1_200_000).collect();
    assert_eq!(
        probe.call(args).unwrap_err(),
        CallError::StackOverflow {
            name: "probe".to_string(),
            needed: 1_200_001,
        }
    );
    assert_eq!(lua.top(), 0);

    let args: Variadic<i64> = (0..10_000).collect();
    assert_eq!(probe.call(args).unwrap(), 10_000);
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_strict_globals_lookup() {
    let lua = fixture_state();
    lua.exec(
        "setmetatable(_G, {
            __index = function(_, k) error('undefined global ' .. k, 2) end,
        })",
    )
    .unwrap();

    let missing: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "missing");
    match missing.call(()).unwrap_err() {
        CallError::Runtime { name, status, message } => {
            assert_eq!(name, "missing");
            assert_eq!(status, CallStatus::RuntimeError);
            assert_eq!(message, "undefined global missing");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(lua.top(), 0);

    let add: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "add");
    assert_eq!(add.call((1, 2)).unwrap(), 3);
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_conversion_errors() {
    let lua = fixture_state();
    let as_int: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "identity");
    assert_eq!(as_int.call("10").unwrap(), 10);
    assert_eq!(as_int.call(3.0).unwrap(), 3);
    assert_eq!(
        as_int.call(2.5).unwrap_err(),
        CallError::Conversion {
            name: "identity".to_string(),
            position: 0,
            source: ConversionError::TypeMismatch {
                expected: "i64",
                found: ValueKind::Number,
            },
        }
    );

    let as_u16: GlobalFunction<_, u16> = GlobalFunction::new(&lua, "identity");
    assert!(matches!(
        as_u16.call(-1).unwrap_err(),
        CallError::Conversion {
            source: ConversionError::OutOfRange { target: "u16", value: -1 },
            ..
        }
    ));

    let as_string: GlobalFunction<_, String> = GlobalFunction::new(&lua, "identity");
    assert!(matches!(
        as_string.call(true).unwrap_err(),
        CallError::Conversion {
            source: ConversionError::TypeMismatch { found: ValueKind::Boolean, .. },
            ..
        }
    ));
    assert_eq!(lua.top(), 0);
}

// ===== Resolution =====

#[test]
fn test_reassigned_global_is_observed() {
    let lua = fixture_state();
    let version: GlobalFunction<_, i32> = GlobalFunction::new(&lua, "version");
    assert_eq!(version.call(()).unwrap(), 1);

    lua.exec("function version() return 2 end").unwrap();
    assert_eq!(version.call(()).unwrap(), 2);

    lua.exec("version = nil").unwrap();
    assert!(matches!(
        version.call(()).unwrap_err(),
        CallError::NotAFunction { found: ValueKind::Nil, .. }
    ));
}

#[test]
fn test_exec_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "function triple(x) return x * 3 end").unwrap();

    let lua = Lua::new().unwrap();
    lua.exec_file(file.path()).unwrap();
    let triple: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "triple");
    assert_eq!(triple.call(14).unwrap(), 42);

    let missing = file.path().with_extension("missing");
    assert!(matches!(lua.exec_file(&missing), Err(LuaError::Io { .. })));
}

#[test]
fn test_borrowed_state() {
    let lua = fixture_state();
    // SAFETY: `lua` outlives the borrowed handle.
    let borrowed = unsafe { Lua::from_raw(lua.as_ptr()) }.unwrap();
    let primes: GlobalFunction<_, (i32, i32, i32)> = GlobalFunction::new(&borrowed, "primes");
    assert_eq!(primes.call(()).unwrap(), (2, 3, 5));
    drop(primes);
    drop(borrowed);

    let add: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "add");
    assert_eq!(add.call((20, 22)).unwrap(), 42);
}
