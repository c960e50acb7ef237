use crate::{CalcError, EquationCompiler, ErrorKind, OpCode, TargetCapabilities};

const NO_PARAMS: &[&str] = &[];

fn kind_of<T: crate::Element>(equation: &str, params: &[&str]) -> ErrorKind {
    EquationCompiler::<T>::new()
        .compile(equation, "x", params)
        .map(|_| ())
        .unwrap_err()
        .kind()
}

#[test]
fn test_sign_fold_on_i8() {
    let mut compiler = EquationCompiler::<i8>::new();
    assert!(compiler.compile("-128", "x", NO_PARAMS).is_ok());
    assert!(compiler.compile("127", "x", NO_PARAMS).is_ok());
    assert_eq!(kind_of::<i8>("-(-128)", NO_PARAMS), ErrorKind::TypeRange);
    assert_eq!(kind_of::<i8>("128", NO_PARAMS), ErrorKind::TypeRange);
}

#[test]
fn test_constant_error_names_literal() {
    let err = EquationCompiler::<u16>::new()
        .compile("x + 70000", "x", NO_PARAMS)
        .unwrap_err();
    assert_eq!(
        err,
        CalcError::ConstantOutOfRange {
            literal: "70000".into(),
            target: "u16",
        }
    );
}

#[test]
fn test_float_constant_bounds() {
    let mut compiler = EquationCompiler::<f32>::new();
    assert!(compiler.compile("x + 3.4028234663852886e38", "x", NO_PARAMS).is_ok());
    assert!(compiler.compile("x - 3.4028234663852886e38", "x", NO_PARAMS).is_ok());
    // The usual printed form of f32::MAX rounds onto it when stored
    let program = compiler.compile("x + 3.4028235e38", "x", NO_PARAMS).unwrap();
    assert!(program.constants().contains(&f32::MAX));
    assert_eq!(kind_of::<f32>("x + 1e39", NO_PARAMS), ErrorKind::TypeRange);
    // Literals overflowing f64 parse to infinity and are rejected
    assert_eq!(kind_of::<f64>("x + 1e400", NO_PARAMS), ErrorKind::TypeRange);
}

#[test]
fn test_unused_and_undefined_variables() {
    assert_eq!(kind_of::<i32>("x+1", &["y"]), ErrorKind::Validation);
    assert_eq!(kind_of::<i32>("x+y+z", &["y"]), ErrorKind::Validation);
}

#[test]
fn test_unsupported_call_on_every_class() {
    assert_eq!(kind_of::<i8>("open('f')", NO_PARAMS), ErrorKind::Validation);
    assert_eq!(kind_of::<u64>("open('f')", NO_PARAMS), ErrorKind::Validation);
    assert_eq!(kind_of::<f64>("open('f')", NO_PARAMS), ErrorKind::Validation);
    assert_eq!(kind_of::<f64>("exec(x)", NO_PARAMS), ErrorKind::Validation);
    assert_eq!(kind_of::<f64>("__import__(x)", NO_PARAMS), ErrorKind::Validation);
}

#[test]
fn test_parse_errors() {
    for bad in ["", "x +", "(x", "x; y", "x[0]", "x = 1", "a < b < c", "lambda: x"] {
        assert_eq!(kind_of::<i32>(bad, NO_PARAMS), ErrorKind::Parse, "{bad:?}");
    }
}

#[test]
fn test_parse_error_location() {
    let err = EquationCompiler::<i32>::new()
        .compile("x + * 2", "x", NO_PARAMS)
        .unwrap_err();
    let CalcError::InvalidSyntax { fragment, span, .. } = &err else {
        panic!("expected syntax error, got {err:?}");
    };
    assert_eq!(fragment, "*");
    assert_eq!(span.start, 4);
    assert!(err.to_string().contains("at position 5"));
}

#[test]
fn test_reserved_names() {
    let mut compiler = EquationCompiler::<i32>::new();
    for reserved in ["abs", "math", "if", "None"] {
        assert_eq!(
            compiler.compile("1", reserved, NO_PARAMS).unwrap_err(),
            CalcError::ReservedName(reserved.into())
        );
        assert_eq!(
            compiler.compile("x", "x", &[reserved]).unwrap_err(),
            CalcError::ReservedName(reserved.into())
        );
    }
}

#[test]
fn test_class_specific_operations() {
    // Bitwise works on integers only
    assert!(EquationCompiler::<u32>::new().compile("x & 0xff | x >> 4", "x", NO_PARAMS).is_ok());
    assert_eq!(kind_of::<f32>("~x", NO_PARAMS), ErrorKind::Validation);
    // Math library on floats only
    assert!(EquationCompiler::<f32>::new().compile("math.sqrt(x)", "x", NO_PARAMS).is_ok());
    assert_eq!(kind_of::<i64>("math.sqrt(x)", NO_PARAMS), ErrorKind::Validation);
    // No negation or abs on unsigned
    assert_eq!(kind_of::<u8>("abs(x)", NO_PARAMS), ErrorKind::Validation);
    assert!(EquationCompiler::<i8>::new().compile("abs(x)", "x", NO_PARAMS).is_ok());
}

#[test]
fn test_capability_profile() {
    let mut compiler = EquationCompiler::<f64>::new()
        .capabilities(TargetCapabilities::full().disable(OpCode::Fmod));
    assert_eq!(
        compiler.compile("math.fmod(x, 2)", "x", NO_PARAMS).unwrap_err(),
        CalcError::UnavailableOperation(vec!["math.fmod".into()])
    );
    assert!(compiler.compile("x % 2", "x", NO_PARAMS).is_ok());
}

#[test]
fn test_stack_limit_configurable() {
    let equation = format!("{}x{}", "(".repeat(20), "*x)".repeat(20));
    let mut tight = EquationCompiler::<f64>::new().max_stack_depth(8);
    assert_eq!(
        tight.compile(&equation, "x", NO_PARAMS).unwrap_err().kind(),
        ErrorKind::Stack
    );
    let mut roomy = EquationCompiler::<f64>::new();
    let program = roomy.compile(&equation, "x", NO_PARAMS).unwrap();
    assert_eq!(program.required_stack_depth(), 23);
}

#[test]
fn test_idempotent_compile() {
    let mut compiler = EquationCompiler::<i64>::new();
    let first = compiler
        .compile("(x * a - b) // 3 % 7", "x", &["a", "b"])
        .unwrap()
        .clone();
    let second = compiler
        .compile("(x * a - b) // 3 % 7", "x", &["a", "b"])
        .unwrap();
    assert_eq!(&first, second);
}

#[test]
fn test_math_constants_fold_to_pushes() {
    let mut compiler = EquationCompiler::<f64>::new();
    let program = compiler.compile("x * math.tau", "x", NO_PARAMS).unwrap();
    assert!(program.constants().contains(&std::f64::consts::TAU));
    assert_eq!(kind_of::<f64>("math.nan", NO_PARAMS), ErrorKind::Validation);
}
