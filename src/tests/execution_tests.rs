use crate::{
    CalcError, EquationCompiler, ErrorKind, ExecOptions, FaultReason, Literal, evaluate,
};

const NO_PARAMS: &[&str] = &[];

fn run<T: crate::Element>(equation: &str, source: &[T]) -> Result<Vec<T>, CalcError> {
    evaluate(equation, "x", &[], source)
}

#[test]
fn test_end_to_end_i32() {
    let mut compiler = EquationCompiler::<i32>::new();
    compiler.compile("x*2+k", "x", &["k"]).unwrap();
    let mut dest = [0i32; 3];
    compiler
        .execute(&[1, 2, 3], &mut dest, &[Literal::Int(10)], &ExecOptions::new())
        .unwrap();
    assert_eq!(dest, [12, 14, 16]);
}

#[test]
fn test_overflow_checked_and_wrapping() {
    let mut compiler = EquationCompiler::<i8>::new();
    compiler.compile("x+1", "x", NO_PARAMS).unwrap();
    let mut dest = [0i8];

    let err = compiler
        .execute(&[127], &mut dest, &[], &ExecOptions::new())
        .unwrap_err();
    assert_eq!(
        err,
        CalcError::ArithmeticFault {
            index: 0,
            op: "add",
            reason: FaultReason::Overflow,
        }
    );

    compiler
        .execute(&[127], &mut dest, &[], &ExecOptions::new().overflow_check(false))
        .unwrap();
    assert_eq!(dest, [-128]);
}

#[test]
fn test_element_limit_leaves_tail_untouched() {
    let mut compiler = EquationCompiler::<i16>::new();
    compiler.compile("x * 10", "x", NO_PARAMS).unwrap();
    let mut dest = [-1i16; 5];
    compiler
        .execute(&[1, 2, 3, 4, 5], &mut dest, &[], &ExecOptions::new().element_limit(2))
        .unwrap();
    assert_eq!(dest, [10, 20, -1, -1, -1]);

    // A limit past the end processes everything
    compiler
        .execute(&[1, 2, 3, 4, 5], &mut dest, &[], &ExecOptions::new().element_limit(99))
        .unwrap();
    assert_eq!(dest, [10, 20, 30, 40, 50]);
}

#[test]
fn test_operand_order() {
    assert_eq!(run::<i32>("10-3", &[0]).unwrap(), vec![7]);
    assert_eq!(run::<i32>("x - 3", &[10]).unwrap(), vec![7]);
    assert_eq!(run::<i32>("100 // x // 3", &[4]).unwrap(), vec![8]);
    assert_eq!(run::<i64>("2 ** 3 ** 2", &[0]).unwrap(), vec![512]);
    assert_eq!(run::<u32>("x << 3 >> 1", &[1]).unwrap(), vec![4]);

    let out = run::<f64>("math.atan2(1, x) + math.copysign(3, -x) + math.fmod(x, 4)", &[6.0])
        .unwrap();
    let expected = 1f64.atan2(6.0) - 3.0 + 2.0;
    assert!((out[0] - expected).abs() < 1e-12);
    assert_eq!(run::<f64>("math.pow(x, 3) - math.ldexp(x, 2)", &[2.0]).unwrap(), vec![0.0]);
}

#[test]
fn test_integer_division_semantics() {
    let src = [7i32, -7];
    assert_eq!(run::<i32>("x / 2", &src).unwrap(), vec![3, -3]);
    assert_eq!(run::<i32>("x // 2", &src).unwrap(), vec![3, -4]);
    assert_eq!(run::<i32>("x % 2", &src).unwrap(), vec![1, 1]);
    assert_eq!(run::<i32>("x % -2", &src).unwrap(), vec![-1, -1]);

    let err = run::<i32>("1 / (x - 7)", &src).unwrap_err();
    assert_eq!(err.fault_index(), Some(0));
    assert!(matches!(
        err,
        CalcError::ArithmeticFault {
            reason: FaultReason::DivisionByZero,
            ..
        }
    ));

    // Division by zero faults even with checking off
    let mut compiler = EquationCompiler::<i32>::new();
    compiler.compile("x % 0", "x", NO_PARAMS).unwrap();
    let mut dest = [0; 1];
    assert!(compiler
        .execute(&[1], &mut dest, &[], &ExecOptions::new().overflow_check(false))
        .is_err());
}

#[test]
fn test_comparisons_and_booleans() {
    let src = [-2i32, 0, 3];
    assert_eq!(run::<i32>("x > 0", &src).unwrap(), vec![0, 0, 1]);
    assert_eq!(run::<i32>("x == 0 or x > 2", &src).unwrap(), vec![0, 1, 1]);
    assert_eq!(run::<i32>("not x", &src).unwrap(), vec![0, 1, 0]);
    assert_eq!(run::<i32>("(x < 0) + (x <= 0) * 2", &src).unwrap(), vec![3, 2, 0]);
    assert_eq!(run::<f64>("x != 0.5 and x >= 0", &[0.5, 1.0]).unwrap(), vec![0.0, 1.0]);
}

#[test]
fn test_float_non_finite_fault() {
    let err = run::<f64>("math.log(x)", &[1.0, 0.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeRange);
    assert_eq!(err.fault_index(), Some(1));

    let mut compiler = EquationCompiler::<f64>::new();
    compiler.compile("1 / x", "x", NO_PARAMS).unwrap();
    let mut dest = [0.0; 1];
    compiler
        .execute(&[0.0], &mut dest, &[], &ExecOptions::new().overflow_check(false))
        .unwrap();
    assert!(dest[0].is_infinite());
}

#[test]
fn test_lanes_match_single_lane() {
    let mut compiler = EquationCompiler::<i64>::new();
    compiler.compile("x * x - 3 * x + k", "x", &["k"]).unwrap();
    let source: Vec<i64> = (-500..500).collect();
    let params = [Literal::Int(17)];

    let mut single = vec![0; source.len()];
    compiler
        .execute(&source, &mut single, &params, &ExecOptions::new())
        .unwrap();

    for lanes in [2, 3, 7, 64, 5000] {
        let mut multi = vec![0; source.len()];
        compiler
            .execute(&source, &mut multi, &params, &ExecOptions::new().lanes(lanes))
            .unwrap();
        assert_eq!(multi, single, "{lanes} lanes");
    }
}

#[test]
fn test_lowest_fault_index_with_lanes() {
    let mut compiler = EquationCompiler::<u8>::new();
    compiler.compile("x * 2", "x", NO_PARAMS).unwrap();
    let mut source = vec![1u8; 100];
    source[40] = 200;
    source[90] = 200;
    let mut dest = vec![0; 100];
    let err = compiler
        .execute(&source, &mut dest, &[], &ExecOptions::new().lanes(4))
        .unwrap_err();
    assert_eq!(err.fault_index(), Some(40));
}

#[test]
fn test_empty_source() {
    assert_eq!(run::<f32>("x + 1", &[]).unwrap(), Vec::<f32>::new());
}

#[test]
fn test_compiler_shared_across_threads() {
    let mut compiler = EquationCompiler::<f64>::new();
    compiler.compile("math.sqrt(x) * k", "x", &["k"]).unwrap();
    let compiler = &compiler;

    std::thread::scope(|s| {
        for k in 1..=4 {
            s.spawn(move || {
                let mut dest = [0.0; 2];
                compiler
                    .execute(&[4.0, 9.0], &mut dest, &[Literal::Int(k)], &ExecOptions::new())
                    .unwrap();
                let k = k as f64;
                assert_eq!(dest, [2.0 * k, 3.0 * k]);
            });
        }
    });
}
