//! Opcode descriptor definitions
//!
//! Integer programs (signed and unsigned) share one code space, floating
//! point programs use another. Codes are stable: they are what a
//! [`CompiledProgram`](crate::CompiledProgram) carries.

use super::{OpCode, OpDescriptor};

const fn push(op: OpCode, name: &'static str, code: u32) -> OpDescriptor {
    OpDescriptor {
        op,
        name,
        int_code: Some(code),
        float_code: Some(code),
        signed_only: false,
        is_math_call: false,
        stack_delta: 1,
        extended: false,
    }
}

const fn unary(
    op: OpCode,
    name: &'static str,
    int_code: Option<u32>,
    float_code: Option<u32>,
    signed_only: bool,
) -> OpDescriptor {
    OpDescriptor {
        op,
        name,
        int_code,
        float_code,
        signed_only,
        is_math_call: false,
        stack_delta: 0,
        extended: false,
    }
}

const fn binary(
    op: OpCode,
    name: &'static str,
    int_code: Option<u32>,
    float_code: Option<u32>,
) -> OpDescriptor {
    OpDescriptor {
        op,
        name,
        int_code,
        float_code,
        signed_only: false,
        is_math_call: false,
        stack_delta: -1,
        extended: false,
    }
}

const fn math(
    op: OpCode,
    name: &'static str,
    float_code: u32,
    arity: i32,
    extended: bool,
) -> OpDescriptor {
    OpDescriptor {
        op,
        name,
        int_code: None,
        float_code: Some(float_code),
        signed_only: false,
        is_math_call: true,
        stack_delta: 1 - arity,
        extended,
    }
}

/// All descriptors, in `OpCode` discriminant order
pub(crate) static DESCRIPTORS: &[OpDescriptor] = &[
    // Stack pushes
    push(OpCode::PushArray, "pusharray", 0),
    push(OpCode::PushVar, "pushvar", 1),
    push(OpCode::PushConst, "pushconst", 2),
    // Unary operators
    unary(OpCode::USub, "usub", Some(3), Some(3), true),
    unary(OpCode::UAdd, "uadd", Some(4), Some(4), false),
    unary(OpCode::Invert, "invert", Some(5), None, false),
    unary(OpCode::Not, "not", Some(6), Some(5), false),
    // Arithmetic
    binary(OpCode::Add, "add", Some(7), Some(6)),
    binary(OpCode::Sub, "sub", Some(8), Some(7)),
    binary(OpCode::Mult, "mult", Some(9), Some(8)),
    binary(OpCode::Div, "div", Some(10), Some(9)),
    binary(OpCode::FloorDiv, "floordiv", Some(11), Some(10)),
    binary(OpCode::Mod, "mod", Some(12), Some(11)),
    binary(OpCode::Pow, "pow", Some(13), Some(12)),
    // Bitwise, integers only
    binary(OpCode::LShift, "lshift", Some(14), None),
    binary(OpCode::RShift, "rshift", Some(15), None),
    binary(OpCode::BitAnd, "bitand", Some(16), None),
    binary(OpCode::BitOr, "bitor", Some(17), None),
    binary(OpCode::BitXor, "bitxor", Some(18), None),
    // Comparison and boolean
    binary(OpCode::Eq, "eq", Some(19), Some(13)),
    binary(OpCode::Ne, "ne", Some(20), Some(14)),
    binary(OpCode::Lt, "lt", Some(21), Some(15)),
    binary(OpCode::Le, "le", Some(22), Some(16)),
    binary(OpCode::Gt, "gt", Some(23), Some(17)),
    binary(OpCode::Ge, "ge", Some(24), Some(18)),
    binary(OpCode::And, "and", Some(25), Some(19)),
    binary(OpCode::Or, "or", Some(26), Some(20)),
    // Built-in call
    unary(OpCode::Abs, "abs", Some(27), Some(21), true),
    // math library, one argument
    math(OpCode::Acos, "math.acos", 22, 1, false),
    math(OpCode::Acosh, "math.acosh", 23, 1, true),
    math(OpCode::Asin, "math.asin", 24, 1, false),
    math(OpCode::Asinh, "math.asinh", 25, 1, true),
    math(OpCode::Atan, "math.atan", 26, 1, false),
    math(OpCode::Atanh, "math.atanh", 27, 1, true),
    math(OpCode::Ceil, "math.ceil", 28, 1, false),
    math(OpCode::Cos, "math.cos", 29, 1, false),
    math(OpCode::Cosh, "math.cosh", 30, 1, false),
    math(OpCode::Degrees, "math.degrees", 31, 1, false),
    math(OpCode::Exp, "math.exp", 32, 1, false),
    math(OpCode::Expm1, "math.expm1", 33, 1, true),
    math(OpCode::Fabs, "math.fabs", 34, 1, false),
    math(OpCode::Floor, "math.floor", 35, 1, false),
    math(OpCode::Log, "math.log", 36, 1, false),
    math(OpCode::Log10, "math.log10", 37, 1, false),
    math(OpCode::Log1p, "math.log1p", 38, 1, true),
    math(OpCode::Log2, "math.log2", 39, 1, true),
    math(OpCode::Radians, "math.radians", 40, 1, false),
    math(OpCode::Sin, "math.sin", 41, 1, false),
    math(OpCode::Sinh, "math.sinh", 42, 1, false),
    math(OpCode::Sqrt, "math.sqrt", 43, 1, false),
    math(OpCode::Tan, "math.tan", 44, 1, false),
    math(OpCode::Tanh, "math.tanh", 45, 1, false),
    math(OpCode::Trunc, "math.trunc", 46, 1, true),
    // math library, two arguments
    math(OpCode::Atan2, "math.atan2", 47, 2, false),
    math(OpCode::Copysign, "math.copysign", 48, 2, true),
    math(OpCode::Fmod, "math.fmod", 49, 2, false),
    math(OpCode::Hypot, "math.hypot", 50, 2, true),
    math(OpCode::Ldexp, "math.ldexp", 51, 2, false),
    math(OpCode::MathPow, "math.pow", 52, 2, false),
];
