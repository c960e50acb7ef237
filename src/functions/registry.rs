use rustc_hash::FxHashMap;
use std::sync::OnceLock;

use super::definitions::DESCRIPTORS;
use super::{OpCode, OpDescriptor};
use crate::traits::NumericClass;

/// Lookup tables derived from the descriptor list
struct Registry {
    by_name: FxHashMap<&'static str, &'static OpDescriptor>,
    by_int_code: FxHashMap<u32, &'static OpDescriptor>,
    by_float_code: FxHashMap<u32, &'static OpDescriptor>,
}

/// Static registry storing all opcode descriptors
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Initialize the registry from the descriptor definitions
fn init_registry() -> Registry {
    let mut by_name = FxHashMap::default();
    let mut by_int_code = FxHashMap::default();
    let mut by_float_code = FxHashMap::default();

    for d in DESCRIPTORS {
        by_name.insert(d.name, d);
        if let Some(code) = d.int_code {
            by_int_code.insert(code, d);
        }
        if let Some(code) = d.float_code {
            by_float_code.insert(code, d);
        }
    }

    Registry {
        by_name,
        by_int_code,
        by_float_code,
    }
}

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(init_registry)
}

/// All descriptors, indexed by `OpCode` discriminant
pub fn descriptors() -> &'static [OpDescriptor] {
    DESCRIPTORS
}

/// Descriptor for an opcode
pub fn descriptor(op: OpCode) -> &'static OpDescriptor {
    op.descriptor()
}

/// Get a descriptor by symbolic name - O(1) HashMap lookup
pub fn lookup(name: &str) -> Option<&'static OpDescriptor> {
    registry().by_name.get(name).copied()
}

/// Map an instruction code back to its descriptor for the given class.
///
/// Returns `None` if the code is unknown or the operation is illegal for `class`.
pub(crate) fn decode(class: NumericClass, code: u32) -> Option<&'static OpDescriptor> {
    let table = match class {
        NumericClass::SignedInt | NumericClass::UnsignedInt => &registry().by_int_code,
        NumericClass::Float => &registry().by_float_code,
    };
    table
        .get(&code)
        .copied()
        .filter(|d| d.is_legal_for(class))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(lookup("mult").map(|d| d.op), Some(OpCode::Mult));
        assert_eq!(lookup("math.atan2").map(|d| d.op), Some(OpCode::Atan2));
        assert!(lookup("mul").is_none());
    }

    #[test]
    fn test_decode_roundtrips_codes() {
        for class in [
            NumericClass::SignedInt,
            NumericClass::UnsignedInt,
            NumericClass::Float,
        ] {
            for d in descriptors() {
                if let Some(code) = d.code_for(class) {
                    assert_eq!(decode(class, code).map(|x| x.op), Some(d.op));
                }
            }
        }
    }

    #[test]
    fn test_decode_rejects_illegal() {
        let usub = OpCode::USub.descriptor().int_code.unwrap();
        assert!(decode(NumericClass::SignedInt, usub).is_some());
        assert!(decode(NumericClass::UnsignedInt, usub).is_none());
        assert!(decode(NumericClass::Float, 9999).is_none());
    }
}
