use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::types::{int_fits, primitive, AliasedType, StructId, StructRef, Type};

fn owner(ty: Type) -> Type {
    Type::OwnerPointer {
        to: Box::new(AliasedType::new(ty)),
        constant: false,
    }
}

fn shared(ty: Type, constant: bool) -> Type {
    Type::SharedPointer {
        to: Box::new(AliasedType::new(ty)),
        constant,
    }
}

fn array(of: Type, size: Option<u64>) -> Type {
    Type::Array {
        of: Box::new(AliasedType::new(of)),
        constant: false,
        size,
    }
}

#[test]
fn test_alias_is_ignored_by_equality() {
    let plain = AliasedType::new(Type::i32());
    let aliased = AliasedType::aliased(Type::i32(), Rc::new(String::from("main::Meters")));

    assert_eq!(plain, aliased);
    assert_eq!(aliased.describe(), "main::Meters (aka i32)");
    assert_eq!(aliased.to_string(), "main::Meters");
    assert_eq!(plain.describe(), "i32");
}

#[test]
fn test_struct_equality_is_by_identity() {
    let a = Type::Struct(StructRef {
        id: StructId(1),
        name: Rc::new(String::from("main::A")),
    });
    let renamed = Type::Struct(StructRef {
        id: StructId(1),
        name: Rc::new(String::from("other")),
    });
    let b = Type::Struct(StructRef {
        id: StructId(2),
        name: Rc::new(String::from("main::A")),
    });

    assert_eq!(a, renamed);
    assert!(a != b);
}

#[test]
fn test_copyable() {
    assert!(Type::i32().is_copyable());
    assert!(shared(Type::i32(), false).is_copyable());
    assert!(!owner(Type::i32()).is_copyable());
    assert!(!array(owner(Type::i32()), Some(2)).is_copyable());
    assert!(!array(owner(Type::i32()), None).is_copyable());
    assert!(array(Type::Bool, Some(4)).is_copyable());
}

#[test]
fn test_pointer_constness_is_part_of_the_type() {
    assert!(shared(Type::i32(), true) != shared(Type::i32(), false));
    assert!(shared(Type::i32(), true).is_constant());
}

#[test]
fn test_display() {
    assert_eq!(owner(Type::i32()).to_string(), "&i32");
    assert_eq!(shared(Type::Bool, true).to_string(), "const *bool");
    assert_eq!(array(Type::Int(8), None).to_string(), "i8[]");
    assert_eq!(Type::string().to_string(), "const i8[]");
    assert_eq!(shared(array(Type::i64(), Some(3)), false).to_string(), "*i64[3]");

    let func = Type::Func(super::types::FuncType {
        params: vec![Type::string().into()],
        vararg: true,
        returns: Box::new(Type::i32().into()),
    });
    assert_eq!(func.to_string(), "(const i8[], ...): i32");
}

#[test]
fn test_int_ranges() {
    assert!(int_fits(127, 8));
    assert!(!int_fits(128, 8));
    assert!(int_fits(-128, 8));
    assert!(!int_fits(300, 8));
    assert!(int_fits(300, 32));
    assert!(int_fits(i64::MAX as i128, 64));
    assert!(!int_fits(i64::MAX as i128 + 1, 64));
}

#[test]
fn test_primitives() {
    assert_eq!(primitive("i16"), Some(Type::Int(16)));
    assert_eq!(primitive("void"), Some(Type::Void));
    assert_eq!(primitive("u32"), None);
}
