use super::*;

fn vector_of(bytes: &[u8]) -> BitVector {
    let mut builder = BitVectorBuilder::new(bytes.len() * 8);
    for (i, &b) in bytes.iter().enumerate() {
        builder.set_byte(i, b);
    }
    builder.build()
}

#[test]
fn boolean_algebra_identities() {
    let v = vector_of(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
    assert_eq!(v.not().not(), v);
    assert_eq!(v.and(&v), v);
    assert_eq!(v.or(&v.not()), BitVector::filled(64, true));
    assert_eq!(v.and(&v.not()), BitVector::new(64));
}

#[test]
fn builder_bytes_read_back_through_bit_tests() {
    let bytes = [0xA5, 0x00, 0xFF, 0x3C, 0x81, 0x7E, 0x01, 0x80];
    let v = vector_of(&bytes);
    for (i, &b) in bytes.iter().enumerate() {
        let mut read = 0u8;
        for bit in 0..8 {
            if v.test_bit(i * 8 + bit) {
                read |= 1 << bit;
            }
        }
        assert_eq!(read, b, "byte {i}");
    }
}

#[test]
fn builder_overwrites_byte() {
    let mut builder = BitVectorBuilder::new(32);
    builder.set_byte(1, 0xFF).set_byte(1, 0x0F);
    let v = builder.build();
    assert_eq!(v.to_string(), format!("{:032b}", 0x0000_0F00u32));
}

#[test]
#[should_panic]
fn builder_rejects_byte_past_end() {
    BitVectorBuilder::new(32).set_byte(4, 1);
}

#[test]
#[should_panic]
fn size_must_be_multiple_of_32() {
    BitVector::new(40);
}

#[test]
fn shift_moves_toward_higher_indices() {
    let v = vector_of(&[0b0000_0001, 0, 0, 0]);
    assert!(v.shift(3).test_bit(3));
    assert!(!v.shift(3).test_bit(0));
    assert_eq!(v.shift(-1), BitVector::new(32));
    assert!(v.shift(31).test_bit(31));
    assert_eq!(v.shift(32), BitVector::new(32));
}

#[test]
fn zero_extended_extraction_across_words() {
    let v = vector_of(&[0, 0, 0, 0x80, 0x01, 0, 0, 0]);
    let e = v.extract_zero_extended(31, 32);
    assert!(e.test_bit(0));
    assert!(e.test_bit(1));
    assert!(!e.test_bit(2));

    let before = v.extract_zero_extended(-32, 64);
    assert!(before.test_bit(63));
    assert!(!before.test_bit(31));
}

#[test]
fn wrapped_extraction_repeats_vector() {
    let v = vector_of(&[0x01, 0, 0, 0]);
    let e = v.extract_wrapped(-1, 64);
    assert!(e.test_bit(1));
    assert!(e.test_bit(33));
    assert!(!e.test_bit(0));

    let far = v.extract_wrapped(96, 32);
    assert_eq!(far, v);
}

#[test]
fn display_is_msb_first() {
    let v = vector_of(&[0b0000_0011, 0, 0, 0x80]);
    let s = v.to_string();
    assert_eq!(s.len(), 32);
    assert!(s.starts_with('1'));
    assert!(s.ends_with("11"));
}
