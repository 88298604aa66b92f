use bresser_rs::constants::{
    CRC16_INIT, CRC16_POLY, DIGEST_XOR_7IN1, LFSR_GENERATOR, LFSR_KEY_6IN1, LFSR_KEY_7IN1, WHITENING_BYTE,
};
use bresser_rs::integrity::{add_bytes, count_bits, crc16, lfsr_digest16};
use bresser_rs::util::hex::hex_to_bytes;
use crc::{Crc, CRC_16_XMODEM};
use proptest::prelude::*;

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

#[test]
fn test_crc16_check_value() {
    assert_eq!(crc16(b"123456789", CRC16_POLY, CRC16_INIT), 0x31C3);
    assert_eq!(crc16(&[], CRC16_POLY, CRC16_INIT), 0);
}

#[test]
fn test_leakage_crc_matches_embedded_value() {
    let msg = hex_to_bytes("C770359704085770000000000000000003FFFFFFFFFFFFFFFFFF");
    let expected = u16::from_be_bytes([msg[0], msg[1]]);
    assert_eq!(crc16(&msg[2..7], CRC16_POLY, CRC16_INIT), expected);
    assert_eq!(XMODEM.checksum(&msg[2..7]), expected);
}

#[test]
fn test_six_in_one_integrity() {
    let msg = hex_to_bytes("5b1287000e3449ffffff0000252216fff0a40000000000000000");
    let expected = u16::from_be_bytes([msg[0], msg[1]]);
    assert_eq!(lfsr_digest16(&msg[2..17], LFSR_GENERATOR, LFSR_KEY_6IN1), expected);
    assert_eq!(add_bytes(&msg[2..18]), 0xFF);
}

#[test]
fn test_seven_in_one_digest_after_dewhitening() {
    let msg = hex_to_bytes("631d05c09e9a18abaabaaaaaaaaa8adacbacff9cafcaaaaaaa00");
    let w: Vec<u8> = msg.iter().map(|b| b ^ WHITENING_BYTE).collect();
    let embedded = u16::from_be_bytes([w[0], w[1]]);
    assert_eq!(embedded ^ lfsr_digest16(&w[2..25], LFSR_GENERATOR, LFSR_KEY_7IN1), DIGEST_XOR_7IN1);
}

#[test]
fn test_lfsr_digest_of_zero_bytes() {
    assert_eq!(lfsr_digest16(&[0; 8], LFSR_GENERATOR, LFSR_KEY_6IN1), 0);
    // a single leading one bit yields the unrotated key
    assert_eq!(lfsr_digest16(&[0x80], LFSR_GENERATOR, LFSR_KEY_6IN1), LFSR_KEY_6IN1);
}

#[test]
fn test_count_bits() {
    assert_eq!(count_bits(&[]), 0);
    assert_eq!(count_bits(&[0xFF, 0x01, 0x80]), 10);
}

proptest! {
    #[test]
    fn prop_crc16_matches_xmodem(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(crc16(&data, CRC16_POLY, CRC16_INIT), XMODEM.checksum(&data));
    }

    #[test]
    fn prop_lfsr_digest_is_linear(
        a in proptest::collection::vec(any::<u8>(), 15),
        b in proptest::collection::vec(any::<u8>(), 15),
    ) {
        let x: Vec<u8> = a.iter().zip(&b).map(|(p, q)| p ^ q).collect();
        prop_assert_eq!(
            lfsr_digest16(&x, LFSR_GENERATOR, LFSR_KEY_6IN1),
            lfsr_digest16(&a, LFSR_GENERATOR, LFSR_KEY_6IN1) ^ lfsr_digest16(&b, LFSR_GENERATOR, LFSR_KEY_6IN1)
        );
    }
}
