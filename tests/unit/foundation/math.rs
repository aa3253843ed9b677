use super::*;

#[test]
fn fnv_is_stable_and_order_sensitive() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"ab");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"ba");
    assert_ne!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_bytes(b"ab");
    assert_eq!(a.finish(), c.finish());
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 0), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
}

#[test]
fn unpremultiply_restores_straight_color() {
    let mut px = vec![10u8, 20, 30, 255, 64, 32, 0, 128, 9, 9, 9, 0];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[10, 20, 30, 255]);
    assert_eq!(&px[4..8], &[128, 64, 0, 128]);
    assert_eq!(&px[8..], &[0, 0, 0, 0]);
}
