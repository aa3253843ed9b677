use super::*;

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(w, h).unwrap()
}

#[test]
fn new_surface_is_blank() {
    let s = Surface::new(canvas(3, 2));
    assert!(s.is_blank());
    assert_eq!(s.data().len(), 24);
    assert_eq!(s.pixel(3, 0), None);
}

#[test]
fn fill_premultiplies() {
    let mut s = Surface::new(canvas(1, 1));
    s.fill([255, 0, 0, 128]);
    assert_eq!(s.pixel(0, 0), Some([128, 0, 0, 128]));
    s.clear();
    assert!(s.is_blank());
}

#[test]
fn copy_requires_matching_size() {
    let mut a = Surface::new(canvas(2, 2));
    let mut b = Surface::new(canvas(2, 2));
    b.fill([1, 2, 3, 255]);
    a.copy_from(&b).unwrap();
    assert_eq!(a.pixel(1, 1), Some([1, 2, 3, 255]));

    let c = Surface::new(canvas(3, 2));
    assert!(a.copy_from(&c).is_err());
}

#[test]
fn from_premul_checks_length() {
    assert!(Surface::from_premul(canvas(2, 2), vec![0; 15]).is_err());
    assert!(Surface::from_premul(canvas(2, 2), vec![0; 16]).is_ok());
}

#[test]
fn snapshot_is_premultiplied_copy() {
    let mut s = Surface::new(canvas(2, 1));
    s.fill([9, 9, 9, 255]);
    let frame = s.snapshot();
    s.clear();
    assert!(frame.premultiplied);
    assert_eq!(frame.data, vec![9, 9, 9, 255, 9, 9, 9, 255]);
}

#[test]
fn shared_lock_survives_poison() {
    let shared = Surface::new(canvas(1, 1)).into_shared();
    let clone = shared.clone();
    let _ = std::thread::spawn(move || {
        let _guard = clone.lock().unwrap();
        panic!("painter died");
    })
    .join();
    assert!(lock_surface(&shared).is_blank());
}

#[test]
fn snapshot_converts_back_to_straight_alpha() {
    let mut s = Surface::new(canvas(1, 1));
    s.fill([255, 0, 0, 128]);
    let frame = s.snapshot();
    assert!(frame.premultiplied);
    assert_eq!(frame.to_straight_rgba8(), vec![255, 0, 0, 128]);
}
