use gradwalk::{Term, Walker};

#[test]
fn main() {
    let a = Term::variable("a", 1.);
    let b = Term::variable("b", 3.);
    let c = Term::variable("c", 5.);
    let ab = &a + &b;
    let ac = &a + &c;
    let abac = &ab + &ac;

    let mut walker = Walker::new(&abac);
    let frames = walker.finish();
    assert_eq!(frames, walker.frame_budget());
    assert_eq!(walker.adjoint(&a), 2.);
    assert_eq!(walker.adjoint(&b), 1.);
    assert_eq!(walker.adjoint(&c), 1.);
}

#[test]
fn shared_node_is_popped_once() {
    // u feeds both g and f, and g feeds f.
    let a = Term::variable("a", 2.);
    let b = Term::variable("b", 3.);
    let c = Term::variable("c", 4.);
    let u = &a * &b;
    let g = &u + &c;
    let f = &g * &u;

    let frames: Vec<_> = Walker::new(&f).collect();
    let visits = frames
        .iter()
        .filter(|frame| frame.node == u.id())
        .count();
    assert_eq!(visits, 2, "one frame per operand of u");

    let mut walker = Walker::new(&f);
    walker.finish();
    // f = (ab + c) * ab, df/du = 2u + c = 16
    assert_eq!(walker.adjoint(&a), 16. * 3.);
    assert_eq!(walker.adjoint(&b), 16. * 2.);
    assert_eq!(walker.adjoint(&c), 6.);
}
