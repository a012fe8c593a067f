use approx::assert_relative_eq;
use gradwalk::{Category, Walker};
use gradwalk_macro::gradwalk;

#[test]
fn square_plus_sine() {
    gradwalk! {{
        let x = 3.;
        let f = x.pow(2.) + sin(x);
    }};

    assert_eq!(x.category(), Category::Variable);
    assert_eq!(x.name(), "x");
    assert_relative_eq!(f.eval(), 9. + 3f64.sin());

    let mut walker = Walker::new(&f);
    assert_eq!(walker.finish(), walker.frame_budget());
    assert_relative_eq!(walker.adjoint(&x), 6. + 3f64.cos(), epsilon = 1e-12);
}

#[test]
fn negation_and_division() {
    gradwalk! {{
        let a = 2.;
        let b = 4.;
        let f = -(a * b) / (b - -1.);
    }};

    assert_relative_eq!(f.eval(), -8. / 5.);

    let mut walker = Walker::new(&f);
    walker.finish();
    assert_relative_eq!(walker.adjoint(&a), -4. / 5., epsilon = 1e-12);
    // d/db of -(ab)/(b + 1) = -a/(b + 1) + ab/(b + 1)^2
    assert_relative_eq!(walker.adjoint(&b), -2. / 5. + 8. / 25., epsilon = 1e-12);
}

#[test]
fn bindings_can_alias_terms() {
    gradwalk! {{
        let x = 0.5;
        let y = x;
        let f = exp(x) * y;
    }};

    let mut walker = Walker::new(&f);
    walker.finish();
    let expected = 0.5f64.exp() * 1.5;
    assert_relative_eq!(walker.adjoint(&x), expected, epsilon = 1e-12);
    assert_eq!(y.id(), x.id());
}
