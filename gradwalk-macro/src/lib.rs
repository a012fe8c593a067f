use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, BinOp, Block, Expr, ExprLit, Ident, Pat, Stmt, UnOp,
};

/// Builds a `gradwalk::Term<f64>` graph from plain arithmetic.
///
/// `let` bindings of literals become variables named after the binding,
/// literals inside expressions become constants, `+ - * /` map to the term
/// operators and `sin cos exp ln pow` (method or function call syntax) map to
/// the term methods.
///
/// ```ignore
/// gradwalk! {{
///     let x = 3.;
///     let f = x.pow(2.) + sin(x);
/// }};
/// ```
#[proc_macro]
pub fn gradwalk(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as Block);

    let mut objs = vec![];

    for stmt in &input.stmts {
        traverse_stmt(stmt, &mut objs);
    }

    let expanded = quote! {
        #(#objs)*
    };

    TokenStream::from(expanded)
}

fn traverse_stmt(input: &Stmt, terms: &mut Vec<TokenStream2>) {
    match input {
        Stmt::Local(local) => {
            if let (Pat::Ident(id), Some(init)) = (&local.pat, &local.init) {
                let name = id.ident.clone();
                let ex = &init.expr;
                let ts = match ex as &Expr {
                    Expr::Lit(lit) => quote! {
                        let #name = ::gradwalk::Term::<f64>::variable(stringify!(#name), #lit as f64);
                    },
                    Expr::Path(path) => quote! {
                        let #name = #path.clone();
                    },
                    _ => {
                        if let Some(res) = traverse_expr(ex, terms) {
                            quote! {
                                let #name = #res;
                            }
                        } else {
                            let message = format!(
                                "gradwalk!: unsupported expression for `{}`",
                                name
                            );
                            quote! {
                                compile_error!(#message);
                            }
                        }
                    }
                };
                terms.push(ts);
            }
        }
        Stmt::Expr(ex, _) => {
            traverse_expr(ex, terms);
        }
        _ => (),
    }
}

fn var_name(terms: &[TokenStream2]) -> String {
    format!("_a{}", terms.len())
}

fn format_constant(ex: &ExprLit, negate: bool, terms: &mut Vec<TokenStream2>) -> Ident {
    let name = Ident::new(&var_name(terms), ex.span());
    let value = if negate {
        quote! { -(#ex as f64) }
    } else {
        quote! { #ex as f64 }
    };
    let ts = quote! {
        let #name = ::gradwalk::Term::<f64>::constant(#value);
    };
    terms.push(ts);
    name
}

fn push_term(span: proc_macro2::Span, body: TokenStream2, terms: &mut Vec<TokenStream2>) -> Ident {
    let name = Ident::new(&var_name(terms), span);
    terms.push(quote! {
        let #name = #body;
    });
    name
}

/// Apply a named function to already traversed arguments.
fn apply_fn(
    func: &Ident,
    receiver: Ident,
    args: &[Ident],
    span: proc_macro2::Span,
    terms: &mut Vec<TokenStream2>,
) -> Option<Ident> {
    let body = match (func.to_string().as_str(), args) {
        ("sin" | "cos" | "exp" | "ln", []) => quote! { #receiver.#func() },
        ("pow" | "powf", [exponent]) => quote! { #receiver.pow(&#exponent) },
        _ => return None,
    };
    Some(push_term(span, body, terms))
}

fn traverse_expr(input: &Expr, terms: &mut Vec<TokenStream2>) -> Option<Ident> {
    match input {
        Expr::Binary(ex) => {
            let lhs = traverse_expr(&ex.left, terms)?;
            let rhs = traverse_expr(&ex.right, terms)?;
            let binop = match ex.op {
                BinOp::Add(_) => quote! { &#lhs + &#rhs },
                BinOp::Sub(_) => quote! { &#lhs - &#rhs },
                BinOp::Mul(_) => quote! { &#lhs * &#rhs },
                BinOp::Div(_) => quote! { &#lhs / &#rhs },
                _ => return None,
            };
            Some(push_term(ex.span(), binop, terms))
        }
        Expr::Unary(ex) if matches!(ex.op, UnOp::Neg(_)) => {
            if let Expr::Lit(lit) = &*ex.expr {
                return Some(format_constant(lit, true, terms));
            }
            let operand = traverse_expr(&ex.expr, terms)?;
            let minus_one = Ident::new(&var_name(terms), ex.span());
            terms.push(quote! {
                let #minus_one = ::gradwalk::Term::<f64>::constant(-1.);
            });
            Some(push_term(ex.span(), quote! { &#minus_one * &#operand }, terms))
        }
        Expr::Paren(ex) => traverse_expr(&ex.expr, terms),
        Expr::Lit(lit) => Some(format_constant(lit, false, terms)),
        Expr::Path(path) => path.path.segments.last().map(|seg| seg.ident.clone()),
        Expr::MethodCall(call) => {
            let receiver = traverse_expr(&call.receiver, terms)?;
            let args = call
                .args
                .iter()
                .map(|arg| traverse_expr(arg, terms))
                .collect::<Option<Vec<_>>>()?;
            apply_fn(&call.method, receiver, &args, call.span(), terms)
        }
        Expr::Call(call) => {
            let Expr::Path(func) = &*call.func else {
                return None;
            };
            let func = func.path.segments.last()?.ident.clone();
            let mut args = call
                .args
                .iter()
                .map(|arg| traverse_expr(arg, terms))
                .collect::<Option<Vec<_>>>()?
                .into_iter();
            let receiver = args.next()?;
            let rest: Vec<_> = args.collect();
            apply_fn(&func, receiver, &rest, call.span(), terms)
        }
        _ => None,
    }
}
