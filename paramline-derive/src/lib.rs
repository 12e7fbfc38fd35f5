use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Literal, Span};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, ExprUnary, Fields, Ident, Lit, LitStr,
    Type, UnOp, parse_macro_input, spanned::Spanned,
};

/// Derive macro for the `Parameter` trait.
///
/// Applies to a struct with exactly one named `f32` field. The parameter's
/// metadata comes from a `#[param(...)]` attribute:
///
/// | key | meaning |
/// |-----|---------|
/// | `id` | variant of `ParamId` (and of `ParamValue`) for this kind |
/// | `name` | stable name used for registry lookup |
/// | `label` | short label used in table renderings |
/// | `default` | numeric literal installed before any update |
/// | `min`, `max` | inclusive bounds, numeric literals |
///
/// Besides the trait impl, the macro generates `From<Self> for ParamValue`.
///
/// # Compile-Time Checks
///
/// - `min <= max`, both finite
/// - `default` lies within `[min, max]`
/// - the struct has exactly one named field, of type `f32`
///
/// # Example
///
/// ```ignore
/// #[derive(Parameter, Debug, Clone, Copy, PartialEq)]
/// #[param(id = FanDutyCycle, name = "FanDutyCycle", label = "FanDuty",
///         default = 50.0, min = 0.0, max = 100.0)]
/// pub struct FanDutyCycle {
///     pub percent: f32,
/// }
/// ```
///
/// # Compile Errors
///
/// Violations are reported at the offending struct name or field type, e.g.
/// `Parameter min (100) is greater than max (0)`. The cases are pinned by
/// the UI tests under `paramline/tests/ui/`.
#[proc_macro_derive(Parameter, attributes(param))]
pub fn derive_parameter(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_parameter_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn get_crate_path() -> proc_macro2::TokenStream {
    match crate_name("paramline") {
        Ok(FoundCrate::Itself) => {
            quote!(::paramline)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => {
            quote!(::paramline)
        }
    }
}

/// Contents of the `#[param(...)]` attribute.
struct ParamAttrs {
    id: Ident,
    name: LitStr,
    label: LitStr,
    default: f32,
    min: f32,
    max: f32,
}

fn derive_parameter_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let field = get_value_field(input)?;
    let attrs = parse_param_attrs(input)?;
    check_bounds(&attrs, input.ident.span())?;

    let ty = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let crate_path = get_crate_path();

    let ParamAttrs {
        id,
        name,
        label,
        default,
        min,
        max,
    } = &attrs;
    let default = Literal::f32_suffixed(*default);
    let min = Literal::f32_suffixed(*min);
    let max = Literal::f32_suffixed(*max);

    Ok(quote! {
        impl #impl_generics #crate_path::Parameter for #ty #ty_generics #where_clause {
            const ID: #crate_path::ParamId = #crate_path::ParamId::#id;
            const NAME: &'static str = #name;
            const LABEL: &'static str = #label;
            const DEFAULT: Self = Self { #field: #default };
            const MIN: f32 = #min;
            const MAX: f32 = #max;

            #[inline]
            fn from_raw(raw: f32) -> Self {
                Self { #field: raw }
            }

            #[inline]
            fn raw(&self) -> f32 {
                self.#field
            }

            #[inline]
            fn from_value(value: &#crate_path::ParamValue) -> ::core::option::Option<Self> {
                match value {
                    #crate_path::ParamValue::#id(v) => ::core::option::Option::Some(*v),
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::core::convert::From<#ty #ty_generics>
            for #crate_path::ParamValue #where_clause
        {
            #[inline]
            fn from(value: #ty #ty_generics) -> Self {
                #crate_path::ParamValue::#id(value)
            }
        }
    })
}

/// Returns the ident of the single named `f32` field.
fn get_value_field(input: &DeriveInput) -> syn::Result<&Ident> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new(
            input.span(),
            "Parameter can only be derived for structs with one named f32 field",
        ));
    };

    let Fields::Named(fields) = &data.fields else {
        return Err(Error::new(
            data.fields.span(),
            "Parameter requires a named field, e.g. `struct Speed { value: f32 }`",
        ));
    };

    let mut iter = fields.named.iter();
    let (Some(field), None) = (iter.next(), iter.next()) else {
        return Err(Error::new(fields.span(), "Parameter requires exactly one field"));
    };

    check_f32(&field.ty)?;

    field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(field.span(), "expected a named field"))
}

fn check_f32(ty: &Type) -> syn::Result<()> {
    match ty {
        Type::Path(path) if path.qself.is_none() && path.path.is_ident("f32") => Ok(()),
        other => Err(Error::new(
            other.span(),
            format!(
                "Parameter field has type `{}`; it must be `f32`",
                quote!(#other)
            ),
        )),
    }
}

fn is_param_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("param")
}

fn parse_param_attrs(input: &DeriveInput) -> syn::Result<ParamAttrs> {
    let attr = input.attrs.iter().find(|a| is_param_attr(a)).ok_or_else(|| {
        Error::new(
            input.span(),
            "Parameter requires #[param(id = .., name = \"..\", label = \"..\", \
             default = .., min = .., max = ..)]",
        )
    })?;

    let mut id = None;
    let mut name = None;
    let mut label = None;
    let mut default = None;
    let mut min = None;
    let mut max = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("id") {
            id = Some(meta.value()?.parse::<Ident>()?);
        } else if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse::<LitStr>()?);
        } else if meta.path.is_ident("label") {
            label = Some(meta.value()?.parse::<LitStr>()?);
        } else if meta.path.is_ident("default") {
            default = Some(eval_number(&meta.value()?.parse::<Expr>()?)?);
        } else if meta.path.is_ident("min") {
            min = Some(eval_number(&meta.value()?.parse::<Expr>()?)?);
        } else if meta.path.is_ident("max") {
            max = Some(eval_number(&meta.value()?.parse::<Expr>()?)?);
        } else {
            return Err(meta.error("unknown key; expected id, name, label, default, min, max"));
        }
        Ok(())
    })?;

    let missing = |key: &str| Error::new(attr.span(), format!("#[param] is missing `{key}`"));

    Ok(ParamAttrs {
        id: id.ok_or_else(|| missing("id"))?,
        name: name.ok_or_else(|| missing("name"))?,
        label: label.ok_or_else(|| missing("label"))?,
        default: default.ok_or_else(|| missing("default"))?,
        min: min.ok_or_else(|| missing("min"))?,
        max: max.ok_or_else(|| missing("max"))?,
    })
}

/// Evaluates an integer or float literal, optionally negated.
fn eval_number(expr: &Expr) -> syn::Result<f32> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Float(f) => f.base10_parse::<f32>(),
            Lit::Int(i) => i.base10_parse::<f32>(),
            other => Err(Error::new(other.span(), "expected a numeric literal")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => eval_number(expr).map(|v| -v),
        other => Err(Error::new(other.span(), "expected a numeric literal")),
    }
}

fn check_bounds(attrs: &ParamAttrs, span: Span) -> syn::Result<()> {
    let (default, min, max) = (attrs.default, attrs.min, attrs.max);

    if !(min.is_finite() && max.is_finite() && default.is_finite()) {
        return Err(Error::new(span, "Parameter bounds and default must be finite"));
    }
    if min > max {
        return Err(Error::new(
            span,
            format!("Parameter min ({min}) is greater than max ({max})"),
        ));
    }
    if default < min || default > max {
        return Err(Error::new(
            span,
            format!("Parameter default ({default}) lies outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn setpoint() -> DeriveInput {
        parse_quote! {
            #[param(id = TemperatureSetpoint, name = "TemperatureSetpoint", label = "Tset",
                    default = 37.5, min = 0.0, max = 100.0)]
            struct TemperatureSetpoint {
                value: f32,
            }
        }
    }

    #[test]
    fn test_parse_attrs_reads_every_key() {
        let attrs = parse_param_attrs(&setpoint()).unwrap();
        assert_eq!(attrs.id, "TemperatureSetpoint");
        assert_eq!(attrs.name.value(), "TemperatureSetpoint");
        assert_eq!(attrs.label.value(), "Tset");
        assert_eq!(attrs.default, 37.5);
        assert_eq!(attrs.min, 0.0);
        assert_eq!(attrs.max, 100.0);
    }

    #[test]
    fn test_parse_attrs_accepts_integers_and_negatives() {
        let input: DeriveInput = parse_quote! {
            #[param(id = Offset, name = "Offset", label = "Off", default = 0, min = -5, max = 5.5)]
            struct Offset {
                delta: f32,
            }
        };
        let attrs = parse_param_attrs(&input).unwrap();
        assert_eq!((attrs.default, attrs.min, attrs.max), (0.0, -5.0, 5.5));
    }

    #[test]
    fn test_parse_attrs_rejects_missing_key() {
        let input: DeriveInput = parse_quote! {
            #[param(id = Foo, name = "Foo", default = 1.0, min = 0.0, max = 2.0)]
            struct Foo {
                value: f32,
            }
        };
        let err = parse_param_attrs(&input).err().unwrap();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn test_parse_attrs_rejects_unknown_key() {
        let input: DeriveInput = parse_quote! {
            #[param(id = Foo, name = "Foo", label = "F", default = 1.0, min = 0.0, max = 2.0,
                    step = 0.5)]
            struct Foo {
                value: f32,
            }
        };
        assert!(parse_param_attrs(&input).is_err());
    }

    #[test]
    fn test_parse_attrs_rejects_missing_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Foo {
                value: f32,
            }
        };
        assert!(parse_param_attrs(&input).is_err());
    }

    #[test]
    fn test_parse_attrs_rejects_non_literal_bound() {
        let input: DeriveInput = parse_quote! {
            #[param(id = Foo, name = "Foo", label = "F", default = 1.0, min = LOW, max = 2.0)]
            struct Foo {
                value: f32,
            }
        };
        assert!(parse_param_attrs(&input).is_err());
    }

    #[test]
    fn test_check_bounds_rejects_inverted_range() {
        let mut attrs = parse_param_attrs(&setpoint()).unwrap();
        attrs.min = 100.0;
        attrs.max = 0.0;
        assert!(check_bounds(&attrs, Span::call_site()).is_err());
    }

    #[test]
    fn test_check_bounds_rejects_default_outside_range() {
        let mut attrs = parse_param_attrs(&setpoint()).unwrap();
        attrs.default = 120.0;
        assert!(check_bounds(&attrs, Span::call_site()).is_err());
    }

    #[test]
    fn test_check_bounds_accepts_degenerate_range() {
        let mut attrs = parse_param_attrs(&setpoint()).unwrap();
        attrs.min = 5.0;
        attrs.max = 5.0;
        attrs.default = 5.0;
        assert!(check_bounds(&attrs, Span::call_site()).is_ok());
    }

    #[test]
    fn test_get_value_field_named() {
        let input = setpoint();
        assert_eq!(get_value_field(&input).unwrap(), "value");
    }

    #[test]
    fn test_get_value_field_rejects_tuple_struct() {
        let input: DeriveInput = parse_quote! {
            struct Foo(f32);
        };
        assert!(get_value_field(&input).is_err());
    }

    #[test]
    fn test_get_value_field_rejects_two_fields() {
        let input: DeriveInput = parse_quote! {
            struct Foo {
                a: f32,
                b: f32,
            }
        };
        assert!(get_value_field(&input).is_err());
    }

    #[test]
    fn test_get_value_field_rejects_empty_struct() {
        let input: DeriveInput = parse_quote! {
            struct Foo {}
        };
        assert!(get_value_field(&input).is_err());
    }

    #[test]
    fn test_get_value_field_rejects_enum() {
        let input: DeriveInput = parse_quote! {
            enum Foo {
                A(f32),
            }
        };
        assert!(get_value_field(&input).is_err());
    }

    #[test]
    fn test_check_f32_rejects_other_types() {
        assert!(check_f32(&parse_quote!(f32)).is_ok());
        assert!(check_f32(&parse_quote!(f64)).is_err());
        assert!(check_f32(&parse_quote!(u32)).is_err());
        assert!(check_f32(&parse_quote!(Option<f32>)).is_err());
        assert!(check_f32(&parse_quote!(&f32)).is_err());
    }

    #[test]
    fn test_expansion_mentions_field_and_variant() {
        let tokens = derive_parameter_impl(&setpoint()).unwrap().to_string();
        assert!(tokens.contains("ParamId :: TemperatureSetpoint"));
        assert!(tokens.contains("ParamValue :: TemperatureSetpoint"));
        assert!(tokens.contains("self . value"));
        assert!(tokens.contains("37.5f32"));
    }
}
