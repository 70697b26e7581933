#[allow(unused_imports)]
use super::*;

mod column;
mod record;

pub(crate) use column::ParsedColumn;
pub(crate) use record::ParsedRecord;

/// Parse `["a", "b"]` following an `=` inside a nested meta.
pub(crate) fn parse_column_list(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<Vec<String>> {
    meta.input.parse::<syn::Token![=]>()?;
    let content;
    syn::bracketed!(content in meta.input);
    let parsed: syn::punctuated::Punctuated<LitStr, syn::Token![,]> =
        content.parse_terminated(<LitStr as Parse>::parse, syn::Token![,])?;
    Ok(parsed.into_iter().map(|lit| lit.value()).collect())
}

pub(crate) fn lit(value: &str) -> LitStr {
    LitStr::new(value, Span::call_site())
}
