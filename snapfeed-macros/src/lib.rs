use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, parse::Parse, parse_macro_input,
    spanned::Spanned,
};

mod parsed;

use parsed::ParsedRecord;

/// Derive table metadata for a row type stored on the data platform.
///
/// ```text
/// #[derive(Record)]
/// #[record(table = "likes", unique_together = ["post_id", "user_id"])]
/// #[record(policy(select = "anyone", insert = "owner", update = "deny", delete = "owner"))]
/// pub struct Like {
///     #[record(id)]
///     pub id: String,
///     #[record(references = "posts", cascade)]
///     pub post_id: String,
///     #[record(owner, references = "profiles", cascade)]
///     pub user_id: String,
///     #[record(created_at)]
///     pub created_at: DateTime<Utc>,
/// }
/// ```
///
/// The derive implements `snapfeed::Record` and submits a `TableRegistration`
/// to the inventory so platforms can discover the table by name.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedRecord::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
