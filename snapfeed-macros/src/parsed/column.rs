#[allow(unused_imports)]
use super::*;

pub(crate) struct ParsedColumn {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) is_id: bool,
    pub(crate) is_owner: bool,
    pub(crate) created_at: bool,
    pub(crate) updated_at: bool,
    pub(crate) indexed: bool,
    pub(crate) unique: Option<bool>,
    pub(crate) references: Option<ForeignKeySpec>,
}

pub(crate) struct ForeignKeySpec {
    pub(crate) table: String,
    pub(crate) cascade: bool,
}

impl ParsedColumn {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Record requires named fields"))?;
        let name = ident.to_string();

        let mut column = Self {
            ident,
            name,
            is_id: false,
            is_owner: false,
            created_at: false,
            updated_at: false,
            indexed: false,
            unique: None,
            references: None,
        };

        for attr in &field.attrs {
            if attr.path().is_ident("record") {
                column.parse_field_attr(attr)?;
            }
        }

        if column.created_at && column.updated_at {
            return Err(Error::new(
                field.span(),
                "a column cannot be both #[record(created_at)] and #[record(updated_at)]",
            ));
        }

        Ok(column)
    }

    fn parse_field_attr(&mut self, attr: &Attribute) -> Result<()> {
        let mut cascade = false;
        let mut references: Option<String> = None;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                self.is_id = true;
            } else if meta.path.is_ident("owner") {
                self.is_owner = true;
            } else if meta.path.is_ident("created_at") {
                self.created_at = true;
            } else if meta.path.is_ident("updated_at") {
                self.updated_at = true;
            } else if meta.path.is_ident("indexed") {
                self.indexed = true;
            } else if meta.path.is_ident("cascade") {
                cascade = true;
            } else if meta.path.is_ident("references") {
                let value: LitStr = meta.value()?.parse()?;
                references = Some(value.value());
            } else if meta.path.is_ident("unique") {
                let mut case_insensitive = false;
                if meta.input.peek(syn::token::Paren) {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let modifier: Ident = content.parse()?;
                    if modifier == "case_insensitive" {
                        case_insensitive = true;
                    } else {
                        return Err(Error::new(
                            modifier.span(),
                            format!("unknown unique option `{modifier}`, expected `case_insensitive`"),
                        ));
                    }
                }
                self.unique = Some(case_insensitive);
            } else {
                return Err(meta.error("unsupported record column attribute"));
            }
            Ok(())
        })?;

        match references {
            Some(table) => self.references = Some(ForeignKeySpec { table, cascade }),
            None if cascade => {
                return Err(Error::new(attr.span(), "`cascade` requires `references = \"table\"`"));
            }
            None => {}
        }

        Ok(())
    }

    pub(crate) fn to_descriptor_tokens(&self) -> TokenStream2 {
        let name = lit(&self.name);
        let indexed = self.indexed || self.is_owner || self.unique.is_some() || self.references.is_some();
        quote! {
            ::snapfeed::types::ColumnDescriptor {
                name: #name.to_string(),
                indexed: #indexed,
            }
        }
    }

    pub(crate) fn foreign_key_tokens(&self) -> Option<TokenStream2> {
        let spec = self.references.as_ref()?;
        let column = lit(&self.name);
        let table = lit(&spec.table);
        let on_delete = if spec.cascade {
            quote! { ::snapfeed::types::OnDelete::Cascade }
        } else {
            quote! { ::snapfeed::types::OnDelete::Restrict }
        };
        Some(quote! {
            ::snapfeed::types::ForeignKey {
                column: #column.to_string(),
                references: #table.to_string(),
                on_delete: #on_delete,
            }
        })
    }
}
