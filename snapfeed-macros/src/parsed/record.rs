#[allow(unused_imports)]
use super::*;

pub(crate) struct ParsedRecord {
    name: Ident,
    table: String,
    id_column: Ident,
    owner_column: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    columns: Vec<ParsedColumn>,
    unique_together: Vec<Vec<String>>,
    distinct: Vec<(String, String)>,
    policy: PolicySpec,
}

struct PolicySpec {
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl Default for PolicySpec {
    fn default() -> Self {
        Self {
            select: "anyone".to_string(),
            insert: "owner".to_string(),
            update: "owner".to_string(),
            delete: "owner".to_string(),
        }
    }
}

const POLICY_RULES: &[&str] = &["anyone", "authenticated", "owner", "deny"];

impl ParsedRecord {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut table: Option<String> = None;
        let mut unique_together = Vec::new();
        let mut distinct = Vec::new();
        let mut policy = PolicySpec::default();

        for attr in &input.attrs {
            if attr.path().is_ident("record") {
                Self::parse_container_attr(attr, &mut table, &mut unique_together, &mut distinct, &mut policy)?;
            }
        }

        let table = table.ok_or_else(|| {
            Error::new(input.ident.span(), "Record requires #[record(table = \"...\")]")
        })?;

        let columns = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedColumn::from_field)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.ident.span(), "Record requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Record can only be derived for structs")),
        };

        let id_column = Self::single(&columns, |c| c.is_id, "#[record(id)]", &input.ident)?
            .map(|c| c.ident.clone())
            .ok_or_else(|| Error::new(input.ident.span(), "Record requires a field annotated with #[record(id)]"))?;
        let owner_column = Self::single(&columns, |c| c.is_owner, "#[record(owner)]", &input.ident)?
            .map(|c| c.name.clone());
        let created_at = Self::single(&columns, |c| c.created_at, "#[record(created_at)]", &input.ident)?
            .map(|c| c.name.clone());
        let updated_at = Self::single(&columns, |c| c.updated_at, "#[record(updated_at)]", &input.ident)?
            .map(|c| c.name.clone());

        let known: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        for name in unique_together.iter().flatten().chain(distinct.iter().flat_map(|(a, b)| [a, b])) {
            if !known.contains(&name.as_str()) {
                return Err(Error::new(
                    input.ident.span(),
                    format!("`{name}` is not a column of {}", input.ident),
                ));
            }
        }

        Ok(Self {
            name: input.ident.clone(),
            table,
            id_column,
            owner_column,
            created_at,
            updated_at,
            columns,
            unique_together,
            distinct,
            policy,
        })
    }

    fn single<'a>(
        columns: &'a [ParsedColumn],
        predicate: impl Fn(&ParsedColumn) -> bool,
        label: &str,
        ident: &Ident,
    ) -> Result<Option<&'a ParsedColumn>> {
        let mut matches = columns.iter().filter(|c| predicate(c));
        let first = matches.next();
        if matches.next().is_some() {
            return Err(Error::new(ident.span(), format!("Record allows at most one {label} field")));
        }
        Ok(first)
    }

    fn parse_container_attr(
        attr: &Attribute,
        table: &mut Option<String>,
        unique_together: &mut Vec<Vec<String>>,
        distinct: &mut Vec<(String, String)>,
        policy: &mut PolicySpec,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                *table = Some(value.value());
            } else if meta.path.is_ident("unique_together") {
                let fields = parse_column_list(&meta)?;
                if fields.len() < 2 {
                    return Err(meta.error("unique_together requires at least 2 columns"));
                }
                unique_together.push(fields);
            } else if meta.path.is_ident("distinct") {
                let fields = parse_column_list(&meta)?;
                match fields.as_slice() {
                    [left, right] => distinct.push((left.clone(), right.clone())),
                    _ => return Err(meta.error("distinct takes exactly 2 columns")),
                }
            } else if meta.path.is_ident("policy") {
                meta.parse_nested_meta(|rule| {
                    let value: LitStr = rule.value()?.parse()?;
                    let value = value.value();
                    if !POLICY_RULES.contains(&value.as_str()) {
                        return Err(rule.error(format!(
                            "unknown policy rule `{value}`, expected one of {POLICY_RULES:?}"
                        )));
                    }
                    if rule.path.is_ident("select") {
                        policy.select = value;
                    } else if rule.path.is_ident("insert") {
                        policy.insert = value;
                    } else if rule.path.is_ident("update") {
                        policy.update = value;
                    } else if rule.path.is_ident("delete") {
                        policy.delete = value;
                    } else {
                        return Err(rule.error("expected select, insert, update or delete"));
                    }
                    Ok(())
                })?;
            } else {
                return Err(meta.error("unsupported record attribute"));
            }
            Ok(())
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let name_lit = lit(&name.to_string());
        let table = lit(&self.table);
        let id_ident = &self.id_column;
        let id_lit = lit(&self.id_column.to_string());

        let optional = |value: &Option<String>| match value {
            Some(column) => {
                let column = lit(column);
                quote! { ::std::option::Option::Some(#column.to_string()) }
            }
            None => quote! { ::std::option::Option::None },
        };
        let owner = optional(&self.owner_column);
        let created_at = optional(&self.created_at);
        let updated_at = optional(&self.updated_at);

        let column_inits = self.columns.iter().map(|c| c.to_descriptor_tokens());
        let foreign_keys = self.columns.iter().filter_map(|c| c.foreign_key_tokens());

        let mut unique_inits: Vec<TokenStream2> = self
            .columns
            .iter()
            .filter_map(|c| {
                c.unique.map(|case_insensitive| {
                    let column = lit(&c.name);
                    quote! {
                        ::snapfeed::types::UniqueConstraint::new([#column], #case_insensitive)
                    }
                })
            })
            .collect();
        for columns in &self.unique_together {
            let columns = columns.iter().map(|c| lit(c));
            unique_inits.push(quote! {
                ::snapfeed::types::UniqueConstraint::new([#(#columns),*], false)
            });
        }

        let check_inits = self.distinct.iter().map(|(left, right)| {
            let left = lit(left);
            let right = lit(right);
            quote! {
                ::snapfeed::types::CheckConstraint::Distinct {
                    left: #left.to_string(),
                    right: #right.to_string(),
                }
            }
        });

        let rule = |value: &str| match value {
            "anyone" => quote! { ::snapfeed::policy::PolicyRule::Anyone },
            "authenticated" => quote! { ::snapfeed::policy::PolicyRule::Authenticated },
            "owner" => quote! { ::snapfeed::policy::PolicyRule::Owner },
            _ => quote! { ::snapfeed::policy::PolicyRule::Deny },
        };
        let select = rule(&self.policy.select);
        let insert = rule(&self.policy.insert);
        let update = rule(&self.policy.update);
        let delete = rule(&self.policy.delete);

        quote! {
            impl ::snapfeed::types::Record for #name {
                const TABLE: &'static str = #table;

                fn descriptor() -> ::snapfeed::types::TableDescriptor {
                    ::snapfeed::types::TableDescriptor {
                        table: #table.to_string(),
                        id_column: #id_lit.to_string(),
                        owner_column: #owner,
                        created_at_column: #created_at,
                        updated_at_column: #updated_at,
                        columns: vec![#(#column_inits),*],
                        unique_constraints: vec![#(#unique_inits),*],
                        foreign_keys: vec![#(#foreign_keys),*],
                        checks: vec![#(#check_inits),*],
                        policies: ::snapfeed::policy::TablePolicies {
                            select: #select,
                            insert: #insert,
                            update: #update,
                            delete: #delete,
                        },
                    }
                }

                fn row_id(&self) -> &str {
                    &self.#id_ident
                }
            }

            ::snapfeed::inventory::submit! {
                ::snapfeed::registry::TableRegistration {
                    table: #table,
                    type_name: #name_lit,
                    descriptor_fn: <#name as ::snapfeed::types::Record>::descriptor,
                }
            }
        }
    }
}
