use heck::{ToShoutySnakeCase, ToSnakeCase};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

/// Generates a layered config loader for a struct of `String` fields.
///
/// Values are read from the kdl config file, then `MRLENS_<FIELD>` env vars,
/// then `--<field>` cli flags, later sources winning. Fields annotated with
/// `#[config(default = "...")]` fall back to that value when no source sets them.
#[proc_macro_derive(AppConfig, attributes(config))]
pub fn app_config_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand(&ast) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

struct FieldGen {
    try_gen: TokenStream2,
    field_gen: TokenStream2,
    cli_gen: TokenStream2,
    cli_args_gen: TokenStream2,
    env_gen: TokenStream2,
    config_gen: TokenStream2,
}

fn field_default(field: &syn::Field) -> syn::Result<Option<LitStr>> {
    let mut default = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("config")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported config attribute"))
            }
        })?;
    }

    Ok(default)
}

fn expand_field(field: &syn::Field) -> syn::Result<FieldGen> {
    let field_name = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "AppConfig requires named fields"))?;
    let field_type = &field.ty;

    let try_gen = match field_default(field)? {
        Some(default) => quote! {
            #field_name: value.#field_name.unwrap_or_else(|| #default.to_string()),
        },
        None => quote! {
            #field_name: value.#field_name.ok_or(::anyhow::anyhow!(format!("expected {} to be set", stringify!(#field_name))))?,
        },
    };

    let field_gen = quote! {
        pub #field_name: Option<#field_type>,
    };

    let cli_gen = quote! {
        if let Some(#field_name) = matches.remove_one::<#field_type>(stringify!(#field_name)) {
            self.#field_name = Some(#field_name);
        }
    };

    let cli_args_gen = quote! {
        .arg(
            ::clap::Arg::new(stringify!(#field_name))
                .long(stringify!(#field_name))
                .action(::clap::ArgAction::Set)
                .help_heading("Config")
                .global(true)
        )
    };

    let env_suffix = field_name.to_string().to_shouty_snake_case();
    let env_gen = quote! {
        if let Ok(item) = std::env::var(format!("{}{}", ::mrlens_config::ENV_PREFIX, #env_suffix)) {
            self.#field_name = Some(item);
        }
    };

    let config_gen = quote! {
        if let Some(item) = config.get(stringify!(#field_name)).and_then(|i| i.entries().first()).map(|i| i.value()) {
            ::tracing::debug!("found {}: {}", stringify!(#field_name), item);
            self.#field_name = item.as_string().map(|i| i.to_string());
        }
    };

    Ok(FieldGen {
        try_gen,
        field_gen,
        cli_gen,
        cli_args_gen,
        env_gen,
        config_gen,
    })
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &ast.ident;
    let namespace = syn::Ident::new(
        &format!("{}", &struct_name).to_snake_case(),
        struct_name.span(),
    );

    let fields = match &ast.data {
        syn::Data::Struct(data_struct) => data_struct
            .fields
            .iter()
            .map(expand_field)
            .collect::<syn::Result<Vec<_>>>()?,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "AppConfig can only be derived for structs",
            ))
        }
    };

    let try_gen = fields.iter().map(|f| &f.try_gen);
    let field_gen = fields.iter().map(|f| &f.field_gen);
    let cli_gen = fields.iter().map(|f| &f.cli_gen);
    let cli_args_gen = fields.iter().map(|f| &f.cli_args_gen);
    let env_gen = fields.iter().map(|f| &f.env_gen);
    let config_gen = fields.iter().map(|f| &f.config_gen);

    let expanded = quote! {
        impl #struct_name {
            pub fn from(conf: #namespace::#struct_name) -> ::anyhow::Result<Self> {
                use ::anyhow::Context;

                let c = conf.try_into().context("failed to resolve application config")?;

                Ok(c)
            }
        }

        impl TryFrom<#namespace::#struct_name> for #struct_name {
            type Error = ::anyhow::Error;

            fn try_from(value: #namespace::#struct_name) -> Result<Self, Self::Error> {
                Ok(Self {
                    #(#try_gen)*
                })
            }
        }

        pub mod #namespace {
            #[derive(Default, Clone, Debug)]
            pub struct #struct_name {
                pub config_file: Option<::std::path::PathBuf>,

                #(#field_gen)*
            }

            impl ::clap::FromArgMatches for #struct_name {
                fn from_arg_matches(matches: &::clap::ArgMatches) -> Result<Self, ::clap::error::Error> {
                    let mut matches = matches.clone();
                    Self::from_arg_matches_mut(&mut matches)
                }
                fn from_arg_matches_mut(matches: &mut ::clap::ArgMatches) -> Result<Self, ::clap::error::Error> {
                    let mut s = Self::default();
                    s.update_from_arg_matches_mut(matches)?;

                    Ok(s)
                }
                fn update_from_arg_matches(&mut self, matches: &::clap::ArgMatches) -> Result<(), ::clap::error::Error> {
                    let mut matches = matches.clone();
                    self.update_from_arg_matches_mut(&mut matches)
                }
                fn update_from_arg_matches_mut(&mut self, matches: &mut ::clap::ArgMatches) -> Result<(), ::clap::error::Error> {
                    use ::mrlens_config::{ConfigFile, Env};

                    let config = matches
                        .remove_one::<String>("config-file")
                        .map(::std::path::PathBuf::from)
                        .unwrap_or_else(::mrlens_config::default_config_file);

                    if let Err(e) = self.set_from_config_file(&config) {
                        ::tracing::warn!("failed to read config from file: {e}");
                    }
                    if let Err(e) = self.set_from_env() {
                        ::tracing::warn!("failed to read config from env: {e}");
                    }
                    self.config_file = Some(config);

                    #(#cli_gen)*

                    Ok(())
                }
            }

            impl ::clap::Args for #struct_name {
                fn augment_args(cmd: ::clap::Command) -> ::clap::Command {
                    cmd
                        .arg(
                            ::clap::Arg::new("config-file")
                                .long("config-file")
                                .action(::clap::ArgAction::Set)
                                .help_heading("Config")
                                .global(true)
                        )
                    #(#cli_args_gen)*
                }
                fn augment_args_for_update(cmd: ::clap::Command) -> ::clap::Command {
                    Self::augment_args(cmd)
                }
            }

            impl ::mrlens_config::Env for #struct_name {
                fn set_from_env(&mut self) -> Result<(), ::mrlens_config::EnvError> {
                    #(#env_gen)*

                    Ok(())
                }
            }

            impl ::mrlens_config::ConfigFile for #struct_name {
                fn set_from_config_file(&mut self, config_file: &::std::path::Path) -> Result<(), ::mrlens_config::ConfigFileError> {
                    use ::anyhow::Context;

                    ::tracing::trace!("looking for kdl config at: {}", config_file.display());
                    let file_content = ::std::fs::read_to_string(config_file)
                        .context("failed to read config file")
                        .map_err(::mrlens_config::ConfigFileError::ConfigFileError)?;

                    let doc: ::kdl::KdlDocument = file_content.parse()
                        .context("failed to parse kdl config file")
                        .map_err(::mrlens_config::ConfigFileError::ConfigFileError)?;

                    if let Some(config) = doc.get("config").and_then(|c| c.children()) {
                        ::tracing::debug!("found config block");

                        #(#config_gen)*
                    }

                    Ok(())
                }
            }
        }
    };

    Ok(expanded)
}
