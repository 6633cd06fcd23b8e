//! Module Templates
//!
//! Final module assembly goes through minijinja templates embedded in the
//! binary. Debug builds on native targets read the template files from disk
//! first so they can be edited without a rebuild.

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::sync::OnceLock;

use crate::errors::{Result, ShaderError};

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/emit/templates"]
struct TemplateAssets;

fn get_env() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure template syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);

        env.set_loader(template_loader);

        env
    })
}

/// Looks up `name` verbatim; every module template carries its extension.
fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    #[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
    {
        let path = std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/src/emit/templates"))
            .join(name);
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(source) => return Ok(Some(source)),
                Err(e) => {
                    return Err(Error::new(
                        ErrorKind::TemplateNotFound,
                        format!("Failed to read file: {e}"),
                    ));
                }
            }
        }
    }

    if let Some(file) = TemplateAssets::get(name)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

/// Renders the template `name` with `ctx`.
pub(crate) fn render<S: Serialize>(name: &str, ctx: &S) -> Result<String> {
    let template = get_env()
        .get_template(name)
        .map_err(|e| ShaderError::internal(format!("template '{name}': {e}")))?;
    template
        .render(ctx)
        .map_err(|e| ShaderError::internal(format!("rendering '{name}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_templates_are_embedded() {
        assert!(TemplateAssets::get("module.glsl").is_some());
        assert!(TemplateAssets::get("module.wgsl").is_some());
    }

    #[test]
    fn template_names_need_their_extension() {
        assert!(template_loader("module").unwrap().is_none());
        assert!(template_loader("module.wgsl").unwrap().is_some());
    }

    #[test]
    fn missing_template_is_an_internal_error() {
        let err = render("no_such_module", &()).unwrap_err();
        assert!(err.is_internal());
    }
}
