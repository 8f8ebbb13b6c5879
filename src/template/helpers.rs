// This module contains the helpers templates can call while rendering.
// They are registered with the Handlebars registry by the renderer.

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
};
use log::trace;
use serde_json::Value;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::sync::Arc;

/// Potential errors during helper execution
mod error {
    use handlebars::RenderError;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum TemplateHelperError {
        #[snafu(display(
            "Incorrect number of params provided to helper '{}' in template '{}' - {} expected, {} received",
            helper,
            template,
            expected,
            received,
        ))]
        IncorrectNumberOfParams {
            expected: usize,
            received: usize,
            helper: String,
            template: String,
        },

        #[snafu(display("Missing param {} for helper '{}'", index, helper))]
        MissingParam { index: usize, helper: String },

        #[snafu(display(
            "Invalid template value, expected {}, got '{}' in template '{}'",
            expected,
            value,
            template
        ))]
        InvalidTemplateValue {
            expected: &'static str,
            value: serde_json::Value,
            template: String,
        },

        #[snafu(display("Failed to hash password in template '{}': {}", template, source))]
        PasswordHash {
            template: String,
            source: super::PasswordHashError,
        },

        #[snafu(display("Unable to write template '{}': '{}'", template, source))]
        TemplateWrite {
            template: String,
            source: std::io::Error,
        },
    }

    // Handlebars helpers are required to return a RenderError.
    impl From<TemplateHelperError> for RenderError {
        fn from(e: TemplateHelperError) -> RenderError {
            RenderError::from_error("TemplateHelperError", e)
        }
    }
}

/// Longest password bcrypt accepts; anything longer would be silently cut.
pub const BCRYPT_MAX_PASSWORD_LEN: usize = 72;

/// Errors from a [`PasswordHasher`].
#[derive(Debug, Snafu)]
pub enum PasswordHashError {
    #[snafu(display(
        "password is {} bytes, bcrypt accepts at most {}",
        len,
        BCRYPT_MAX_PASSWORD_LEN
    ))]
    TooLong { len: usize },

    #[snafu(display("{}", source))]
    Bcrypt { source: bcrypt::BcryptError },
}

/// One-way password hashing used by the `Bcrypt` helper.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError>;
}

/// bcrypt at the library's default cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        ensure!(
            password.len() <= BCRYPT_MAX_PASSWORD_LEN,
            TooLongSnafu {
                len: password.len()
            }
        );
        bcrypt::hash(password, bcrypt::DEFAULT_COST).context(BcryptSnafu)
    }
}

/// `QuoteMeta` escapes regex metacharacters so that a value can be embedded
/// in a regular expression literal: {{QuoteMeta external_master_hostname}}
pub fn quote_meta(
    helper: &Helper<'_, '_>,
    _: &Handlebars,
    _: &Context,
    renderctx: &mut RenderContext<'_, '_>,
    out: &mut dyn Output,
) -> HelperResult {
    trace!("Starting QuoteMeta helper");
    let template_name = template_name(renderctx);
    check_param_count(helper, template_name, 1)?;

    let value = get_param(helper, 0)?;
    let text = value.as_str().context(error::InvalidTemplateValueSnafu {
        expected: "string",
        value: value.to_owned(),
        template: template_name,
    })?;

    out.write(&regex::escape(text))
        .context(error::TemplateWriteSnafu {
            template: template_name,
        })?;
    Ok(())
}

/// `Bcrypt` writes the bcrypt hash of its string argument:
/// {{Bcrypt cluster_password}}
pub struct BcryptHelper {
    hasher: Arc<dyn PasswordHasher>,
}

impl BcryptHelper {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { hasher }
    }
}

impl HelperDef for BcryptHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        helper: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        renderctx: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        trace!("Starting Bcrypt helper");
        let template_name = template_name(renderctx);
        check_param_count(helper, template_name, 1)?;

        let value = get_param(helper, 0)?;
        let password = value.as_str().context(error::InvalidTemplateValueSnafu {
            expected: "string",
            value: value.to_owned(),
            template: template_name,
        })?;

        let hashed = self
            .hasher
            .hash(password)
            .context(error::PasswordHashSnafu {
                template: template_name,
            })?;
        out.write(&hashed).context(error::TemplateWriteSnafu {
            template: template_name,
        })?;
        Ok(())
    }
}

fn get_param<'a>(helper: &'a Helper<'_, '_>, idx: usize) -> Result<&'a Value, RenderError> {
    Ok(helper
        .param(idx)
        .map(|v| v.value())
        .context(error::MissingParamSnafu {
            index: idx,
            helper: helper.name(),
        })?)
}

/// Get the template name if there is one, otherwise return "dynamic template"
fn template_name<'a>(renderctx: &'a RenderContext<'_, '_>) -> &'a str {
    match renderctx.get_root_template_name() {
        Some(s) => s.as_str(),
        None => "dynamic template",
    }
}

fn check_param_count(helper: &Helper<'_, '_>, template_name: &str, expected: usize) -> Result<(), RenderError> {
    if helper.params().len() != expected {
        return Err(RenderError::from(
            error::TemplateHelperError::IncorrectNumberOfParams {
                expected,
                received: helper.params().len(),
                helper: helper.name().to_string(),
                template: template_name.to_string(),
            },
        ));
    }
    Ok(())
}
