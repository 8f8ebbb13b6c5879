// src/template/renderer.rs
use super::assets::{EmbeddedTemplates, TemplateSource};
use super::helpers::{quote_meta, BcryptHasher, BcryptHelper, PasswordHasher};
use crate::config::{AzureConfig, Config};
use crate::error::{self, Result};
use handlebars::Handlebars;
use log::debug;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::fmt;
use std::sync::Arc;

/// Which bundle a template belongs to, taken from its first path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Node,
}

impl Role {
    pub fn prefix(self) -> &'static str {
        match self {
            Role::Master => "master/",
            Role::Node => "node/",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Node => write!(f, "node"),
        }
    }
}

/// The view of a [`Config`] templates render against.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub external_master_hostname: String,
    pub master: MasterContext,
    pub auth_secret: String,
    pub enc_secret: String,
    pub cluster_username: String,
    pub cluster_password: String,
    pub enable_aad_authentication: bool,
    pub azure: AzureConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct MasterContext {
    pub hostname: String,
    pub ips: Vec<String>,
    pub port: u16,
}

impl TemplateContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            external_master_hostname: config.external_master_hostname.clone(),
            master: MasterContext {
                hostname: config.master.hostname.clone(),
                ips: config.master.ips.iter().map(ToString::to_string).collect(),
                port: config.master.port,
            },
            auth_secret: config.auth_secret.clone(),
            enc_secret: config.enc_secret.clone(),
            cluster_username: config.cluster_username.clone(),
            cluster_password: config.cluster_password.clone(),
            enable_aad_authentication: config.enable_aad_authentication,
            azure: config.azure_config.clone(),
        }
    }
}

/// A rendered file: output path relative to the bundle root, and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// Expands role templates with the `QuoteMeta` and `Bcrypt` helpers.
///
/// Holds no state between renders beyond the injected template source and
/// password hasher.
pub struct TemplateRenderer {
    source: Arc<dyn TemplateSource>,
    hasher: Arc<dyn PasswordHasher>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(Arc::new(EmbeddedTemplates::new()), Arc::new(BcryptHasher))
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("templates", &self.source.names())
            .finish()
    }
}

impl TemplateRenderer {
    pub fn new(source: Arc<dyn TemplateSource>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { source, hasher }
    }

    fn registry(&self) -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        // Strict mode fails the render when a template names a field the
        // context does not have.
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("QuoteMeta", Box::new(quote_meta));
        registry.register_helper("Bcrypt", Box::new(BcryptHelper::new(Arc::clone(&self.hasher))));
        registry
    }

    /// Renders one named template.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<Vec<u8>> {
        let mut registry = self.registry();
        self.register(&mut registry, name)?;
        self.render_registered(&registry, name, context)
    }

    /// Renders every template of `role`, in name order.
    ///
    /// Nothing is returned unless every template rendered, so a caller never
    /// sees part of a role's files.
    pub fn render_role(&self, role: Role, context: &TemplateContext) -> Result<Vec<RenderedFile>> {
        let names: Vec<String> = self
            .source
            .names()
            .into_iter()
            .filter(|name| name.starts_with(role.prefix()))
            .collect();

        let mut registry = self.registry();
        for name in &names {
            self.register(&mut registry, name)?;
        }

        let mut rendered = Vec::with_capacity(names.len());
        for name in &names {
            let contents = self.render_registered(&registry, name, context)?;
            rendered.push(RenderedFile {
                path: name[role.prefix().len()..].to_string(),
                contents,
            });
        }
        debug!("Rendered {} {} templates", rendered.len(), role);
        Ok(rendered)
    }

    fn register(&self, registry: &mut Handlebars<'static>, name: &str) -> Result<()> {
        let bytes = self
            .source
            .load(name)
            .context(error::TemplateMissingSnafu { name })?;
        let text = std::str::from_utf8(bytes).context(error::TemplateEncodingSnafu { name })?;
        registry
            .register_template_string(name, text)
            .context(error::TemplateParseSnafu { name })
    }

    fn render_registered(
        &self,
        registry: &Handlebars<'static>,
        name: &str,
        context: &TemplateContext,
    ) -> Result<Vec<u8>> {
        let data = serde_json::to_value(context).context(error::TemplateDataSnafu)?;
        registry
            .render(name, &data)
            .map(String::into_bytes)
            .context(error::TemplateRenderSnafu { name })
    }
}
