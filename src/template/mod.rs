// src/template/mod.rs
mod assets;
mod helpers;
mod renderer;

pub use assets::{EmbeddedTemplates, MemoryTemplates, TemplateSource};
pub use helpers::{BcryptHasher, PasswordHashError, PasswordHasher, BCRYPT_MAX_PASSWORD_LEN};
pub use renderer::{MasterContext, RenderedFile, Role, TemplateContext, TemplateRenderer};
