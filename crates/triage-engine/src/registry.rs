//! Module registry

use anyhow::{Context, Result};
use tracing::info;
use triage_config::Config;
use triage_core::Module;
use triage_modules::{AttachmentModule, PrivacyModule, PrivacyOptions, RemoveTriagedMeqsModule};
use triage_security::{AccessTokenRedactor, AttachmentRedactor, NoopRedactor, SensitiveDataScanner};

use crate::scope::ModuleScope;

pub struct RegisteredModule {
    pub module: Box<dyn Module>,
    pub scope: ModuleScope,
    pub enabled: bool,
}

impl RegisteredModule {
    pub fn name(&self) -> &str {
        self.module.name()
    }
}

/// Modules in execution order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<RegisteredModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn Module>, scope: ModuleScope) {
        self.register_with(module, scope, true);
    }

    pub fn register_with(&mut self, module: Box<dyn Module>, scope: ModuleScope, enabled: bool) {
        self.modules.push(RegisteredModule {
            module,
            scope,
            enabled,
        });
    }

    pub fn enabled_modules(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.modules.iter().filter(|registered| registered.enabled)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Build every enabled module from configuration. Disabled modules are
    /// not constructed, so their settings are never validated.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        let modules = &config.modules;

        let privacy = &modules.privacy;
        if privacy.scope.enabled {
            let scanner = SensitiveDataScanner::new(&privacy.allowed_emails)
                .context("Failed to build privacy scanner")?;
            let redactor: Box<dyn AttachmentRedactor> = if privacy.redact_access_tokens {
                Box::new(AccessTokenRedactor)
            } else {
                Box::new(NoopRedactor)
            };
            let options = PrivacyOptions {
                message: privacy.message.clone(),
                comment_note: privacy.comment_note.clone(),
                sensitive_file_names: privacy.sensitive_file_names.clone(),
                exempt_groups: privacy.exempt_groups.clone(),
                notice_group: privacy.notice_group.clone(),
                restrict_group: privacy.restrict_group.clone(),
            };
            registry.register(
                Box::new(PrivacyModule::new(options, scanner, redactor)),
                ModuleScope::from(&privacy.scope),
            );
        }

        let attachment = &modules.attachment;
        if attachment.scope.enabled {
            registry.register(
                Box::new(AttachmentModule::new(
                    attachment.extension_blacklist.clone(),
                    attachment.comment.clone(),
                )),
                ModuleScope::from(&attachment.scope),
            );
        }

        let meqs = &modules.remove_triaged_meqs;
        if meqs.scope.enabled {
            registry.register(
                Box::new(
                    RemoveTriagedMeqsModule::new(meqs.meqs_tags.clone(), meqs.removal_reason.clone())
                        .context("Failed to build MEQS module")?,
                ),
                ModuleScope::from(&meqs.scope),
            );
        }

        info!("Registered {} modules", registry.len());
        Ok(registry)
    }
}
