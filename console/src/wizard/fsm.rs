//! Finite State Machine for the deployment request wizard

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::WizardError;
use crate::models::deployment::{
    DeploymentRequest, Env, NamespaceType, SubmissionReceipt, VariableSchema, CUSTOM_SERVICE,
};
use crate::submission::gateway::SubmissionGateway;
use crate::wizard::schema::SchemaResolver;

/// Wizard stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStage {
    /// Service, tag, environment and namespace
    Configure,

    /// Environment variables and secret marks
    Variables,

    /// Read-only summary before submission
    Review,

    /// Handed off to the pipeline
    Submitted,
}

/// Navigation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    Next,
    Back,
}

/// Proof that a schema belongs to the latest service selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTicket {
    generation: u64,
    service: String,
}

impl SchemaTicket {
    pub fn service(&self) -> &str {
        &self.service
    }
}

/// Deployment request wizard
#[derive(Debug, Clone)]
pub struct Wizard {
    stage: WizardStage,
    catalog: Option<BTreeSet<String>>,
    service: String,
    tag: String,
    env: Option<Env>,
    namespace_type: NamespaceType,
    vars: BTreeMap<String, String>,
    schema_keys: Vec<String>,
    custom_keys: BTreeSet<String>,
    secret_keys: BTreeSet<String>,
    suggested_tags: Vec<String>,
    generation: u64,
    receipt: Option<SubmissionReceipt>,
    last_error: Option<String>,
}

impl Wizard {
    /// Create a wizard accepting any service name
    pub fn new() -> Self {
        Self {
            stage: WizardStage::Configure,
            catalog: None,
            service: String::new(),
            tag: String::new(),
            env: None,
            namespace_type: NamespaceType::default(),
            vars: BTreeMap::new(),
            schema_keys: Vec::new(),
            custom_keys: BTreeSet::new(),
            secret_keys: BTreeSet::new(),
            suggested_tags: Vec::new(),
            generation: 0,
            receipt: None,
            last_error: None,
        }
    }

    /// Create a wizard restricted to catalog services and `custom`
    pub fn with_catalog<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut wizard = Self::new();
        wizard.catalog = Some(services.into_iter().map(Into::into).collect());
        wizard
    }

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn env(&self) -> Option<Env> {
        self.env
    }

    pub fn namespace_type(&self) -> NamespaceType {
        self.namespace_type
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn secret_keys(&self) -> &BTreeSet<String> {
        &self.secret_keys
    }

    /// Keys declared by the resolved schema, in schema order
    pub fn schema_keys(&self) -> &[String] {
        &self.schema_keys
    }

    /// Keys added by the operator
    pub fn custom_keys(&self) -> &BTreeSet<String> {
        &self.custom_keys
    }

    pub fn suggested_tags(&self) -> &[String] {
        &self.suggested_tags
    }

    /// Receipt of a successful submission
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    /// Message of the last failed submission
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Service, tag and environment are all set
    pub fn is_ready(&self) -> bool {
        self.missing_field().is_none()
    }

    fn missing_field(&self) -> Option<&'static str> {
        if self.service.trim().is_empty() {
            Some("service")
        } else if self.tag.trim().is_empty() {
            Some("tag")
        } else if self.env.is_none() {
            Some("env")
        } else {
            None
        }
    }

    fn require_stage(&self, stage: WizardStage, action: &'static str) -> Result<(), WizardError> {
        if self.stage != stage {
            return Err(WizardError::WrongStage {
                stage: self.stage,
                action,
            });
        }
        Ok(())
    }

    // ============================== CONFIGURE ================================ //

    /// Select a service.
    ///
    /// The returned ticket must accompany the schema resolved for it; a
    /// later selection invalidates earlier tickets.
    pub fn select_service(&mut self, service: &str) -> Result<SchemaTicket, WizardError> {
        self.require_stage(WizardStage::Configure, "select a service")?;

        let service = service.trim();
        if service.is_empty() {
            return Err(WizardError::MissingField("service"));
        }
        if let Some(catalog) = &self.catalog {
            if service != CUSTOM_SERVICE && !catalog.contains(service) {
                return Err(WizardError::UnknownService(service.to_string()));
            }
        }

        self.generation += 1;
        self.service = service.to_string();
        debug!("Service selected: {} (selection {})", service, self.generation);

        Ok(SchemaTicket {
            generation: self.generation,
            service: self.service.clone(),
        })
    }

    /// Install a resolved schema; returns `false` for a stale ticket.
    ///
    /// Values already entered for keys that survive are kept, custom keys
    /// are always kept, and secret marks on dropped keys are removed.
    pub fn apply_schema(&mut self, ticket: &SchemaTicket, schema: VariableSchema) -> bool {
        if ticket.generation != self.generation || ticket.service != self.service {
            debug!(
                "Discarding stale schema for {} (selection {}, current {})",
                ticket.service, ticket.generation, self.generation
            );
            return false;
        }

        let mut vars = BTreeMap::new();
        for key in &schema.keys {
            let value = self.vars.get(key).cloned().unwrap_or_default();
            vars.insert(key.clone(), value);
        }

        // A custom key the schema now declares becomes a schema key
        self.custom_keys.retain(|k| !vars.contains_key(k));
        for key in &self.custom_keys {
            let value = self.vars.get(key).cloned().unwrap_or_default();
            vars.insert(key.clone(), value);
        }

        self.secret_keys.retain(|k| vars.contains_key(k));
        self.vars = vars;
        self.schema_keys = schema.keys;
        self.suggested_tags = schema.suggested_tags;

        info!(
            "Schema applied for {}: {} keys, {} custom",
            self.service,
            self.schema_keys.len(),
            self.custom_keys.len()
        );
        true
    }

    /// Select a service and resolve its schema in one step
    pub async fn choose_service(
        &mut self,
        resolver: &SchemaResolver,
        service: &str,
    ) -> Result<(), WizardError> {
        let ticket = self.select_service(service)?;
        let schema = resolver.resolve(ticket.service()).await;
        self.apply_schema(&ticket, schema);
        Ok(())
    }

    pub fn set_tag(&mut self, tag: &str) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Configure, "set the tag")?;
        self.tag = tag.trim().to_string();
        Ok(())
    }

    pub fn set_env(&mut self, env: Env) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Configure, "set the environment")?;
        self.env = Some(env);
        Ok(())
    }

    pub fn clear_env(&mut self) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Configure, "clear the environment")?;
        self.env = None;
        Ok(())
    }

    pub fn set_namespace_type(&mut self, namespace_type: NamespaceType) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Configure, "set the namespace")?;
        self.namespace_type = namespace_type;
        Ok(())
    }

    // ============================== VARIABLES ================================ //

    /// Set the value of a known key
    pub fn set_var(&mut self, key: &str, value: &str) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Variables, "edit variables")?;
        match self.vars.get_mut(key) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(WizardError::UnknownKey(key.to_string())),
        }
    }

    /// Add a key outside the resolved schema
    pub fn add_custom_var(&mut self, key: &str, value: &str) -> Result<(), WizardError> {
        self.require_stage(WizardStage::Variables, "add variables")?;

        let key = key.trim();
        if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
            return Err(WizardError::InvalidKey(key.to_string()));
        }
        if self.vars.contains_key(key) {
            warn!("Rejected duplicate variable key: {}", key);
            return Err(WizardError::DuplicateKey(key.to_string()));
        }

        self.custom_keys.insert(key.to_string());
        self.vars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Remove a key together with its secret mark
    pub fn remove_var(&mut self, key: &str) -> Result<bool, WizardError> {
        self.require_stage(WizardStage::Variables, "remove variables")?;
        let removed = self.vars.remove(key).is_some();
        if removed {
            self.custom_keys.remove(key);
            self.schema_keys.retain(|k| k != key);
            self.secret_keys.remove(key);
        }
        Ok(removed)
    }

    /// Flip a key's secret mark; returns whether it is now secret
    pub fn toggle_secret(&mut self, key: &str) -> Result<bool, WizardError> {
        self.require_stage(WizardStage::Variables, "mark secrets")?;
        if !self.vars.contains_key(key) {
            return Err(WizardError::UnknownKey(key.to_string()));
        }
        if self.secret_keys.remove(key) {
            Ok(false)
        } else {
            self.secret_keys.insert(key.to_string());
            Ok(true)
        }
    }

    /// Value as rendered, masked for secret keys
    pub fn display_value(&self, key: &str) -> Option<String> {
        let value = self.vars.get(key)?;
        if self.secret_keys.contains(key) {
            Some("*".repeat(value.chars().count().max(8)))
        } else {
            Some(value.clone())
        }
    }

    // ============================== NAVIGATION =============================== //

    /// Process a navigation event and transition stage
    pub fn process(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        let new_stage = match (self.stage, event) {
            (WizardStage::Configure, WizardEvent::Next) => {
                if let Some(field) = self.missing_field() {
                    return Err(WizardError::MissingField(field));
                }
                WizardStage::Variables
            }
            (WizardStage::Variables, WizardEvent::Next) => WizardStage::Review,
            (WizardStage::Variables, WizardEvent::Back) => WizardStage::Configure,
            (WizardStage::Review, WizardEvent::Back) => WizardStage::Variables,

            // Review -> Submitted only through `submit`
            (stage, WizardEvent::Next) => {
                return Err(WizardError::WrongStage {
                    stage,
                    action: "advance",
                })
            }
            (stage, WizardEvent::Back) => {
                return Err(WizardError::WrongStage {
                    stage,
                    action: "go back",
                })
            }
        };

        debug!("Wizard {:?} -> {:?}", self.stage, new_stage);
        self.stage = new_stage;
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), WizardError> {
        self.process(WizardEvent::Next)
    }

    pub fn back(&mut self) -> Result<(), WizardError> {
        self.process(WizardEvent::Back)
    }

    // ============================== SUBMISSION =============================== //

    /// Snapshot the current state as a request
    pub fn build_request(&self) -> Result<DeploymentRequest, WizardError> {
        if let Some(field) = self.missing_field() {
            return Err(WizardError::MissingField(field));
        }
        let env = self.env.ok_or(WizardError::MissingField("env"))?;

        Ok(DeploymentRequest {
            service: self.service.clone(),
            tag: self.tag.clone(),
            env,
            namespace_type: self.namespace_type,
            vars: self.vars.clone(),
            secret_keys: self.secret_keys.clone(),
        })
    }

    /// Submit from `Review`.
    ///
    /// On failure the wizard stays in `Review` and may be submitted again.
    pub async fn submit(
        &mut self,
        gateway: &SubmissionGateway,
    ) -> Result<SubmissionReceipt, WizardError> {
        self.require_stage(WizardStage::Review, "submit")?;
        let request = self.build_request()?;

        match gateway.submit(&request).await {
            Ok(receipt) => {
                self.stage = WizardStage::Submitted;
                self.last_error = None;
                self.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(WizardError::Submission(e))
            }
        }
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}
