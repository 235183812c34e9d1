//! Catalog service
//!
//! Entry points the surrounding layer calls with loaded, authorized inputs.
//! The service applies configuration defaults and logs each call; the
//! algorithms themselves live in the incarnation and migration crates.

use crate::config::CoreConfig;
use crate::error::CoreError;
use riskcat_incarnation::{
    AppliedIncarnation, ElementRepository, InMemoryRepository, IncarnationApplier,
    IncarnationPlan, IncarnationRequest, IncarnationResolver, ResolveOptions,
};
use riskcat_migration::{ChangeKind, ChangeSet, MigrationOrchestrator, MigrationOutcome};
use riskcat_model::{Domain, DomainTemplate, RiskDefinition, TemplateGraph};
use std::collections::BTreeSet;
use tracing::{info, info_span, warn};

/// Facade over incarnation and migration for one repository
#[derive(Debug)]
pub struct CatalogService<R> {
    config: CoreConfig,
    repository: R,
}

impl CatalogService<InMemoryRepository> {
    /// Service over a fresh in-memory repository
    #[must_use]
    pub fn in_memory(config: CoreConfig) -> Self {
        let repository =
            InMemoryRepository::new().with_unique_names(config.repository.enforce_unique_names);
        Self::new(repository, config)
    }
}

impl<R: ElementRepository> CatalogService<R> {
    #[must_use]
    pub fn new(repository: R, config: CoreConfig) -> Self {
        Self { config, repository }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Resolver options for a request: request, then service config, then domain
    #[must_use]
    pub fn options_for(&self, domain: &Domain, request: &IncarnationRequest) -> ResolveOptions {
        let settings = &self.config.incarnation;
        let defaults = settings.over(&domain.incarnation_configuration);
        request
            .options(&defaults)
            .with_merge_bidirectional_references(settings.merge_bidirectional_references)
    }

    /// Expand a request into a plan
    ///
    /// `graph` holds the items of the request's namespace: the domain catalog
    /// or a profile.
    pub fn resolve_incarnation(
        &self,
        domain: &Domain,
        graph: &TemplateGraph,
        request: &IncarnationRequest,
    ) -> Result<IncarnationPlan, CoreError> {
        let _span = info_span!("resolve_incarnation", domain = %domain.id, unit = %request.unit)
            .entered();
        let options = self.options_for(domain, request);
        let plan = IncarnationResolver::new(graph, &self.repository).resolve(request, &options)?;
        if !plan.issues.is_empty() {
            warn!("{} integrity issues in plan", plan.issues.len());
        }
        Ok(plan)
    }

    /// Materialize a plan in one repository commit
    pub fn apply_incarnation(
        &self,
        domain: &Domain,
        graph: &TemplateGraph,
        plan: &IncarnationPlan,
    ) -> Result<AppliedIncarnation, CoreError> {
        let _span =
            info_span!("apply_incarnation", domain = %domain.id, unit = %plan.unit).entered();
        Ok(IncarnationApplier::new(graph, domain, &self.repository).apply(plan)?)
    }

    /// Resolve and apply in one step
    pub fn incarnate(
        &self,
        domain: &Domain,
        graph: &TemplateGraph,
        request: &IncarnationRequest,
    ) -> Result<AppliedIncarnation, CoreError> {
        let plan = self.resolve_incarnation(domain, graph, request)?;
        self.apply_incarnation(domain, graph, &plan)
    }

    /// Structural changes between two versions of a risk definition
    #[must_use]
    pub fn diff_risk_definition(&self, old: &RiskDefinition, new: &RiskDefinition) -> ChangeSet {
        let changes = riskcat_migration::diff_risk_definition(old, new);
        info!(
            "risk definition '{}': {} changes {:?}",
            new.id,
            changes.len(),
            changes.kinds()
        );
        changes
    }

    /// Evaluate migrating a domain to a template against the domain's live elements
    ///
    /// The domain is left untouched; a successful outcome carries the
    /// migrated copy for the caller to persist.
    pub fn evaluate_migration(
        &self,
        domain: &Domain,
        template: &DomainTemplate,
        accepted: &BTreeSet<ChangeKind>,
    ) -> Result<MigrationOutcome, CoreError> {
        let _span = info_span!(
            "evaluate_migration",
            domain = %domain.id,
            from = %domain.template_version,
            to = %template.version
        )
        .entered();
        let elements = self.repository.elements_in_domain(domain.id)?;
        info!("evaluating migration against {} elements", elements.len());
        let orchestrator = MigrationOrchestrator::new()
            .with_inert(self.config.migration.inert_change_kinds.clone());
        Ok(orchestrator.evaluate(domain, template, &elements, accepted)?)
    }
}
