//! Incarnation applier
//!
//! Materializes a plan inside its unit. Elements are instantiated in
//! creation order with their pre-allocated ids, then every reference of a
//! created element is realized as a relation. All writes end up in one
//! [`ElementBatch`]; any failure before or during the commit leaves the
//! repository untouched.

use crate::error::ApplyError;
use crate::ordering::creation_order;
use crate::plan::{
    Disposition, IncarnationDescription, IncarnationPlan, ReferenceTarget, ResolvedReference,
};
use crate::repository::{ElementBatch, ElementRepository, IncarnationGuard};
use indexmap::IndexMap;
use riskcat_model::{
    AuxiliaryRole, ControlImplementation, CustomLink, Domain, Element, ElementId, ElementType,
    IncarnationLookup, ItemId, RequirementImplementation, RiskValueRef, TailoringReferenceKind,
    TemplateGraph, TemplateItem, UnitId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Result of a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedIncarnation {
    /// Element of every description, in plan order
    pub elements: Vec<ElementId>,
    /// Newly created elements, in creation order
    pub created: Vec<ElementId>,
    /// Existing elements that received new relations
    pub modified: Vec<ElementId>,
}

/// Applies plans against a domain and its template graph
#[derive(Debug)]
pub struct IncarnationApplier<'a, R: ?Sized> {
    graph: &'a TemplateGraph,
    domain: &'a Domain,
    repository: &'a R,
}

impl<'a, R: ElementRepository + ?Sized> IncarnationApplier<'a, R> {
    #[must_use]
    pub fn new(graph: &'a TemplateGraph, domain: &'a Domain, repository: &'a R) -> Self {
        Self {
            graph,
            domain,
            repository,
        }
    }

    /// Apply a (possibly edited) plan in one transaction
    pub fn apply(&self, plan: &IncarnationPlan) -> Result<AppliedIncarnation, ApplyError> {
        if plan.domain != self.domain.id {
            return Err(ApplyError::DomainMismatch {
                expected: self.domain.id,
                actual: plan.domain,
            });
        }
        let unit = self
            .repository
            .find_unit(plan.unit)?
            .ok_or(ApplyError::UnitNotFound(plan.unit))?;
        if !unit.is_associated_with(self.domain.id) {
            return Err(ApplyError::UnitNotInDomain {
                unit: unit.id,
                domain: self.domain.id,
            });
        }
        validate_plan(plan)?;

        let order = creation_order(&plan.descriptions);
        let mut workspace = Workspace::new(self.repository, plan.unit);
        let mut guards = Vec::new();

        for &position in &order {
            let description = &plan.descriptions[position];
            let Disposition::Create { element, guarded } = description.disposition else {
                continue;
            };
            let item = self
                .graph
                .get(description.item)
                .ok_or(ApplyError::ItemNotFound(description.item))?;
            workspace
                .created
                .insert(element, self.instantiate(item, element, plan.unit)?);
            if guarded {
                if let Some(applied) = item.applied_item() {
                    guards.push(IncarnationGuard {
                        item: applied,
                        version: (plan.lookup == IncarnationLookup::SameVersion)
                            .then_some(item.template_version),
                    });
                }
            }
        }

        for &position in &order {
            let description = &plan.descriptions[position];
            if !description.disposition.is_create() {
                continue;
            }
            let origin = description.disposition.element();
            for reference in &description.references {
                self.wire(&mut workspace, plan, description, origin, reference)?;
            }
        }

        let created_count = workspace.created.len();
        let modified: Vec<ElementId> = workspace.modified.keys().copied().collect();
        let batch = ElementBatch {
            unit: plan.unit,
            domain: self.domain.id,
            created: workspace.created.into_values().collect(),
            modified: workspace.modified.into_values().collect(),
            guards,
        };
        let created = self.repository.commit(batch)?;

        tracing::info!(
            "applied incarnation plan to unit {}: {} created, {} modified, {} reused",
            plan.unit,
            created_count,
            modified.len(),
            plan.reuse_count()
        );
        Ok(AppliedIncarnation {
            elements: plan
                .descriptions
                .iter()
                .map(|d| d.disposition.element())
                .collect(),
            created,
            modified,
        })
    }

    /// New element from a template item's structural data
    fn instantiate(
        &self,
        item: &TemplateItem,
        id: ElementId,
        unit: UnitId,
    ) -> Result<Element, ApplyError> {
        if let Some(sub_type) = &item.sub_type {
            let status = item.status.as_deref().unwrap_or_default();
            let defined = self
                .domain
                .element_type_definition(item.element_type)
                .is_some_and(|d| d.allows(sub_type, status));
            if !defined {
                return Err(ApplyError::InvalidSubType {
                    item: item.id,
                    sub_type: sub_type.clone(),
                    status: status.to_string(),
                });
            }
        }

        let mut element = Element::new(id, unit, self.domain.id, &item.name, item.element_type);
        element.abbreviation.clone_from(&item.abbreviation);
        element.description.clone_from(&item.description);
        element.sub_type.clone_from(&item.sub_type);
        element.status.clone_from(&item.status);
        element.custom_aspects.clone_from(&item.custom_aspects);
        if let Some(applied) = item.applied_item() {
            element = element.with_applied_item(applied, item.template_version);
        }
        Ok(element)
    }

    /// Realize one reference of a created element
    fn wire(
        &self,
        ws: &mut Workspace<'_, R>,
        plan: &IncarnationPlan,
        description: &IncarnationDescription,
        origin: ElementId,
        reference: &ResolvedReference,
    ) -> Result<(), ApplyError> {
        let target = target_element(plan, description, reference.target)?;
        let domain = self.domain.id;

        match &reference.kind {
            TailoringReferenceKind::Copy | TailoringReferenceKind::CopyAlways => {}
            TailoringReferenceKind::Link {
                link_type,
                attributes,
            } => {
                ws.element(target)?;
                ws.get_mut(origin)?.add_link(CustomLink {
                    link_type: link_type.clone(),
                    target,
                    domain,
                    attributes: attributes.clone(),
                });
            }
            TailoringReferenceKind::LinkExternal {
                link_type,
                attributes,
            } => {
                ws.get_mut(target)?.add_link(CustomLink {
                    link_type: link_type.clone(),
                    target: origin,
                    domain,
                    attributes: attributes.clone(),
                });
            }
            TailoringReferenceKind::Part => add_part(ws, origin, target)?,
            TailoringReferenceKind::Composite => add_part(ws, target, origin)?,
            TailoringReferenceKind::Scope => add_member(ws, target, origin)?,
            TailoringReferenceKind::Member => add_member(ws, origin, target)?,
            TailoringReferenceKind::Risk { values, .. } => {
                require_risk_affected(ws, origin)?;
                require_type(ws, target, ElementType::Scenario, "risk scenario")?;
                let owner = auxiliary(plan, description, reference, AuxiliaryRole::RiskOwner)?;
                if let Some(owner) = owner {
                    require_type(ws, owner, ElementType::Person, "risk owner")?;
                }
                let mitigation =
                    auxiliary(plan, description, reference, AuxiliaryRole::Mitigation)?;
                if let Some(mitigation) = mitigation {
                    require_type(ws, mitigation, ElementType::Control, "mitigation")?;
                }
                for value in values {
                    self.check_risk_value(description.item, value)?;
                }

                let risk = ws.get_mut(origin)?.obtain_risk(target, domain);
                risk.owner = owner.or(risk.owner);
                risk.mitigation = mitigation.or(risk.mitigation);
                for value in values {
                    if !risk.values.contains(value) {
                        risk.values.push(value.clone());
                    }
                }
            }
            TailoringReferenceKind::ControlImplementation { description: text, .. } => {
                require_risk_affected(ws, origin)?;
                require_type(ws, target, ElementType::Control, "implemented control")?;
                let responsible =
                    auxiliary(plan, description, reference, AuxiliaryRole::Responsible)?;
                if let Some(responsible) = responsible {
                    require_type(ws, responsible, ElementType::Person, "responsible")?;
                }
                let element = ws.get_mut(origin)?;
                if !element
                    .control_implementations
                    .iter()
                    .any(|ci| ci.control == target)
                {
                    element.control_implementations.push(ControlImplementation {
                        control: target,
                        responsible,
                        description: text.clone(),
                    });
                }
            }
            TailoringReferenceKind::RequirementImplementation {
                status, statement, ..
            } => {
                require_risk_affected(ws, origin)?;
                require_type(ws, target, ElementType::Control, "required control")?;
                let responsible =
                    auxiliary(plan, description, reference, AuxiliaryRole::Responsible)?;
                if let Some(responsible) = responsible {
                    require_type(ws, responsible, ElementType::Person, "responsible")?;
                }
                let element = ws.get_mut(origin)?;
                if !element
                    .requirement_implementations
                    .iter()
                    .any(|ri| ri.control == target)
                {
                    element
                        .requirement_implementations
                        .push(RequirementImplementation {
                            control: target,
                            status: *status,
                            statement: statement.clone(),
                            responsible,
                        });
                }
            }
        }
        Ok(())
    }

    fn check_risk_value(&self, item: ItemId, value: &RiskValueRef) -> Result<(), ApplyError> {
        let invalid = |reason: String| ApplyError::InvalidRiskValue {
            item,
            risk_definition: value.risk_definition.clone(),
            reason,
        };
        let definition = self
            .domain
            .risk_definition(&value.risk_definition)
            .ok_or_else(|| invalid("unknown risk definition".to_string()))?;
        let category = definition
            .categories
            .get(value.category)
            .ok_or_else(|| invalid(format!("no category at index {}", value.category)))?;
        category
            .cell(value.cell)
            .ok_or_else(|| invalid(format!("no matrix cell at {}", value.cell)))?;
        Ok(())
    }
}

/// Positions in range and pre-allocated ids distinct
fn validate_plan(plan: &IncarnationPlan) -> Result<(), ApplyError> {
    let mut ids = HashSet::new();
    for description in &plan.descriptions {
        if description.disposition.is_create() && !ids.insert(description.disposition.element()) {
            return Err(ApplyError::InvalidPlan(format!(
                "element id {} allocated twice",
                description.disposition.element()
            )));
        }
        let out_of_range = description
            .references
            .iter()
            .flat_map(ResolvedReference::targets)
            .any(|t| matches!(t, ReferenceTarget::Planned(p) if p >= plan.descriptions.len()));
        if out_of_range {
            return Err(ApplyError::InvalidPlan(format!(
                "reference of item {} points past the plan",
                description.item
            )));
        }
    }
    Ok(())
}

fn target_element(
    plan: &IncarnationPlan,
    description: &IncarnationDescription,
    target: ReferenceTarget,
) -> Result<ElementId, ApplyError> {
    match target {
        ReferenceTarget::Planned(position) => plan
            .descriptions
            .get(position)
            .map(|d| d.disposition.element())
            .ok_or_else(|| ApplyError::InvalidPlan(format!("no plan position {position}"))),
        ReferenceTarget::Existing(element) => Ok(element),
        ReferenceTarget::Unresolved(item) => Err(ApplyError::MissingTarget {
            target: item,
            required_by: description.item,
        }),
    }
}

fn auxiliary(
    plan: &IncarnationPlan,
    description: &IncarnationDescription,
    reference: &ResolvedReference,
    role: AuxiliaryRole,
) -> Result<Option<ElementId>, ApplyError> {
    reference
        .auxiliary
        .iter()
        .find(|a| a.role == role)
        .map(|a| target_element(plan, description, a.target))
        .transpose()
}

fn add_part<R: ElementRepository + ?Sized>(
    ws: &mut Workspace<'_, R>,
    composite: ElementId,
    part: ElementId,
) -> Result<(), ApplyError> {
    let composite_type = ws.element(composite)?.element_type;
    let part_type = ws.element(part)?.element_type;
    if !composite_type.is_composite() || composite_type != part_type {
        return Err(ApplyError::ModelConsistency(format!(
            "{part_type} {part} cannot be a part of {composite_type} {composite}"
        )));
    }
    ws.get_mut(composite)?.add_part(part);
    Ok(())
}

fn add_member<R: ElementRepository + ?Sized>(
    ws: &mut Workspace<'_, R>,
    scope: ElementId,
    member: ElementId,
) -> Result<(), ApplyError> {
    require_type(ws, scope, ElementType::Scope, "scope")?;
    ws.element(member)?;
    ws.get_mut(scope)?.add_member(member);
    Ok(())
}

fn require_type<R: ElementRepository + ?Sized>(
    ws: &mut Workspace<'_, R>,
    id: ElementId,
    expected: ElementType,
    role: &str,
) -> Result<(), ApplyError> {
    let actual = ws.element(id)?.element_type;
    if actual == expected {
        Ok(())
    } else {
        Err(ApplyError::ModelConsistency(format!(
            "{role} must be a {expected}, {id} is a {actual}"
        )))
    }
}

fn require_risk_affected<R: ElementRepository + ?Sized>(
    ws: &mut Workspace<'_, R>,
    id: ElementId,
) -> Result<(), ApplyError> {
    let actual = ws.element(id)?.element_type;
    if actual.is_risk_affected() {
        Ok(())
    } else {
        Err(ApplyError::ModelConsistency(format!(
            "{actual} {id} cannot carry risks or control implementations"
        )))
    }
}

/// Elements touched by one apply call
struct Workspace<'r, R: ?Sized> {
    repository: &'r R,
    unit: UnitId,
    created: IndexMap<ElementId, Element>,
    modified: IndexMap<ElementId, Element>,
    loaded: HashMap<ElementId, Element>,
}

impl<'r, R: ElementRepository + ?Sized> Workspace<'r, R> {
    fn new(repository: &'r R, unit: UnitId) -> Self {
        Self {
            repository,
            unit,
            created: IndexMap::new(),
            modified: IndexMap::new(),
            loaded: HashMap::new(),
        }
    }

    /// Element by id, loading existing elements on first access
    fn element(&mut self, id: ElementId) -> Result<&Element, ApplyError> {
        let known = self.created.contains_key(&id)
            || self.modified.contains_key(&id)
            || self.loaded.contains_key(&id);
        if !known {
            let element = self
                .repository
                .find_element(id)?
                .ok_or(ApplyError::ElementNotFound(id))?;
            if element.owner != self.unit {
                return Err(ApplyError::ForeignElement {
                    element: id,
                    unit: self.unit,
                });
            }
            self.loaded.insert(id, element);
        }
        self.created
            .get(&id)
            .or_else(|| self.modified.get(&id))
            .or_else(|| self.loaded.get(&id))
            .ok_or(ApplyError::ElementNotFound(id))
    }

    /// Element for modification; existing elements join the batch
    fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, ApplyError> {
        if self.created.contains_key(&id) {
            return self
                .created
                .get_mut(&id)
                .ok_or(ApplyError::ElementNotFound(id));
        }
        if !self.modified.contains_key(&id) {
            self.element(id)?;
            let element = self
                .loaded
                .remove(&id)
                .ok_or(ApplyError::ElementNotFound(id))?;
            self.modified.insert(id, element);
        }
        self.modified
            .get_mut(&id)
            .ok_or(ApplyError::ElementNotFound(id))
    }
}
