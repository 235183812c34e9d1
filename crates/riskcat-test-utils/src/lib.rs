//! Testing utilities for the riskcat workspace
//!
//! Shared fixtures (risk definitions, domains, units, catalog graphs) and
//! proptest strategies.

#![allow(missing_docs)]

use proptest::prelude::*;
use riskcat_model::{
    AttributeDefinition, CategoryDefinition, Domain, DomainId, DomainTemplate, Element, ElementId,
    ElementType, ElementTypeDefinition, ItemId, Level, MatrixCell, RiskDefinition, RiskValueRef,
    CellRef, TailoringReferenceKind, TailoringReferenceType, TemplateGraph, TemplateItem,
    TemplateVersion, Translations, Unit, UnitId, ValueMatrix,
};

pub const COLORS: [&str; 4] = ["#00ff00", "#ffff00", "#ff8000", "#ff0000"];

/// `n` levels with names and colors
pub fn levels(n: usize) -> Vec<Level> {
    (0..n)
        .map(|i| {
            Level::new(i)
                .with_color(COLORS[i % COLORS.len()])
                .with_name("en", &format!("Level {i}"))
        })
        .collect()
}

/// `rows` x `columns` matrix with value `(row + column) / 2`, capped at `max`
pub fn matrix(rows: usize, columns: usize, max: usize) -> ValueMatrix {
    (0..rows)
        .map(|row| {
            (0..columns)
                .map(|column| {
                    let value = ((row + column) / 2).min(max);
                    MatrixCell {
                        value,
                        html_color: Some(COLORS[value % COLORS.len()].to_string()),
                    }
                })
                .collect()
        })
        .collect()
}

/// "DSRA" with categories C and I, each a 3x3 matrix
pub fn dsra() -> RiskDefinition {
    RiskDefinition::new("DSRA")
        .with_probability(levels(3))
        .with_risk_values(levels(3))
        .with_category(CategoryDefinition::new("C", levels(3)).with_matrix(matrix(3, 3, 2)))
        .with_category(CategoryDefinition::new("I", levels(3)).with_matrix(matrix(3, 3, 2)))
}

/// "DSRA" with impact row `row` removed from category C
pub fn dsra_without_impact(row: usize) -> RiskDefinition {
    let mut definition = dsra();
    let category = &mut definition.categories[0];
    category.potential_impacts.remove(row);
    if let Some(matrix) = category.value_matrix.as_mut() {
        matrix.remove(row);
    }
    for (i, level) in category.potential_impacts.iter_mut().enumerate() {
        level.ordinal = i;
    }
    definition
}

/// Element type definitions used across tests
pub fn element_types() -> Vec<ElementTypeDefinition> {
    vec![
        ElementTypeDefinition::new(ElementType::Asset)
            .with_sub_type("AST_Server", &["NEW", "IN_OPERATION"])
            .with_sub_type("AST_Datatype", &["NEW"])
            .with_attribute("asset_details", "asset_owner", AttributeDefinition::Text)
            .with_attribute(
                "asset_details",
                "asset_kind",
                AttributeDefinition::Enum {
                    allowed_values: vec!["physical".into(), "virtual".into()],
                },
            ),
        ElementTypeDefinition::new(ElementType::Control)
            .with_sub_type("CTL_TOM", &["NEW", "RELEASED"]),
        ElementTypeDefinition::new(ElementType::Document),
        ElementTypeDefinition::new(ElementType::Incident),
        ElementTypeDefinition::new(ElementType::Person)
            .with_sub_type("PER_Person", &["NEW"]),
        ElementTypeDefinition::new(ElementType::Process)
            .with_sub_type("PRO_DataProcessing", &["NEW", "RELEASED"]),
        ElementTypeDefinition::new(ElementType::Scenario)
            .with_sub_type("SCN_Scenario", &["NEW"]),
        ElementTypeDefinition::new(ElementType::Scope)
            .with_sub_type("SCP_Scope", &["NEW"]),
    ]
}

/// Template at a version carrying DSRA and the test element types
pub fn domain_template(version: TemplateVersion) -> DomainTemplate {
    let mut template = DomainTemplate::new("test-domain", version);
    template.risk_definitions = vec![dsra()];
    template.element_type_definitions = element_types();
    template
}

/// Domain derived from `domain_template(1.0.0)`
pub fn domain() -> Domain {
    Domain::from_template(&domain_template(TemplateVersion::new(1, 0, 0)))
}

/// Unit working with `domain`
pub fn unit_in(domain: &Domain) -> Unit {
    Unit::new(UnitId::new(), "test-unit", vec![domain.id])
}

/// Element of `unit` in `domain`
pub fn element(unit: &Unit, domain: &Domain, name: &str, element_type: ElementType) -> Element {
    Element::new(ElementId::new(), unit.id, domain.id, name, element_type)
}

/// Asset with a DSRA risk value at `cell` of category `category`
pub fn asset_with_risk_value(
    unit: &Unit,
    domain: &Domain,
    category: usize,
    cell: CellRef,
) -> Element {
    let mut asset = element(unit, domain, "asset with risk", ElementType::Asset);
    let risk = asset.obtain_risk(ElementId::new(), domain.id);
    risk.values.push(RiskValueRef::new("DSRA", category, cell));
    asset
}

/// Catalog A -> B (COPY), B -> C (LINK), returns items and `[a, b, c]`
pub fn copy_link_chain(domain: DomainId) -> (Vec<TemplateItem>, [ItemId; 3]) {
    let c = TemplateItem::catalog(domain, "C", ElementType::Control);
    let b = TemplateItem::catalog(domain, "B", ElementType::Control)
        .with_reference(c.id, TailoringReferenceKind::link("relates_to"));
    let a = TemplateItem::catalog(domain, "A", ElementType::Control)
        .with_reference(b.id, TailoringReferenceKind::Copy);
    let ids = [a.id, b.id, c.id];
    (vec![a, b, c], ids)
}

/// Catalog graph with `count` controls and the given edges
///
/// Edges are `(origin, target, type)` by position; positions are taken
/// modulo `count`. Only copy and link types are used so that any edge can be
/// applied between controls.
pub fn graph_from_edges(
    domain: DomainId,
    count: usize,
    edges: &[(usize, usize, TailoringReferenceType)],
) -> (TemplateGraph, Vec<ItemId>) {
    let mut items: Vec<TemplateItem> = (0..count)
        .map(|i| TemplateItem::catalog(domain, format!("item-{i}"), ElementType::Control))
        .collect();
    let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
    for &(origin, target, reference_type) in edges {
        let kind = match reference_type {
            TailoringReferenceType::Copy => TailoringReferenceKind::Copy,
            TailoringReferenceType::CopyAlways => TailoringReferenceKind::CopyAlways,
            TailoringReferenceType::LinkExternal => TailoringReferenceKind::LinkExternal {
                link_type: "relates_to".into(),
                attributes: Default::default(),
            },
            _ => TailoringReferenceKind::link("relates_to"),
        };
        let target = ids[target % count];
        let origin = &mut items[origin % count];
        origin.tailoring_references.push(
            riskcat_model::TailoringReference::new(target, kind),
        );
    }
    let graph = TemplateGraph::new(items).unwrap();
    (graph, ids)
}

/// Edge lists over up to `max_items` items, cycles included
pub fn arb_edges(
    max_items: usize,
) -> impl Strategy<Value = (usize, Vec<(usize, usize, TailoringReferenceType)>)> {
    (1..=max_items).prop_flat_map(|count| {
        let reference_type = prop_oneof![
            Just(TailoringReferenceType::Copy),
            Just(TailoringReferenceType::CopyAlways),
            Just(TailoringReferenceType::Link),
            Just(TailoringReferenceType::LinkExternal),
        ];
        (
            Just(count),
            prop::collection::vec((0..count, 0..count, reference_type), 0..count * 2),
        )
    })
}

fn arb_translations() -> impl Strategy<Value = Translations> {
    prop::collection::vec(
        (
            prop_oneof![Just("en"), Just("de")],
            prop_oneof![Just("name"), Just("abbreviation")],
            "[a-z]{1,6}",
        ),
        0..3,
    )
    .prop_map(|entries| {
        let mut translations = Translations::new();
        for (locale, field, text) in entries {
            translations.insert(locale, field, text);
        }
        translations
    })
}

fn arb_levels(count: usize) -> impl Strategy<Value = Vec<Level>> {
    prop::collection::vec(
        (prop::option::of(prop::sample::select(COLORS.to_vec())), arb_translations()),
        count,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(ordinal, (color, translations))| Level {
                ordinal,
                html_color: color.map(str::to_string),
                translations,
            })
            .collect()
    })
}

/// Structurally valid risk definitions with id "RD"
pub fn arb_risk_definition() -> impl Strategy<Value = RiskDefinition> {
    (1usize..=4, 1usize..=4, 1usize..=3).prop_flat_map(|(probabilities, values, categories)| {
        let category = (1usize..=4, any::<bool>()).prop_flat_map(move |(impacts, has_matrix)| {
            let cells = prop::collection::vec(
                prop::collection::vec(0..values, probabilities),
                impacts,
            );
            (arb_levels(impacts), cells, arb_translations()).prop_map(
                move |(potential_impacts, cells, translations)| {
                    let value_matrix = has_matrix.then(|| {
                        cells
                            .into_iter()
                            .map(|row| row.into_iter().map(MatrixCell::new).collect())
                            .collect()
                    });
                    (potential_impacts, value_matrix, translations)
                },
            )
        });
        (
            arb_levels(probabilities),
            arb_levels(values),
            prop::collection::vec(category, categories),
            arb_translations(),
        )
            .prop_map(|(probability, risk_values, categories, translations)| {
                let mut definition = RiskDefinition::new("RD")
                    .with_probability(probability)
                    .with_risk_values(risk_values);
                definition.translations = translations;
                for (i, (impacts, value_matrix, translations)) in categories.into_iter().enumerate()
                {
                    let mut category = CategoryDefinition::new(format!("cat-{i}"), impacts);
                    category.value_matrix = value_matrix;
                    category.translations = translations;
                    definition.categories.push(category);
                }
                definition
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_valid() {
        assert!(dsra().validate().is_ok());
        assert!(dsra_without_impact(2).validate().is_ok());
        assert_eq!(dsra_without_impact(2).categories[0].potential_impacts.len(), 2);
    }

    proptest! {
        #[test]
        fn generated_risk_definitions_validate(definition in arb_risk_definition()) {
            prop_assert!(definition.validate().is_ok());
        }
    }
}
