//! Reference pattern catalog.
//!
//! Every syntactic position where a table, column or measure name can appear,
//! as a static, ordered table of rules keyed by rename kind and file family.
//! Rule order is significant: rules are applied one after another against
//! progressively rewritten content, so for each position the rule matching the
//! quoted spelling of the old name comes before the rule matching the bare
//! spelling.
//!
//! Text patterns use two placeholders that are filled per operation:
//! `{old}` (the old name, spelled for the rule's dialect and form) and
//! `{table}` (the owning table of a column). Each pattern captures exactly
//! one `old` group; only that span is replaced. A bare table spelling that
//! can directly follow another word is captured as `table` so the engine can
//! tell it apart from the tail of a longer table name.
//!
//! TMDL and DAX names are case-insensitive, so model-definition rules match
//! any casing of the old name. The replacement is always the new name as
//! given.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::operation::{RenameKind, RenameOperation};
use super::quoting::{escape_quotes, force_quote, quote};
use crate::error::{Error, Result};
use crate::project::FileFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntacticPosition {
    TableDeclaration,
    RefTableDeclaration,
    PartitionDeclaration,
    RelationshipName,
    RelationshipTableField,
    RelationshipColumnTablePart,
    BracketAccess,
    FunctionArgument,
    OrderingAnnotation,
    ColumnDeclaration,
    SortByColumn,
    RelationshipColumnField,
    MeasureDeclaration,
    MeasureReference,
    ReportEntity,
    ReportTable,
    ReportNativeReferenceName,
    ReportQualifiedName,
    ReportQueryRefAggregate,
    ReportEntityProperty,
    ReportProperty,
    LinguisticConceptualEntity,
    LinguisticEntityKey,
    DiagramNodeIndex,
}

/// How a name is spelled at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// TMDL / DAX identifier, spelled by the quoting grammar.
    Model,
    /// Inside `[...]`, with `]` doubled.
    Bracket,
    /// Inside an enclosing single-quoted string, with `'` doubled.
    Embedded,
    /// JSON string content.
    Json,
}

/// Source spelling of the old name a rule matches (model dialect only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameForm {
    Quoted,
    Bare,
}

/// Context condition a text match must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    None,
    /// Not inside a double-quoted DAX string literal on the same line.
    OutsideStringLiteral,
    /// Inside the declaration block of the owning table.
    OwningTableBlock,
    /// The relationship block's `fromTable`/`toTable` (matching the captured
    /// `end`) names the owning table.
    RelationshipEndIsTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum Matcher {
    /// Regex substitution of the `old` group. `tail` must match right after
    /// the group without being consumed.
    Text {
        pattern: &'static str,
        tail: Option<&'static str>,
    },
    /// Tree walk over a JSON document pairing `Entity` with `Property`.
    Structural,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReferencePatternRule {
    pub id: &'static str,
    pub kind: RenameKind,
    pub position: SyntacticPosition,
    pub families: &'static [FileFamily],
    pub dialect: Dialect,
    pub form: NameForm,
    /// Spelling of `{table}` in model-dialect patterns.
    pub table_form: NameForm,
    pub matcher: Matcher,
    pub guard: Guard,
}

impl ReferencePatternRule {
    const fn text(
        id: &'static str,
        kind: RenameKind,
        position: SyntacticPosition,
        families: &'static [FileFamily],
        dialect: Dialect,
        form: NameForm,
        pattern: &'static str,
    ) -> Self {
        ReferencePatternRule {
            id,
            kind,
            position,
            families,
            dialect,
            form,
            table_form: NameForm::Bare,
            matcher: Matcher::Text {
                pattern,
                tail: None,
            },
            guard: Guard::None,
        }
    }

    const fn tail(self, tail: &'static str) -> Self {
        match self.matcher {
            Matcher::Text { pattern, .. } => ReferencePatternRule {
                matcher: Matcher::Text {
                    pattern,
                    tail: Some(tail),
                },
                ..self
            },
            Matcher::Structural => self,
        }
    }

    const fn guard(self, guard: Guard) -> Self {
        ReferencePatternRule { guard, ..self }
    }

    const fn table_form(self, table_form: NameForm) -> Self {
        ReferencePatternRule { table_form, ..self }
    }

    pub fn applies_to(&self, kind: RenameKind, family: FileFamily) -> bool {
        self.kind == kind && self.families.contains(&family)
    }

    /// Rules over TMDL / DAX text, where names are case-insensitive.
    pub fn is_model_rule(&self) -> bool {
        self.families.contains(&FileFamily::ModelDefinition)
    }
}

const MODEL: &[FileFamily] = &[FileFamily::ModelDefinition];
const REPORT: &[FileFamily] = &[FileFamily::LegacyReport, FileFamily::EnhancedReport];
const ENHANCED: &[FileFamily] = &[FileFamily::EnhancedReport];
const LINGUISTIC: &[FileFamily] = &[FileFamily::LinguisticSchema];
const DIAGRAM: &[FileFamily] = &[FileFamily::DiagramLayout];

use Dialect::{Bracket, Embedded, Json, Model};
use NameForm::{Bare, Quoted};
use RenameKind::{Column, Measure, Table};
use SyntacticPosition as P;

type Rule = ReferencePatternRule;

/// The full catalog, in application order.
pub static CATALOG: &[ReferencePatternRule] = &[
    // ------------------------------------------------------------------
    // Table rename: model-definition text
    // ------------------------------------------------------------------
    Rule::text("table.declaration.quoted", Table, P::TableDeclaration, MODEL, Model, Quoted,
        r"(?m)^[ \t]*table[ \t]+(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.declaration.bare", Table, P::TableDeclaration, MODEL, Model, Bare,
        r"(?m)^[ \t]*table[ \t]+(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.ref.quoted", Table, P::RefTableDeclaration, MODEL, Model, Quoted,
        r"(?m)^[ \t]*ref[ \t]+table[ \t]+(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.ref.bare", Table, P::RefTableDeclaration, MODEL, Model, Bare,
        r"(?m)^[ \t]*ref[ \t]+table[ \t]+(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.partition.quoted", Table, P::PartitionDeclaration, MODEL, Model, Quoted,
        r"(?m)^[ \t]*partition[ \t]+(?P<old>{old})[ \t]*="),
    Rule::text("table.partition.bare", Table, P::PartitionDeclaration, MODEL, Model, Bare,
        r"(?m)^[ \t]*partition[ \t]+(?P<old>{old})[ \t]*="),
    Rule::text("table.relationship_name.from", Table, P::RelationshipName, MODEL, Embedded, Bare,
        r"(?m)^[ \t]*relationship[ \t]+'(?P<old>{old})[ \t]+to[ \t]+"),
    Rule::text("table.relationship_name.to", Table, P::RelationshipName, MODEL, Embedded, Bare,
        r"(?m)^[ \t]*relationship[ \t]+'(?:[^'\r\n]|'')*?[ \t]+to[ \t]+(?P<old>{old})'[ \t]*\r?$"),
    Rule::text("table.relationship_table.quoted", Table, P::RelationshipTableField, MODEL, Model, Quoted,
        r"(?m)^[ \t]*(?:fromTable|toTable)[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.relationship_table.bare", Table, P::RelationshipTableField, MODEL, Model, Bare,
        r"(?m)^[ \t]*(?:fromTable|toTable)[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$"),
    Rule::text("table.relationship_column.quoted", Table, P::RelationshipColumnTablePart, MODEL, Model, Quoted,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?P<old>{old})\."),
    Rule::text("table.relationship_column.bare", Table, P::RelationshipColumnTablePart, MODEL, Model, Bare,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?P<old>{old})\."),
    Rule::text("table.bracket.quoted", Table, P::BracketAccess, MODEL, Model, Quoted,
        r"(?m)(?:^|[^'])(?P<old>{old})")
        .tail(r"[ \t]*\[")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("table.bracket.bare", Table, P::BracketAccess, MODEL, Model, Bare,
        r"(?m)(?:^|[^\w'.\]])(?P<old>{old})")
        .tail(r"[ \t]*\[")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("table.function_argument.quoted", Table, P::FunctionArgument, MODEL, Model, Quoted,
        r"(?m)(?:[(,]|^)[ \t]*(?P<old>{old})")
        .tail(r"[ \t]*[,)]")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("table.function_argument.bare", Table, P::FunctionArgument, MODEL, Model, Bare,
        r"(?m)(?:[(,]|^)[ \t]*(?P<old>{old})")
        .tail(r"[ \t]*[,)]")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("table.ordering_annotation", Table, P::OrderingAnnotation, MODEL, Json, Bare,
        r#"(?m)^[ \t]*annotation[ \t]+PBI_QueryOrder[ \t]*=[ \t]*\[[^\]\r\n]*?"(?P<old>{old})""#),
    // ------------------------------------------------------------------
    // Table rename: report layer and ancillary JSON
    // ------------------------------------------------------------------
    Rule::text("table.report.entity", Table, P::ReportEntity, REPORT, Json, Bare,
        r#"\\?"Entity\\?"[ \t]*:[ \t]*\\?"(?P<old>{old})\\?""#),
    Rule::text("table.report.table", Table, P::ReportTable, REPORT, Json, Bare,
        r#"\\?"Table\\?"[ \t]*:[ \t]*\\?"(?P<old>{old})\\?""#),
    Rule::text("table.report.native_reference_name", Table, P::ReportNativeReferenceName, REPORT, Json, Bare,
        r#"\\?"NativeReferenceName\\?"[ \t]*:[ \t]*\\?"(?P<old>{old})\\?""#),
    Rule::text("table.report.qualified_name", Table, P::ReportQualifiedName, REPORT, Json, Bare,
        r#""(?P<old>{old})\."#),
    Rule::text("table.report.query_ref_aggregate", Table, P::ReportQueryRefAggregate, REPORT, Json, Bare,
        r#"\\?"(?:queryRef|nativeQueryRef|metadata)\\?"[ \t]*:[ \t]*\\?"[^"]*?\((?P<old>{old})\."#),
    Rule::text("table.linguistic.conceptual_entity", Table, P::LinguisticConceptualEntity, LINGUISTIC, Json, Bare,
        r#"\\?"ConceptualEntity\\?"[ \t]*:[ \t]*\\?"(?P<old>{old})\\?""#),
    Rule::text("table.linguistic.entity_key", Table, P::LinguisticEntityKey, LINGUISTIC, Json, Bare,
        r#""(?P<old>{old})"[ \t]*:"#),
    Rule::text("table.diagram.node_index", Table, P::DiagramNodeIndex, DIAGRAM, Json, Bare,
        r#""nodeIndex"[ \t]*:[ \t]*"(?P<old>{old})""#),
    // ------------------------------------------------------------------
    // Column rename: model-definition text
    // ------------------------------------------------------------------
    Rule::text("column.bracket.quoted_table", Column, P::BracketAccess, MODEL, Bracket, Bare,
        r"(?m)(?:^|[^'])(?:{table})[ \t]*\[[ \t]*(?P<old>{old})[ \t]*\]")
        .table_form(Quoted)
        .guard(Guard::OutsideStringLiteral),
    Rule::text("column.bracket.bare_table", Column, P::BracketAccess, MODEL, Bracket, Bare,
        r"(?m)(?:^|[^\w'.\]])(?P<table>{table})[ \t]*\[[ \t]*(?P<old>{old})[ \t]*\]")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("column.declaration.quoted", Column, P::ColumnDeclaration, MODEL, Model, Quoted,
        r"(?m)^[ \t]*column[ \t]+(?P<old>{old})[ \t]*(?:=|\r?$)")
        .guard(Guard::OwningTableBlock),
    Rule::text("column.declaration.bare", Column, P::ColumnDeclaration, MODEL, Model, Bare,
        r"(?m)^[ \t]*column[ \t]+(?P<old>{old})[ \t]*(?:=|\r?$)")
        .guard(Guard::OwningTableBlock),
    Rule::text("column.sort_by_column.quoted", Column, P::SortByColumn, MODEL, Model, Quoted,
        r"(?m)^[ \t]*sortByColumn[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$")
        .guard(Guard::OwningTableBlock),
    Rule::text("column.sort_by_column.bare", Column, P::SortByColumn, MODEL, Model, Bare,
        r"(?m)^[ \t]*sortByColumn[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$")
        .guard(Guard::OwningTableBlock),
    Rule::text("column.relationship.quoted_table.quoted", Column, P::RelationshipColumnField, MODEL, Model, Quoted,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?:{table})\.(?P<old>{old})[ \t]*\r?$")
        .table_form(Quoted),
    Rule::text("column.relationship.quoted_table.bare", Column, P::RelationshipColumnField, MODEL, Model, Bare,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?:{table})\.(?P<old>{old})[ \t]*\r?$")
        .table_form(Quoted),
    Rule::text("column.relationship.bare_table.quoted", Column, P::RelationshipColumnField, MODEL, Model, Quoted,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?:{table})\.(?P<old>{old})[ \t]*\r?$"),
    Rule::text("column.relationship.bare_table.bare", Column, P::RelationshipColumnField, MODEL, Model, Bare,
        r"(?m)^[ \t]*(?:fromColumn|toColumn)[ \t]*:[ \t]*(?:{table})\.(?P<old>{old})[ \t]*\r?$"),
    Rule::text("column.relationship.unqualified.quoted", Column, P::RelationshipColumnField, MODEL, Model, Quoted,
        r"(?m)^[ \t]*(?P<end>from|to)Column[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$")
        .guard(Guard::RelationshipEndIsTable),
    Rule::text("column.relationship.unqualified.bare", Column, P::RelationshipColumnField, MODEL, Model, Bare,
        r"(?m)^[ \t]*(?P<end>from|to)Column[ \t]*:[ \t]*(?P<old>{old})[ \t]*\r?$")
        .guard(Guard::RelationshipEndIsTable),
    // ------------------------------------------------------------------
    // Column rename: report layer
    // ------------------------------------------------------------------
    ReferencePatternRule {
        id: "column.report.entity_property",
        kind: Column,
        position: P::ReportEntityProperty,
        families: ENHANCED,
        dialect: Json,
        form: Bare,
        table_form: Bare,
        matcher: Matcher::Structural,
        guard: Guard::None,
    },
    Rule::text("column.report.qualified_name", Column, P::ReportQualifiedName, REPORT, Json, Bare,
        r#""(?:{table})\.(?P<old>{old})\\?""#),
    Rule::text("column.report.query_ref_aggregate", Column, P::ReportQueryRefAggregate, REPORT, Json, Bare,
        r"\((?:{table})\.(?P<old>{old})\)"),
    // ------------------------------------------------------------------
    // Measure rename
    // ------------------------------------------------------------------
    Rule::text("measure.declaration.quoted", Measure, P::MeasureDeclaration, MODEL, Model, Quoted,
        r"(?m)^[ \t]*measure[ \t]+(?P<old>{old})[ \t]*="),
    Rule::text("measure.declaration.bare", Measure, P::MeasureDeclaration, MODEL, Model, Bare,
        r"(?m)^[ \t]*measure[ \t]+(?P<old>{old})[ \t]*="),
    Rule::text("measure.reference", Measure, P::MeasureReference, MODEL, Bracket, Bare,
        r"(?m)(?:^|[^\w'\]])\[[ \t]*(?P<old>{old})[ \t]*\]")
        .guard(Guard::OutsideStringLiteral),
    Rule::text("measure.report.property", Measure, P::ReportProperty, REPORT, Json, Bare,
        r#"\\?"Property\\?"[ \t]*:[ \t]*\\?"(?P<old>{old})\\?""#),
    Rule::text("measure.report.qualified_name", Measure, P::ReportQualifiedName, REPORT, Json, Bare,
        r#"\.(?P<old>{old})\\?""#),
];

/// Rules for one rename kind and file family, in application order.
pub fn rules_for(
    kind: RenameKind,
    family: FileFamily,
) -> impl Iterator<Item = &'static ReferencePatternRule> {
    CATALOG
        .iter()
        .filter(move |rule| rule.applies_to(kind, family))
}

/// A text rule with its placeholders filled in for one operation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: &'static ReferencePatternRule,
    pub regex: Regex,
    pub tail: Option<Regex>,
    /// Spelling written in place of the `old` group.
    pub replacement: String,
    /// Logical owning table (column renames), used by guards.
    pub table: String,
}

/// Compile the text rules that apply to `op` in `family`.
///
/// Structural rules are not compiled; the engine runs them separately.
pub fn compile(op: &RenameOperation, family: FileFamily) -> Result<Vec<CompiledRule>> {
    let mut compiled = Vec::new();

    for rule in rules_for(op.kind, family) {
        let Matcher::Text { pattern, tail } = rule.matcher else {
            continue;
        };

        let old = spell_old(rule.dialect, rule.form, &op.old_name);
        let table = spell_table(rule.dialect, rule.table_form, op.table_name());
        let source = pattern
            .replace("{old}", &regex::escape(&old))
            .replace("{table}", &regex::escape(&table));

        let regex = RegexBuilder::new(&source)
            .case_insensitive(rule.is_model_rule())
            .build()
            .map_err(|e| {
                Error::internal_unexpected(format!("rule {} failed to compile: {}", rule.id, e))
            })?;
        let tail = match tail {
            Some(t) => Some(Regex::new(&format!("^(?:{})", t)).map_err(|e| {
                Error::internal_unexpected(format!(
                    "rule {} tail failed to compile: {}",
                    rule.id, e
                ))
            })?),
            None => None,
        };

        compiled.push(CompiledRule {
            rule,
            regex,
            tail,
            replacement: spell_new(rule.dialect, &op.new_name),
            table: op.table_name().to_string(),
        });
    }

    Ok(compiled)
}

/// Structural rules that apply to `kind` in `family`.
pub fn structural_rules(
    kind: RenameKind,
    family: FileFamily,
) -> impl Iterator<Item = &'static ReferencePatternRule> {
    rules_for(kind, family).filter(|rule| rule.matcher == Matcher::Structural)
}

/// Spelling of the old name a rule searches for.
pub fn spell_old(dialect: Dialect, form: NameForm, name: &str) -> String {
    match (dialect, form) {
        (Model, Quoted) => force_quote(name),
        (Model, Bare) => name.to_string(),
        (Bracket, _) => name.replace(']', "]]"),
        (Embedded, _) => escape_quotes(name),
        (Json, _) => json_escape(name),
    }
}

/// Destination spelling of the new name.
pub fn spell_new(dialect: Dialect, name: &str) -> String {
    match dialect {
        Model => quote(name),
        Bracket => name.replace(']', "]]"),
        Embedded => escape_quotes(name),
        Json => json_escape(name),
    }
}

fn spell_table(dialect: Dialect, form: NameForm, table: &str) -> String {
    match dialect {
        Json => json_escape(table),
        _ => spell_old(Model, form, table),
    }
}

/// JSON string content (without the surrounding quotes).
pub fn json_escape(name: &str) -> String {
    let quoted = serde_json::to_string(name).unwrap_or_else(|_| format!("\"{}\"", name));
    quoted[1..quoted.len() - 1].to_string()
}
